//! Template Engine
//!
//! A `text/template` style engine. A `TemplateSet` holds named template
//! bodies, one of which is the root (`__main__`), plus the
//! `FunctionNamespace` its templates may call.

pub mod types;
pub mod value;
pub mod lexer;
pub mod parser;
pub mod funcs;
mod exec;

use std::collections::BTreeMap;

use tracing::debug;

pub use funcs::{FuncContext, FunctionNamespace, TemplateFn};
pub use parser::NodeList;
pub use types::{TemplateExecuteError, TemplateParseError, MAX_EXEC_DEPTH, ROOT_TEMPLATE};
pub use value::Value;

/// Named templates sharing one function namespace
#[derive(Debug)]
pub struct TemplateSet {
    templates: BTreeMap<String, NodeList>,
    funcs: FunctionNamespace,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateSet {
    /// An empty set with the builtin functions
    pub fn new() -> Self {
        Self::with_functions(FunctionNamespace::builtins())
    }

    pub fn with_functions(funcs: FunctionNamespace) -> Self {
        Self {
            templates: BTreeMap::new(),
            funcs,
        }
    }

    pub fn functions(&self) -> &FunctionNamespace {
        &self.funcs
    }

    /// Functions must be registered before the templates that call them
    /// are parsed.
    pub fn functions_mut(&mut self) -> &mut FunctionNamespace {
        &mut self.funcs
    }

    /// Parse `src` and register it as `name`, along with every template it
    /// defines. Existing templates with the same names are replaced.
    pub fn parse(&mut self, name: &str, src: &str) -> Result<(), TemplateParseError> {
        let funcs = &self.funcs;
        let parsed = parser::parse_template(name, src, &|f: &str| funcs.contains(f))?;
        debug!(
            template = name,
            bytes = src.len(),
            defines = parsed.defines.len(),
            "parsed template"
        );
        self.templates.insert(name.to_string(), parsed.root);
        for (define, body) in parsed.defines {
            self.templates.insert(define, body);
        }
        Ok(())
    }

    /// Register a partial. The root name is reserved.
    pub fn parse_partial(&mut self, name: &str, src: &str) -> Result<(), TemplateParseError> {
        if name == ROOT_TEMPLATE {
            return Err(TemplateParseError::new(
                name,
                0,
                format!("partial may not be named {}", ROOT_TEMPLATE),
            ));
        }
        self.parse(name, src)
    }

    /// Template names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn lookup(&self, name: &str) -> Option<&NodeList> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Render `name` with `data` as dot.
    pub fn execute(&self, name: &str, data: &Value) -> Result<String, TemplateExecuteError> {
        let body = self.lookup(name).ok_or_else(|| {
            TemplateExecuteError::new(format!("no template \"{}\" associated with set", name))
        })?;
        let mut state = exec::State::new(self, name, data);
        state.walk(body, data)?;
        let out = state.into_output();
        debug!(template = name, bytes = out.len(), "executed template");
        Ok(out)
    }
}

/// Root source with the prelude in front, separated by exactly one line
/// boundary.
pub fn compose_root(prelude: &str, main: &str) -> String {
    let mut src = String::with_capacity(prelude.len() + main.len() + 1);
    src.push_str(prelude);
    if !prelude.is_empty() && !prelude.ends_with('\n') {
        src.push('\n');
    }
    src.push_str(main);
    src
}

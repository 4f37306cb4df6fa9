//! tpth - render shell-script templates into checked, formatted scripts
//!
//! A template is rendered against a table of `key=value` variables, the
//! result is parsed as a shell script, and the AST is printed back in
//! canonical form. Any failure stops the run before output is produced.

pub mod ast;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod printer;
pub mod template;
pub mod vars;

pub use ast::types::*;
pub use error::{Error, FileReadError, Result};
pub use parser::{parse, Parser, ShellSyntaxError};
pub use pipeline::{generate, run, Generated, PipelineOptions};
pub use printer::{print, PrintConfig};
pub use template::{
    FuncContext, FunctionNamespace, TemplateExecuteError, TemplateParseError, TemplateSet, Value,
};
pub use vars::{MalformedVariableError, VariableTable};

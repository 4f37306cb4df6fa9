//! Template error types

use thiserror::Error;

/// Name under which the root template is registered.
pub const ROOT_TEMPLATE: &str = "__main__";

/// Max nested `template` invocations during one execution.
pub const MAX_EXEC_DEPTH: usize = 1000;

/// A template source could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template: {template_name}:{line}: {message}")]
pub struct TemplateParseError {
    pub template_name: String,
    pub line: usize,
    pub message: String,
}

impl TemplateParseError {
    pub fn new(template_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            line,
            message: message.into(),
        }
    }
}

/// Rendering failed after a successful parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template: {message}")]
pub struct TemplateExecuteError {
    pub message: String,
}

impl TemplateExecuteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error raised while running the action at `name:line`.
    pub fn at(name: &str, line: usize, message: impl std::fmt::Display) -> Self {
        Self::new(format!("{}:{}: {}", name, line, message))
    }
}

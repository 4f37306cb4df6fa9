//! Error types shared by the pipeline stages

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::parser::ShellSyntaxError;
use crate::template::{TemplateExecuteError, TemplateParseError};
use crate::vars::MalformedVariableError;

/// An input file or directory could not be read.
#[derive(Debug, Error)]
#[error("cannot read {}: {source}", .path.display())]
pub struct FileReadError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl FileReadError {
    pub fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Any failure of a `tpth` run
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    MalformedVariable(#[from] MalformedVariableError),

    #[error(transparent)]
    FileRead(#[from] FileReadError),

    #[error(transparent)]
    TemplateParse(#[from] TemplateParseError),

    #[error(transparent)]
    TemplateExecute(#[from] TemplateExecuteError),

    #[error("syntax error: {0}")]
    ShellSyntax(#[from] ShellSyntaxError),
}

pub type Result<T> = std::result::Result<T, Error>;

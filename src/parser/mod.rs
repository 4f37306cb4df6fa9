//! Parser module for shell scripts
//!
//! This module contains the lexer and parser for rendered shell scripts.

pub mod types;
pub mod lexer;
pub mod word_parser;
pub mod compound_parser;
pub mod command_parser;
pub mod parser;

// Re-exports
pub use types::ShellSyntaxError;
pub use lexer::{Lexer, Token, TokenType};
pub use parser::{parse, Parser};

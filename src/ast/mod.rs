//! Abstract Syntax Tree (AST) Types for shell scripts
//!
//! This module defines the AST produced from rendered template output.
//!
//! Architecture:
//!   Template → Lexer → Parser → AST → Printer → Output

pub mod types;

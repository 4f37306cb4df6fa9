//! Canonical printer for shell ASTs
//!
//! Turns a parsed script back into text with one statement per line and
//! uniform indentation. Words and here-document bodies are reproduced
//! verbatim.

pub mod types;
pub mod printer;

pub use printer::{print, Printer};
pub use types::PrintConfig;

//! Parser Types and Constants
//!
//! Shared types and constants used across parser modules.

use thiserror::Error;

use crate::parser::lexer::{Token, TokenType};

/// Max recursion depth for nested constructs
pub const MAX_PARSER_DEPTH: usize = 100;

/// Text used for `found` when the input ran out.
pub const END_OF_INPUT: &str = "end of input";

/// Check if a token type is a redirection operator
pub fn is_redirection_token(t: TokenType) -> bool {
    matches!(
        t,
        TokenType::Less
            | TokenType::Great
            | TokenType::DLess
            | TokenType::DGreat
            | TokenType::LessAnd
            | TokenType::GreatAnd
            | TokenType::LessGreat
            | TokenType::DLessDash
            | TokenType::Clobber
            | TokenType::TLess
            | TokenType::AndGreat
            | TokenType::AndDGreat
    )
}

/// The first syntax error found in a shell script.
///
/// Lexer errors carry a `context` ("unterminated double quote") and point at
/// the opening construct; parser errors point at the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {}expected {expected}, found {found}", context_prefix(.context))]
pub struct ShellSyntaxError {
    pub line: usize,
    pub column: usize,
    /// Byte offset into the rendered script
    pub offset: usize,
    pub expected: String,
    pub found: String,
    pub context: Option<String>,
}

impl ShellSyntaxError {
    pub fn new(
        expected: impl Into<String>,
        found: impl Into<String>,
        line: usize,
        column: usize,
        offset: usize,
    ) -> Self {
        Self {
            line,
            column,
            offset,
            expected: expected.into(),
            found: found.into(),
            context: None,
        }
    }

    /// Error positioned at `token`, which is also what was found.
    pub fn at_token(expected: impl Into<String>, token: &Token) -> Self {
        Self::new(expected, describe_token(token), token.line, token.column, token.start)
    }

    /// Input ended inside a construct that started at the given position.
    pub fn unterminated(
        what: &str,
        closer: &str,
        line: usize,
        column: usize,
        offset: usize,
    ) -> Self {
        let mut err = Self::new(format!("`{}`", closer), END_OF_INPUT, line, column, offset);
        err.context = Some(format!("unterminated {}", what));
        err
    }
}

fn context_prefix(context: &Option<String>) -> String {
    match context {
        Some(context) => format!("{}: ", context),
        None => String::new(),
    }
}

/// How a token is named in error messages.
pub fn describe_token(token: &Token) -> String {
    match token.token_type {
        TokenType::Eof => END_OF_INPUT.to_string(),
        TokenType::Newline => "newline".to_string(),
        TokenType::HeredocContent => "here-document body".to_string(),
        _ => format!("`{}`", token.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parser_error() {
        let err = ShellSyntaxError::new("`fi`", END_OF_INPUT, 1, 21, 20);
        assert_eq!(err.to_string(), "line 1, column 21: expected `fi`, found end of input");
    }

    #[test]
    fn test_display_unterminated() {
        let err = ShellSyntaxError::unterminated("single quote", "'", 2, 6, 12);
        assert_eq!(
            err.to_string(),
            "line 2, column 6: unterminated single quote: expected `'`, found end of input"
        );
    }

    #[test]
    fn test_describe_token() {
        let tok = Token::new(TokenType::Fi, "fi", 0, 2, 1, 1);
        assert_eq!(describe_token(&tok), "`fi`");
        let eof = Token::new(TokenType::Eof, "", 2, 2, 1, 3);
        assert_eq!(describe_token(&eof), END_OF_INPUT);
    }
}

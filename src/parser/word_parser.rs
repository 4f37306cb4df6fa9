//! Word Parser
//!
//! Splits the raw text of a word token into its parts. Quoted spans and
//! expansions keep their inner text verbatim; the lexer has already checked
//! that every construct is closed.

use crate::ast::types::{WordNode, WordPart, AST};
use crate::parser::lexer::{precedes_command, reserved_word_at, TokenType};

/// Collect `chars[from..to]`, clamped to the slice.
fn text(chars: &[char], from: usize, to: usize) -> String {
    let to = to.min(chars.len());
    if from >= to {
        return String::new();
    }
    chars[from..to].iter().collect()
}

/// Index of the closing `'` of a single-quoted span starting at `i`.
fn find_single_close(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i] != '\'' {
        i += 1;
    }
    i
}

/// Index of the closing `'` of a `$'...'` span starting at `i`.
fn find_ansi_c_close(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '\'' => return i,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Index of the closing backquote for a substitution starting at `i`.
fn find_backtick_close(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '`' => return i,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Index of the closing `"` of a double-quoted span starting at `i`.
fn find_double_close(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => return i,
            '`' => i = find_backtick_close(chars, i + 1) + 1,
            '$' => i = skip_dollar(chars, i),
            _ => i += 1,
        }
    }
    chars.len()
}

/// Index just past the `close` that brings `depth` to zero.
fn skip_balanced(chars: &[char], mut i: usize, open: char, close: char, mut depth: usize) -> usize {
    while i < chars.len() {
        let c = chars[i];
        if c == open {
            depth += 1;
            i += 1;
        } else if c == close {
            depth -= 1;
            i += 1;
            if depth == 0 {
                return i;
            }
        } else {
            i = match c {
                '\\' => i + 2,
                '\'' => find_single_close(chars, i + 1) + 1,
                '"' => find_double_close(chars, i + 1) + 1,
                '`' => find_backtick_close(chars, i + 1) + 1,
                '$' => skip_dollar(chars, i),
                _ => i + 1,
            };
        }
    }
    chars.len()
}

/// Index just past the `)` closing a command substitution whose body
/// starts at `i`. Inside an open `case` an unmatched `)` ends a pattern.
fn skip_command_substitution(chars: &[char], mut i: usize) -> usize {
    let mut depth = 1usize;
    let mut cases: Vec<usize> = Vec::new();
    let mut command_start = true;
    while i < chars.len() {
        if command_start {
            if let Some((len, token_type)) = reserved_word_at(chars, i) {
                match token_type {
                    TokenType::Case => cases.push(depth),
                    TokenType::Esac => {
                        cases.pop();
                    }
                    _ => {}
                }
                i += len;
                command_start = precedes_command(token_type);
                continue;
            }
        }
        let c = chars[i];
        command_start = matches!(c, '(' | ')' | ';' | '&' | '|' | '\n')
            || (command_start && matches!(c, ' ' | '\t' | '{' | '!'));
        i = match c {
            '(' => {
                depth += 1;
                i + 1
            }
            ')' if cases.last() == Some(&depth) => i + 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
                i + 1
            }
            '\\' => i + 2,
            '\'' => find_single_close(chars, i + 1) + 1,
            '"' => find_double_close(chars, i + 1) + 1,
            '`' => find_backtick_close(chars, i + 1) + 1,
            '$' => skip_dollar(chars, i),
            _ => i + 1,
        };
    }
    chars.len()
}

/// Index just past a `$` construct starting at `i`.
fn skip_dollar(chars: &[char], i: usize) -> usize {
    match (chars.get(i + 1), chars.get(i + 2)) {
        (Some('('), Some('(')) => skip_balanced(chars, i + 3, '(', ')', 2),
        (Some('('), _) => skip_command_substitution(chars, i + 2),
        (Some('{'), _) => skip_balanced(chars, i + 2, '{', '}', 1),
        (Some('\''), _) => find_ansi_c_close(chars, i + 2) + 1,
        _ => i + 1,
    }
}

fn is_special_parameter(c: char) -> bool {
    matches!(c, '@' | '*' | '#' | '?' | '$' | '!' | '-') || c.is_ascii_digit()
}

/// Parse the raw text of a word into a WordNode.
pub fn parse_word(raw: &str) -> WordNode {
    let chars: Vec<char> = raw.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    fn flush(literal: &mut String, parts: &mut Vec<WordPart>) {
        if !literal.is_empty() {
            parts.push(WordPart::Literal(std::mem::take(literal)));
        }
    }

    while i < chars.len() {
        match chars[i] {
            '\\' => match chars.get(i + 1) {
                Some(&c) => {
                    flush(&mut literal, &mut parts);
                    parts.push(WordPart::Escaped(c));
                    i += 2;
                }
                None => {
                    literal.push('\\');
                    i += 1;
                }
            },
            '\'' => {
                let end = find_single_close(&chars, i + 1);
                flush(&mut literal, &mut parts);
                parts.push(WordPart::SingleQuoted(text(&chars, i + 1, end)));
                i = end + 1;
            }
            '"' => {
                let end = find_double_close(&chars, i + 1);
                flush(&mut literal, &mut parts);
                parts.push(WordPart::DoubleQuoted(text(&chars, i + 1, end)));
                i = end + 1;
            }
            '`' => {
                let end = find_backtick_close(&chars, i + 1);
                flush(&mut literal, &mut parts);
                parts.push(WordPart::CommandSubstitution {
                    body: text(&chars, i + 1, end),
                    backtick: true,
                });
                i = end + 1;
            }
            '$' => {
                let next = chars.get(i + 1).copied();
                match next {
                    Some('(') if chars.get(i + 2) == Some(&'(') => {
                        let end = skip_balanced(&chars, i + 3, '(', ')', 2);
                        flush(&mut literal, &mut parts);
                        parts.push(WordPart::ArithmeticExpansion(text(
                            &chars,
                            i + 3,
                            end.saturating_sub(2),
                        )));
                        i = end;
                    }
                    Some('(') => {
                        let end = skip_command_substitution(&chars, i + 2);
                        flush(&mut literal, &mut parts);
                        parts.push(WordPart::CommandSubstitution {
                            body: text(&chars, i + 2, end.saturating_sub(1)),
                            backtick: false,
                        });
                        i = end;
                    }
                    Some('{') => {
                        let end = skip_balanced(&chars, i + 2, '{', '}', 1);
                        flush(&mut literal, &mut parts);
                        parts.push(WordPart::ParameterExpansion(text(&chars, i, end)));
                        i = end;
                    }
                    Some('\'') => {
                        let end = find_ansi_c_close(&chars, i + 2);
                        flush(&mut literal, &mut parts);
                        parts.push(WordPart::AnsiCQuoted(text(&chars, i + 2, end)));
                        i = end + 1;
                    }
                    Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                        let mut end = i + 1;
                        while end < chars.len()
                            && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                        {
                            end += 1;
                        }
                        flush(&mut literal, &mut parts);
                        parts.push(WordPart::ParameterExpansion(text(&chars, i, end)));
                        i = end;
                    }
                    Some(c) if is_special_parameter(c) => {
                        flush(&mut literal, &mut parts);
                        parts.push(WordPart::ParameterExpansion(text(&chars, i, i + 2)));
                        i += 2;
                    }
                    _ => {
                        literal.push('$');
                        i += 1;
                    }
                }
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }

    flush(&mut literal, &mut parts);
    AST::word(parts)
}

/// Check if a string is a valid variable or function name
pub fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

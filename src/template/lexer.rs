//! Template Lexer
//!
//! Splits template source into text and action segments, applying trim
//! markers, and tokenizes the inside of each action.

use lazy_static::lazy_static;
use regex_lite::Regex;

use super::types::TemplateParseError;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Returns true if `s` can name a field, variable or function.
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// A piece of template source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// Body of a `{{...}}` action with delimiters and trim markers removed
    Action { body: String, line: usize },
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Find the `}}` closing an action whose body starts at `from`, skipping
/// over quoted strings. Returns the byte offset of the delimiter.
fn find_action_end(src: &str, from: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'`' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'`' {
                    i += 1;
                }
                i += 1;
            }
            b'}' if src[i..].starts_with(RIGHT_DELIM) => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn push_text(segments: &mut Vec<Segment>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start_matches(is_space);
    }
    if trim_end {
        text = text.trim_end_matches(is_space);
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn count_lines(s: &str) -> usize {
    s.bytes().filter(|b| *b == b'\n').count()
}

/// Split `src` into segments. `name` is only used for error messages.
pub fn split_segments(name: &str, src: &str) -> Result<Vec<Segment>, TemplateParseError> {
    let mut segments = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    let mut trim_next = false;

    while let Some(rel) = src[pos..].find(LEFT_DELIM) {
        let start = pos + rel;
        let text = &src[pos..start];
        line += count_lines(text);
        let action_line = line;

        let mut body_start = start + LEFT_DELIM.len();
        let rest = &src[body_start..];
        let trim_left = rest.starts_with('-') && rest[1..].starts_with(is_space);
        if trim_left {
            body_start += 1;
        }
        push_text(&mut segments, text, trim_next, trim_left);

        let body_rest = src[body_start..].trim_start_matches(is_space);
        let end = if body_rest.starts_with("/*") {
            let comment_start = src.len() - body_rest.len();
            let close = src[comment_start..].find("*/").ok_or_else(|| {
                TemplateParseError::new(name, action_line, "unclosed comment")
            })? + comment_start
                + 2;
            let after = src[close..].trim_start_matches(is_space);
            let after_pos = src.len() - after.len();
            if after.starts_with("-}}") {
                after_pos + 1
            } else if after.starts_with(RIGHT_DELIM) {
                after_pos
            } else {
                return Err(TemplateParseError::new(
                    name,
                    action_line,
                    "comment ends before closing delimiter",
                ));
            }
        } else {
            find_action_end(src, body_start).ok_or_else(|| {
                TemplateParseError::new(name, action_line, "unclosed action")
            })?
        };

        let raw = &src[body_start..end];
        let trim_right = raw.ends_with('-') && raw[..raw.len() - 1].ends_with(is_space);
        let body = if trim_right { &raw[..raw.len() - 1] } else { raw };
        let is_comment = body.trim_start_matches(is_space).starts_with("/*");
        if !is_comment {
            segments.push(Segment::Action {
                body: body.to_string(),
                line: action_line,
            });
        }
        line += count_lines(raw);
        trim_next = trim_right;
        pos = end + RIGHT_DELIM.len();
    }
    push_text(&mut segments, &src[pos..], trim_next, false);
    Ok(segments)
}

/// Token kinds inside an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTokenKind {
    /// A lone `.`
    Dot,
    /// `.Name`
    Field(String),
    /// `$name`, or `$` alone (empty name)
    Variable(String),
    Ident(String),
    Str(String),
    Int(i64),
    Pipe,
    LParen,
    RParen,
    Declare,
    Assign,
    Comma,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionToken {
    pub kind: ActionTokenKind,
    /// Whitespace preceded this token
    pub spaced: bool,
}

fn take_name(chars: &[char], mut i: usize) -> (String, usize) {
    let start = i;
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

fn unescape(c: char) -> Option<char> {
    Some(match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0c',
        'v' => '\x0b',
        '\\' => '\\',
        '"' => '"',
        '\'' => '\'',
        _ => return None,
    })
}

/// Tokenize the body of an action.
pub fn tokenize_action(body: &str) -> Result<Vec<ActionToken>, String> {
    let chars: Vec<char> = body.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut spaced = false;

    while i < chars.len() {
        let c = chars[i];
        if is_space(c) {
            spaced = true;
            i += 1;
            continue;
        }
        let kind = match c {
            '.' => {
                if i + 1 < chars.len() && (chars[i + 1].is_ascii_alphabetic() || chars[i + 1] == '_') {
                    let (name, next) = take_name(&chars, i + 1);
                    i = next;
                    ActionTokenKind::Field(name)
                } else {
                    i += 1;
                    ActionTokenKind::Dot
                }
            }
            '$' => {
                let (name, next) = take_name(&chars, i + 1);
                i = next;
                ActionTokenKind::Variable(name)
            }
            '"' => {
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None | Some('\n') => return Err("unterminated quoted string".to_string()),
                        Some('"') => break,
                        Some('\\') => {
                            let esc = chars
                                .get(i + 1)
                                .ok_or_else(|| "unterminated quoted string".to_string())?;
                            let ch = unescape(*esc)
                                .ok_or_else(|| format!("invalid escape sequence \\{}", esc))?;
                            s.push(ch);
                            i += 2;
                        }
                        Some(ch) => {
                            s.push(*ch);
                            i += 1;
                        }
                    }
                }
                i += 1;
                ActionTokenKind::Str(s)
            }
            '`' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|ch| *ch == '`')
                    .ok_or_else(|| "unterminated raw quoted string".to_string())?;
                i = start + end + 1;
                ActionTokenKind::Str(chars[start..start + end].iter().collect())
            }
            '\'' => {
                let (ch, width) = match (chars.get(i + 1), chars.get(i + 2)) {
                    (Some('\\'), Some(esc)) => (
                        unescape(*esc).ok_or_else(|| format!("invalid escape sequence \\{}", esc))?,
                        2,
                    ),
                    (Some(ch), _) if *ch != '\'' => (*ch, 1),
                    _ => return Err("malformed character constant".to_string()),
                };
                if chars.get(i + 1 + width) != Some(&'\'') {
                    return Err("unterminated character constant".to_string());
                }
                i += width + 2;
                ActionTokenKind::Int(ch as i64)
            }
            '0'..='9' | '-' | '+' => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<i64>()
                    .map_err(|_| format!("bad number syntax: {:?}", text))?;
                ActionTokenKind::Int(n)
            }
            '|' => {
                i += 1;
                ActionTokenKind::Pipe
            }
            '(' => {
                i += 1;
                ActionTokenKind::LParen
            }
            ')' => {
                i += 1;
                ActionTokenKind::RParen
            }
            ',' => {
                i += 1;
                ActionTokenKind::Comma
            }
            ':' if chars.get(i + 1) == Some(&'=') => {
                i += 2;
                ActionTokenKind::Declare
            }
            '=' => {
                i += 1;
                ActionTokenKind::Assign
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let (name, next) = take_name(&chars, i);
                i = next;
                ActionTokenKind::Ident(name)
            }
            other => return Err(format!("unexpected {:?} in command", other)),
        };
        tokens.push(ActionToken { kind, spaced });
        spaced = false;
    }
    Ok(tokens)
}

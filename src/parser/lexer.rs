//! Lexer for Shell Scripts
//!
//! The lexer tokenizes input into a stream of tokens that the parser consumes.
//! It handles:
//! - Operators and delimiters
//! - Words (with quoting rules and raw expansions)
//! - Comments
//! - Here-documents
//! - Escape sequences and line continuations
//!
//! Nothing is expanded: every word token carries its source text.

use std::collections::{HashMap, VecDeque};

use crate::parser::types::ShellSyntaxError;

/// Token types for the shell lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // End of input
    Eof,

    // Newlines and separators
    Newline,
    Semicolon,
    Amp, // &

    // Operators
    Pipe,   // |
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Redirections
    Less,      // <
    Great,     // >
    DLess,     // <<
    DGreat,    // >>
    LessAnd,   // <&
    GreatAnd,  // >&
    LessGreat, // <>
    DLessDash, // <<-
    Clobber,   // >|
    TLess,     // <<<
    AndGreat,  // &>
    AndDGreat, // &>>

    // Grouping
    LParen, // (
    RParen, // )
    LBrace, // {
    RBrace, // }

    // Special
    DSemi, // ;;

    // Reserved words
    If,
    Then,
    Else,
    Elif,
    Fi,
    For,
    While,
    Until,
    Do,
    Done,
    Case,
    Esac,
    In,
    Function,

    // Words
    Word,
    Number, // For redirections like 2>&1

    // Comments
    Comment,

    // Here-document content
    HeredocContent,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eof => "EOF",
            Self::Newline => "NEWLINE",
            Self::Semicolon => ";",
            Self::Amp => "&",
            Self::Pipe => "|",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Bang => "!",
            Self::Less => "<",
            Self::Great => ">",
            Self::DLess => "<<",
            Self::DGreat => ">>",
            Self::LessAnd => "<&",
            Self::GreatAnd => ">&",
            Self::LessGreat => "<>",
            Self::DLessDash => "<<-",
            Self::Clobber => ">|",
            Self::TLess => "<<<",
            Self::AndGreat => "&>",
            Self::AndDGreat => "&>>",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::DSemi => ";;",
            Self::If => "if",
            Self::Then => "then",
            Self::Else => "else",
            Self::Elif => "elif",
            Self::Fi => "fi",
            Self::For => "for",
            Self::While => "while",
            Self::Until => "until",
            Self::Do => "do",
            Self::Done => "done",
            Self::Case => "case",
            Self::Esac => "esac",
            Self::In => "in",
            Self::Function => "function",
            Self::Word => "WORD",
            Self::Number => "NUMBER",
            Self::Comment => "COMMENT",
            Self::HeredocContent => "HEREDOC_CONTENT",
        }
    }

    /// Reserved words and the lone-character tokens that the parser may also
    /// accept as ordinary words outside command position.
    pub fn is_word_like(&self) -> bool {
        matches!(
            self,
            Self::Word
                | Self::Number
                | Self::Bang
                | Self::LBrace
                | Self::RBrace
                | Self::If
                | Self::Then
                | Self::Else
                | Self::Elif
                | Self::Fi
                | Self::For
                | Self::While
                | Self::Until
                | Self::Do
                | Self::Done
                | Self::Case
                | Self::Esac
                | Self::In
                | Self::Function
        )
    }
}

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    /// Byte offsets into the input
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        value: impl Into<String>,
        start: usize,
        end: usize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            token_type,
            value: value.into(),
            start,
            end,
            line,
            column,
        }
    }
}

/// Pending heredoc information
#[derive(Debug, Clone)]
struct PendingHeredoc {
    delimiter: String,
    strip_tabs: bool,
    /// Position of the operator, for the unterminated error
    offset: usize,
    line: usize,
    column: usize,
}

lazy_static::lazy_static! {
    /// Reserved words
    static ref RESERVED_WORDS: HashMap<&'static str, TokenType> = {
        let mut m = HashMap::new();
        m.insert("if", TokenType::If);
        m.insert("then", TokenType::Then);
        m.insert("else", TokenType::Else);
        m.insert("elif", TokenType::Elif);
        m.insert("fi", TokenType::Fi);
        m.insert("for", TokenType::For);
        m.insert("while", TokenType::While);
        m.insert("until", TokenType::Until);
        m.insert("do", TokenType::Do);
        m.insert("done", TokenType::Done);
        m.insert("case", TokenType::Case);
        m.insert("esac", TokenType::Esac);
        m.insert("in", TokenType::In);
        m.insert("function", TokenType::Function);
        m.insert("{", TokenType::LBrace);
        m.insert("}", TokenType::RBrace);
        m.insert("!", TokenType::Bang);
        m
    };

    /// Single-character operators
    static ref SINGLE_CHAR_OPS: HashMap<char, TokenType> = {
        let mut m = HashMap::new();
        m.insert('|', TokenType::Pipe);
        m.insert('&', TokenType::Amp);
        m.insert(';', TokenType::Semicolon);
        m.insert('(', TokenType::LParen);
        m.insert(')', TokenType::RParen);
        m.insert('<', TokenType::Less);
        m.insert('>', TokenType::Great);
        m
    };
}

/// Three-character operators
const THREE_CHAR_OPS: &[(&str, TokenType)] = &[
    ("<<-", TokenType::DLessDash),
    ("<<<", TokenType::TLess),
    ("&>>", TokenType::AndDGreat),
];

/// Two-character operators
const TWO_CHAR_OPS: &[(&str, TokenType)] = &[
    ("&&", TokenType::AndAnd),
    ("||", TokenType::OrOr),
    (";;", TokenType::DSemi),
    ("<<", TokenType::DLess),
    (">>", TokenType::DGreat),
    ("<&", TokenType::LessAnd),
    (">&", TokenType::GreatAnd),
    ("<>", TokenType::LessGreat),
    (">|", TokenType::Clobber),
    ("&>", TokenType::AndGreat),
];

/// Check if a character is a word boundary (ends a word token)
fn is_word_boundary(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | ';' | '&' | '|' | '(' | ')' | '<' | '>')
}

/// Strip quoting from a here-document delimiter word.
fn unquote_delimiter(raw: &str) -> (String, bool) {
    let mut out = String::new();
    let mut quoted = false;
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => quoted = true,
            '\\' => {
                quoted = true;
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            _ => out.push(c),
        }
    }
    (out, quoted)
}

/// A reserved word spelled out at `pos` and ending at a word boundary,
/// with its length in chars.
pub(crate) fn reserved_word_at(input: &[char], pos: usize) -> Option<(usize, TokenType)> {
    let rest = input.get(pos..)?;
    let len = rest.iter().take_while(|c| c.is_ascii_lowercase()).count();
    if len == 0 || !rest.get(len).map_or(true, |&c| is_word_boundary(c)) {
        return None;
    }
    let word: String = rest[..len].iter().collect();
    RESERVED_WORDS.get(word.as_str()).map(|&t| (len, t))
}

/// Reserved words that may be directly followed by a command.
pub(crate) fn precedes_command(token_type: TokenType) -> bool {
    matches!(
        token_type,
        TokenType::If
            | TokenType::Then
            | TokenType::Else
            | TokenType::Elif
            | TokenType::While
            | TokenType::Until
            | TokenType::Do
    )
}

/// Lexer over a shell script.
///
/// Iterating yields tokens up to and including `Eof`, or stops after the
/// first error. Cloning a lexer restarts from the clone's position.
#[derive(Debug, Clone)]
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    offset: usize,
    line: usize,
    column: usize,
    pending_heredocs: VecDeque<PendingHeredoc>,
    queued: VecDeque<Token>,
    last_type: Option<TokenType>,
    done: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            offset: 0,
            line: 1,
            column: 1,
            pending_heredocs: VecDeque::new(),
            queued: VecDeque::new(),
            last_type: None,
            done: false,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(self) -> Result<Vec<Token>, ShellSyntaxError> {
        self.collect()
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += 1;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Move one char from the input onto `value`.
    fn take(&mut self, value: &mut String) {
        if let Some(c) = self.advance() {
            value.push(c);
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            match c {
                ' ' | '\t' => {
                    self.advance();
                }
                '\\' if self.peek(1) == Some('\n') => {
                    // Line continuation
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ShellSyntaxError> {
        if self.last_type == Some(TokenType::Newline) && !self.pending_heredocs.is_empty() {
            self.read_heredoc_bodies()?;
            if let Some(token) = self.queued.pop_front() {
                return Ok(token);
            }
        }

        self.skip_whitespace();

        let start_line = self.line;
        let start_column = self.column;
        let start_pos = self.offset;

        let c0 = match self.current() {
            Some(c) => c,
            None => {
                if let Some(pending) = self.pending_heredocs.front() {
                    return Err(ShellSyntaxError::unterminated(
                        "here-document",
                        &pending.delimiter,
                        pending.line,
                        pending.column,
                        pending.offset,
                    ));
                }
                return Ok(Token::new(
                    TokenType::Eof,
                    "",
                    start_pos,
                    start_pos,
                    start_line,
                    start_column,
                ));
            }
        };
        let c1 = self.peek(1);

        if c0 == '#' {
            return Ok(self.read_comment(start_pos, start_line, start_column));
        }

        if c0 == '\n' {
            self.advance();
            return Ok(Token::new(
                TokenType::Newline,
                "\n",
                start_pos,
                self.offset,
                start_line,
                start_column,
            ));
        }

        // [[ ... ]] and (( ... )) are kept as single raw words
        if c0 == '[' && c1 == Some('[') {
            return self.read_double_bracket(start_pos, start_line, start_column);
        }
        if c0 == '(' && c1 == Some('(') {
            let mut value = String::new();
            self.take(&mut value);
            self.take(&mut value);
            self.read_balanced(
                &mut value,
                2,
                "arithmetic command",
                "))",
                (start_pos, start_line, start_column),
            )?;
            return Ok(Token::new(
                TokenType::Word,
                value,
                start_pos,
                self.offset,
                start_line,
                start_column,
            ));
        }

        if let Some(token_type) = self.match_operator() {
            let value = token_type.as_str();
            for _ in 0..value.len() {
                self.advance();
            }
            if matches!(token_type, TokenType::DLess | TokenType::DLessDash) {
                self.register_heredoc_from_lookahead(
                    token_type == TokenType::DLessDash,
                    (start_pos, start_line, start_column),
                );
            }
            return Ok(Token::new(
                token_type,
                value,
                start_pos,
                self.offset,
                start_line,
                start_column,
            ));
        }

        self.read_word(start_pos, start_line, start_column)
    }

    fn match_operator(&self) -> Option<TokenType> {
        let lookahead: String = self.input[self.pos..].iter().take(3).collect();
        for (op, token_type) in THREE_CHAR_OPS {
            if lookahead.starts_with(op) {
                return Some(*token_type);
            }
        }
        for (op, token_type) in TWO_CHAR_OPS {
            if lookahead.starts_with(op) {
                return Some(*token_type);
            }
        }
        self.current().and_then(|c| SINGLE_CHAR_OPS.get(&c).copied())
    }

    fn read_comment(&mut self, start: usize, line: usize, column: usize) -> Token {
        let mut value = String::new();
        while let Some(c) = self.current() {
            if c == '\n' {
                break;
            }
            self.take(&mut value);
        }
        Token::new(TokenType::Comment, value, start, self.offset, line, column)
    }

    fn read_word(
        &mut self,
        start: usize,
        line: usize,
        column: usize,
    ) -> Result<Token, ShellSyntaxError> {
        let mut value = String::new();

        while let Some(c) = self.current() {
            match c {
                c if is_word_boundary(c) => break,
                '\\' => {
                    if self.peek(1) == Some('\n') {
                        self.advance();
                        self.advance();
                        continue;
                    }
                    self.take(&mut value);
                    self.take(&mut value);
                }
                '\'' => self.read_single_quoted(&mut value)?,
                '"' => self.read_double_quoted(&mut value)?,
                '`' => self.read_backtick(&mut value)?,
                '$' => self.read_dollar(&mut value)?,
                _ => self.take(&mut value),
            }
        }

        let is_number = !value.is_empty()
            && value.chars().all(|c| c.is_ascii_digit())
            && matches!(self.current(), Some('<') | Some('>'));

        let token_type = if is_number {
            TokenType::Number
        } else {
            RESERVED_WORDS
                .get(value.as_str())
                .copied()
                .unwrap_or(TokenType::Word)
        };

        Ok(Token::new(token_type, value, start, self.offset, line, column))
    }

    fn here(&self) -> (usize, usize, usize) {
        (self.offset, self.line, self.column)
    }

    fn read_single_quoted(&mut self, value: &mut String) -> Result<(), ShellSyntaxError> {
        let (offset, line, column) = self.here();
        self.take(value);
        loop {
            match self.current() {
                Some('\'') => {
                    self.take(value);
                    return Ok(());
                }
                Some(_) => self.take(value),
                None => {
                    return Err(ShellSyntaxError::unterminated(
                        "single quote",
                        "'",
                        line,
                        column,
                        offset,
                    ))
                }
            }
        }
    }

    fn read_ansi_c_quoted(&mut self, value: &mut String) -> Result<(), ShellSyntaxError> {
        let (offset, line, column) = self.here();
        self.take(value); // $
        self.take(value); // '
        loop {
            match self.current() {
                Some('\'') => {
                    self.take(value);
                    return Ok(());
                }
                Some('\\') => {
                    self.take(value);
                    self.take(value);
                }
                Some(_) => self.take(value),
                None => {
                    return Err(ShellSyntaxError::unterminated(
                        "ANSI-C quote",
                        "'",
                        line,
                        column,
                        offset,
                    ))
                }
            }
        }
    }

    fn read_double_quoted(&mut self, value: &mut String) -> Result<(), ShellSyntaxError> {
        let (offset, line, column) = self.here();
        self.take(value);
        loop {
            match self.current() {
                Some('"') => {
                    self.take(value);
                    return Ok(());
                }
                Some('\\') => {
                    if self.peek(1) == Some('\n') {
                        self.advance();
                        self.advance();
                        continue;
                    }
                    self.take(value);
                    self.take(value);
                }
                Some('`') => self.read_backtick(value)?,
                Some('$') => self.read_dollar(value)?,
                Some(_) => self.take(value),
                None => {
                    return Err(ShellSyntaxError::unterminated(
                        "double quote",
                        "\"",
                        line,
                        column,
                        offset,
                    ))
                }
            }
        }
    }

    fn read_backtick(&mut self, value: &mut String) -> Result<(), ShellSyntaxError> {
        let (offset, line, column) = self.here();
        self.take(value);
        loop {
            match self.current() {
                Some('`') => {
                    self.take(value);
                    return Ok(());
                }
                Some('\\') => {
                    self.take(value);
                    self.take(value);
                }
                Some(_) => self.take(value),
                None => {
                    return Err(ShellSyntaxError::unterminated(
                        "command substitution",
                        "`",
                        line,
                        column,
                        offset,
                    ))
                }
            }
        }
    }

    /// Read a `$` expansion. Plain `$NAME` leaves the name to the caller.
    fn read_dollar(&mut self, value: &mut String) -> Result<(), ShellSyntaxError> {
        let opening = self.here();
        match (self.peek(1), self.peek(2)) {
            (Some('('), Some('(')) => {
                self.take(value);
                self.take(value);
                self.take(value);
                self.read_balanced(value, 2, "arithmetic expansion", "))", opening)
            }
            (Some('('), _) => {
                self.take(value);
                self.take(value);
                self.read_balanced(value, 1, "command substitution", ")", opening)
            }
            (Some('{'), _) => {
                self.take(value);
                self.take(value);
                self.read_braced(value, opening)
            }
            (Some('\''), _) => self.read_ansi_c_quoted(value),
            _ => {
                self.take(value);
                Ok(())
            }
        }
    }

    /// Consume up to the `)` that brings paren depth to zero.
    fn read_balanced(
        &mut self,
        value: &mut String,
        mut depth: usize,
        what: &str,
        closer: &str,
        (offset, line, column): (usize, usize, usize),
    ) -> Result<(), ShellSyntaxError> {
        // Inside `$( )` a `case` pattern ends in an unmatched `)`; these are
        // the paren depths of the open `case` commands.
        let track_case = closer == ")";
        let mut cases: Vec<usize> = Vec::new();
        let mut command_start = true;
        loop {
            if track_case && command_start {
                if let Some((len, token_type)) = reserved_word_at(&self.input, self.pos) {
                    match token_type {
                        TokenType::Case => cases.push(depth),
                        TokenType::Esac => {
                            cases.pop();
                        }
                        _ => {}
                    }
                    for _ in 0..len {
                        self.take(value);
                    }
                    command_start = precedes_command(token_type);
                    continue;
                }
            }
            match self.current() {
                Some('(') => {
                    depth += 1;
                    self.take(value);
                    command_start = true;
                }
                Some(')') if cases.last() == Some(&depth) => {
                    // case pattern terminator
                    self.take(value);
                    command_start = true;
                }
                Some(')') => {
                    depth -= 1;
                    self.take(value);
                    if depth == 0 {
                        return Ok(());
                    }
                    command_start = true;
                }
                Some(';' | '&' | '|' | '\n') => {
                    self.take(value);
                    command_start = true;
                }
                Some(' ' | '\t' | '{' | '!') => self.take(value),
                Some('\'') => {
                    self.read_single_quoted(value)?;
                    command_start = false;
                }
                Some('"') => {
                    self.read_double_quoted(value)?;
                    command_start = false;
                }
                Some('`') => {
                    self.read_backtick(value)?;
                    command_start = false;
                }
                Some('$') => {
                    self.read_dollar(value)?;
                    command_start = false;
                }
                Some('\\') => {
                    self.take(value);
                    self.take(value);
                    command_start = false;
                }
                Some(_) => {
                    self.take(value);
                    command_start = false;
                }
                None => {
                    return Err(ShellSyntaxError::unterminated(what, closer, line, column, offset))
                }
            }
        }
    }

    fn read_braced(
        &mut self,
        value: &mut String,
        (offset, line, column): (usize, usize, usize),
    ) -> Result<(), ShellSyntaxError> {
        let mut depth = 1usize;
        loop {
            match self.current() {
                Some('{') => {
                    depth += 1;
                    self.take(value);
                }
                Some('}') => {
                    depth -= 1;
                    self.take(value);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('\'') => self.read_single_quoted(value)?,
                Some('"') => self.read_double_quoted(value)?,
                Some('`') => self.read_backtick(value)?,
                Some('$') => self.read_dollar(value)?,
                Some('\\') => {
                    self.take(value);
                    self.take(value);
                }
                Some(_) => self.take(value),
                None => {
                    return Err(ShellSyntaxError::unterminated(
                        "parameter expansion",
                        "}",
                        line,
                        column,
                        offset,
                    ))
                }
            }
        }
    }

    fn read_double_bracket(
        &mut self,
        start: usize,
        line: usize,
        column: usize,
    ) -> Result<Token, ShellSyntaxError> {
        let mut value = String::new();
        self.take(&mut value);
        self.take(&mut value);
        loop {
            match self.current() {
                Some(']')
                    if self.peek(1) == Some(']')
                        && self.peek(2).map_or(true, is_word_boundary) =>
                {
                    self.take(&mut value);
                    self.take(&mut value);
                    return Ok(Token::new(
                        TokenType::Word,
                        value,
                        start,
                        self.offset,
                        line,
                        column,
                    ));
                }
                Some('\'') => self.read_single_quoted(&mut value)?,
                Some('"') => self.read_double_quoted(&mut value)?,
                Some('`') => self.read_backtick(&mut value)?,
                Some('$') => self.read_dollar(&mut value)?,
                Some('\\') => {
                    self.take(&mut value);
                    self.take(&mut value);
                }
                Some(_) => self.take(&mut value),
                None => {
                    return Err(ShellSyntaxError::unterminated(
                        "conditional expression",
                        "]]",
                        line,
                        column,
                        start,
                    ))
                }
            }
        }
    }

    /// Peek at the delimiter word following `<<` without consuming it.
    fn register_heredoc_from_lookahead(
        &mut self,
        strip_tabs: bool,
        (offset, line, column): (usize, usize, usize),
    ) {
        let mut i = self.pos;
        while matches!(self.input.get(i), Some(' ') | Some('\t')) {
            i += 1;
        }

        let mut raw = String::new();
        let mut quote: Option<char> = None;
        while let Some(&c) = self.input.get(i) {
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '\'' || c == '"' => quote = Some(c),
                None if is_word_boundary(c) => break,
                None => {}
            }
            raw.push(c);
            i += 1;
        }

        if raw.is_empty() {
            return;
        }

        let (delimiter, _) = unquote_delimiter(&raw);
        self.pending_heredocs.push_back(PendingHeredoc {
            delimiter,
            strip_tabs,
            offset,
            line,
            column,
        });
    }

    /// Read the bodies of every pending here-document, in registration order.
    fn read_heredoc_bodies(&mut self) -> Result<(), ShellSyntaxError> {
        while let Some(pending) = self.pending_heredocs.pop_front() {
            let (start, line, column) = self.here();
            let mut body = String::new();

            loop {
                if self.current().is_none() {
                    return Err(ShellSyntaxError::unterminated(
                        "here-document",
                        &pending.delimiter,
                        pending.line,
                        pending.column,
                        pending.offset,
                    ));
                }

                let mut text = String::new();
                while let Some(c) = self.advance() {
                    text.push(c);
                    if c == '\n' {
                        break;
                    }
                }

                let content = text.strip_suffix('\n').unwrap_or(&text);
                let candidate = if pending.strip_tabs {
                    content.trim_start_matches('\t')
                } else {
                    content
                };
                if candidate == pending.delimiter {
                    break;
                }
                body.push_str(&text);
            }

            self.queued.push_back(Token::new(
                TokenType::HeredocContent,
                body,
                start,
                self.offset,
                line,
                column,
            ));
        }
        Ok(())
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, ShellSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = match self.queued.pop_front() {
            Some(token) => Ok(token),
            None => self.next_token(),
        };

        match &result {
            Ok(token) => {
                if token.token_type == TokenType::Eof {
                    self.done = true;
                }
                self.last_type = Some(token.token_type);
            }
            Err(_) => self.done = true,
        }
        Some(result)
    }
}

/// Whether a here-document delimiter word disables expansion in the body.
pub fn heredoc_delimiter_is_quoted(raw: &str) -> bool {
    unquote_delimiter(raw).1
}

/// The line that ends a here-document whose delimiter is written as `raw`.
pub fn heredoc_terminator(raw: &str) -> String {
    unquote_delimiter(raw).0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(input: &str) -> Vec<TokenType> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    fn values(input: &str) -> Vec<String> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn test_simple_words() {
        assert_eq!(
            types("echo hello world"),
            vec![TokenType::Word, TokenType::Word, TokenType::Word, TokenType::Eof]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            types("a && b || c | d ; e & f ;;"),
            vec![
                TokenType::Word,
                TokenType::AndAnd,
                TokenType::Word,
                TokenType::OrOr,
                TokenType::Word,
                TokenType::Pipe,
                TokenType::Word,
                TokenType::Semicolon,
                TokenType::Word,
                TokenType::Amp,
                TokenType::Word,
                TokenType::DSemi,
                TokenType::Eof,
            ]
        );
        assert_eq!(
            types("a &>> f <<< s >| g <> h"),
            vec![
                TokenType::Word,
                TokenType::AndDGreat,
                TokenType::Word,
                TokenType::TLess,
                TokenType::Word,
                TokenType::Clobber,
                TokenType::Word,
                TokenType::LessGreat,
                TokenType::Word,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_io_number() {
        assert_eq!(
            types("cmd 2>&1 3 >x"),
            vec![
                TokenType::Word,
                TokenType::Number,
                TokenType::GreatAnd,
                TokenType::Word,
                TokenType::Word,
                TokenType::Great,
                TokenType::Word,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_reserved_words_and_braces() {
        assert_eq!(
            types("{ ! if; }"),
            vec![
                TokenType::LBrace,
                TokenType::Bang,
                TokenType::If,
                TokenType::Semicolon,
                TokenType::RBrace,
                TokenType::Eof,
            ]
        );
        // Quoted or embedded forms stay words
        assert_eq!(
            types("\"if\" {a,b} !x"),
            vec![TokenType::Word, TokenType::Word, TokenType::Word, TokenType::Eof]
        );
    }

    #[test]
    fn test_quotes_keep_raw_text() {
        assert_eq!(
            values(r#"echo "a $b" 'c d' $'e\'f'"#),
            vec!["echo", "\"a $b\"", "'c d'", "$'e\\'f'", ""]
        );
    }

    #[test]
    fn test_expansions_are_single_words() {
        assert_eq!(
            values("echo $(ls | wc -l) ${x:-a b} $((1 + (2))) `date`"),
            vec!["echo", "$(ls | wc -l)", "${x:-a b}", "$((1 + (2)))", "`date`", ""]
        );
    }

    #[test]
    fn test_case_inside_command_substitution() {
        assert_eq!(
            values("echo $(case x in a) echo;; (b) :;; esac) done"),
            vec!["echo", "$(case x in a) echo;; (b) :;; esac)", "done", ""]
        );
        assert_eq!(
            values("v=$(if true; then case $1 in\n*) echo;;\nesac; fi)"),
            vec!["v=$(if true; then case $1 in\n*) echo;;\nesac; fi)", ""]
        );
        // not in command position, so no pattern is expected
        assert_eq!(values("echo $(echo case) x"), vec!["echo", "$(echo case)", "x", ""]);
        assert_eq!(values("echo $(mycase)"), vec!["echo", "$(mycase)", ""]);
    }

    #[test]
    fn test_double_bracket_and_dparen_raw() {
        assert_eq!(
            values("[[ -n \"$x\" && $y ]] && (( i++ ))"),
            vec!["[[ -n \"$x\" && $y ]]", "&&", "(( i++ ))", ""]
        );
    }

    #[test]
    fn test_comment_only_at_token_start() {
        let tokens = Lexer::new("echo a#b # note\n").tokenize().unwrap();
        assert_eq!(tokens[1].value, "a#b");
        assert_eq!(tokens[2].token_type, TokenType::Comment);
        assert_eq!(tokens[2].value, "# note");
        assert_eq!(tokens[3].token_type, TokenType::Newline);
    }

    #[test]
    fn test_line_continuation_dropped() {
        assert_eq!(values("echo a \\\n  b"), vec!["echo", "a", "b", ""]);
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("ab\n  cd").tokenize().unwrap();
        assert_eq!((tokens[0].line, tokens[0].column, tokens[0].start), (1, 1, 0));
        assert_eq!((tokens[2].line, tokens[2].column, tokens[2].start), (2, 3, 5));
        assert_eq!(tokens[2].end, 7);
    }

    #[test]
    fn test_heredoc_body_follows_newline() {
        let tokens = Lexer::new("cat <<EOF\nline $x\nEOF\necho done\n").tokenize().unwrap();
        let kinds: Vec<TokenType> = tokens.iter().map(|t| t.token_type).collect();
        assert_eq!(
            kinds,
            vec![
                TokenType::Word,
                TokenType::DLess,
                TokenType::Word,
                TokenType::Newline,
                TokenType::HeredocContent,
                TokenType::Word,
                TokenType::Word,
                TokenType::Newline,
                TokenType::Eof,
            ]
        );
        assert_eq!(tokens[4].value, "line $x\n");
    }

    #[test]
    fn test_multiple_heredocs_in_order() {
        let tokens = Lexer::new("cat <<A <<-'B'\none\nA\n\ttwo\n\tB\n").tokenize().unwrap();
        let bodies: Vec<&str> = tokens
            .iter()
            .filter(|t| t.token_type == TokenType::HeredocContent)
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(bodies, vec!["one\n", "\ttwo\n"]);
    }

    #[test]
    fn test_heredoc_delimiter_quoting() {
        assert!(heredoc_delimiter_is_quoted("'EOF'"));
        assert!(heredoc_delimiter_is_quoted("\\EOF"));
        assert!(!heredoc_delimiter_is_quoted("EOF"));
        assert_eq!(heredoc_terminator("\"END\""), "END");
    }

    #[test]
    fn test_unterminated_quote() {
        let err = Lexer::new("echo 'abc").tokenize().unwrap_err();
        assert_eq!(err.context.as_deref(), Some("unterminated single quote"));
        assert_eq!((err.line, err.column), (1, 6));
        assert_eq!(err.found, "end of input");
    }

    #[test]
    fn test_unterminated_double_quote_and_substitution() {
        let err = Lexer::new("echo \"abc").tokenize().unwrap_err();
        assert_eq!(err.context.as_deref(), Some("unterminated double quote"));
        let err = Lexer::new("echo $(ls").tokenize().unwrap_err();
        assert_eq!(err.context.as_deref(), Some("unterminated command substitution"));
        let err = Lexer::new("echo ${x").tokenize().unwrap_err();
        assert_eq!(err.context.as_deref(), Some("unterminated parameter expansion"));
    }

    #[test]
    fn test_unterminated_heredoc() {
        let err = Lexer::new("cat <<EOF\nbody\n").tokenize().unwrap_err();
        assert_eq!(err.context.as_deref(), Some("unterminated here-document"));
        assert_eq!((err.line, err.column), (1, 5));

        let err = Lexer::new("cat <<EOF").tokenize().unwrap_err();
        assert_eq!(err.expected, "`EOF`");
    }

    #[test]
    fn test_lexer_is_restartable() {
        let lexer = Lexer::new("a | b");
        let first: Vec<_> = lexer.clone().collect();
        let second: Vec<_> = lexer.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }
}

//! Template Parser
//!
//! Builds a node tree from the segments produced by the lexer. Variables
//! and function names are resolved here, so an undefined name is reported
//! at parse time with the template name and line.

use super::lexer::{split_segments, tokenize_action, ActionToken, ActionTokenKind, Segment};
use super::types::TemplateParseError;
use super::value::Value;

/// A parsed template body
pub type NodeList = Vec<Node>;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Action(Pipeline),
    If(Branch),
    Range(Branch),
    With(Branch),
    Template {
        name: String,
        pipe: Option<Pipeline>,
        line: usize,
    },
}

/// Shared shape of `if`, `with` and `range`
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub pipe: Pipeline,
    pub list: NodeList,
    pub else_list: Option<NodeList>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Variables declared or assigned by this pipeline
    pub decl: Vec<String>,
    /// `=` rather than `:=`
    pub is_assign: bool,
    pub commands: Vec<Command>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Dot,
    /// `.A.B` evaluated against dot
    Field(Vec<String>),
    Variable { name: String, fields: Vec<String> },
    Literal(Value),
    Func(String),
    Sub { pipe: Box<Pipeline>, fields: Vec<String> },
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Dot => write!(f, "."),
            Operand::Field(chain) => write!(f, ".{}", chain.join(".")),
            Operand::Variable { name, fields } => {
                write!(f, "${}", name)?;
                for field in fields {
                    write!(f, ".{}", field)?;
                }
                Ok(())
            }
            Operand::Literal(Value::Str(s)) => write!(f, "{:?}", s),
            Operand::Literal(v) => write!(f, "{}", v),
            Operand::Func(name) => write!(f, "{}", name),
            Operand::Sub { .. } => write!(f, "(...)"),
        }
    }
}

/// Result of parsing one template source
#[derive(Debug, Default)]
pub struct ParsedSource {
    pub root: NodeList,
    /// `define` and `block` bodies, in source order
    pub defines: Vec<(String, NodeList)>,
}

enum Stop {
    End,
    Else(Vec<ActionToken>, usize),
}

struct TemplateParser<'a> {
    name: &'a str,
    segments: std::vec::IntoIter<Segment>,
    is_func: &'a dyn Fn(&str) -> bool,
    vars: Vec<String>,
    depth: usize,
    defines: Vec<(String, NodeList)>,
}

/// Parse `src` as the template `name`. `is_func` tells which identifiers
/// are callable functions.
pub fn parse_template(
    name: &str,
    src: &str,
    is_func: &dyn Fn(&str) -> bool,
) -> Result<ParsedSource, TemplateParseError> {
    let segments = split_segments(name, src)?;
    let mut parser = TemplateParser {
        name,
        segments: segments.into_iter(),
        is_func,
        vars: vec![String::new()],
        depth: 0,
        defines: Vec::new(),
    };
    let (root, _) = parser.parse_list(false)?;
    Ok(ParsedSource {
        root,
        defines: parser.defines,
    })
}

fn keyword(tokens: &[ActionToken]) -> Option<&str> {
    match tokens.first().map(|t| &t.kind) {
        Some(ActionTokenKind::Ident(word)) => match word.as_str() {
            "if" | "else" | "end" | "range" | "with" | "define" | "template" | "block" => {
                Some(word.as_str())
            }
            _ => None,
        },
        _ => None,
    }
}

impl<'a> TemplateParser<'a> {
    fn error(&self, line: usize, message: impl Into<String>) -> TemplateParseError {
        TemplateParseError::new(self.name, line, message)
    }

    /// Parse nodes until `{{end}}`/`{{else}}` (when `nested`) or end of
    /// input (when not).
    fn parse_list(&mut self, nested: bool) -> Result<(NodeList, Option<Stop>), TemplateParseError> {
        let mut nodes = Vec::new();
        while let Some(segment) = self.segments.next() {
            let (body, line) = match segment {
                Segment::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Segment::Action { body, line } => (body, line),
            };
            let tokens = tokenize_action(&body).map_err(|msg| self.error(line, msg))?;
            if tokens.is_empty() {
                return Err(self.error(line, "missing value for command"));
            }
            match keyword(&tokens) {
                Some("end") => {
                    if !nested {
                        return Err(self.error(line, "unexpected {{end}}"));
                    }
                    if tokens.len() > 1 {
                        return Err(self.error(line, "unexpected tokens after end"));
                    }
                    return Ok((nodes, Some(Stop::End)));
                }
                Some("else") => {
                    if !nested {
                        return Err(self.error(line, "unexpected {{else}}"));
                    }
                    return Ok((nodes, Some(Stop::Else(tokens[1..].to_vec(), line))));
                }
                Some("if") => nodes.push(Node::If(self.parse_branch("if", &tokens[1..], line)?)),
                Some("with") => {
                    nodes.push(Node::With(self.parse_branch("with", &tokens[1..], line)?))
                }
                Some("range") => {
                    nodes.push(Node::Range(self.parse_branch("range", &tokens[1..], line)?))
                }
                Some("template") => nodes.push(self.parse_template_call(&tokens[1..], line)?),
                Some("define") => {
                    if nested || self.depth > 0 {
                        return Err(self.error(line, "unexpected define"));
                    }
                    let name = self.parse_name("define", &tokens[1..], line)?;
                    if tokens.len() > 2 {
                        return Err(self.error(line, "unexpected tokens in define clause"));
                    }
                    let body = self.parse_definition(line)?;
                    self.defines.push((name, body));
                }
                Some("block") => {
                    let name = self.parse_name("block", &tokens[1..], line)?;
                    let pipe = self.parse_optional_pipe(&tokens[2..], line)?;
                    let body = self.parse_definition(line)?;
                    self.defines.push((name.clone(), body));
                    nodes.push(Node::Template { name, pipe, line });
                }
                _ => nodes.push(Node::Action(self.parse_pipeline(&tokens, line, false, true)?)),
            }
        }
        if nested {
            return Err(self.error(0, "unexpected EOF"));
        }
        Ok((nodes, None))
    }

    fn eof_line(&self, err: TemplateParseError, line: usize) -> TemplateParseError {
        if err.line == 0 {
            TemplateParseError { line, ..err }
        } else {
            err
        }
    }

    /// Body of `define`/`block` up to its `end`, with a fresh variable scope.
    fn parse_definition(&mut self, line: usize) -> Result<NodeList, TemplateParseError> {
        let saved = std::mem::replace(&mut self.vars, vec![String::new()]);
        self.depth += 1;
        let result = self.parse_list(true);
        self.depth -= 1;
        self.vars = saved;
        match result.map_err(|e| self.eof_line(e, line))? {
            (body, Some(Stop::End)) => Ok(body),
            (_, Some(Stop::Else(_, else_line))) => {
                Err(self.error(else_line, "unexpected {{else}} in definition"))
            }
            (_, None) => Err(self.error(line, "unexpected EOF")),
        }
    }

    fn parse_name(
        &self,
        context: &str,
        tokens: &[ActionToken],
        line: usize,
    ) -> Result<String, TemplateParseError> {
        match tokens.first().map(|t| &t.kind) {
            Some(ActionTokenKind::Str(name)) => Ok(name.clone()),
            _ => Err(self.error(line, format!("expected quoted template name in {}", context))),
        }
    }

    fn parse_optional_pipe(
        &self,
        tokens: &[ActionToken],
        line: usize,
    ) -> Result<Option<Pipeline>, TemplateParseError> {
        if tokens.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.parse_pipeline_ro(tokens, line)?))
        }
    }

    fn parse_template_call(
        &self,
        tokens: &[ActionToken],
        line: usize,
    ) -> Result<Node, TemplateParseError> {
        let name = self.parse_name("template clause", tokens, line)?;
        let pipe = self.parse_optional_pipe(&tokens[1..], line)?;
        Ok(Node::Template { name, pipe, line })
    }

    fn parse_branch(
        &mut self,
        context: &str,
        tokens: &[ActionToken],
        line: usize,
    ) -> Result<Branch, TemplateParseError> {
        let mark = self.vars.len();
        let pipe = self.parse_pipeline(tokens, line, context == "range", true)?;
        self.depth += 1;
        let result = self.parse_branch_lists(context, line);
        self.depth -= 1;
        self.vars.truncate(mark);
        let (list, else_list) = result?;
        Ok(Branch {
            pipe,
            list,
            else_list,
        })
    }

    fn parse_branch_lists(
        &mut self,
        context: &str,
        line: usize,
    ) -> Result<(NodeList, Option<NodeList>), TemplateParseError> {
        let (list, stop) = self.parse_list(true).map_err(|e| self.eof_line(e, line))?;
        let else_list = match stop {
            Some(Stop::End) | None => None,
            Some(Stop::Else(rest, else_line)) => {
                if rest.is_empty() {
                    match self.parse_list(true).map_err(|e| self.eof_line(e, else_line))? {
                        (body, Some(Stop::End)) => Some(body),
                        (_, _) => return Err(self.error(else_line, "expected end; found else")),
                    }
                } else {
                    // `else if` / `else with` nests a branch sharing our `end`
                    match keyword(&rest) {
                        Some(kw) if kw == context && context != "range" => {
                            let branch = self.parse_branch(context, &rest[1..], else_line)?;
                            let node = if context == "if" {
                                Node::If(branch)
                            } else {
                                Node::With(branch)
                            };
                            Some(vec![node])
                        }
                        _ => return Err(self.error(else_line, "unexpected tokens after else")),
                    }
                }
            }
        };
        Ok((list, else_list))
    }

    /// Pipeline parse that may not declare variables.
    fn parse_pipeline_ro(
        &self,
        tokens: &[ActionToken],
        line: usize,
    ) -> Result<Pipeline, TemplateParseError> {
        let mut cursor = Cursor { tokens, pos: 0 };
        let pipe = self.parse_commands(&mut cursor, line, Vec::new(), false)?;
        if cursor.pos < tokens.len() {
            return Err(self.error(line, "unexpected right paren"));
        }
        Ok(pipe)
    }

    fn parse_pipeline(
        &mut self,
        tokens: &[ActionToken],
        line: usize,
        allow_two: bool,
        allow_decl: bool,
    ) -> Result<Pipeline, TemplateParseError> {
        let mut decl = Vec::new();
        let mut is_assign = false;
        let mut start = 0;
        if allow_decl {
            use ActionTokenKind::*;
            let kinds: Vec<&ActionTokenKind> = tokens.iter().take(4).map(|t| &t.kind).collect();
            match kinds.as_slice() {
                [Variable(a), Comma, Variable(b), Declare, ..] if allow_two => {
                    decl = vec![a.clone(), b.clone()];
                    start = 4;
                }
                [Variable(a), Declare, ..] => {
                    decl = vec![a.clone()];
                    start = 2;
                }
                [Variable(a), Assign, ..] => {
                    if !self.vars.contains(a) {
                        return Err(self.error(line, format!("undefined variable: ${}", a)));
                    }
                    decl = vec![a.clone()];
                    is_assign = true;
                    start = 2;
                }
                _ => {}
            }
        }
        let mut cursor = Cursor {
            tokens: &tokens[start..],
            pos: 0,
        };
        let pipe = self.parse_commands(&mut cursor, line, decl, is_assign)?;
        if cursor.pos < cursor.tokens.len() {
            return Err(self.error(line, "unexpected right paren"));
        }
        if !pipe.is_assign {
            for name in &pipe.decl {
                self.vars.push(name.clone());
            }
        }
        Ok(pipe)
    }

    /// Commands separated by `|`, stopping at end of tokens or `)`.
    fn parse_commands(
        &self,
        cursor: &mut Cursor<'_>,
        line: usize,
        decl: Vec<String>,
        is_assign: bool,
    ) -> Result<Pipeline, TemplateParseError> {
        let mut commands = Vec::new();
        loop {
            let mut args = Vec::new();
            while let Some(tok) = cursor.peek() {
                match tok.kind {
                    ActionTokenKind::Pipe | ActionTokenKind::RParen => break,
                    _ => args.push(self.parse_operand(cursor, line)?),
                }
            }
            if args.is_empty() {
                return Err(self.error(line, "missing value for command"));
            }
            commands.push(Command { args });
            match cursor.peek().map(|t| &t.kind) {
                Some(ActionTokenKind::Pipe) => {
                    cursor.pos += 1;
                }
                _ => break,
            }
        }
        Ok(Pipeline {
            decl,
            is_assign,
            commands,
            line,
        })
    }

    fn parse_operand(&self, cursor: &mut Cursor<'_>, line: usize) -> Result<Operand, TemplateParseError> {
        let tok = cursor.next().ok_or_else(|| self.error(line, "missing operand"))?;
        let operand = match &tok.kind {
            ActionTokenKind::Dot => Operand::Dot,
            ActionTokenKind::Field(name) => {
                let mut chain = vec![name.clone()];
                chain.extend(self.parse_fields(cursor));
                return Ok(Operand::Field(chain));
            }
            ActionTokenKind::Variable(name) => {
                if !self.vars.contains(name) {
                    return Err(self.error(line, format!("undefined variable \"${}\"", name)));
                }
                return Ok(Operand::Variable {
                    name: name.clone(),
                    fields: self.parse_fields(cursor),
                });
            }
            ActionTokenKind::Str(s) => Operand::Literal(Value::Str(s.clone())),
            ActionTokenKind::Int(i) => Operand::Literal(Value::Int(*i)),
            ActionTokenKind::Ident(word) => match word.as_str() {
                "true" => Operand::Literal(Value::Bool(true)),
                "false" => Operand::Literal(Value::Bool(false)),
                "nil" => Operand::Literal(Value::Nil),
                name if (self.is_func)(name) => Operand::Func(name.to_string()),
                name => {
                    return Err(self.error(line, format!("function \"{}\" not defined", name)))
                }
            },
            ActionTokenKind::LParen => {
                let pipe = self.parse_commands(cursor, line, Vec::new(), false)?;
                match cursor.next().map(|t| &t.kind) {
                    Some(ActionTokenKind::RParen) => {}
                    _ => return Err(self.error(line, "unclosed left paren")),
                }
                return Ok(Operand::Sub {
                    pipe: Box::new(pipe),
                    fields: self.parse_fields(cursor),
                });
            }
            ActionTokenKind::RParen => return Err(self.error(line, "unexpected right paren")),
            other => return Err(self.error(line, format!("unexpected {:?} in operand", other))),
        };
        if let Some(ActionTokenKind::Field(_)) = cursor.peek().filter(|t| !t.spaced).map(|t| &t.kind) {
            return Err(self.error(line, format!("unexpected field after {}", operand)));
        }
        Ok(operand)
    }

    /// Field names directly attached (no whitespace) to the previous operand.
    fn parse_fields(&self, cursor: &mut Cursor<'_>) -> Vec<String> {
        let mut fields = Vec::new();
        while let Some(ActionToken {
            kind: ActionTokenKind::Field(name),
            spaced: false,
        }) = cursor.peek()
        {
            fields.push(name.clone());
            cursor.pos += 1;
        }
        fields
    }
}

struct Cursor<'t> {
    tokens: &'t [ActionToken],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn peek(&self) -> Option<&'t ActionToken> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t ActionToken> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(name: &str) -> bool {
        matches!(name, "printf" | "eq" | "len")
    }

    fn parse(src: &str) -> Result<ParsedSource, TemplateParseError> {
        parse_template("t", src, &known)
    }

    #[test]
    fn test_text_and_field() {
        let parsed = parse("echo {{.USER}}").unwrap();
        assert_eq!(parsed.root.len(), 2);
        match &parsed.root[1] {
            Node::Action(pipe) => {
                assert_eq!(pipe.commands[0].args, vec![Operand::Field(vec!["USER".into()])]);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_if_else_if_chain() {
        let parsed = parse("{{if .A}}a{{else if .B}}b{{else}}c{{end}}").unwrap();
        match &parsed.root[0] {
            Node::If(branch) => {
                let else_list = branch.else_list.as_ref().unwrap();
                match &else_list[0] {
                    Node::If(inner) => {
                        assert_eq!(inner.list, vec![Node::Text("b".into())]);
                        assert_eq!(inner.else_list, Some(vec![Node::Text("c".into())]));
                    }
                    other => panic!("unexpected node {:?}", other),
                }
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_range_two_vars_scoped() {
        let parsed = parse("{{range $i, $e := .L}}{{$i}}={{$e}}{{end}}").unwrap();
        match &parsed.root[0] {
            Node::Range(branch) => assert_eq!(branch.pipe.decl, vec!["i", "e"]),
            other => panic!("unexpected node {:?}", other),
        }
        let err = parse("{{range $e := .L}}{{end}}{{$e}}").unwrap_err();
        assert_eq!(err.message, "undefined variable \"$e\"");
    }

    #[test]
    fn test_declaration_visible_afterwards() {
        let parsed = parse("{{$x := \"a\"}}{{$x = \"b\"}}{{$x}}").unwrap();
        assert_eq!(parsed.root.len(), 3);
    }

    #[test]
    fn test_undefined_variable() {
        let err = parse("line1\n{{$nope}}").unwrap_err();
        assert_eq!(err.template_name, "t");
        assert_eq!(err.line, 2);
        assert_eq!(err.message, "undefined variable \"$nope\"");
    }

    #[test]
    fn test_undefined_function() {
        let err = parse("{{frobnicate .X}}").unwrap_err();
        assert_eq!(err.message, "function \"frobnicate\" not defined");
    }

    #[test]
    fn test_define_and_block() {
        let parsed = parse("{{define \"a\"}}A{{end}}{{block \"b\" .}}B{{end}}").unwrap();
        let names: Vec<_> = parsed.defines.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(matches!(&parsed.root[0], Node::Template { name, .. } if name == "b"));
    }

    #[test]
    fn test_define_not_top_level() {
        let err = parse("{{if .X}}{{define \"a\"}}{{end}}{{end}}").unwrap_err();
        assert_eq!(err.message, "unexpected define");
    }

    #[test]
    fn test_unbalanced() {
        assert_eq!(parse("{{end}}").unwrap_err().message, "unexpected {{end}}");
        assert_eq!(parse("{{else}}").unwrap_err().message, "unexpected {{else}}");
        let err = parse("{{if .X}}\nyes").unwrap_err();
        assert_eq!(err.message, "unexpected EOF");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_parenthesized_pipeline() {
        let parsed = parse("{{(printf \"%s\" .X).Y | len}}").unwrap();
        match &parsed.root[0] {
            Node::Action(pipe) => {
                assert_eq!(pipe.commands.len(), 2);
                assert!(matches!(&pipe.commands[0].args[0], Operand::Sub { fields, .. } if fields == &vec!["Y".to_string()]));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_empty_command() {
        assert_eq!(parse("{{.X | }}").unwrap_err().message, "missing value for command");
    }
}

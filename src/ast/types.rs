//! Abstract Syntax Tree (AST) Types for generated shell scripts
//!
//! This module defines the tree the parser produces and the printer walks.
//! Words keep their source text verbatim: nothing here is expanded or
//! evaluated, so printing a tree reproduces every quote and expansion.

use serde::Serialize;
use std::fmt;

// =============================================================================
// SCRIPT & LISTS
// =============================================================================

/// Root node: a complete script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptNode {
    pub body: BodyNode,
}

impl ScriptNode {
    pub fn is_empty(&self) -> bool {
        self.body.list.is_none() && self.body.trailing_comments.is_empty()
    }
}

/// The statements of a script or of a compound construct's clause.
///
/// Comments that are not followed by any statement before the clause ends
/// are kept in `trailing_comments`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BodyNode {
    pub list: Option<ListNode>,
    pub trailing_comments: Vec<String>,
}

/// A list of pipelines joined by connectors, left-associative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ListNode {
    Pipeline(PipelineNode),
    Connected(Box<ConnectedNode>),
}

/// `left CONNECTOR right`. `right` is `None` only for a trailing `&`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectedNode {
    pub left: ListNode,
    pub connector: Connector,
    pub right: Option<ListNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Connector {
    Semi,  // ; or newline
    Amp,   // &
    And,   // &&
    Or,    // ||
}

impl Connector {
    /// `&&` and `||` bind tighter than `;` and `&`.
    pub fn is_and_or(self) -> bool {
        matches!(self, Connector::And | Connector::Or)
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semi => write!(f, ";"),
            Self::Amp => write!(f, "&"),
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
        }
    }
}

// =============================================================================
// PIPELINES & COMMANDS
// =============================================================================

/// A pipeline: cmd1 | cmd2 | cmd3
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineNode {
    pub commands: Vec<CommandNode>,
    /// Negate exit status with !
    pub negated: bool,
    /// Comments that textually precede the pipeline
    pub comments: Vec<String>,
}

/// Union of all command types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CommandNode {
    Simple(SimpleCommandNode),
    Compound(CompoundCommandNode),
    FunctionDef(FunctionDefNode),
}

/// Simple command: words (assignments included) plus redirections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimpleCommandNode {
    pub words: Vec<WordNode>,
    pub redirections: Vec<RedirectionNode>,
}

/// Compound commands: control structures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum CompoundCommandNode {
    If(IfNode),
    For(ForNode),
    While(WhileNode),
    Case(CaseNode),
    Subshell(SubshellNode),
    Group(GroupNode),
}

impl CompoundCommandNode {
    pub fn redirections(&self) -> &[RedirectionNode] {
        match self {
            Self::If(n) => &n.redirections,
            Self::For(n) => &n.redirections,
            Self::While(n) => &n.redirections,
            Self::Case(n) => &n.redirections,
            Self::Subshell(n) => &n.redirections,
            Self::Group(n) => &n.redirections,
        }
    }

    pub fn redirections_mut(&mut self) -> &mut Vec<RedirectionNode> {
        match self {
            Self::If(n) => &mut n.redirections,
            Self::For(n) => &mut n.redirections,
            Self::While(n) => &mut n.redirections,
            Self::Case(n) => &mut n.redirections,
            Self::Subshell(n) => &mut n.redirections,
            Self::Group(n) => &mut n.redirections,
        }
    }
}

// =============================================================================
// CONTROL FLOW
// =============================================================================

/// if statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IfNode {
    /// The `if` clause followed by every `elif` clause
    pub clauses: Vec<IfClause>,
    pub else_body: Option<BodyNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IfClause {
    pub condition: BodyNode,
    pub body: BodyNode,
}

/// for loop: for VAR [in WORDS]; do ...; done
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForNode {
    pub variable: String,
    /// Words to iterate over (None = "$@")
    pub words: Option<Vec<WordNode>>,
    pub body: BodyNode,
    pub redirections: Vec<RedirectionNode>,
}

/// while or until loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhileNode {
    pub condition: BodyNode,
    pub body: BodyNode,
    pub until: bool,
    pub redirections: Vec<RedirectionNode>,
}

/// case statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseNode {
    pub word: WordNode,
    pub items: Vec<CaseItemNode>,
    /// Comments before `esac` when there are no arms to hold them
    pub trailing_comments: Vec<String>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseItemNode {
    pub patterns: Vec<WordNode>,
    pub body: BodyNode,
}

/// Subshell: ( ... )
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubshellNode {
    pub body: BodyNode,
    pub redirections: Vec<RedirectionNode>,
}

/// Command group: { ...; }
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupNode {
    pub body: BodyNode,
    pub redirections: Vec<RedirectionNode>,
}

// =============================================================================
// FUNCTIONS
// =============================================================================

/// Function definition: name() compound, or function name compound
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDefNode {
    pub name: String,
    pub body: Box<CompoundCommandNode>,
    pub redirections: Vec<RedirectionNode>,
    /// Declared with the `function` keyword
    pub keyword: bool,
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

/// I/O redirection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectionNode {
    /// Explicit file descriptor, e.g. the 2 in 2>&1
    pub fd: Option<u32>,
    pub operator: RedirectionOperator,
    pub target: RedirectionTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RedirectionTarget {
    Word(WordNode),
    HereDoc(HereDocNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RedirectionOperator {
    Less,           // <
    Great,          // >
    DGreat,         // >>
    GreatAnd,       // >&
    LessAnd,        // <&
    LessGreat,      // <>
    Clobber,        // >|
    AndGreat,       // &>
    AndDGreat,      // &>>
    TLess,          // <<<
    DLess,          // <<
    DLessDash,      // <<-
}

impl RedirectionOperator {
    pub fn is_heredoc(self) -> bool {
        matches!(self, Self::DLess | Self::DLessDash)
    }
}

impl fmt::Display for RedirectionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Less => write!(f, "<"),
            Self::Great => write!(f, ">"),
            Self::DGreat => write!(f, ">>"),
            Self::GreatAnd => write!(f, ">&"),
            Self::LessAnd => write!(f, "<&"),
            Self::LessGreat => write!(f, "<>"),
            Self::Clobber => write!(f, ">|"),
            Self::AndGreat => write!(f, "&>"),
            Self::AndDGreat => write!(f, "&>>"),
            Self::TLess => write!(f, "<<<"),
            Self::DLess => write!(f, "<<"),
            Self::DLessDash => write!(f, "<<-"),
        }
    }
}

/// Here document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HereDocNode {
    /// Delimiter exactly as written after the operator, quotes included
    pub delimiter: String,
    /// Raw body lines, each ending in a newline; never re-indented
    pub body: String,
    /// Strip leading tabs (<<- vs <<)
    pub strip_tabs: bool,
    /// Quoted delimiter means no expansion
    pub quoted: bool,
}

// =============================================================================
// WORDS
// =============================================================================

/// A Word is a sequence of parts that form a single shell word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordNode {
    pub parts: Vec<WordPart>,
}

/// Parts that can make up a word. Every payload is source text, never a
/// computed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum WordPart {
    /// Unquoted text with no special meaning
    Literal(String),
    /// Backslash escape outside quotes: the escaped character
    Escaped(char),
    /// 'literal' (content without the quotes)
    SingleQuoted(String),
    /// $'ansi-c' (content without the delimiters)
    AnsiCQuoted(String),
    /// "with $expansion" (content without the quotes)
    DoubleQuoted(String),
    /// $NAME, $1, $@, ${...}
    ParameterExpansion(String),
    /// $(...) or `...`
    CommandSubstitution { body: String, backtick: bool },
    /// $((...)) (expression only)
    ArithmeticExpansion(String),
}

impl WordNode {
    /// Source form of the word, reassembled from its parts.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            part.write_source(&mut out);
        }
        out
    }

    /// The word as plain text when it has no quoting or expansion.
    pub fn as_literal(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [WordPart::Literal(s)] => Some(s),
            _ => None,
        }
    }
}

impl WordPart {
    fn write_source(&self, out: &mut String) {
        match self {
            WordPart::Literal(s) => out.push_str(s),
            WordPart::Escaped(c) => {
                out.push('\\');
                out.push(*c);
            }
            WordPart::SingleQuoted(s) => {
                out.push('\'');
                out.push_str(s);
                out.push('\'');
            }
            WordPart::AnsiCQuoted(s) => {
                out.push_str("$'");
                out.push_str(s);
                out.push('\'');
            }
            WordPart::DoubleQuoted(s) => {
                out.push('"');
                out.push_str(s);
                out.push('"');
            }
            WordPart::ParameterExpansion(s) => out.push_str(s),
            WordPart::CommandSubstitution { body, backtick } => {
                if *backtick {
                    out.push('`');
                    out.push_str(body);
                    out.push('`');
                } else {
                    out.push_str("$(");
                    out.push_str(body);
                    out.push(')');
                }
            }
            WordPart::ArithmeticExpansion(s) => {
                out.push_str("$((");
                out.push_str(s);
                out.push_str("))");
            }
        }
    }
}

impl fmt::Display for WordNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_source())
    }
}

// =============================================================================
// AST FACTORY
// =============================================================================

/// AST factory for building nodes
pub struct AST;

impl AST {
    pub fn script(body: BodyNode) -> ScriptNode {
        ScriptNode { body }
    }

    pub fn body(list: Option<ListNode>, trailing_comments: Vec<String>) -> BodyNode {
        BodyNode {
            list,
            trailing_comments,
        }
    }

    pub fn connected(left: ListNode, connector: Connector, right: Option<ListNode>) -> ListNode {
        ListNode::Connected(Box::new(ConnectedNode {
            left,
            connector,
            right,
        }))
    }

    pub fn pipeline(commands: Vec<CommandNode>, negated: bool, comments: Vec<String>) -> PipelineNode {
        PipelineNode {
            commands,
            negated,
            comments,
        }
    }

    pub fn simple_command(words: Vec<WordNode>, redirections: Vec<RedirectionNode>) -> SimpleCommandNode {
        SimpleCommandNode {
            words,
            redirections,
        }
    }

    pub fn word(parts: Vec<WordPart>) -> WordNode {
        WordNode { parts }
    }

    pub fn literal(value: impl Into<String>) -> WordPart {
        WordPart::Literal(value.into())
    }

    pub fn redirection(
        operator: RedirectionOperator,
        target: RedirectionTarget,
        fd: Option<u32>,
    ) -> RedirectionNode {
        RedirectionNode {
            fd,
            operator,
            target,
        }
    }

    pub fn here_doc(
        delimiter: impl Into<String>,
        body: impl Into<String>,
        strip_tabs: bool,
        quoted: bool,
    ) -> HereDocNode {
        HereDocNode {
            delimiter: delimiter.into(),
            body: body.into(),
            strip_tabs,
            quoted,
        }
    }

    pub fn if_node(
        clauses: Vec<IfClause>,
        else_body: Option<BodyNode>,
        redirections: Vec<RedirectionNode>,
    ) -> IfNode {
        IfNode {
            clauses,
            else_body,
            redirections,
        }
    }

    pub fn for_node(
        variable: impl Into<String>,
        words: Option<Vec<WordNode>>,
        body: BodyNode,
        redirections: Vec<RedirectionNode>,
    ) -> ForNode {
        ForNode {
            variable: variable.into(),
            words,
            body,
            redirections,
        }
    }

    pub fn while_node(
        condition: BodyNode,
        body: BodyNode,
        until: bool,
        redirections: Vec<RedirectionNode>,
    ) -> WhileNode {
        WhileNode {
            condition,
            body,
            until,
            redirections,
        }
    }

    pub fn case_node(
        word: WordNode,
        items: Vec<CaseItemNode>,
        redirections: Vec<RedirectionNode>,
    ) -> CaseNode {
        CaseNode {
            word,
            items,
            trailing_comments: Vec::new(),
            redirections,
        }
    }

    pub fn case_item(patterns: Vec<WordNode>, body: BodyNode) -> CaseItemNode {
        CaseItemNode { patterns, body }
    }

    pub fn subshell(body: BodyNode, redirections: Vec<RedirectionNode>) -> SubshellNode {
        SubshellNode { body, redirections }
    }

    pub fn group(body: BodyNode, redirections: Vec<RedirectionNode>) -> GroupNode {
        GroupNode { body, redirections }
    }

    pub fn function_def(
        name: impl Into<String>,
        body: CompoundCommandNode,
        redirections: Vec<RedirectionNode>,
        keyword: bool,
    ) -> FunctionDefNode {
        FunctionDefNode {
            name: name.into(),
            body: Box::new(body),
            redirections,
            keyword,
        }
    }
}

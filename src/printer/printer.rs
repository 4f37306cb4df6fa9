//! AST to shell text.

use crate::ast::types::{
    BodyNode, CaseNode, CommandNode, CompoundCommandNode, Connector, ForNode, FunctionDefNode,
    HereDocNode, IfNode, ListNode, PipelineNode, RedirectionNode, RedirectionTarget, ScriptNode,
    SimpleCommandNode, WhileNode,
};
use crate::parser::lexer::heredoc_terminator;
use crate::printer::types::PrintConfig;

// =============================================================================
// LIST FLATTENING
// =============================================================================

/// One line-level statement: an and-or chain, optionally backgrounded.
struct Statement<'a> {
    chain: Vec<(Option<Connector>, &'a PipelineNode)>,
    background: bool,
}

fn and_or_chain<'a>(list: &'a ListNode, out: &mut Vec<(Option<Connector>, &'a PipelineNode)>) {
    match list {
        ListNode::Pipeline(p) => out.push((None, p)),
        ListNode::Connected(c) => {
            and_or_chain(&c.left, out);
            if let Some(right) = &c.right {
                let start = out.len();
                and_or_chain(right, out);
                if let Some(first) = out.get_mut(start) {
                    first.0 = Some(c.connector);
                }
            }
        }
    }
}

fn statements<'a>(list: &'a ListNode, out: &mut Vec<Statement<'a>>) {
    match list {
        ListNode::Connected(c) if !c.connector.is_and_or() => {
            statements(&c.left, out);
            if c.connector == Connector::Amp {
                if let Some(last) = out.last_mut() {
                    last.background = true;
                }
            }
            if let Some(right) = &c.right {
                statements(right, out);
            }
        }
        other => {
            let mut chain = Vec::new();
            and_or_chain(other, &mut chain);
            out.push(Statement {
                chain,
                background: false,
            });
        }
    }
}

fn body_statements(body: &BodyNode) -> Vec<Statement<'_>> {
    let mut out = Vec::new();
    if let Some(list) = &body.list {
        statements(list, &mut out);
    }
    out
}

/// Whether a condition list fits on the header line.
fn is_inline(body: &BodyNode) -> bool {
    body.trailing_comments.is_empty()
        && body_statements(body).iter().all(|stmt| {
            !stmt.background
                && stmt.chain.iter().all(|(_, p)| {
                    p.comments.is_empty()
                        && p.commands.iter().all(|c| matches!(c, CommandNode::Simple(_)))
                })
        })
}

// =============================================================================
// PRINTER
// =============================================================================

/// Writes an AST as canonical shell text
pub struct Printer<'a> {
    config: &'a PrintConfig,
    out: String,
    level: usize,
    heredocs: Vec<&'a HereDocNode>,
}

impl<'a> Printer<'a> {
    pub fn new(config: &'a PrintConfig) -> Self {
        Self {
            config,
            out: String::new(),
            level: 0,
            heredocs: Vec::new(),
        }
    }

    pub fn print_script(mut self, script: &'a ScriptNode) -> String {
        self.body(&script.body);
        self.out
    }

    fn indent(&mut self) {
        let pad = self.config.indentation(self.level);
        self.out.push_str(&pad);
    }

    /// End the current line, then write any here-documents it opened.
    fn newline(&mut self) {
        self.out.push('\n');
        for doc in std::mem::take(&mut self.heredocs) {
            self.out.push_str(&doc.body);
            self.out.push_str(&heredoc_terminator(&doc.delimiter));
            self.out.push('\n');
        }
    }

    fn comment_lines(&mut self, comments: &[String]) {
        for comment in comments {
            self.indent();
            self.out.push_str(comment);
            self.newline();
        }
    }

    fn nested<F: FnOnce(&mut Self)>(&mut self, f: F) {
        self.level += 1;
        f(self);
        self.level -= 1;
    }

    fn body(&mut self, body: &'a BodyNode) {
        for stmt in body_statements(body) {
            self.statement(&stmt);
        }
        self.comment_lines(&body.trailing_comments);
    }

    fn statement(&mut self, stmt: &Statement<'a>) {
        for (i, (connector, pipeline)) in stmt.chain.iter().enumerate() {
            if i == 0 {
                self.comment_lines(&pipeline.comments);
                self.indent();
            } else {
                if let Some(connector) = connector {
                    self.out.push(' ');
                    self.out.push_str(&connector.to_string());
                }
                if pipeline.comments.is_empty() {
                    self.out.push(' ');
                } else {
                    self.newline();
                    self.comment_lines(&pipeline.comments);
                    self.indent();
                }
            }
            self.pipeline(*pipeline);
        }
        if stmt.background {
            self.out.push_str(" &");
        }
        self.newline();
    }

    /// Statements joined by `; ` on the current line.
    fn inline_list(&mut self, body: &'a BodyNode) {
        for (i, stmt) in body_statements(body).iter().enumerate() {
            if i > 0 {
                self.out.push_str("; ");
            }
            for (j, (connector, pipeline)) in stmt.chain.iter().enumerate() {
                if j > 0 {
                    if let Some(connector) = connector {
                        self.out.push(' ');
                        self.out.push_str(&connector.to_string());
                    }
                    self.out.push(' ');
                }
                self.pipeline(*pipeline);
            }
        }
    }

    /// `keyword COND; opener` or the block form when COND does not fit.
    fn header(&mut self, keyword: &str, condition: &'a BodyNode, opener: &str) {
        self.out.push_str(keyword);
        if is_inline(condition) {
            self.out.push(' ');
            self.inline_list(condition);
            self.out.push_str("; ");
            self.out.push_str(opener);
            self.newline();
        } else {
            self.newline();
            self.nested(|p| p.body(condition));
            self.indent();
            self.out.push_str(opener);
            self.newline();
        }
    }

    fn pipeline(&mut self, pipeline: &'a PipelineNode) {
        if pipeline.negated {
            self.out.push_str("! ");
        }
        for (i, command) in pipeline.commands.iter().enumerate() {
            if i > 0 {
                self.out.push_str(" | ");
            }
            self.command(command);
        }
    }

    fn command(&mut self, command: &'a CommandNode) {
        match command {
            CommandNode::Simple(cmd) => self.simple(cmd),
            CommandNode::Compound(cmd) => self.compound(cmd),
            CommandNode::FunctionDef(def) => self.function_def(def),
        }
    }

    fn simple(&mut self, cmd: &'a SimpleCommandNode) {
        let mut first = true;
        for word in &cmd.words {
            if !first {
                self.out.push(' ');
            }
            self.out.push_str(&word.to_source());
            first = false;
        }
        for redirection in &cmd.redirections {
            if !first {
                self.out.push(' ');
            }
            self.redirection(redirection);
            first = false;
        }
    }

    fn redirection(&mut self, redirection: &'a RedirectionNode) {
        if let Some(fd) = redirection.fd {
            self.out.push_str(&fd.to_string());
        }
        self.out.push_str(&redirection.operator.to_string());
        match &redirection.target {
            RedirectionTarget::Word(word) => self.out.push_str(&word.to_source()),
            RedirectionTarget::HereDoc(doc) => {
                self.out.push_str(&doc.delimiter);
                self.heredocs.push(doc);
            }
        }
    }

    fn trailing_redirections(&mut self, redirections: &'a [RedirectionNode]) {
        for redirection in redirections {
            self.out.push(' ');
            self.redirection(redirection);
        }
    }

    fn close(&mut self, keyword: &str) {
        self.indent();
        self.out.push_str(keyword);
    }

    fn compound(&mut self, cmd: &'a CompoundCommandNode) {
        match cmd {
            CompoundCommandNode::If(node) => self.if_node(node),
            CompoundCommandNode::For(node) => self.for_node(node),
            CompoundCommandNode::While(node) => self.while_node(node),
            CompoundCommandNode::Case(node) => self.case_node(node),
            CompoundCommandNode::Subshell(node) => {
                self.out.push('(');
                self.newline();
                self.nested(|p| p.body(&node.body));
                self.close(")");
            }
            CompoundCommandNode::Group(node) => {
                self.out.push('{');
                self.newline();
                self.nested(|p| p.body(&node.body));
                self.close("}");
            }
        }
        self.trailing_redirections(cmd.redirections());
    }

    fn if_node(&mut self, node: &'a IfNode) {
        for (i, clause) in node.clauses.iter().enumerate() {
            if i > 0 {
                self.indent();
            }
            self.header(if i == 0 { "if" } else { "elif" }, &clause.condition, "then");
            self.nested(|p| p.body(&clause.body));
        }
        if let Some(else_body) = &node.else_body {
            self.close("else");
            self.newline();
            self.nested(|p| p.body(else_body));
        }
        self.close("fi");
    }

    fn for_node(&mut self, node: &'a ForNode) {
        self.out.push_str("for ");
        self.out.push_str(&node.variable);
        if let Some(words) = &node.words {
            self.out.push_str(" in");
            for word in words {
                self.out.push(' ');
                self.out.push_str(&word.to_source());
            }
        }
        self.out.push_str("; do");
        self.newline();
        self.nested(|p| p.body(&node.body));
        self.close("done");
    }

    fn while_node(&mut self, node: &'a WhileNode) {
        let keyword = if node.until { "until" } else { "while" };
        self.header(keyword, &node.condition, "do");
        self.nested(|p| p.body(&node.body));
        self.close("done");
    }

    fn case_node(&mut self, node: &'a CaseNode) {
        self.out.push_str("case ");
        self.out.push_str(&node.word.to_source());
        self.out.push_str(" in");
        self.newline();
        self.nested(|p| {
            for item in &node.items {
                p.indent();
                let patterns: Vec<String> = item.patterns.iter().map(|w| w.to_source()).collect();
                p.out.push_str(&patterns.join(" | "));
                p.out.push(')');
                p.newline();
                p.nested(|p| {
                    p.body(&item.body);
                    p.indent();
                    p.out.push_str(";;");
                    p.newline();
                });
            }
            p.comment_lines(&node.trailing_comments);
        });
        self.close("esac");
    }

    fn function_def(&mut self, def: &'a FunctionDefNode) {
        if def.keyword {
            self.out.push_str("function ");
            self.out.push_str(&def.name);
            self.out.push(' ');
        } else {
            self.out.push_str(&def.name);
            self.out.push_str("() ");
        }
        self.compound(&def.body);
        self.trailing_redirections(&def.redirections);
    }
}

/// Print a script with the given configuration.
pub fn print(script: &ScriptNode, config: &PrintConfig) -> String {
    Printer::new(config).print_script(script)
}

//! Compound Command Parser
//!
//! Handles parsing of compound commands:
//! - if/elif/else/fi
//! - for/do/done
//! - while/until/do/done
//! - case/esac
//! - ( subshell ) and { group; }

use crate::ast::types::{CompoundCommandNode, IfClause, WordNode, AST};
use crate::parser::lexer::TokenType;
use crate::parser::parser::Parser;
use crate::parser::types::ShellSyntaxError;
use crate::parser::word_parser::{is_valid_name, parse_word};

impl Parser {
    /// Parse any compound command, including its trailing redirections.
    pub(crate) fn parse_compound_command(&mut self) -> Result<CompoundCommandNode, ShellSyntaxError> {
        self.enter()?;
        let result = match self.current().token_type {
            TokenType::If => self.parse_if(),
            TokenType::For => self.parse_for(),
            TokenType::While => self.parse_while(false),
            TokenType::Until => self.parse_while(true),
            TokenType::Case => self.parse_case(),
            TokenType::LParen => self.parse_subshell(),
            TokenType::LBrace => self.parse_group(),
            _ => Err(self.error("compound command")),
        };
        self.leave();
        result
    }

    fn parse_if(&mut self) -> Result<CompoundCommandNode, ShellSyntaxError> {
        self.expect(TokenType::If, "`if`")?;

        let condition = self.parse_required_list()?;
        self.expect(TokenType::Then, "`then`")?;
        let body = self.parse_required_list()?;
        let mut clauses = vec![IfClause { condition, body }];

        while self.check(&[TokenType::Elif]) {
            self.advance();
            let condition = self.parse_required_list()?;
            self.expect(TokenType::Then, "`then`")?;
            let body = self.parse_required_list()?;
            clauses.push(IfClause { condition, body });
        }

        let else_body = if self.check(&[TokenType::Else]) {
            self.advance();
            Some(self.parse_required_list()?)
        } else {
            None
        };

        self.expect(TokenType::Fi, "`fi`")?;
        let redirections = self.parse_optional_redirections()?;

        Ok(CompoundCommandNode::If(AST::if_node(clauses, else_body, redirections)))
    }

    fn parse_for(&mut self) -> Result<CompoundCommandNode, ShellSyntaxError> {
        self.expect(TokenType::For, "`for`")?;

        if !(self.check(&[TokenType::Word]) && is_valid_name(&self.current().value)) {
            return Err(self.error("variable name"));
        }
        let variable = self.advance().value;

        let words = if self.check(&[TokenType::Semicolon]) {
            self.advance();
            None
        } else {
            self.skip_newlines();
            if self.check(&[TokenType::In]) {
                self.advance();
                let mut words: Vec<WordNode> = Vec::new();
                while self.current().token_type.is_word_like() {
                    words.push(parse_word(&self.advance().value));
                }
                if self.check(&[TokenType::Semicolon]) {
                    self.advance();
                } else if !self.check(&[TokenType::Newline, TokenType::Comment]) {
                    return Err(self.error("`;` or newline"));
                }
                Some(words)
            } else {
                None
            }
        };

        self.skip_newlines();
        self.expect(TokenType::Do, "`do`")?;
        let body = self.parse_required_list()?;
        self.expect(TokenType::Done, "`done`")?;
        let redirections = self.parse_optional_redirections()?;

        Ok(CompoundCommandNode::For(AST::for_node(variable, words, body, redirections)))
    }

    fn parse_while(&mut self, until: bool) -> Result<CompoundCommandNode, ShellSyntaxError> {
        self.advance();

        let condition = self.parse_required_list()?;
        self.expect(TokenType::Do, "`do`")?;
        let body = self.parse_required_list()?;
        self.expect(TokenType::Done, "`done`")?;
        let redirections = self.parse_optional_redirections()?;

        Ok(CompoundCommandNode::While(AST::while_node(condition, body, until, redirections)))
    }

    fn parse_case(&mut self) -> Result<CompoundCommandNode, ShellSyntaxError> {
        self.expect(TokenType::Case, "`case`")?;

        if !self.current().token_type.is_word_like() {
            return Err(self.error("word"));
        }
        let word = parse_word(&self.advance().value);

        self.skip_newlines();
        self.expect(TokenType::In, "`in`")?;
        self.skip_newlines();

        let mut items = Vec::new();

        while !self.check(&[TokenType::Esac, TokenType::Eof]) {
            if self.check(&[TokenType::LParen]) {
                self.advance();
            }

            let mut patterns = Vec::new();
            loop {
                if !self.current().token_type.is_word_like() {
                    return Err(self.error("pattern"));
                }
                patterns.push(parse_word(&self.advance().value));
                if self.check(&[TokenType::Pipe]) {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(TokenType::RParen, "`)`")?;

            // Empty arms are allowed
            let body = self.parse_compound_list()?;
            items.push(AST::case_item(patterns, body));

            if self.check(&[TokenType::DSemi]) {
                self.advance();
                self.skip_newlines();
            } else {
                break;
            }
        }

        // Comments between the last arm and esac
        let mut trailing_comments = Vec::new();
        match items.last_mut() {
            Some(last) => last.body.trailing_comments.append(&mut self.pending_comments),
            None => trailing_comments.append(&mut self.pending_comments),
        }

        self.expect(TokenType::Esac, "`esac`")?;
        let redirections = self.parse_optional_redirections()?;

        let mut node = AST::case_node(word, items, redirections);
        node.trailing_comments = trailing_comments;
        Ok(CompoundCommandNode::Case(node))
    }

    fn parse_subshell(&mut self) -> Result<CompoundCommandNode, ShellSyntaxError> {
        self.expect(TokenType::LParen, "`(`")?;

        let body = self.parse_required_list()?;

        self.expect(TokenType::RParen, "`)`")?;

        let redirections = self.parse_optional_redirections()?;

        Ok(CompoundCommandNode::Subshell(AST::subshell(body, redirections)))
    }

    fn parse_group(&mut self) -> Result<CompoundCommandNode, ShellSyntaxError> {
        self.expect(TokenType::LBrace, "`{`")?;

        let body = self.parse_required_list()?;

        self.expect(TokenType::RBrace, "`}`")?;

        let redirections = self.parse_optional_redirections()?;

        Ok(CompoundCommandNode::Group(AST::group(body, redirections)))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::types::{CommandNode, CompoundCommandNode, ListNode};
    use crate::parser::parser::parse;

    fn compound(input: &str) -> CompoundCommandNode {
        let script = parse(input).unwrap();
        match script.body.list {
            Some(ListNode::Pipeline(mut p)) => match p.commands.remove(0) {
                CommandNode::Compound(c) => c,
                other => panic!("expected compound, got {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_case_without_arms_keeps_comments() {
        let script = parse("case x in\n# c\nesac\necho").unwrap();
        match script.body.list {
            Some(ListNode::Connected(c)) => {
                match &c.left {
                    ListNode::Pipeline(p) => match &p.commands[0] {
                        CommandNode::Compound(CompoundCommandNode::Case(n)) => {
                            assert!(n.items.is_empty());
                            assert_eq!(n.trailing_comments, vec!["# c".to_string()]);
                        }
                        other => panic!("unexpected {:?}", other),
                    },
                    other => panic!("unexpected {:?}", other),
                }
                match &c.right {
                    Some(ListNode::Pipeline(p)) => assert!(p.comments.is_empty()),
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_statement() {
        match compound("if a; then b; elif c; then d; else e; fi") {
            CompoundCommandNode::If(n) => {
                assert_eq!(n.clauses.len(), 2);
                assert!(n.else_body.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_for_loop() {
        match compound("for i in a b c; do echo $i; done") {
            CompoundCommandNode::For(n) => {
                assert_eq!(n.variable, "i");
                let words: Vec<String> =
                    n.words.unwrap().iter().map(|w| w.to_source()).collect();
                assert_eq!(words, vec!["a", "b", "c"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_for_without_in() {
        match compound("for arg; do echo \"$arg\"; done") {
            CompoundCommandNode::For(n) => assert!(n.words.is_none()),
            other => panic!("unexpected {:?}", other),
        }
        match compound("for arg\ndo\n  echo\ndone") {
            CompoundCommandNode::For(n) => assert!(n.words.is_none()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_while_and_until() {
        match compound("while true; do echo yes; done") {
            CompoundCommandNode::While(n) => assert!(!n.until),
            other => panic!("unexpected {:?}", other),
        }
        match compound("until false\ndo\n  echo no\ndone") {
            CompoundCommandNode::While(n) => assert!(n.until),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_case_statement() {
        match compound("case $x in\n  (a|b) echo ab;;\n  *) ;;\n  c) echo c\nesac") {
            CompoundCommandNode::Case(n) => {
                assert_eq!(n.word.to_source(), "$x");
                assert_eq!(n.items.len(), 3);
                assert_eq!(n.items[0].patterns.len(), 2);
                assert!(n.items[1].body.list.is_none());
                assert!(n.items[2].body.list.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_subshell_and_group_with_redirections() {
        match compound("(cd /tmp && ls) >out 2>&1") {
            CompoundCommandNode::Subshell(n) => assert_eq!(n.redirections.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        match compound("{ echo hello; } <in") {
            CompoundCommandNode::Group(n) => assert_eq!(n.redirections.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_required_clauses_fail() {
        for input in [
            "if then b; fi",
            "if a; then fi",
            "if a; then b; else fi",
            "while do b; done",
            "while a; do done",
            "( )",
            "{ }",
        ] {
            let err = parse(input).unwrap_err();
            assert_eq!(err.expected, "command", "input: {}", input);
        }
    }

    #[test]
    fn test_missing_closers() {
        assert_eq!(parse("for x in a; do b").unwrap_err().expected, "`done`");
        assert_eq!(parse("case x in a) b;;").unwrap_err().expected, "`esac`");
        assert_eq!(parse("{ a; ").unwrap_err().expected, "`}`");
        assert_eq!(parse("if a; b; fi").unwrap_err().expected, "`then`");
    }

    #[test]
    fn test_for_requires_name() {
        assert_eq!(parse("for 1x in a; do b; done").unwrap_err().expected, "variable name");
    }
}

//! Command Parser
//!
//! Simple commands, function definitions and redirections.

use crate::ast::types::{
    CommandNode, RedirectionNode, RedirectionOperator, RedirectionTarget, AST,
};
use crate::parser::lexer::{heredoc_delimiter_is_quoted, TokenType};
use crate::parser::parser::Parser;
use crate::parser::types::ShellSyntaxError;
use crate::parser::word_parser::{is_valid_name, parse_word};

fn redirection_operator(t: TokenType) -> Option<RedirectionOperator> {
    let op = match t {
        TokenType::Less => RedirectionOperator::Less,
        TokenType::Great => RedirectionOperator::Great,
        TokenType::DGreat => RedirectionOperator::DGreat,
        TokenType::GreatAnd => RedirectionOperator::GreatAnd,
        TokenType::LessAnd => RedirectionOperator::LessAnd,
        TokenType::LessGreat => RedirectionOperator::LessGreat,
        TokenType::Clobber => RedirectionOperator::Clobber,
        TokenType::AndGreat => RedirectionOperator::AndGreat,
        TokenType::AndDGreat => RedirectionOperator::AndDGreat,
        TokenType::TLess => RedirectionOperator::TLess,
        TokenType::DLess => RedirectionOperator::DLess,
        TokenType::DLessDash => RedirectionOperator::DLessDash,
        _ => return None,
    };
    Some(op)
}

impl Parser {
    pub(crate) fn parse_simple_command(&mut self) -> Result<CommandNode, ShellSyntaxError> {
        let mut words = Vec::new();
        let mut redirections = Vec::new();

        loop {
            if self.is_redirection() {
                redirections.push(self.parse_redirection()?);
                continue;
            }
            let t = self.current().token_type;
            // Reserved words only count as arguments once a command word is seen
            let accepted = if words.is_empty() {
                t == TokenType::Word
            } else {
                t.is_word_like()
            };
            if !accepted {
                break;
            }
            words.push(parse_word(&self.advance().value));
        }

        if words.is_empty() && redirections.is_empty() {
            return Err(self.error("command"));
        }

        Ok(CommandNode::Simple(AST::simple_command(words, redirections)))
    }

    /// name() compound-command [redirections]
    pub(crate) fn parse_function_def(&mut self) -> Result<CommandNode, ShellSyntaxError> {
        let name_token = self.advance();
        if !is_valid_name(&name_token.value) {
            return Err(ShellSyntaxError::at_token("function name", &name_token));
        }
        self.expect(TokenType::LParen, "`(`")?;
        self.expect(TokenType::RParen, "`)`")?;
        self.parse_function_body(name_token.value, false)
    }

    /// function name [()] compound-command [redirections]
    pub(crate) fn parse_function_keyword(&mut self) -> Result<CommandNode, ShellSyntaxError> {
        self.expect(TokenType::Function, "`function`")?;

        if !(self.check(&[TokenType::Word]) && is_valid_name(&self.current().value)) {
            return Err(self.error("function name"));
        }
        let name = self.advance().value;

        // `function f ( ... )` has a subshell body and no empty parens
        if self.check(&[TokenType::LParen]) && self.peek(1).token_type == TokenType::RParen {
            self.advance();
            self.advance();
        }
        self.parse_function_body(name, true)
    }

    fn parse_function_body(&mut self, name: String, keyword: bool) -> Result<CommandNode, ShellSyntaxError> {
        self.skip_newlines();
        if !self.check(&[
            TokenType::LBrace,
            TokenType::LParen,
            TokenType::If,
            TokenType::For,
            TokenType::While,
            TokenType::Until,
            TokenType::Case,
        ]) {
            return Err(self.error("function body"));
        }

        let mut body = self.parse_compound_command()?;
        let redirections = std::mem::take(body.redirections_mut());

        Ok(CommandNode::FunctionDef(AST::function_def(name, body, redirections, keyword)))
    }

    pub(crate) fn parse_optional_redirections(&mut self) -> Result<Vec<RedirectionNode>, ShellSyntaxError> {
        let mut redirections = Vec::new();
        while self.is_redirection() {
            redirections.push(self.parse_redirection()?);
        }
        Ok(redirections)
    }

    fn parse_redirection(&mut self) -> Result<RedirectionNode, ShellSyntaxError> {
        let fd = if self.check(&[TokenType::Number]) {
            let token = self.advance();
            match token.value.parse::<u32>() {
                Ok(fd) => Some(fd),
                Err(_) => return Err(ShellSyntaxError::at_token("file descriptor", &token)),
            }
        } else {
            None
        };

        let operator = match redirection_operator(self.current().token_type) {
            Some(op) => op,
            None => return Err(self.error("redirection operator")),
        };
        self.advance();

        if !self.current().token_type.is_word_like() {
            let expected = if operator.is_heredoc() {
                "here-document delimiter"
            } else {
                "redirection target"
            };
            return Err(self.error(expected));
        }
        let target = self.advance().value;

        let target = if operator.is_heredoc() {
            let body = self.heredoc_bodies.pop_front().unwrap_or_default();
            let quoted = heredoc_delimiter_is_quoted(&target);
            RedirectionTarget::HereDoc(AST::here_doc(
                target,
                body,
                operator == RedirectionOperator::DLessDash,
                quoted,
            ))
        } else {
            RedirectionTarget::Word(parse_word(&target))
        };

        Ok(AST::redirection(operator, target, fd))
    }
}

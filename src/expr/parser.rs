// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::{
    error::{ParseError, Reason},
    lexer::{LexerToken, Token},
    Expression, Operand, Relation,
};
use crate::value::Tristate;

impl Expression {
    /// Parses a complete expression from a string.
    #[cfg(test)]
    pub(crate) fn parse(original: &str) -> Result<Self, ParseError> {
        let tokens = super::lexer::Lexer::tokenize(original)?;
        Self::parse_tokens(&tokens, original)
    }

    /// Parses a complete expression from already lexed tokens.
    ///
    /// `original` is the text the tokens' spans refer to and is only used for
    /// error reporting.
    pub(crate) fn parse_tokens(
        tokens: &[LexerToken<'_>],
        original: &str,
    ) -> Result<Self, ParseError> {
        let mut p = Parser { tokens, pos: 0, original };
        if tokens.is_empty() {
            return Err(p.err(0..original.len(), Reason::Empty));
        }
        let expr = p.or()?;
        if let Some(t) = p.peek() {
            let reason = if t.token == Token::CloseParen {
                Reason::UnopenedParens
            } else {
                Reason::Unexpected(&["&&", "||"])
            };
            return Err(p.err(t.span.clone(), reason));
        }
        Ok(expr)
    }
}

struct Parser<'t, 'a> {
    tokens: &'t [LexerToken<'a>],
    pos: usize,
    original: &'t str,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn err(&self, span: std::ops::Range<usize>, reason: Reason) -> ParseError {
        ParseError { original: self.original.to_owned(), span, reason }
    }

    fn peek(&self) -> Option<&'t LexerToken<'a>> {
        self.tokens.get(self.pos)
    }

    fn end_span(&self) -> std::ops::Range<usize> {
        let end = self.tokens.last().map_or(self.original.len(), |t| t.span.end);
        end..end
    }

    fn or(&mut self) -> Result<Expression, ParseError> {
        let mut lhs = self.and()?;
        while self.peek().is_some_and(|t| t.token == Token::Or) {
            self.pos += 1;
            let rhs = self.and()?;
            lhs = Expression::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expression, ParseError> {
        let mut lhs = self.factor()?;
        while self.peek().is_some_and(|t| t.token == Token::And) {
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expression::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expression, ParseError> {
        let Some(t) = self.peek() else {
            return Err(self.err(self.end_span(), Reason::Unexpected(&["<symbol>", "!", "("])));
        };
        match &t.token {
            Token::Not => {
                self.pos += 1;
                Ok(Expression::Not(Box::new(self.factor()?)))
            }
            Token::OpenParen => {
                let open = t.span.clone();
                self.pos += 1;
                let inner = self.or()?;
                match self.peek() {
                    Some(t) if t.token == Token::CloseParen => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some(t) => Err(self.err(t.span.clone(), Reason::Unexpected(&[")", "&&", "||"]))),
                    None => Err(self.err(open.start..self.original.len(), Reason::UnclosedParens)),
                }
            }
            Token::CloseParen => Err(self.err(t.span.clone(), Reason::UnopenedParens)),
            Token::Word(_) | Token::Str(_) => {
                let lhs = self.operand()?;
                let rel = match self.peek().map(|t| &t.token) {
                    Some(Token::Eq) => Relation::Eq,
                    Some(Token::Ne) => Relation::Ne,
                    Some(Token::Lt) => Relation::Lt,
                    Some(Token::Le) => Relation::Le,
                    Some(Token::Gt) => Relation::Gt,
                    Some(Token::Ge) => Relation::Ge,
                    _ => return Ok(Expression::Operand(lhs)),
                };
                self.pos += 1;
                let rhs = self.operand()?;
                Ok(Expression::Compare(rel, lhs, rhs))
            }
            _ => Err(self.err(t.span.clone(), Reason::Unexpected(&["<symbol>", "!", "("]))),
        }
    }

    fn operand(&mut self) -> Result<Operand, ParseError> {
        let Some(t) = self.peek() else {
            return Err(self.err(self.end_span(), Reason::Unexpected(&["<symbol>"])));
        };
        let op = match &t.token {
            Token::Word("y") => Operand::Tristate(Tristate::Y),
            Token::Word("m") => Operand::Tristate(Tristate::M),
            Token::Word("n") => Operand::Tristate(Tristate::N),
            Token::Word(w) => Operand::Symbol((*w).to_owned()),
            Token::Str(s) => Operand::Const(s.clone().into_owned()),
            _ => return Err(self.err(t.span.clone(), Reason::Unexpected(&["<symbol>"]))),
        };
        self.pos += 1;
        Ok(op)
    }
}

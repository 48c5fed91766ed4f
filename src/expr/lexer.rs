// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::{borrow::Cow, ops::Range};

use super::error::{ParseError, Reason};

/// A single token in a schema line or dependency expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// A keyword, symbol name or unquoted constant such as `0x10` or `-1`
    Word(&'a str),
    /// A quoted string, with escapes processed
    Str(Cow<'a, str>),
    /// `!`
    Not,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
}

impl Token<'_> {
    pub(crate) fn as_word(&self) -> Option<&str> {
        match self {
            Self::Word(w) => Some(w),
            _ => None,
        }
    }
}

/// A token and the byte range it was parsed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LexerToken<'a> {
    pub(crate) token: Token<'a>,
    pub(crate) span: Range<usize>,
}

/// Allows iteration through a schema line or expression, yielding a token or
/// a `ParseError`.
pub(crate) struct Lexer<'a> {
    inner: &'a str,
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { inner: text, offset: 0 }
    }

    /// Collects every token, failing on the first lexical error.
    pub(crate) fn tokenize(text: &'a str) -> Result<Vec<LexerToken<'a>>, ParseError> {
        Self::new(text).collect()
    }

    fn err(&self, span: Range<usize>, reason: Reason) -> ParseError {
        ParseError { original: self.inner.to_owned(), span, reason }
    }

    fn quoted(&mut self, start: usize, quote: char) -> Result<LexerToken<'a>, ParseError> {
        let body_start = start + 1;
        let body = &self.inner[body_start..];
        let mut escaped = false;
        let mut needs_unescape = false;
        for (i, c) in body.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if c == '\\' {
                escaped = true;
                needs_unescape = true;
            } else if c == quote {
                let raw = &body[..i];
                self.offset = body_start + i + 1;
                let s = if needs_unescape { Cow::Owned(unescape(raw)) } else { Cow::Borrowed(raw) };
                return Ok(LexerToken { token: Token::Str(s), span: start..self.offset });
            }
        }
        Err(self.err(start..self.inner.len(), Reason::UnclosedQuotes))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | '.' | '-')
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<LexerToken<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.inner[self.offset..];
        let trimmed = rest.trim_start();
        self.offset += rest.len() - trimmed.len();
        let start = self.offset;
        let mut chars = trimmed.chars();
        let c = chars.next()?;
        let next = chars.next();

        let (token, len) = match (c, next) {
            ('"' | '\'', _) => return Some(self.quoted(start, c)),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('!', Some('=')) => (Token::Ne, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('!', _) => (Token::Not, 1),
            ('=', _) => (Token::Eq, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('(', _) => (Token::OpenParen, 1),
            (')', _) => (Token::CloseParen, 1),
            (c, _) if is_word_char(c) => {
                let len = trimmed.find(|c| !is_word_char(c)).unwrap_or(trimmed.len());
                (Token::Word(&trimmed[..len]), len)
            }
            (c, _) => {
                let span = start..start + c.len_utf8();
                self.offset = self.inner.len();
                return Some(Err(self.err(span, Reason::InvalidCharacter)));
            }
        };
        self.offset += len;
        Some(Ok(LexerToken { token, span: start..self.offset }))
    }
}

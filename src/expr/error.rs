// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::{error::Error, fmt, ops::Range};

/// A dependency expression that could not be tokenized or parsed.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ParseError {
    pub(crate) original: String,
    /// Byte range of the offending input.
    pub(crate) span: Range<usize>,
    pub(crate) reason: Reason,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Reason {
    UnclosedParens,
    UnopenedParens,
    UnclosedQuotes,
    InvalidCharacter,
    Empty,
    /// The tokens that would have been accepted.
    Unexpected(&'static [&'static str]),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason == Reason::Empty {
            return f.write_str("empty expression");
        }
        // Columns are 1-based, like the line numbers of schema errors.
        let column = self.original[..self.span.start.min(self.original.len())].chars().count() + 1;
        write!(f, "{} at column {column} of `{}`", self.reason, self.original)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnclosedParens => f.write_str("unclosed `(`"),
            Self::UnopenedParens => f.write_str("unmatched `)`"),
            Self::UnclosedQuotes => f.write_str("unterminated string"),
            Self::InvalidCharacter => f.write_str("invalid character"),
            Self::Empty => f.write_str("empty expression"),
            Self::Unexpected([]) => f.write_str("unexpected token"),
            Self::Unexpected([one]) => write!(f, "expected `{one}`"),
            Self::Unexpected(many) => {
                f.write_str("expected one of ")?;
                for (i, t) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "`{t}`")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for ParseError {}

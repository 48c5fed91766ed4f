// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::{fmt, io, path::PathBuf};

macro_rules! format_err {
    ($($tt:tt)*) => {
        crate::Error::new(format!($($tt)*))
    };
}

macro_rules! bail {
    ($($tt:tt)*) => {
        return Err(format_err!($($tt)*))
    };
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// An error that occurred while loading, resolving or writing a configuration.
#[derive(Debug)]
pub struct Error(ErrorKind);

// Hiding error variants from a library's public error type to prevent
// dependency updates from becoming breaking changes.
// We can add `is_*` methods that indicate the kind of error if needed, but
// don't expose dependencies' types directly in the public API.
#[derive(Debug)]
pub(crate) enum ErrorKind {
    Io(io::Error),
    Int(std::num::ParseIntError),

    Expr(crate::expr::error::ParseError),
    Schema(SchemaError),
    UnknownOption(String),

    Other(String),
    WithContext(String, Option<Box<Error>>),
}

/// Location-tagged error in a schema file.
#[derive(Debug)]
pub(crate) struct SchemaError {
    pub(crate) path: PathBuf,
    pub(crate) line: usize,
    pub(crate) msg: String,
}

impl Error {
    pub(crate) fn new(e: impl Into<ErrorKind>) -> Self {
        Self(e.into())
    }

    pub(crate) fn schema(path: impl Into<PathBuf>, line: usize, msg: impl fmt::Display) -> Self {
        Self(ErrorKind::Schema(SchemaError { path: path.into(), line, msg: msg.to_string() }))
    }

    pub(crate) fn unknown_option(name: &str) -> Self {
        Self(ErrorKind::UnknownOption(name.to_owned()))
    }

    /// Returns `true` if this error was caused by a malformed or missing schema.
    pub fn is_schema(&self) -> bool {
        match &self.0 {
            ErrorKind::Schema(_) | ErrorKind::Expr(_) => true,
            ErrorKind::WithContext(_, Some(e)) => e.is_schema(),
            _ => false,
        }
    }

    /// Returns `true` if this error was caused by a reference to an option
    /// that the schema does not define.
    pub fn is_unknown_option(&self) -> bool {
        match &self.0 {
            ErrorKind::UnknownOption(_) => true,
            ErrorKind::WithContext(_, Some(e)) => e.is_unknown_option(),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ErrorKind::Io(e) => fmt::Display::fmt(e, f),
            ErrorKind::Int(e) => fmt::Display::fmt(e, f),
            ErrorKind::Expr(e) => fmt::Display::fmt(e, f),
            ErrorKind::Schema(e) if e.line == 0 => write!(f, "{}: {}", e.path.display(), e.msg),
            ErrorKind::Schema(e) => write!(f, "{}:{}: {}", e.path.display(), e.line, e.msg),
            ErrorKind::UnknownOption(name) => write!(f, "unknown option `{name}`"),
            ErrorKind::Other(e) | ErrorKind::WithContext(e, ..) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.0 {
            ErrorKind::Io(e) => Some(e),
            ErrorKind::Int(e) => Some(e),
            ErrorKind::Expr(e) => Some(e),
            ErrorKind::Schema(_) | ErrorKind::UnknownOption(_) | ErrorKind::Other(_) => None,
            ErrorKind::WithContext(_, e) => Some(e.as_ref()?),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e.0 {
            ErrorKind::Io(e) => e,
            ErrorKind::Int(e) => Self::new(io::ErrorKind::InvalidData, e),
            ErrorKind::Expr(e) => Self::new(io::ErrorKind::InvalidData, e),
            e @ (ErrorKind::Schema(_) | ErrorKind::UnknownOption(_)) => {
                Self::new(io::ErrorKind::InvalidData, Error(e))
            }
            ErrorKind::Other(e) | ErrorKind::WithContext(e, ..) => Self::new(io::ErrorKind::Other, e),
        }
    }
}

impl From<Error> for ErrorKind {
    fn from(e: Error) -> Self {
        e.0
    }
}
impl From<String> for ErrorKind {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
impl From<&str> for ErrorKind {
    fn from(s: &str) -> Self {
        Self::Other(s.to_owned())
    }
}
impl From<io::Error> for ErrorKind {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
impl From<std::num::ParseIntError> for ErrorKind {
    fn from(e: std::num::ParseIntError) -> Self {
        Self::Int(e)
    }
}
impl From<crate::expr::error::ParseError> for ErrorKind {
    fn from(e: crate::expr::error::ParseError) -> Self {
        Self::Expr(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::new(e)
    }
}

// Inspired by anyhow::Context.
pub(crate) trait Context<T, E> {
    fn with_context<C, F>(self, context: F) -> Result<T, Error>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}
impl<T, E> Context<T, E> for Result<T, E>
where
    E: Into<ErrorKind>,
{
    fn with_context<C, F>(self, context: F) -> Result<T, Error>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        match self {
            Ok(ok) => Ok(ok),
            Err(e) => Err(Error(ErrorKind::WithContext(
                context().to_string(),
                Some(Box::new(Error(e.into()))),
            ))),
        }
    }
}

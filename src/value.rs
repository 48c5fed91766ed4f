// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::{fmt, ops, path::PathBuf, str::FromStr};

use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A three-valued logic value.
///
/// The ordering is `n < m < y`, so `min` is logical AND and `max` is logical OR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(clippy::exhaustive_enums)]
pub enum Tristate {
    /// Disabled.
    #[default]
    #[serde(rename = "n")]
    N,
    /// Built as a loadable module.
    #[serde(rename = "m")]
    M,
    /// Enabled (built in).
    #[serde(rename = "y")]
    Y,
}

impl Tristate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::N => "n",
            Self::M => "m",
            Self::Y => "y",
        }
    }
    pub(crate) fn from_bool(b: bool) -> Self {
        if b {
            Self::Y
        } else {
            Self::N
        }
    }
    pub(crate) fn as_num(self) -> i128 {
        self as i128
    }
}

// `!n == y`, `!m == m`, `!y == n`
impl ops::Not for Tristate {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Self::N => Self::Y,
            Self::M => Self::M,
            Self::Y => Self::N,
        }
    }
}

impl FromStr for Tristate {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "n" => Ok(Self::N),
            "m" => Ok(Self::M),
            "y" => Ok(Self::Y),
            other => bail!("must be y, m or n, but found `{other}`"),
        }
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The declared type of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SymbolType {
    Bool,
    Tristate,
    String,
    Int,
    Hex,
}

impl SymbolType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Tristate => "tristate",
            Self::String => "string",
            Self::Int => "int",
            Self::Hex => "hex",
        }
    }
    /// Returns `true` for `bool` and `tristate`.
    pub fn is_tristate_like(self) -> bool {
        matches!(self, Self::Bool | Self::Tristate)
    }
    pub(crate) fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "bool" | "boolean" => Some(Self::Bool),
            "tristate" => Some(Self::Tristate),
            "string" => Some(Self::String),
            "int" => Some(Self::Int),
            "hex" => Some(Self::Hex),
            _ => None,
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value of a symbol.
///
/// `int` and `hex` values are kept in their textual form so that they are
/// written back exactly as they were given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
#[allow(clippy::exhaustive_enums)]
pub enum Value {
    Tristate(Tristate),
    String(String),
}

impl Value {
    /// Parses `s` as a value of type `ty`.
    ///
    /// `m` assigned to a `bool` is promoted to `y`.
    pub fn parse(ty: SymbolType, s: &str) -> Result<Self> {
        match ty {
            SymbolType::Bool => match s.parse::<Tristate>()? {
                Tristate::M => Ok(Self::Tristate(Tristate::Y)),
                v => Ok(Self::Tristate(v)),
            },
            SymbolType::Tristate => Ok(Self::Tristate(s.parse()?)),
            SymbolType::String => Ok(Self::String(s.to_owned())),
            SymbolType::Int | SymbolType::Hex => {
                if parse_num(s, ty).is_none() {
                    bail!("`{s}` is not a valid {ty} value");
                }
                Ok(Self::String(s.to_owned()))
            }
        }
    }

    /// Returns the tristate value, or `n` for non-tristate values.
    pub fn tristate(&self) -> Tristate {
        match self {
            Self::Tristate(v) => *v,
            Self::String(_) => Tristate::N,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Tristate(v) => v.as_str(),
            Self::String(s) => s,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Tristate> for Value {
    fn from(v: Tristate) -> Self {
        Self::Tristate(v)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// Parses the textual form of a number.
///
/// `ty` of `None` means an untyped constant: hexadecimal when prefixed with
/// `0x`, decimal otherwise.
pub(crate) fn parse_num(s: &str, ty: impl Into<Option<SymbolType>>) -> Option<i128> {
    let s = s.trim();
    let hex = |s: &str| {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        if digits.is_empty() {
            return None;
        }
        i128::from_str_radix(digits, 16).ok()
    };
    match ty.into() {
        Some(SymbolType::Hex) => hex(s),
        Some(SymbolType::Int) => s.parse().ok(),
        _ => {
            if s.starts_with("0x") || s.starts_with("0X") {
                hex(s)
            } else {
                s.parse().ok()
            }
        }
    }
}

/// A value assigned by a user, with where it was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
#[allow(clippy::exhaustive_structs)]
pub struct UserValue {
    /// The assigned value.
    pub val: Value,
    /// The location where `val` was assigned (e.g. the config file it was
    /// loaded from).
    #[serde(skip)]
    pub definition: Option<Definition>,
}

impl UserValue {
    pub fn new(val: impl Into<Value>, definition: impl Into<Option<Definition>>) -> Self {
        Self { val: val.into(), definition: definition.into() }
    }
}

/// Location where a user value is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Definition {
    /// Loaded from a config file, includes the path to the file.
    Path(PathBuf),
    /// Assigned in the interactive editor.
    Editor,
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Editor => f.write_str("interactive editor"),
        }
    }
}

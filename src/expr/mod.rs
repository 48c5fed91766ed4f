// SPDX-License-Identifier: Apache-2.0 OR MIT

// Dependency expressions as they appear after `depends on`, `if`, `default`,
// `select ... if`, `visible if` and friends.
//
// Grammar (lowest to highest precedence):
//
//     expr    := and ( '||' and )*
//     and     := factor ( '&&' factor )*
//     factor  := '!' factor | '(' expr ')' | operand [ relation operand ]

pub(crate) mod error;
pub(crate) mod lexer;
mod parser;


use std::{cmp::Ordering, fmt};

use crate::{
    error::Result,
    value::{parse_num, SymbolType, Tristate},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expression {
    Operand(Operand),
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Compare(Relation, Operand, Operand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Operand {
    /// A reference to a symbol, or an unquoted constant such as `42`.
    Symbol(String),
    /// One of the constant symbols `y`, `m` and `n`.
    Tristate(Tristate),
    /// A quoted constant.
    Const(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relation {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// The value of an operand as seen by an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OperandValue {
    pub(crate) tri: Tristate,
    pub(crate) text: String,
    /// `None` for undefined symbols and quoted constants.
    pub(crate) ty: Option<SymbolType>,
}

impl OperandValue {
    pub(crate) fn constant(text: impl Into<String>) -> Self {
        Self { tri: Tristate::N, text: text.into(), ty: None }
    }

    fn num(&self) -> Option<i128> {
        match self.ty {
            Some(SymbolType::Bool | SymbolType::Tristate) => Some(self.tri.as_num()),
            ty => parse_num(&self.text, ty),
        }
    }
}

/// Provides symbol values while evaluating an expression.
pub(crate) trait Lookup {
    fn symbol(&mut self, name: &str) -> Result<OperandValue>;
}

impl<F: FnMut(&str) -> Result<OperandValue>> Lookup for F {
    fn symbol(&mut self, name: &str) -> Result<OperandValue> {
        self(name)
    }
}

impl Operand {
    pub(crate) fn value(&self, lookup: &mut impl Lookup) -> Result<OperandValue> {
        match self {
            Self::Symbol(name) => lookup.symbol(name),
            Self::Tristate(v) => {
                Ok(OperandValue { tri: *v, text: v.as_str().to_owned(), ty: Some(SymbolType::Tristate) })
            }
            Self::Const(s) => Ok(OperandValue::constant(s.as_str())),
        }
    }
}

impl Expression {
    /// The constant `y`.
    pub(crate) fn y() -> Self {
        Self::Operand(Operand::Tristate(Tristate::Y))
    }

    pub(crate) fn symbol(name: impl Into<String>) -> Self {
        Self::Operand(Operand::Symbol(name.into()))
    }

    /// `a && b`, where a missing operand means `y`.
    pub(crate) fn and(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(Self::And(Box::new(a), Box::new(b))),
        }
    }

    /// `a || b`, where a missing operand means `n`.
    pub(crate) fn or(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(Self::Or(Box::new(a), Box::new(b))),
        }
    }

    /// Evaluates this expression to a tristate value.
    pub(crate) fn eval(&self, lookup: &mut impl Lookup) -> Result<Tristate> {
        Ok(match self {
            Self::Operand(op) => op.value(lookup)?.tri,
            Self::Not(e) => !e.eval(lookup)?,
            Self::And(a, b) => {
                let a = a.eval(lookup)?;
                if a == Tristate::N {
                    return Ok(Tristate::N);
                }
                a.min(b.eval(lookup)?)
            }
            Self::Or(a, b) => {
                let a = a.eval(lookup)?;
                if a == Tristate::Y {
                    return Ok(Tristate::Y);
                }
                a.max(b.eval(lookup)?)
            }
            Self::Compare(rel, a, b) => {
                let a = a.value(lookup)?;
                let b = b.value(lookup)?;
                Tristate::from_bool(rel.holds(compare(&a, &b)))
            }
        })
    }

    /// Evaluates this expression as the value of a `string`, `int` or `hex`
    /// default: a lone operand yields its text, anything else its tristate.
    pub(crate) fn eval_text(&self, lookup: &mut impl Lookup) -> Result<String> {
        match self {
            Self::Operand(op) => Ok(op.value(lookup)?.text),
            _ => Ok(self.eval(lookup)?.as_str().to_owned()),
        }
    }
}

// Two string symbols compare as text. Anything else compares as numbers when
// both sides parse as one.
fn compare(a: &OperandValue, b: &OperandValue) -> Ordering {
    let strings = a.ty == Some(SymbolType::String) && b.ty == Some(SymbolType::String);
    if !strings {
        if let (Some(a), Some(b)) = (a.num(), b.num()) {
            return a.cmp(&b);
        }
    }
    a.text.cmp(&b.text)
}

impl Relation {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
        }
    }
    fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol(name) => f.write_str(name),
            Self::Tristate(v) => f.write_str(v.as_str()),
            Self::Const(s) => write!(f, "{s:?}"),
        }
    }
}

// Used for dependency-loop diagnostics and help text in the editor.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn operand(f: &mut fmt::Formatter<'_>, e: &Expression, parent_is_and: bool) -> fmt::Result {
            match e {
                Expression::Or(..) if parent_is_and => write!(f, "({e})"),
                Expression::And(..) | Expression::Or(..) => write!(f, "{e}"),
                Expression::Operand(_) | Expression::Compare(..) | Expression::Not(_) => {
                    write!(f, "{e}")
                }
            }
        }
        match self {
            Self::Operand(op) => write!(f, "{op}"),
            Self::Not(e) => match **e {
                Self::Operand(_) | Self::Not(_) => write!(f, "!{e}"),
                _ => write!(f, "!({e})"),
            },
            Self::And(a, b) => {
                operand(f, a, true)?;
                f.write_str(" && ")?;
                operand(f, b, true)
            }
            Self::Or(a, b) => {
                operand(f, a, false)?;
                f.write_str(" || ")?;
                operand(f, b, false)
            }
            Self::Compare(rel, a, b) => write!(f, "{a} {} {b}", rel.as_str()),
        }
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Schema (Kconfig) loading.

mod parser;

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    expr::{Expression, Operand},
    value::SymbolType,
    ResolveContext,
};

/// A loaded option schema.
///
/// Symbols are kept in declaration order, which is the order of every
/// generated output.
#[derive(Debug)]
pub struct Schema {
    pub(crate) path: PathBuf,
    pub(crate) mainmenu: Option<String>,
    /// Prefix of symbol names in config files and generated outputs.
    pub(crate) prefix: String,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) choices: Vec<Choice>,
    /// Menu tree. `nodes[0]` is the root.
    pub(crate) nodes: Vec<MenuNode>,
}

/// A named, typed configuration option.
#[derive(Debug)]
pub struct Symbol {
    pub(crate) name: String,
    pub(crate) ty: SymbolType,
    pub(crate) prompts: Vec<Prompt>,
    pub(crate) defaults: Vec<DefaultValue>,
    /// `depends on` and enclosing menu/if/choice dependencies, ORed over all
    /// definitions of the symbol.
    pub(crate) direct_dep: Expression,
    /// ORed `select` conditions of the symbols selecting this one.
    pub(crate) rev_dep: Option<Expression>,
    pub(crate) ranges: Vec<RangeDef>,
    pub(crate) help: Option<String>,
    pub(crate) choice: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct Prompt {
    pub(crate) text: String,
    /// Includes the dependencies of the definition.
    pub(crate) cond: Option<Expression>,
}

#[derive(Debug, Clone)]
pub(crate) struct DefaultValue {
    pub(crate) value: Expression,
    pub(crate) cond: Option<Expression>,
}

#[derive(Debug, Clone)]
pub(crate) struct RangeDef {
    pub(crate) low: Operand,
    pub(crate) high: Operand,
    pub(crate) cond: Option<Expression>,
}

#[derive(Debug)]
pub(crate) struct Choice {
    pub(crate) name: Option<String>,
    pub(crate) prompt: Option<Prompt>,
    pub(crate) defaults: Vec<(usize, Option<Expression>)>,
    pub(crate) members: Vec<usize>,
    pub(crate) optional: bool,
    pub(crate) help: Option<String>,
}

#[derive(Debug)]
pub(crate) struct MenuNode {
    pub(crate) item: NodeItem,
    pub(crate) dep: Option<Expression>,
    /// `visible if` of a menu.
    pub(crate) visible: Option<Expression>,
    pub(crate) children: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeItem {
    Root,
    Symbol(usize),
    Choice(usize),
    Menu(String),
    Comment(String),
}

impl Schema {
    /// Loads the schema rooted at `path`, following `source` statements.
    pub fn load(path: impl AsRef<Path>, cx: &ResolveContext) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::schema(path, 0, format!("failed to read schema: {e}")))?;
        Self::parse(path, &text, cx)
    }

    /// Parses a schema from a string.
    ///
    /// `path` is used for error messages and for resolving `rsource`
    /// statements.
    pub fn parse(path: impl AsRef<Path>, text: &str, cx: &ResolveContext) -> Result<Self> {
        parser::Parser::new(path.as_ref(), cx).parse_root(text)
    }

    /// Path of the root schema file.
    pub fn path(&self) -> &Path {
        &self.path
    }
    /// Title given by `mainmenu`.
    pub fn mainmenu(&self) -> Option<&str> {
        self.mainmenu.as_deref()
    }
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
    /// Symbols in declaration order.
    pub fn symbols(&self) -> impl ExactSizeIterator<Item = &Symbol> + '_ {
        self.symbols.iter()
    }
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }
    pub fn len(&self) -> usize {
        self.symbols.len()
    }
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub(crate) fn id(&self, name: &str) -> Result<usize> {
        self.index.get(name).copied().ok_or_else(|| Error::unknown_option(name))
    }
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn ty(&self) -> SymbolType {
        self.ty
    }
    /// Text of the first prompt, if the symbol has one.
    pub fn prompt(&self) -> Option<&str> {
        self.prompts.first().map(|p| p.text.as_str())
    }
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }
    /// Returns `true` if this symbol is a member of a `choice`.
    pub fn is_choice_member(&self) -> bool {
        self.choice.is_some()
    }
    /// Rendered `depends on` expression, `None` when unconditional.
    pub fn depends_on(&self) -> Option<String> {
        match &self.direct_dep {
            e if *e == Expression::y() => None,
            e => Some(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests;

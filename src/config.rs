// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    error::{Context as _, Result},
    eval::{self, Resolved},
    merge::Merge,
    schema::Schema,
    value::{Definition, Tristate, UserValue, Value},
};

/// The user's choice of member for a `choice` block.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selection {
    pub(crate) member: usize,
    pub(crate) definition: Option<Definition>,
}

/// A schema together with the values assigned to its symbols.
///
/// Values come in layers. [`Self::set_default`] only fills symbols that do
/// not have a value yet, and [`Self::set_value`] overrides whatever is there.
/// Applying defaults files with the former and the project config and
/// interactive edits with the latter gives the precedence
///
/// 1. interactive edit
/// 2. project config
/// 3. defaults files, the first file that assigns a symbol wins
/// 4. schema defaults
///
/// User values are kept as given (including `m`); the schema only applies
/// when resolving, see [`Self::resolve`].
#[derive(Debug)]
pub struct Config {
    pub(crate) schema: Schema,
    pub(crate) user: Vec<Option<UserValue>>,
    pub(crate) selections: Vec<Option<Selection>>,
}

impl Config {
    pub fn new(schema: Schema) -> Self {
        let user = vec![None; schema.symbols.len()];
        let selections = vec![None; schema.choices.len()];
        Self { schema, user, selections }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Assigns `value` to `name` unless it already has a user value.
    ///
    /// Returns `true` if the value was assigned.
    pub fn set_default(&mut self, name: &str, value: UserValue) -> Result<bool> {
        self.assign(name, value, false)
    }

    /// Assigns `value` to `name`, replacing any existing user value.
    pub fn set_value(&mut self, name: &str, value: UserValue) -> Result<()> {
        self.assign(name, value, true).map(drop)
    }

    /// Removes the user value of `name`.
    pub fn unset(&mut self, name: &str) -> Result<()> {
        let id = self.schema.id(name)?;
        self.user[id] = None;
        if let Some(choice) = self.schema.symbols[id].choice {
            if self.selections[choice].as_ref().is_some_and(|s| s.member == id) {
                self.selections[choice] = None;
            }
        }
        Ok(())
    }

    /// Returns the user value of `name`, if any.
    pub fn user_value(&self, name: &str) -> Result<Option<&UserValue>> {
        let id = self.schema.id(name)?;
        Ok(self.user[id].as_ref())
    }

    /// Returns an iterator over all symbols that have a user value, in
    /// declaration order.
    pub fn user_values(&self) -> impl Iterator<Item = (&str, &UserValue)> + '_ {
        self.schema
            .symbols
            .iter()
            .zip(&self.user)
            .filter_map(|(sym, v)| Some((sym.name.as_str(), v.as_ref()?)))
    }

    /// Evaluates every symbol of the schema against the current user values.
    pub fn resolve(&self) -> Result<Resolved<'_>> {
        eval::resolve(self)
    }

    /// Returns the effective value of `name`.
    pub fn resolved_value(&self, name: &str) -> Result<Value> {
        let id = self.schema.id(name)?;
        let resolved = self.resolve()?;
        Ok(resolved.symbols[id].value.clone())
    }

    pub(crate) fn assign(&mut self, name: &str, value: UserValue, force: bool) -> Result<bool> {
        let id = self.schema.id(name)?;
        let sym = &self.schema.symbols[id];
        let val = Value::parse(sym.ty, value.val.as_str())
            .with_context(|| format!("invalid value for `{name}`"))?;
        if let Some(choice) = sym.choice {
            if val.tristate() == Tristate::Y {
                let selection = Selection { member: id, definition: value.definition.clone() };
                self.selections[choice].merge(Some(selection), force);
            }
        }
        let changed = self.user[id].merge(Some(UserValue { val, ..value }), force);
        if changed {
            tracing::trace!("assigned `{name}` (force: {force})");
        }
        Ok(changed)
    }
}

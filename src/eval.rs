// SPDX-License-Identifier: Apache-2.0 OR MIT

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{
    config::Config,
    error::{Error, Result},
    expr::{Expression, Lookup, Operand, OperandValue},
    schema::{Schema, Symbol},
    value::{parse_num, SymbolType, Tristate, UserValue, Value},
};

/// The effective state of a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ResolvedSymbol {
    pub value: Value,
    /// Maximum of the symbol's prompt conditions. `n` for symbols without a
    /// prompt.
    pub visibility: Tristate,
    /// Whether the symbol is written to the generated files. Symbols that are
    /// invisible and got their value from nowhere are left out.
    pub persisted: bool,
}

/// Every symbol of a schema, evaluated.
#[derive(Debug)]
pub struct Resolved<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) symbols: Vec<ResolvedSymbol>,
}

impl<'a> Resolved<'a> {
    pub fn get(&self, name: &str) -> Option<&ResolvedSymbol> {
        self.schema.index.get(name).map(|&id| &self.symbols[id])
    }

    /// Returns the value of `name`.
    pub fn value(&self, name: &str) -> Result<&Value> {
        Ok(&self.symbols[self.schema.id(name)?].value)
    }

    /// Returns an iterator over all symbols in declaration order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&'a Symbol, &ResolvedSymbol)> + '_ {
        self.schema.symbols.iter().zip(&self.symbols)
    }

    /// Returns an iterator over the symbols written to the generated files.
    pub fn persisted(&self) -> impl Iterator<Item = (&'a Symbol, &ResolvedSymbol)> + '_ {
        self.iter().filter(|(_, r)| r.persisted)
    }

    /// Evaluates `expr` against the resolved values. `None` is `y`.
    pub(crate) fn eval(&self, expr: Option<&Expression>) -> Tristate {
        let Some(expr) = expr else { return Tristate::Y };
        let mut lookup = |name: &str| -> Result<OperandValue> {
            Ok(match self.schema.index.get(name) {
                Some(&id) => operand(&self.schema.symbols[id], &self.symbols[id].value),
                None => undefined(name),
            })
        };
        // Lookups never fail once everything is resolved.
        expr.eval(&mut lookup).unwrap_or(Tristate::N)
    }
}

/// Serializes as a map from symbol names to values.
impl Serialize for Resolved<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.symbols.len()))?;
        for (sym, r) in self.iter() {
            map.serialize_entry(&sym.name, &r.value)?;
        }
        map.end()
    }
}

fn operand(sym: &Symbol, value: &Value) -> OperandValue {
    OperandValue { tri: value.tristate(), text: value.as_str().to_owned(), ty: Some(sym.ty) }
}

// Undefined symbols are constants: `n` in a logical context, their name
// everywhere else.
fn undefined(name: &str) -> OperandValue {
    OperandValue::constant(name)
}

pub(crate) fn resolve(config: &Config) -> Result<Resolved<'_>> {
    let mut e = Evaluator {
        config,
        values: vec![Slot::Todo; config.schema.symbols.len()],
        visibility: vec![Slot::Todo; config.schema.symbols.len()],
        choice_visibility: vec![Slot::Todo; config.schema.choices.len()],
        selections: vec![Slot::Todo; config.schema.choices.len()],
        stack: vec![],
    };
    let symbols =
        (0..config.schema.symbols.len()).map(|id| e.value(id)).collect::<Result<Vec<_>>>()?;
    Ok(Resolved { schema: &config.schema, symbols })
}

#[derive(Debug, Clone)]
enum Slot<T> {
    Todo,
    Busy,
    Done(T),
}

struct Evaluator<'a> {
    config: &'a Config,
    values: Vec<Slot<ResolvedSymbol>>,
    visibility: Vec<Slot<Tristate>>,
    choice_visibility: Vec<Slot<Tristate>>,
    selections: Vec<Slot<Option<usize>>>,
    /// Names of the items being evaluated, for dependency loop errors.
    stack: Vec<&'a str>,
}

impl Lookup for Evaluator<'_> {
    fn symbol(&mut self, name: &str) -> Result<OperandValue> {
        let config = self.config;
        match config.schema.index.get(name) {
            Some(&id) => {
                let r = self.value(id)?;
                Ok(operand(&config.schema.symbols[id], &r.value))
            }
            None => Ok(undefined(name)),
        }
    }
}

impl<'a> Evaluator<'a> {
    fn memo<T: Clone>(
        &mut self,
        name: &'a str,
        i: usize,
        slot: fn(&mut Self, usize) -> &mut Slot<T>,
        compute: fn(&mut Self, usize) -> Result<T>,
    ) -> Result<T> {
        let state = slot(self, i);
        if let Slot::Done(v) = state {
            return Ok(v.clone());
        }
        let busy = matches!(state, Slot::Busy);
        *state = Slot::Busy;
        if busy {
            return Err(self.dependency_loop(name));
        }
        self.stack.push(name);
        let v = compute(self, i);
        self.stack.pop();
        let v = v?;
        *slot(self, i) = Slot::Done(v.clone());
        Ok(v)
    }

    fn dependency_loop(&self, name: &str) -> Error {
        let start = self.stack.iter().position(|&n| n == name).unwrap_or(0);
        let mut cycle = self.stack[start..].to_vec();
        cycle.push(name);
        // a symbol's value and visibility are tracked separately
        cycle.dedup();
        Error::schema(
            self.config.schema.path(),
            0,
            format!("dependency loop detected: {}", cycle.join(" -> ")),
        )
    }

    fn cond(&mut self, expr: Option<&Expression>) -> Result<Tristate> {
        match expr {
            Some(expr) => expr.eval(self),
            None => Ok(Tristate::Y),
        }
    }

    fn value(&mut self, id: usize) -> Result<ResolvedSymbol> {
        let config = self.config;
        let name = config.schema.symbols[id].name.as_str();
        self.memo(name, id, |e, i| &mut e.values[i], Self::compute_value)
    }

    fn visibility(&mut self, id: usize) -> Result<Tristate> {
        let config = self.config;
        let name = config.schema.symbols[id].name.as_str();
        self.memo(name, id, |e, i| &mut e.visibility[i], Self::compute_visibility)
    }

    fn choice_visibility(&mut self, c: usize) -> Result<Tristate> {
        let config = self.config;
        let name = config.schema.choices[c].name.as_deref().unwrap_or("<choice>");
        self.memo(name, c, |e, i| &mut e.choice_visibility[i], Self::compute_choice_visibility)
    }

    fn selection(&mut self, c: usize) -> Result<Option<usize>> {
        let config = self.config;
        let name = config.schema.choices[c].name.as_deref().unwrap_or("<choice>");
        self.memo(name, c, |e, i| &mut e.selections[i], Self::compute_selection)
    }

    fn compute_visibility(&mut self, id: usize) -> Result<Tristate> {
        let config = self.config;
        let sym = &config.schema.symbols[id];
        let mut vis = Tristate::N;
        for prompt in &sym.prompts {
            vis = vis.max(self.cond(prompt.cond.as_ref())?);
        }
        if vis == Tristate::M && sym.ty != SymbolType::Tristate {
            vis = Tristate::Y;
        }
        if let Some(c) = sym.choice {
            vis = vis.min(self.choice_visibility(c)?);
        }
        Ok(vis)
    }

    fn compute_choice_visibility(&mut self, c: usize) -> Result<Tristate> {
        let config = self.config;
        let choice = &config.schema.choices[c];
        let vis = match &choice.prompt {
            Some(prompt) => self.cond(prompt.cond.as_ref())?,
            None => Tristate::N,
        };
        // Only bool choices exist.
        Ok(if vis == Tristate::M { Tristate::Y } else { vis })
    }

    fn compute_selection(&mut self, c: usize) -> Result<Option<usize>> {
        let config = self.config;
        let choice = &config.schema.choices[c];
        let user = config.selections[c].as_ref().map(|s| s.member);
        // An optional choice is off until the user picks a member.
        if self.choice_visibility(c)? == Tristate::N || choice.optional && user.is_none() {
            return Ok(None);
        }
        if let Some(member) = user {
            if self.visibility(member)? != Tristate::N {
                return Ok(Some(member));
            }
        }
        for (member, cond) in &choice.defaults {
            if self.cond(cond.as_ref())? != Tristate::N && self.visibility(*member)? != Tristate::N
            {
                return Ok(Some(*member));
            }
        }
        for &member in &choice.members {
            if self.visibility(member)? != Tristate::N {
                return Ok(Some(member));
            }
        }
        Ok(None)
    }

    fn compute_value(&mut self, id: usize) -> Result<ResolvedSymbol> {
        let config = self.config;
        let sym = &config.schema.symbols[id];
        let user = config.user[id].as_ref();
        let visibility = self.visibility(id)?;
        let mut persisted = visibility != Tristate::N;
        let value = match sym.ty {
            SymbolType::Bool | SymbolType::Tristate => {
                let v = match sym.choice {
                    Some(c) => Tristate::from_bool(
                        visibility != Tristate::N && self.selection(c)? == Some(id),
                    ),
                    None => self.tristate(sym, visibility, user, &mut persisted)?,
                };
                Value::Tristate(if v == Tristate::M && sym.ty == SymbolType::Bool {
                    Tristate::Y
                } else {
                    v
                })
            }
            SymbolType::String => Value::String(self.string(sym, visibility, user, &mut persisted)?),
            SymbolType::Int | SymbolType::Hex => {
                Value::String(self.number(sym, visibility, user, &mut persisted)?)
            }
        };
        Ok(ResolvedSymbol { value, visibility, persisted })
    }

    fn tristate(
        &mut self,
        sym: &'a Symbol,
        visibility: Tristate,
        user: Option<&UserValue>,
        persisted: &mut bool,
    ) -> Result<Tristate> {
        let mut v = Tristate::N;
        match user {
            Some(user) if visibility != Tristate::N => v = user.val.tristate().min(visibility),
            _ => {
                for default in &sym.defaults {
                    let cond = self.cond(default.cond.as_ref())?;
                    if cond != Tristate::N {
                        v = default.value.eval(self)?.min(cond);
                        *persisted |= v != Tristate::N;
                        break;
                    }
                }
            }
        }
        if let Some(rev_dep) = &sym.rev_dep {
            let selected = rev_dep.eval(self)?;
            if selected != Tristate::N {
                if sym.direct_dep.eval(self)? < selected {
                    tracing::warn!(
                        "`{}` is selected by `{rev_dep}` but its dependencies (`{}`) are not met",
                        sym.name,
                        sym.direct_dep
                    );
                }
                v = v.max(selected);
                *persisted = true;
            }
        }
        Ok(v)
    }

    fn string(
        &mut self,
        sym: &'a Symbol,
        visibility: Tristate,
        user: Option<&UserValue>,
        persisted: &mut bool,
    ) -> Result<String> {
        if let Some(user) = user.filter(|_| visibility != Tristate::N) {
            return Ok(user.val.as_str().to_owned());
        }
        for default in &sym.defaults {
            if self.cond(default.cond.as_ref())? != Tristate::N {
                *persisted = true;
                return default.value.eval_text(self);
            }
        }
        Ok(String::new())
    }

    fn number(
        &mut self,
        sym: &'a Symbol,
        visibility: Tristate,
        user: Option<&UserValue>,
        persisted: &mut bool,
    ) -> Result<String> {
        let ty = sym.ty;
        let mut range = None;
        for r in &sym.ranges {
            if self.cond(r.cond.as_ref())? != Tristate::N {
                range = Some((self.bound(&r.low, ty)?, self.bound(&r.high, ty)?));
                break;
            }
        }

        if let Some(user) = user.filter(|_| visibility != Tristate::N) {
            let text = user.val.as_str();
            match (parse_num(text, ty), range) {
                (Some(n), Some((low, high))) if !(low..=high).contains(&n) => {
                    tracing::warn!(
                        "value `{text}` of `{}` is outside the range [{}, {}], falling back to defaults",
                        sym.name,
                        format_num(low, ty),
                        format_num(high, ty)
                    );
                }
                // kept exactly as written
                (Some(_), _) => return Ok(text.to_owned()),
                (None, _) => tracing::warn!("ignoring invalid {ty} value `{text}` of `{}`", sym.name),
            }
        }

        let mut text = String::new();
        let mut n = 0;
        let mut has_default = false;
        for default in &sym.defaults {
            if self.cond(default.cond.as_ref())? != Tristate::N {
                has_default = true;
                *persisted = true;
                text = default.value.eval_text(self)?;
                n = parse_num(&text, ty).unwrap_or(0);
                break;
            }
        }
        // Clamping also applies without a default, to the implicit 0.
        if let Some((low, high)) = range {
            let clamped = if n < low {
                Some(low)
            } else if n > high {
                Some(high)
            } else {
                None
            };
            if let Some(clamped) = clamped {
                let clamped = format_num(clamped, ty);
                if has_default {
                    tracing::warn!(
                        "default value `{text}` of `{}` clamped to `{clamped}`",
                        sym.name
                    );
                }
                text = clamped;
            }
        }
        Ok(text)
    }

    fn bound(&mut self, op: &Operand, ty: SymbolType) -> Result<i128> {
        Ok(parse_num(&op.value(self)?.text, ty).unwrap_or(0))
    }
}

fn format_num(n: i128, ty: SymbolType) -> String {
    match ty {
        SymbolType::Hex if n < 0 => format!("-{:#x}", n.unsigned_abs()),
        SymbolType::Hex => format!("{n:#x}"),
        _ => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{value::Definition, ResolveContext};

    fn config(text: &str) -> Config {
        Config::new(Schema::parse("Kconfig", text, &ResolveContext::no_env()).unwrap())
    }

    #[track_caller]
    fn set(config: &mut Config, name: &str, value: &str) {
        config.set_value(name, UserValue::new(value, Definition::Editor)).unwrap();
    }

    #[track_caller]
    fn check(config: &Config, expected: &[(&str, &str, bool)]) {
        let resolved = config.resolve().unwrap();
        for &(name, value, persisted) in expected {
            let r = resolved.get(name).unwrap();
            assert_eq!((name, r.value.as_str(), r.persisted), (name, value, persisted));
        }
    }

    #[test]
    fn bool_and_tristate() {
        let mut config = config(
            r#"
config FOO
    bool "foo"
config BAR
    tristate "bar"
    depends on FOO
    default m
config HIDDEN
    bool
    default y if BAR
config HIDDEN_OFF
    bool
    default BAR = y
config DRIVER
    tristate "driver"
"#,
        );
        check(&config, &[
            ("FOO", "n", true),
            ("BAR", "n", false),
            ("HIDDEN", "n", false),
            ("HIDDEN_OFF", "n", false),
        ]);

        set(&mut config, "FOO", "y");
        check(&config, &[
            ("FOO", "y", true),
            ("BAR", "m", true),
            // `y if m` is limited to `m`, then promoted on a bool
            ("HIDDEN", "y", true),
            ("HIDDEN_OFF", "n", false),
        ]);

        set(&mut config, "BAR", "y");
        set(&mut config, "DRIVER", "m");
        check(&config, &[("BAR", "y", true), ("HIDDEN_OFF", "y", true), ("DRIVER", "m", true)]);

        // user values of invisible symbols are ignored
        set(&mut config, "FOO", "n");
        check(&config, &[("BAR", "n", false), ("HIDDEN", "n", false)]);
        assert_eq!(config.user_value("BAR").unwrap().unwrap().val, Value::from(Tristate::Y));
    }

    #[test]
    fn select() {
        let mut config = config(
            r#"
config LIB
    bool
config DEP
    bool "dep"
config LIB_USER
    bool "user"
    select LIB
    select OPT if DEP
config OPT
    bool "opt"
    depends on DEP
"#,
        );
        check(&config, &[("LIB", "n", false), ("OPT", "n", false)]);
        set(&mut config, "LIB_USER", "y");
        check(&config, &[("LIB", "y", true), ("OPT", "n", false)]);
        set(&mut config, "DEP", "y");
        set(&mut config, "OPT", "n");
        // select wins over the user value
        check(&config, &[("OPT", "y", true)]);
    }

    #[test]
    fn strings() {
        let mut config = config(
            r#"
config BOARD
    string "board"
    default "devkit"
config TARGET
    string
    default BOARD
config UNSET
    string
config FROM_UNDEFINED
    string
    default UNDEFINED_NAME
"#,
        );
        check(&config, &[
            ("BOARD", "devkit", true),
            ("TARGET", "devkit", true),
            ("UNSET", "", false),
            ("FROM_UNDEFINED", "UNDEFINED_NAME", true),
        ]);
        set(&mut config, "BOARD", "custom");
        set(&mut config, "TARGET", "ignored");
        check(&config, &[("BOARD", "custom", true), ("TARGET", "custom", true)]);
    }

    #[test]
    fn numbers() {
        let mut config = config(
            r#"
config COUNT
    int "count"
    range 1 10
    default 20
config ADDR
    hex "addr"
    range 0x100 0x1ff
config OFFSET
    hex "offset"
    default 0x10
config WIDE
    int "wide"
    range 0 MAX
    default 100
config MAX
    int
    default 64
config FREE
    int
"#,
        );
        check(&config, &[
            ("COUNT", "10", true),
            ("ADDR", "0x100", true),
            ("OFFSET", "0x10", true),
            ("WIDE", "64", true),
            ("MAX", "64", true),
            ("FREE", "", false),
        ]);

        set(&mut config, "COUNT", "3");
        set(&mut config, "ADDR", "1A0");
        set(&mut config, "WIDE", "65");
        check(&config, &[("COUNT", "3", true), ("ADDR", "1A0", true), ("WIDE", "64", true)]);

        set(&mut config, "COUNT", "0");
        check(&config, &[("COUNT", "10", true)]);
    }

    #[test]
    fn choices() {
        let mut config = config(
            r#"
config FAST
    bool "fast"

choice
    prompt "optimization"
    default OPT_SPEED if FAST
    default OPT_SIZE

config OPT_DEBUG
    bool "debug"
config OPT_SIZE
    bool "size"
config OPT_SPEED
    bool "speed"
endchoice

choice
    prompt "extra"
    optional
config EXTRA_A
    bool "a"
config EXTRA_B
    bool "b"
endchoice

choice
    prompt "hidden"
    depends on FAST
config HIDDEN_A
    bool "a"
endchoice
"#,
        );
        check(&config, &[
            ("OPT_DEBUG", "n", true),
            ("OPT_SIZE", "y", true),
            ("OPT_SPEED", "n", true),
            ("EXTRA_A", "n", true),
            ("EXTRA_B", "n", true),
            ("HIDDEN_A", "n", false),
        ]);

        set(&mut config, "FAST", "y");
        check(&config, &[("OPT_SIZE", "n", true), ("OPT_SPEED", "y", true), ("HIDDEN_A", "y", true)]);

        set(&mut config, "OPT_DEBUG", "y");
        set(&mut config, "EXTRA_B", "y");
        check(&config, &[
            ("OPT_DEBUG", "y", true),
            ("OPT_SPEED", "n", true),
            ("EXTRA_A", "n", true),
            ("EXTRA_B", "y", true),
        ]);
    }

    #[test]
    fn menus_and_ifs() {
        let mut config = config(
            r#"
config NET
    bool "net"
menu "Network"
    depends on NET
config NET_PORT
    int "port"
    default 80
endmenu
if !NET
config OFFLINE
    bool
    default y
endif
"#,
        );
        check(&config, &[("NET_PORT", "", false), ("OFFLINE", "y", true)]);
        set(&mut config, "NET", "y");
        check(&config, &[("NET_PORT", "80", true), ("OFFLINE", "n", false)]);
    }

    #[test]
    fn dependency_loop() {
        let config = config(
            r#"
config A
    bool "a"
    depends on B
config B
    bool "b"
    depends on A
"#,
        );
        let e = config.resolve().unwrap_err();
        assert!(e.is_schema());
        assert_eq!(e.to_string(), "Kconfig: dependency loop detected: A -> B -> A");
    }

    #[test]
    fn serialize() {
        let mut config = config("config A\n    bool \"a\"\nconfig N\n    int\n    default 4\n");
        set(&mut config, "A", "y");
        let resolved = config.resolve().unwrap();
        assert_eq!(serde_json::to_string(&resolved).unwrap(), r#"{"A":"y","N":"4"}"#);
        assert_eq!(resolved.value("N").unwrap(), &Value::from("4"));
        assert!(resolved.value("X").unwrap_err().is_unknown_option());
        assert_eq!(resolved.persisted().count(), 2);
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT

// Reading and writing config files (`sdkconfig`, `sdkconfig.default`).
//
// A config file has one assignment per line:
//
//     CONFIG_FOO=y
//     CONFIG_NAME="quoted \"string\""
//     # CONFIG_BAR is not set
//
// Other `#` lines and blank lines are ignored.

use std::{fs, path::Path};

use crate::{
    config::Config,
    error::{Context as _, Result},
    eval::{Resolved, ResolvedSymbol},
    schema::{NodeItem, Symbol},
    value::{Definition, SymbolType, Tristate, UserValue, Value},
};

impl Config {
    /// Loads the assignments of a config file.
    ///
    /// If `replace` is `true`, the assignments override existing user values.
    /// Otherwise, only symbols without a user value are assigned.
    ///
    /// `# CONFIG_X is not set` on a `string`, `int` or `hex` symbol removes
    /// its user value when `replace` is `true` and is ignored otherwise.
    ///
    /// Unknown symbols, malformed lines and invalid values are warned about
    /// and skipped.
    pub fn load(&mut self, path: impl AsRef<Path>, replace: bool) -> Result<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config `{}`", path.display()))?;
        let mut assigned = 0;
        for (i, line) in text.lines().enumerate() {
            let Some((name, value)) = self.parse_line(path, i + 1, line.trim_end()) else {
                continue;
            };
            let Some(value) = value else {
                // `is not set` on a string, int or hex symbol
                if replace {
                    self.unset(&name)?;
                }
                continue;
            };
            if self.assign(&name, UserValue::new(value, Definition::Path(path.to_owned())), replace)?
            {
                assigned += 1;
            }
        }
        tracing::debug!("assigned {assigned} values from `{}`", path.display());
        Ok(())
    }

    // A value of `None` clears the symbol.
    fn parse_line(
        &self,
        path: &Path,
        line_no: usize,
        line: &str,
    ) -> Option<(String, Option<String>)> {
        let prefix = self.schema.prefix();
        let warn = |msg: std::fmt::Arguments<'_>| {
            tracing::warn!("{}:{line_no}: {msg}", path.display());
        };
        let (name, raw) = if let Some((name, raw)) =
            line.strip_prefix(prefix).and_then(|l| l.split_once('='))
        {
            (name, Some(raw))
        } else if let Some(name) = line
            .strip_prefix("# ")
            .and_then(|l| l.strip_prefix(prefix))
            .and_then(|l| l.split_once(' '))
            .filter(|(_, rest)| rest.starts_with("is not set"))
            .map(|(name, _)| name)
        {
            (name, None)
        } else {
            if !line.is_empty() && !line.trim_start().starts_with('#') {
                warn(format_args!("ignoring malformed line `{line}`"));
            }
            return None;
        };

        let Some(sym) = self.schema.symbol(name) else {
            warn(format_args!(
                "ignoring assignment of `{}` to undefined symbol `{name}`",
                raw.unwrap_or("n")
            ));
            return None;
        };
        let value = match (sym.ty, raw) {
            (ty, None) if !ty.is_tristate_like() => return Some((name.to_owned(), None)),
            (_, None) => "n".to_owned(),
            // Only the first character counts, like the C tools.
            (ty, Some(raw)) if ty.is_tristate_like() => {
                let valid: &[&str] =
                    if ty == SymbolType::Bool { &["y", "n"] } else { &["y", "m", "n"] };
                match valid.iter().find(|v| raw.starts_with(*v)) {
                    Some(v) => (*v).to_owned(),
                    None => {
                        warn(format_args!("`{raw}` is not a valid value for {ty} symbol `{name}`"));
                        return None;
                    }
                }
            }
            (SymbolType::String, Some(raw)) => match unquote(raw) {
                Some(s) => s,
                None => {
                    warn(format_args!("malformed string literal in assignment to `{name}`"));
                    return None;
                }
            },
            (ty, Some(raw)) => {
                if let Err(e) = Value::parse(ty, raw) {
                    warn(format_args!("{e} for `{name}`"));
                    return None;
                }
                raw.to_owned()
            }
        };
        Some((name.to_owned(), Some(value)))
    }

    /// Writes the resolved configuration to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let resolved = self.resolve()?;
        fs::write(path, self.render(&resolved))
            .with_context(|| format!("failed to write config `{}`", path.display()))
    }

    /// Renders the config file contents: persisted symbols in declaration
    /// order, with visible menus and comments as section headers.
    pub(crate) fn render(&self, resolved: &Resolved<'_>) -> String {
        let mut w = Writer {
            config: self,
            resolved,
            out: String::from("#\n# Automatically generated file; DO NOT EDIT.\n"),
            after_end: false,
            seen: vec![false; self.schema.symbols.len()],
        };
        if let Some(title) = self.schema.mainmenu() {
            w.out.push_str(&format!("# {title}\n"));
        }
        w.out.push_str("#\n");
        w.node(0);
        w.out
    }
}

struct Writer<'a> {
    config: &'a Config,
    resolved: &'a Resolved<'a>,
    out: String,
    /// Whether the last thing written was an `# end of` line.
    after_end: bool,
    /// Symbols with several definitions are written once.
    seen: Vec<bool>,
}

impl Writer<'_> {
    fn node(&mut self, node: usize) {
        let config = self.config;
        let schema = &config.schema;
        for &child in &schema.nodes[node].children {
            let n = &schema.nodes[child];
            let mut section = None;
            match &n.item {
                NodeItem::Symbol(id) => {
                    if !self.seen[*id] {
                        self.seen[*id] = true;
                        let line =
                            config_line(schema.prefix(), &schema.symbols[*id], &self.resolved.symbols[*id]);
                        if let Some(line) = line {
                            if self.after_end {
                                self.out.push('\n');
                                self.after_end = false;
                            }
                            self.out.push_str(&line);
                        }
                    }
                }
                NodeItem::Menu(title) => {
                    if self.resolved.eval(n.dep.as_ref()) != Tristate::N
                        && self.resolved.eval(n.visible.as_ref()) != Tristate::N
                    {
                        self.header(title);
                        section = Some(title);
                    }
                }
                NodeItem::Comment(text) => {
                    if self.resolved.eval(n.dep.as_ref()) != Tristate::N {
                        self.header(text);
                    }
                }
                NodeItem::Choice(_) | NodeItem::Root => {}
            }
            self.node(child);
            if let Some(title) = section {
                self.out.push_str(&format!("# end of {title}\n"));
                self.after_end = true;
            }
        }
    }

    fn header(&mut self, title: &str) {
        self.out.push_str(&format!("\n#\n# {title}\n#\n"));
        self.after_end = false;
    }
}

fn config_line(prefix: &str, sym: &Symbol, r: &ResolvedSymbol) -> Option<String> {
    if !r.persisted {
        return None;
    }
    let name = &sym.name;
    Some(match sym.ty {
        SymbolType::Bool | SymbolType::Tristate if r.value.tristate() == Tristate::N => {
            format!("# {prefix}{name} is not set\n")
        }
        SymbolType::String => format!("{prefix}{name}=\"{}\"\n", escape(r.value.as_str())),
        _ => format!("{prefix}{name}={}\n", r.value),
    })
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// Parses a double-quoted string with backslash escapes. Anything after the
// closing quote is ignored.
fn unquote(s: &str) -> Option<String> {
    let mut chars = s.strip_prefix('"')?.chars();
    let mut out = String::new();
    loop {
        match chars.next()? {
            '"' => return Some(out),
            '\\' => out.push(chars.next()?),
            c => out.push(c),
        }
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT

// Line-oriented configuration editor.

use std::io::{BufRead, Write};

use crate::{
    config::Config,
    error::Result,
    eval::Resolved,
    schema::NodeItem,
    value::{Definition, SymbolType, Tristate, UserValue},
};

const HELP: &str = "\
commands:
  list            show the visible options
  NAME=VALUE      assign VALUE to NAME
  ?NAME           show help for NAME
  unset NAME      remove the value assigned to NAME
  help            show this message
  save, quit      finish editing (end of input does the same)
";

/// Runs the interactive editor until the user finishes or `input` ends.
///
/// Assignments replace existing values, like the project config does.
/// Invalid commands print an error and editing continues.
///
/// Returns the number of commands that changed a value.
pub fn edit(config: &mut Config, mut input: impl BufRead, mut output: impl Write) -> Result<usize> {
    let mut changes = 0;
    list(config, &mut output)?;
    let mut line = String::new();
    loop {
        write!(output, "> ")?;
        output.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }
        let cmd = line.trim();
        match cmd {
            "" => {}
            "save" | "quit" | "q" | "exit" => break,
            "list" | "ls" => list(config, &mut output)?,
            "help" | "h" => output.write_all(HELP.as_bytes())?,
            _ => match command(config, cmd, &mut output) {
                Ok(changed) => changes += usize::from(changed),
                Err(e) => writeln!(output, "error: {e}")?,
            },
        }
    }
    tracing::debug!("interactive editor made {changes} changes");
    Ok(changes)
}

fn command(config: &mut Config, cmd: &str, output: &mut impl Write) -> Result<bool> {
    if let Some(name) = cmd.strip_prefix('?') {
        describe(config, name.trim(), output)?;
        return Ok(false);
    }
    if let Some(name) = cmd.strip_prefix("unset ") {
        config.unset(name.trim())?;
        return Ok(true);
    }
    let Some((name, value)) = cmd.split_once('=') else {
        bail!("unknown command `{cmd}` (type `help` for a list of commands)");
    };
    let name = name.trim();
    let value = value.trim();
    // Strings may be given with or without quotes.
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    config.set_value(name, UserValue::new(value, Definition::Editor))?;

    let resolved = config.resolve()?;
    if let Some(r) = resolved.get(name) {
        if r.visibility == Tristate::N {
            writeln!(output, "note: `{name}` is not visible, the value has no effect for now")?;
        } else if r.value.as_str() != value {
            writeln!(output, "note: `{name}` is {} (limited by its dependencies or range)", r.value)?;
        }
    }
    Ok(true)
}

fn list(config: &Config, output: &mut impl Write) -> Result<()> {
    let resolved = config.resolve()?;
    if let Some(title) = config.schema.mainmenu() {
        writeln!(output, "{title}")?;
    }
    List { config, resolved: &resolved, output }.node(0, 1)
}

struct List<'a, W> {
    config: &'a Config,
    resolved: &'a Resolved<'a>,
    output: &'a mut W,
}

impl<W: Write> List<'_, W> {
    fn node(&mut self, node: usize, depth: usize) -> Result<()> {
        let config = self.config;
        let indent = "  ".repeat(depth);
        for &child in &config.schema.nodes[node].children {
            let n = &config.schema.nodes[child];
            let shown = match &n.item {
                NodeItem::Symbol(id) => {
                    let sym = &config.schema.symbols[*id];
                    let r = &self.resolved.symbols[*id];
                    if r.visibility != Tristate::N {
                        let value = display_value(sym.ty, r.value.as_str());
                        let prompt = sym.prompt().unwrap_or_default();
                        writeln!(self.output, "{indent}{} [{}] = {value}  {prompt}", sym.name, sym.ty)?;
                    }
                    r.visibility != Tristate::N
                }
                NodeItem::Choice(c) => {
                    let choice = &config.schema.choices[*c];
                    let visible = choice.prompt.as_ref().is_some_and(|p| {
                        self.resolved.eval(p.cond.as_ref()) != Tristate::N
                    });
                    if let (true, Some(prompt)) = (visible, &choice.prompt) {
                        writeln!(self.output, "{indent}({})", prompt.text)?;
                    }
                    visible
                }
                NodeItem::Menu(title) => {
                    let visible = self.resolved.eval(n.dep.as_ref()) != Tristate::N
                        && self.resolved.eval(n.visible.as_ref()) != Tristate::N;
                    if visible {
                        writeln!(self.output, "{indent}{title}")?;
                    }
                    visible
                }
                NodeItem::Comment(text) => {
                    if self.resolved.eval(n.dep.as_ref()) != Tristate::N {
                        writeln!(self.output, "{indent}*** {text} ***")?;
                    }
                    false
                }
                NodeItem::Root => false,
            };
            if shown {
                self.node(child, depth + 1)?;
            }
        }
        Ok(())
    }
}

fn display_value(ty: SymbolType, value: &str) -> String {
    match ty {
        SymbolType::String => format!("{value:?}"),
        _ => value.to_owned(),
    }
}

fn describe(config: &Config, name: &str, output: &mut impl Write) -> Result<()> {
    let Some(sym) = config.schema.symbol(name) else {
        bail!("unknown option `{name}`");
    };
    let resolved = config.resolve()?;
    let value = display_value(sym.ty, resolved.value(name)?.as_str());
    writeln!(output, "{} [{}] = {value}", sym.name, sym.ty)?;
    if let Some(prompt) = sym.prompt() {
        writeln!(output, "prompt: {prompt}")?;
    }
    if let Some(deps) = sym.depends_on() {
        writeln!(output, "depends on: {deps}")?;
    }
    if let Some(user) = config.user_value(name)? {
        match &user.definition {
            Some(def) => writeln!(output, "set to {} in {def}", user.val)?,
            None => writeln!(output, "set to {}", user.val)?,
        }
    }
    match sym.help() {
        Some(help) => writeln!(output, "\n{help}")?,
        None => writeln!(output, "\n(no help available)")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{schema::Schema, value::Value, ResolveContext};

    const SCHEMA: &str = r#"
mainmenu "Demo"
config FOO
    bool "Enable foo"
    help
      Turns on foo.
menu "Foo options"
    depends on FOO
config FOO_NAME
    string "name"
    default "x"
endmenu
config LEVEL
    int "level"
    range 0 5
    default 1
"#;

    fn run(config: &mut Config, input: &str) -> (usize, String) {
        let mut out = vec![];
        let changes = edit(config, input.as_bytes(), &mut out).unwrap();
        (changes, String::from_utf8(out).unwrap())
    }

    fn demo() -> Config {
        Config::new(Schema::parse("Kconfig", SCHEMA, &ResolveContext::no_env()).unwrap())
    }

    #[test]
    fn assign_and_list() {
        let mut config = demo();
        let (changes, out) = run(&mut config, "FOO=y\nFOO_NAME=\"quoted name\"\nlist\nsave\nLEVEL=2\n");
        assert_eq!(changes, 2);
        assert_eq!(config.resolved_value("FOO").unwrap(), Value::from(Tristate::Y));
        assert_eq!(config.resolved_value("FOO_NAME").unwrap(), Value::from("quoted name"));
        assert_eq!(config.resolved_value("LEVEL").unwrap(), Value::from("1"));
        assert_eq!(
            config.user_value("FOO").unwrap().unwrap().definition,
            Some(Definition::Editor)
        );
        // the initial listing hides the menu, the second one shows it
        assert!(out.starts_with("Demo\n  FOO [bool] = n  Enable foo\n  LEVEL [int] = 1  level\n> "));
        assert!(out.contains("  Foo options\n    FOO_NAME [string] = \"quoted name\"  name\n"));
    }

    #[test]
    fn errors_continue() {
        let mut config = demo();
        let (changes, out) = run(&mut config, "NOPE=1\nLEVEL=abc\nfrobnicate\nLEVEL=9\n");
        assert_eq!(changes, 1);
        assert!(out.contains("error: unknown option `NOPE`\n"));
        assert!(out.contains("error: invalid value for `LEVEL`\n"));
        assert!(out.contains("error: unknown command `frobnicate`"));
        assert!(out.contains("note: `LEVEL` is 1 (limited by its dependencies or range)\n"));
        // end of input finishes editing
        assert!(out.ends_with("> \n"));
    }

    #[test]
    fn describe_and_unset() {
        let mut config = demo();
        let (_, out) = run(&mut config, "FOO_NAME=z\n?FOO_NAME\n?FOO\nunset FOO_NAME\nquit\n");
        assert!(out.contains("note: `FOO_NAME` is not visible"));
        assert!(out.contains("FOO_NAME [string] = \"\"\nprompt: name\ndepends on: FOO\nset to z in interactive editor\n\n(no help available)\n"));
        assert!(out.contains("FOO [bool] = n\nprompt: Enable foo\n\nTurns on foo.\n"));
        assert_eq!(config.user_value("FOO_NAME").unwrap(), None);
    }
}

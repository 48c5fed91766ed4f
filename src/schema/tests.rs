// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::*;
use crate::{resolve::ResolveOptions, value::SymbolType};

fn parse(text: &str) -> Schema {
    Schema::parse("Kconfig", text, &ResolveContext::no_env()).unwrap()
}

#[track_caller]
fn parse_err(text: &str) -> String {
    Schema::parse("Kconfig", text, &ResolveContext::no_env()).unwrap_err().to_string()
}

#[test]
fn entries() {
    let schema = parse(
        r#"
mainmenu "Demo Configuration"

config FOO
    bool "Enable foo"
    default y
    help
      Foo support.

      Second paragraph.

config BAR
	int "Bar count" if FOO
	range 1 10
	default 3

config NAME
    string
    default "demo"
"#,
    );
    assert_eq!(schema.mainmenu(), Some("Demo Configuration"));
    assert_eq!(schema.len(), 3);
    let names: Vec<_> = schema.symbols().map(Symbol::name).collect();
    assert_eq!(names, ["FOO", "BAR", "NAME"]);

    let foo = schema.symbol("FOO").unwrap();
    assert_eq!(foo.ty(), SymbolType::Bool);
    assert_eq!(foo.prompt(), Some("Enable foo"));
    assert_eq!(foo.help(), Some("Foo support.\n\nSecond paragraph."));
    assert_eq!(foo.depends_on(), None);

    let bar = schema.symbol("BAR").unwrap();
    assert_eq!(bar.ty(), SymbolType::Int);
    assert_eq!(bar.prompts[0].cond, Some(Expression::symbol("FOO")));
    assert_eq!(bar.ranges.len(), 1);
    assert_eq!(bar.defaults.len(), 1);

    let name = schema.symbol("NAME").unwrap();
    assert_eq!(name.prompt(), None);
    assert_eq!(name.defaults[0].value, Expression::Operand(Operand::Const("demo".into())));
    assert!(schema.symbol("BAZ").is_none());
    assert!(schema.id("BAZ").unwrap_err().is_unknown_option());
}

#[test]
fn dependencies() {
    let schema = parse(
        r#"
config A
    bool "A"

menu "Sub"
    depends on A

if B
config C
    tristate "C"
    depends on !D
    default m
endif

endmenu

config B
    def_bool y
    select E if A

config D
    bool

config E
    tristate
"#,
    );
    let c = schema.symbol("C").unwrap();
    assert_eq!(c.depends_on().as_deref(), Some("A && B && !D"));
    assert_eq!(c.defaults[0].cond.as_ref().map(ToString::to_string).as_deref(), Some("A && B && !D"));
    assert_eq!(c.prompts[0].cond.as_ref().map(ToString::to_string).as_deref(), Some("A && B && !D"));

    let e = schema.symbol("E").unwrap();
    assert_eq!(e.rev_dep.as_ref().map(ToString::to_string).as_deref(), Some("B && A"));

    let b = schema.symbol("B").unwrap();
    assert_eq!(b.ty(), SymbolType::Bool);
    assert_eq!(b.defaults[0].value, Expression::y());

    // menu node carries its own dependency, its children the accumulated one.
    let root = &schema.nodes[0];
    let menu = &schema.nodes[root.children[1]];
    assert_eq!(menu.item, NodeItem::Menu("Sub".into()));
    assert_eq!(menu.dep, Some(Expression::symbol("A")));
    assert_eq!(menu.children.len(), 1);
}

#[test]
fn multiple_definitions() {
    let schema = parse(
        r#"
config X
    bool "X"
    depends on A

config X
    bool
    depends on B

config A
    bool
config B
    bool
"#,
    );
    let x = schema.symbol("X").unwrap();
    assert_eq!(x.depends_on().as_deref(), Some("A || B"));
    assert_eq!(x.prompts.len(), 1);
    assert_eq!(schema.nodes[0].children.len(), 4);

    assert_eq!(
        parse_err("config X\n    bool\nconfig X\n    int\n"),
        "Kconfig:4: `X` redefined as `int` (previously `bool`)"
    );
}

#[test]
fn visible_if() {
    let schema = parse(
        r#"
config SHOW
    bool
menu "Hidden"
    visible if SHOW
config IN
    bool "inside"
endmenu
"#,
    );
    let inside = schema.symbol("IN").unwrap();
    assert_eq!(inside.prompts[0].cond, Some(Expression::symbol("SHOW")));
    assert_eq!(inside.depends_on(), None);
}

#[test]
fn choices() {
    let schema = parse(
        r#"
choice LEVEL
    prompt "Log level"
    default LEVEL_INFO if VERBOSE
    default LEVEL_WARN
    help
      Level.

config LEVEL_WARN
    bool "warn"
if VERBOSE
config LEVEL_INFO
    bool "info"
endif
endchoice

config VERBOSE
    bool "verbose"
"#,
    );
    assert_eq!(schema.choices.len(), 1);
    let choice = &schema.choices[0];
    assert_eq!(choice.name.as_deref(), Some("LEVEL"));
    assert_eq!(choice.prompt.as_ref().map(|p| p.text.as_str()), Some("Log level"));
    assert_eq!(choice.help.as_deref(), Some("Level."));
    assert!(!choice.optional);
    let warn = schema.id("LEVEL_WARN").unwrap();
    let info = schema.id("LEVEL_INFO").unwrap();
    assert_eq!(choice.members, [warn, info]);
    assert_eq!(choice.defaults.len(), 2);
    assert_eq!(choice.defaults[0].0, info);
    assert_eq!(choice.defaults[1], (warn, None));
    assert!(schema.symbol("LEVEL_INFO").unwrap().is_choice_member());
    assert!(!schema.symbol("VERBOSE").unwrap().is_choice_member());

    assert_eq!(
        parse_err("choice\n    prompt \"c\"\nconfig A\n    int \"a\"\nendchoice\n"),
        "Kconfig:3: choice member `A` must be `bool`, found `int`"
    );
    assert_eq!(parse_err("choice\n    tristate \"c\"\nendchoice\n"), "Kconfig:2: `tristate` choices are not supported");
}

#[test]
fn continuation_and_comments() {
    let schema = parse(
        "config A # trailing comment\n    bool \"a # not a comment\" \\\n        if B\nconfig B\n    bool\n",
    );
    let a = schema.symbol("A").unwrap();
    assert_eq!(a.prompt(), Some("a # not a comment"));
    assert_eq!(a.prompts[0].cond, Some(Expression::symbol("B")));
}

#[test]
fn env_expansion() {
    let cx = ResolveOptions::default().env([("PLATFORM", "demo")]).into_context();
    let schema =
        Schema::parse("Kconfig", "config NAME\n    string\n    default \"$(PLATFORM)-board\"\n", &cx)
            .unwrap();
    let name = schema.symbol("NAME").unwrap();
    assert_eq!(name.defaults[0].value, Expression::Operand(Operand::Const("demo-board".into())));
}

#[test]
fn errors() {
    assert_eq!(parse_err("config A\n"), "Kconfig:1: `A` is defined without a type");
    assert_eq!(parse_err("menu \"m\"\nconfig A\n    bool\n"), "Kconfig:1: missing `endmenu`");
    assert_eq!(parse_err("endif\n"), "Kconfig:1: unexpected `endif` (expected end of file)");
    assert_eq!(parse_err("if A\nendmenu\n"), "Kconfig:2: unexpected `endmenu` (expected endif)");
    assert_eq!(parse_err("config A\n    bool\n    imply B\n"), "Kconfig:3: `imply` is not supported");
    assert_eq!(parse_err("config A\n    bool\n    frobnicate\n"), "Kconfig:3: unknown statement `frobnicate`");
    assert_eq!(parse_err("range 1 2\n"), "Kconfig:1: `range` is not valid here");
    assert_eq!(
        parse_err("config A\n    string\n    select B\nconfig B\n    bool\n"),
        "Kconfig:3: `select` on non-boolean symbol `A`"
    );
    assert!(parse_err("config A\n    bool\n    depends on (B\n").starts_with("Kconfig:3: invalid expression:"));
    assert!(Schema::parse("Kconfig", "config\n", &ResolveContext::no_env()).unwrap_err().is_schema());

    // unknown select targets only warn
    let schema = parse("config A\n    bool\n    select MISSING\n");
    assert_eq!(schema.len(), 1);
}

#[test]
fn source() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    fs_err::create_dir_all(dir.join("sub/drivers/uart")).unwrap();
    fs_err::create_dir_all(dir.join("sub/drivers/spi")).unwrap();
    fs_err::write(
        dir.join("Kconfig"),
        "config TOP\n    bool\nsource \"sub/Kconfig\"\nosource \"missing/Kconfig\"\n",
    )
    .unwrap();
    fs_err::write(
        dir.join("sub/Kconfig"),
        "menu \"Drivers\"\nrsource \"drivers/*/Kconfig\"\norsource \"nothing/*/Kconfig\"\nendmenu\n",
    )
    .unwrap();
    fs_err::write(dir.join("sub/drivers/uart/Kconfig"), "config UART\n    bool \"uart\"\n").unwrap();
    fs_err::write(dir.join("sub/drivers/spi/Kconfig"), "config SPI\n    bool \"spi\"\n").unwrap();

    let cx = ResolveOptions::default().env([("X", "")]).srctree(dir).into_context();
    let schema = Schema::load(dir.join("Kconfig"), &cx).unwrap();
    let names: Vec<_> = schema.symbols().map(Symbol::name).collect();
    assert_eq!(names, ["TOP", "SPI", "UART"]);

    fs_err::write(dir.join("sub/drivers/spi/Kconfig"), "source \"sub/Kconfig\"\n").unwrap();
    let e = Schema::load(dir.join("Kconfig"), &cx).unwrap_err();
    assert!(e.to_string().ends_with("recursive `source`"), "{e}");

    // the same file reached through `..` at every level
    fs_err::write(dir.join("sub/drivers/spi/Kconfig"), "config SPI\n    bool \"spi\"\n").unwrap();
    fs_err::write(dir.join("sub/drivers/uart/Kconfig"), "rsource \"../uart/Kconfig\"\n").unwrap();
    let e = Schema::load(dir.join("Kconfig"), &cx).unwrap_err();
    assert!(e.is_schema());
    assert!(e.to_string().ends_with("recursive `source`"), "{e}");

    fs_err::write(dir.join("Kconfig"), "source \"missing/Kconfig\"\n").unwrap();
    let e = Schema::load(dir.join("Kconfig"), &cx).unwrap_err();
    assert!(e.to_string().ends_with("could not find `missing/Kconfig`"), "{e}");

    let e = Schema::load(dir.join("nope"), &cx).unwrap_err();
    assert!(e.is_schema());
    assert!(e.to_string().starts_with(&format!("{}: failed to read schema", dir.join("nope").display())));
}

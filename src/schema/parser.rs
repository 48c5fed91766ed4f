// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::{
    collections::HashMap,
    fs, mem,
    path::{Component, Path, PathBuf},
};

use globset::GlobBuilder;
use walkdir::WalkDir;

use super::{
    Choice, DefaultValue, MenuNode, NodeItem, Prompt, RangeDef, Schema, Symbol,
};
use crate::{
    error::{Error, Result},
    expr::{
        lexer::{Lexer, LexerToken, Token},
        Expression, Operand,
    },
    value::{SymbolType, Tristate},
    ResolveContext,
};

// An entry whose attributes are still being read.
enum Pending {
    None,
    Config(PendingConfig),
    Choice { choice: usize, depends: Option<Expression>, prompt: Option<Prompt> },
    Menu { node: usize, depends: Option<Expression>, visible: Option<Expression> },
    Comment { node: usize, depends: Option<Expression> },
}

struct PendingConfig {
    sym: usize,
    node: usize,
    path: PathBuf,
    prompts: Vec<Prompt>,
    defaults: Vec<DefaultValue>,
    depends: Option<Expression>,
    selects: Vec<(String, Option<Expression>, usize)>,
    ranges: Vec<RangeDef>,
    help: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Root,
    Menu,
    If,
    Choice(usize),
}

impl FrameKind {
    fn end_keyword(self) -> &'static str {
        match self {
            Self::Root => "end of file",
            Self::Menu => "endmenu",
            Self::If => "endif",
            Self::Choice(_) => "endchoice",
        }
    }
}

struct Frame {
    kind: FrameKind,
    node: usize,
    dep: Option<Expression>,
    visible: Option<Expression>,
    path: PathBuf,
    line: usize,
}

struct Select {
    selector: usize,
    target: String,
    cond: Option<Expression>,
    path: PathBuf,
    line: usize,
}

pub(super) struct Parser<'cx> {
    cx: &'cx ResolveContext,
    schema: Schema,
    /// Where each symbol was first defined, and whether it got a type.
    locations: Vec<(PathBuf, usize)>,
    typed: Vec<bool>,
    frames: Vec<Frame>,
    pending: Pending,
    selects: Vec<Select>,
    choice_defaults: Vec<(usize, String, Option<Expression>, PathBuf, usize)>,
    include_stack: Vec<PathBuf>,
}

/// Source location of the statement being parsed.
#[derive(Clone, Copy)]
struct Loc<'a> {
    path: &'a Path,
    line: usize,
}

impl Loc<'_> {
    fn err(self, msg: impl std::fmt::Display) -> Error {
        Error::schema(self.path, self.line, msg)
    }
}

impl<'cx> Parser<'cx> {
    pub(super) fn new(path: &Path, cx: &'cx ResolveContext) -> Self {
        let schema = Schema {
            path: path.to_owned(),
            mainmenu: None,
            prefix: cx.prefix().to_owned(),
            symbols: vec![],
            index: HashMap::new(),
            choices: vec![],
            nodes: vec![MenuNode {
                item: NodeItem::Root,
                dep: None,
                visible: None,
                children: vec![],
            }],
        };
        Self {
            cx,
            schema,
            locations: vec![],
            typed: vec![],
            frames: vec![Frame {
                kind: FrameKind::Root,
                node: 0,
                dep: None,
                visible: None,
                path: path.to_owned(),
                line: 0,
            }],
            pending: Pending::None,
            selects: vec![],
            choice_defaults: vec![],
            include_stack: vec![],
        }
    }

    pub(super) fn parse_root(mut self, text: &str) -> Result<Schema> {
        let path = self.schema.path.clone();
        self.parse_file(&path, text)?;
        self.finish_entry()?;
        if let Some(frame) = self.frames.pop().filter(|f| f.kind != FrameKind::Root) {
            return Err(Error::schema(
                &frame.path,
                frame.line,
                format!("missing `{}`", frame.kind.end_keyword()),
            ));
        }
        self.link()?;
        tracing::debug!(
            "loaded {} symbols from `{}`",
            self.schema.symbols.len(),
            self.schema.path.display()
        );
        Ok(self.schema)
    }

    fn parse_file(&mut self, path: &Path, text: &str) -> Result<()> {
        // `a/../a/Kconfig` and `a/Kconfig` are the same file. Schemas parsed
        // from memory have no file to resolve and are compared as given.
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_owned());
        if self.include_stack.contains(&key) {
            return Err(Error::schema(path, 0, "recursive `source`"));
        }
        self.include_stack.push(key);

        let lines: Vec<&str> = text.lines().collect();
        let mut i = 0;
        while i < lines.len() {
            let loc = Loc { path, line: i + 1 };
            let mut line = lines[i].to_owned();
            i += 1;
            while line.ends_with('\\') {
                line.pop();
                match lines.get(i) {
                    Some(next) => {
                        line.push_str(next);
                        i += 1;
                    }
                    None => break,
                }
            }
            let line = strip_comment(&line);
            let line = self.cx.expand(line).map_err(|e| loc.err(e))?;
            let tokens =
                Lexer::tokenize(&line).map_err(|e| loc.err(format!("invalid syntax: {e}")))?;
            let Some(first) = tokens.first() else { continue };
            let Some(keyword) = first.token.as_word() else {
                return Err(loc.err("expected a keyword"));
            };
            if matches!(keyword, "help" | "---help---") {
                let (help, next) = collect_help(&lines, i);
                i = next;
                self.help(loc, help)?;
                continue;
            }
            self.statement(loc, keyword, &tokens[1..], &line)?;
        }

        self.include_stack.pop();
        Ok(())
    }

    fn statement(
        &mut self,
        loc: Loc<'_>,
        keyword: &str,
        args: &[LexerToken<'_>],
        line: &str,
    ) -> Result<()> {
        match keyword {
            "config" | "menuconfig" => {
                self.finish_entry()?;
                let name = single_word(loc, args, keyword)?;
                let sym = self.symbol(name, loc);
                let node = self.add_node(NodeItem::Symbol(sym));
                if let Some(choice) = self.enclosing_choice() {
                    let members = &mut self.schema.choices[choice].members;
                    if !members.contains(&sym) {
                        members.push(sym);
                    }
                    self.schema.symbols[sym].choice = Some(choice);
                }
                self.pending = Pending::Config(PendingConfig {
                    sym,
                    node,
                    path: loc.path.to_owned(),
                    prompts: vec![],
                    defaults: vec![],
                    depends: None,
                    selects: vec![],
                    ranges: vec![],
                    help: None,
                });
            }
            "choice" => {
                self.finish_entry()?;
                let name = match args {
                    [] => None,
                    _ => Some(single_word(loc, args, keyword)?.to_owned()),
                };
                let choice = self.schema.choices.len();
                self.schema.choices.push(Choice {
                    name,
                    prompt: None,
                    defaults: vec![],
                    members: vec![],
                    optional: false,
                    help: None,
                });
                let node = self.add_node(NodeItem::Choice(choice));
                self.push_frame(FrameKind::Choice(choice), node, loc);
                self.pending = Pending::Choice { choice, depends: None, prompt: None };
            }
            "menu" => {
                self.finish_entry()?;
                let title = single_str(loc, args, keyword)?;
                let node = self.add_node(NodeItem::Menu(title));
                self.push_frame(FrameKind::Menu, node, loc);
                self.pending = Pending::Menu { node, depends: None, visible: None };
            }
            "comment" => {
                self.finish_entry()?;
                let text = single_str(loc, args, keyword)?;
                let node = self.add_node(NodeItem::Comment(text));
                self.pending = Pending::Comment { node, depends: None };
            }
            "if" => {
                self.finish_entry()?;
                let cond = parse_expr(loc, args, line)?;
                let parent = self.top();
                let frame = Frame {
                    kind: FrameKind::If,
                    node: parent.node,
                    dep: Expression::and(parent.dep.clone(), Some(cond)),
                    visible: parent.visible.clone(),
                    path: loc.path.to_owned(),
                    line: loc.line,
                };
                self.frames.push(frame);
            }
            "endmenu" | "endif" | "endchoice" => self.end_block(loc, keyword)?,
            "mainmenu" => {
                self.finish_entry()?;
                self.schema.mainmenu = Some(single_str(loc, args, keyword)?);
            }
            "source" | "rsource" | "osource" | "orsource" => {
                self.finish_entry()?;
                let pattern = single_str(loc, args, keyword)?;
                self.source(loc, keyword, &pattern)?;
            }
            _ => self.attribute(loc, keyword, args, line)?,
        }
        Ok(())
    }

    fn attribute(
        &mut self,
        loc: Loc<'_>,
        keyword: &str,
        args: &[LexerToken<'_>],
        line: &str,
    ) -> Result<()> {
        if let Some(ty) = SymbolType::from_keyword(keyword) {
            let prompt = match args {
                [] => None,
                _ => Some(parse_prompt(loc, args, line)?),
            };
            match &mut self.pending {
                Pending::Config(c) => {
                    let sym = c.sym;
                    c.prompts.extend(prompt);
                    self.set_type(loc, sym, ty)?;
                }
                Pending::Choice { prompt: choice_prompt, .. } => {
                    if ty != SymbolType::Bool {
                        return Err(loc.err(format!("`{ty}` choices are not supported")));
                    }
                    if prompt.is_some() {
                        *choice_prompt = prompt;
                    }
                }
                _ => return Err(loc.err(format!("`{keyword}` is not valid here"))),
            }
            return Ok(());
        }

        match (keyword, &mut self.pending) {
            ("prompt", Pending::Config(c)) => c.prompts.push(parse_prompt(loc, args, line)?),
            ("prompt", Pending::Choice { prompt, .. }) => {
                *prompt = Some(parse_prompt(loc, args, line)?);
            }
            ("default", Pending::Config(c)) => c.defaults.push(parse_default(loc, args, line)?),
            ("default", Pending::Choice { choice, .. }) => {
                let (value, cond) = split_cond(args);
                let target = single_word(loc, value, keyword)?.to_owned();
                let cond = cond.map(|c| parse_expr(loc, c, line)).transpose()?;
                self.choice_defaults.push((*choice, target, cond, loc.path.to_owned(), loc.line));
            }
            ("def_bool" | "def_tristate", Pending::Config(c)) => {
                let sym = c.sym;
                c.defaults.push(parse_default(loc, args, line)?);
                let ty = if keyword == "def_bool" { SymbolType::Bool } else { SymbolType::Tristate };
                self.set_type(loc, sym, ty)?;
            }
            ("depends", pending) => {
                let Some(expr) = args.strip_prefix_word("on") else {
                    return Err(loc.err("expected `depends on <expr>`"));
                };
                let expr = parse_expr(loc, expr, line)?;
                match pending {
                    Pending::Config(PendingConfig { depends, .. })
                    | Pending::Choice { depends, .. }
                    | Pending::Menu { depends, .. }
                    | Pending::Comment { depends, .. } => {
                        *depends = Expression::and(depends.take(), Some(expr));
                    }
                    Pending::None => return Err(loc.err("`depends on` is not valid here")),
                }
            }
            ("select", Pending::Config(c)) => {
                let (target, cond) = split_cond(args);
                let target = single_word(loc, target, keyword)?.to_owned();
                let cond = cond.map(|c| parse_expr(loc, c, line)).transpose()?;
                c.selects.push((target, cond, loc.line));
            }
            ("range", Pending::Config(c)) => {
                let (bounds, cond) = split_cond(args);
                let [low, high] = bounds else {
                    return Err(loc.err("expected `range <low> <high> [if <expr>]`"));
                };
                let low = range_bound(loc, low)?;
                let high = range_bound(loc, high)?;
                let cond = cond.map(|c| parse_expr(loc, c, line)).transpose()?;
                c.ranges.push(RangeDef { low, high, cond });
            }
            ("visible", Pending::Menu { visible, .. }) => {
                let Some(expr) = args.strip_prefix_word("if") else {
                    return Err(loc.err("expected `visible if <expr>`"));
                };
                *visible = Expression::and(visible.take(), Some(parse_expr(loc, expr, line)?));
            }
            ("optional", Pending::Choice { choice, .. }) => {
                self.schema.choices[*choice].optional = true;
            }
            ("imply" | "option" | "modules" | "transitional" | "allnoconfig_y" | "env", _) => {
                return Err(loc.err(format!("`{keyword}` is not supported")));
            }
            (
                "prompt" | "default" | "def_bool" | "def_tristate" | "select" | "range" | "visible"
                | "optional",
                _,
            ) => return Err(loc.err(format!("`{keyword}` is not valid here"))),
            _ => return Err(loc.err(format!("unknown statement `{keyword}`"))),
        }
        Ok(())
    }

    fn help(&mut self, loc: Loc<'_>, help: String) -> Result<()> {
        match &mut self.pending {
            Pending::Config(c) => c.help = Some(help),
            Pending::Choice { choice, .. } => self.schema.choices[*choice].help = Some(help),
            _ => return Err(loc.err("`help` is not valid here")),
        }
        Ok(())
    }

    fn top(&self) -> &Frame {
        // The root frame is only popped at the end of parsing.
        &self.frames[self.frames.len() - 1]
    }

    // Entries inside an `if` block still belong to the surrounding choice.
    fn enclosing_choice(&self) -> Option<usize> {
        match self.frames.iter().rev().find(|f| f.kind != FrameKind::If)?.kind {
            FrameKind::Choice(c) => Some(c),
            _ => None,
        }
    }

    fn push_frame(&mut self, kind: FrameKind, node: usize, loc: Loc<'_>) {
        let parent = self.top();
        let frame = Frame {
            kind,
            node,
            dep: parent.dep.clone(),
            visible: parent.visible.clone(),
            path: loc.path.to_owned(),
            line: loc.line,
        };
        self.frames.push(frame);
    }

    fn end_block(&mut self, loc: Loc<'_>, keyword: &str) -> Result<()> {
        self.finish_entry()?;
        let expected = self.top().kind.end_keyword();
        if expected != keyword {
            return Err(loc.err(format!("unexpected `{keyword}` (expected {expected})")));
        }
        self.frames.pop();
        Ok(())
    }

    fn add_node(&mut self, item: NodeItem) -> usize {
        let id = self.schema.nodes.len();
        let parent = self.top().node;
        self.schema.nodes.push(MenuNode { item, dep: None, visible: None, children: vec![] });
        self.schema.nodes[parent].children.push(id);
        id
    }

    fn symbol(&mut self, name: &str, loc: Loc<'_>) -> usize {
        if let Some(&id) = self.schema.index.get(name) {
            return id;
        }
        let id = self.schema.symbols.len();
        self.schema.symbols.push(Symbol {
            name: name.to_owned(),
            // Placeholder until a type statement is seen; checked in `link`.
            ty: SymbolType::Bool,
            prompts: vec![],
            defaults: vec![],
            direct_dep: Expression::Operand(Operand::Tristate(Tristate::N)),
            rev_dep: None,
            ranges: vec![],
            help: None,
            choice: None,
        });
        self.schema.index.insert(name.to_owned(), id);
        self.locations.push((loc.path.to_owned(), loc.line));
        self.typed.push(false);
        id
    }

    fn set_type(&mut self, loc: Loc<'_>, sym: usize, ty: SymbolType) -> Result<()> {
        let symbol = &mut self.schema.symbols[sym];
        if self.typed[sym] && symbol.ty != ty {
            return Err(loc.err(format!(
                "`{}` redefined as `{ty}` (previously `{}`)",
                symbol.name, symbol.ty
            )));
        }
        symbol.ty = ty;
        self.typed[sym] = true;
        Ok(())
    }

    // Propagates the dependencies of the finished entry into its properties.
    fn finish_entry(&mut self) -> Result<()> {
        match mem::replace(&mut self.pending, Pending::None) {
            Pending::None => {}
            Pending::Config(c) => {
                let parent = self.top();
                let dep = Expression::and(parent.dep.clone(), c.depends);
                let visible = parent.visible.clone();
                self.schema.nodes[c.node].dep = dep.clone();

                let symbol = &mut self.schema.symbols[c.sym];
                let this_dep = dep.clone().unwrap_or_else(Expression::y);
                let undeclared = Expression::Operand(Operand::Tristate(Tristate::N));
                symbol.direct_dep = if symbol.direct_dep == undeclared {
                    this_dep
                } else {
                    Expression::Or(Box::new(symbol.direct_dep.clone()), Box::new(this_dep))
                };
                for p in c.prompts {
                    let cond = Expression::and(Expression::and(p.cond, dep.clone()), visible.clone());
                    symbol.prompts.push(Prompt { text: p.text, cond });
                }
                for d in c.defaults {
                    symbol.defaults.push(DefaultValue {
                        value: d.value,
                        cond: Expression::and(d.cond, dep.clone()),
                    });
                }
                for r in c.ranges {
                    symbol.ranges.push(RangeDef { cond: Expression::and(r.cond, dep.clone()), ..r });
                }
                if c.help.is_some() {
                    symbol.help = c.help;
                }
                let name = symbol.name.clone();
                for (target, cond, line) in c.selects {
                    let cond = Expression::and(
                        Some(Expression::symbol(name.as_str())),
                        Expression::and(cond, dep.clone()),
                    );
                    self.selects.push(Select {
                        selector: c.sym,
                        target,
                        cond,
                        path: c.path.clone(),
                        line,
                    });
                }
            }
            Pending::Choice { choice, depends, prompt } => {
                let parent = &self.frames[self.frames.len() - 2];
                let dep = Expression::and(parent.dep.clone(), depends);
                let visible = parent.visible.clone();
                let node = self.top().node;
                self.schema.nodes[node].dep = dep.clone();
                if let Some(p) = prompt {
                    let cond = Expression::and(Expression::and(p.cond, dep.clone()), visible);
                    self.schema.choices[choice].prompt = Some(Prompt { text: p.text, cond });
                }
                let len = self.frames.len();
                self.frames[len - 1].dep = dep;
            }
            Pending::Menu { node, depends, visible } => {
                let parent = &self.frames[self.frames.len() - 2];
                let dep = Expression::and(parent.dep.clone(), depends);
                let frame_visible = Expression::and(parent.visible.clone(), visible.clone());
                self.schema.nodes[node].dep = dep.clone();
                self.schema.nodes[node].visible = visible;
                let len = self.frames.len();
                self.frames[len - 1].dep = dep;
                self.frames[len - 1].visible = frame_visible;
            }
            Pending::Comment { node, depends } => {
                let dep = Expression::and(self.top().dep.clone(), depends);
                self.schema.nodes[node].dep = dep;
            }
        }
        Ok(())
    }

    fn source(&mut self, loc: Loc<'_>, keyword: &str, pattern: &str) -> Result<()> {
        let relative = keyword.starts_with('r') || keyword == "orsource";
        let optional = keyword.starts_with('o');
        let pattern = Path::new(pattern);
        let dir = loc.path.parent().unwrap_or_else(|| Path::new(""));

        let mut candidates = vec![];
        if pattern.is_absolute() {
            candidates.push(pattern.to_owned());
        } else {
            if !relative {
                if let Some(srctree) = self.cx.srctree() {
                    candidates.push(srctree.join(pattern));
                }
            }
            candidates.push(dir.join(pattern));
        }

        let mut files = vec![];
        for candidate in &candidates {
            files = expand_glob(candidate).map_err(|e| loc.err(e))?;
            if !files.is_empty() {
                break;
            }
        }
        if files.is_empty() {
            if optional {
                tracing::debug!("`{keyword}` of `{}` matched no files", pattern.display());
                return Ok(());
            }
            return Err(loc.err(format!("could not find `{}`", pattern.display())));
        }
        for file in files {
            let text = fs::read_to_string(&file)
                .map_err(|e| loc.err(format!("failed to read `{}`: {e}", file.display())))?;
            self.parse_file(&file, &text)?;
            // An entry may not continue across files.
            self.finish_entry()?;
        }
        Ok(())
    }

    // Resolves references that may point forward in the schema.
    fn link(&mut self) -> Result<()> {
        for (i, typed) in self.typed.iter().enumerate() {
            if !typed {
                let (path, line) = &self.locations[i];
                return Err(Error::schema(
                    path,
                    *line,
                    format!("`{}` is defined without a type", self.schema.symbols[i].name),
                ));
            }
        }
        for choice in &self.schema.choices {
            for &m in &choice.members {
                let sym = &self.schema.symbols[m];
                if sym.ty != SymbolType::Bool {
                    let (path, line) = &self.locations[m];
                    return Err(Error::schema(
                        path,
                        *line,
                        format!("choice member `{}` must be `bool`, found `{}`", sym.name, sym.ty),
                    ));
                }
            }
        }
        for select in mem::take(&mut self.selects) {
            let selector = &self.schema.symbols[select.selector];
            if !selector.ty.is_tristate_like() {
                return Err(Error::schema(
                    &select.path,
                    select.line,
                    format!("`select` on non-boolean symbol `{}`", selector.name),
                ));
            }
            let Some(&target) = self.schema.index.get(&select.target) else {
                tracing::warn!(
                    "{}:{}: `{}` selects undefined symbol `{}`",
                    select.path.display(),
                    select.line,
                    selector.name,
                    select.target
                );
                continue;
            };
            let target = &mut self.schema.symbols[target];
            if !target.ty.is_tristate_like() {
                return Err(Error::schema(
                    &select.path,
                    select.line,
                    format!("cannot select non-boolean symbol `{}`", target.name),
                ));
            }
            target.rev_dep = Expression::or(target.rev_dep.take(), select.cond);
        }
        for (choice, target, cond, path, line) in mem::take(&mut self.choice_defaults) {
            match self.schema.index.get(&target) {
                Some(&m) if self.schema.choices[choice].members.contains(&m) => {
                    self.schema.choices[choice].defaults.push((m, cond));
                }
                _ => tracing::warn!(
                    "{}:{line}: choice default `{target}` is not a member of the choice",
                    path.display()
                ),
            }
        }
        Ok(())
    }
}

fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (c, quote) {
            ('\\', Some(_)) => escaped = true,
            ('"' | '\'', None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            ('#', None) => return &line[..i],
            _ => {}
        }
    }
    line
}

fn indentation(line: &str) -> usize {
    let mut col = 0;
    for c in line.chars() {
        match c {
            ' ' => col += 1,
            '\t' => col = (col / 8 + 1) * 8,
            _ => break,
        }
    }
    col
}

// Strips `n` columns of leading whitespace.
fn dedent(line: &str, n: usize) -> &str {
    let mut col = 0;
    for (i, c) in line.char_indices() {
        if col >= n {
            return &line[i..];
        }
        match c {
            ' ' => col += 1,
            '\t' => col = (col / 8 + 1) * 8,
            _ => return &line[i..],
        }
    }
    ""
}

// Help text is every following line indented at least as much as its first
// non-blank line.
fn collect_help(lines: &[&str], start: usize) -> (String, usize) {
    let Some(first) = lines[start..].iter().position(|l| !l.trim().is_empty()) else {
        return (String::new(), lines.len());
    };
    let first = start + first;
    let indent = indentation(lines[first]);
    if indent == 0 {
        return (String::new(), start);
    }
    let mut end = first;
    let mut text = vec![];
    while end < lines.len() {
        let line = lines[end];
        if !line.trim().is_empty() && indentation(line) < indent {
            break;
        }
        text.push(dedent(line, indent).trim_end());
        end += 1;
    }
    while text.last().is_some_and(|l| l.is_empty()) {
        text.pop();
    }
    (text.join("\n"), end)
}

fn has_glob(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

fn expand_glob(pattern: &Path) -> Result<Vec<PathBuf>, String> {
    let text = pattern.to_string_lossy();
    if !has_glob(&text) {
        return Ok(if pattern.is_file() { vec![pattern.to_owned()] } else { vec![] });
    }
    let mut base = PathBuf::new();
    let mut depth = 0;
    for component in pattern.components() {
        let is_glob = matches!(component, Component::Normal(c) if has_glob(&c.to_string_lossy()));
        if depth == 0 && !is_glob {
            base.push(component);
        } else {
            depth += 1;
        }
    }
    if !base.as_os_str().is_empty() && !base.is_dir() {
        return Ok(vec![]);
    }
    let matcher = GlobBuilder::new(&text)
        .literal_separator(true)
        .build()
        .map_err(|e| format!("invalid pattern `{text}`: {e}"))?
        .compile_matcher();
    let cwd = base.as_os_str().is_empty();
    let root = if cwd { PathBuf::from(".") } else { base };
    let mut files = vec![];
    for entry in WalkDir::new(&root).min_depth(depth).max_depth(depth).sort_by_file_name() {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = if cwd { entry.path().strip_prefix(".").unwrap_or(entry.path()) } else { entry.path() };
        if entry.file_type().is_file() && matcher.is_match(path) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn single_word<'a>(loc: Loc<'_>, args: &'a [LexerToken<'_>], keyword: &str) -> Result<&'a str> {
    match args {
        [t] => t.token.as_word().ok_or_else(|| loc.err(format!("expected a name after `{keyword}`"))),
        _ => Err(loc.err(format!("expected a single name after `{keyword}`"))),
    }
}

fn single_str(loc: Loc<'_>, args: &[LexerToken<'_>], keyword: &str) -> Result<String> {
    match args {
        [LexerToken { token: Token::Str(s), .. }] => Ok(s.clone().into_owned()),
        _ => Err(loc.err(format!("expected a quoted string after `{keyword}`"))),
    }
}

trait TokensExt<'a> {
    /// Returns the rest of the tokens if the first one is the word `kw`.
    fn strip_prefix_word(&self, kw: &str) -> Option<&[LexerToken<'a>]>;
}

impl<'a> TokensExt<'a> for [LexerToken<'a>] {
    fn strip_prefix_word(&self, kw: &str) -> Option<&[LexerToken<'a>]> {
        match self.split_first() {
            Some((first, rest)) if first.token.as_word() == Some(kw) => Some(rest),
            _ => None,
        }
    }
}

/// Splits `<value> if <cond>` at the first `if`.
fn split_cond<'t, 'a>(
    args: &'t [LexerToken<'a>],
) -> (&'t [LexerToken<'a>], Option<&'t [LexerToken<'a>]>) {
    match args.iter().position(|t| t.token.as_word() == Some("if")) {
        Some(i) => (&args[..i], Some(&args[i + 1..])),
        None => (args, None),
    }
}

fn parse_expr(loc: Loc<'_>, tokens: &[LexerToken<'_>], line: &str) -> Result<Expression> {
    Expression::parse_tokens(tokens, line).map_err(|e| loc.err(format!("invalid expression: {e}")))
}

fn parse_prompt(loc: Loc<'_>, args: &[LexerToken<'_>], line: &str) -> Result<Prompt> {
    let (text, cond) = split_cond(args);
    let text = single_str(loc, text, "prompt")?;
    let cond = cond.map(|c| parse_expr(loc, c, line)).transpose()?;
    Ok(Prompt { text, cond })
}

fn parse_default(loc: Loc<'_>, args: &[LexerToken<'_>], line: &str) -> Result<DefaultValue> {
    let (value, cond) = split_cond(args);
    let value = parse_expr(loc, value, line)?;
    let cond = cond.map(|c| parse_expr(loc, c, line)).transpose()?;
    Ok(DefaultValue { value, cond })
}

fn range_bound(loc: Loc<'_>, t: &LexerToken<'_>) -> Result<Operand> {
    match &t.token {
        Token::Word(w) => Ok(Operand::Symbol((*w).to_owned())),
        _ => Err(loc.err("range bounds must be numbers or symbols")),
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::{
    borrow::Cow,
    collections::HashMap,
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::error::Result;

/// Environment variable naming the canonical config file.
pub const KCONFIG_CONFIG: &str = "KCONFIG_CONFIG";
/// Environment variable naming the root for `source` statements.
pub const SRCTREE: &str = "srctree";
/// Environment variable overriding the symbol prefix.
pub const CONFIG_PREFIX_VAR: &str = "CONFIG_";

const DEFAULT_PREFIX: &str = "CONFIG_";

/// Options that control how a schema is loaded and resolved.
///
/// Nothing here touches the process environment: variables given with
/// [`Self::var`] and the paths given with [`Self::srctree`] and
/// [`Self::config_path`] are only visible to this resolution.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct ResolveOptions {
    env: Option<HashMap<String, String>>,
    vars: Vec<(String, String)>,
    srctree: Option<PathBuf>,
    config_path: Option<PathBuf>,
    prefix: Option<String>,
}

impl ResolveOptions {
    /// Sets the base environment that `$(VAR)` references in the schema are
    /// expanded from.
    ///
    /// Variables whose name or value is not valid UTF-8 are ignored.
    ///
    /// This is mainly intended for use in tests where it is necessary to adjust
    /// the kinds of environment variables that are referenced.
    ///
    /// # Default value
    ///
    /// [`std::env::vars_os`]
    pub fn env(
        mut self,
        vars: impl IntoIterator<Item = (impl Into<OsString>, impl Into<OsString>)>,
    ) -> Self {
        let mut env = HashMap::default();
        for (k, v) in vars {
            if let (Ok(k), Ok(v)) = (k.into().into_string(), v.into().into_string()) {
                env.insert(k, v);
            }
        }
        self.env = Some(env);
        self
    }
    /// Adds a variable on top of the base environment.
    ///
    /// Later calls win over earlier ones.
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }
    /// Sets the `srctree` directory used to resolve `source` statements.
    ///
    /// # Default value
    ///
    /// The value of the `srctree` environment variable, if any.
    pub fn srctree(mut self, path: impl Into<PathBuf>) -> Self {
        self.srctree = Some(path.into());
        self
    }
    /// Sets the canonical config file path (`KCONFIG_CONFIG`).
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }
    /// Sets the prefix applied to symbol names in every output.
    ///
    /// # Default value
    ///
    /// The value of the `CONFIG_` environment variable if it is set. Otherwise, `CONFIG_`.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn into_context(mut self) -> ResolveContext {
        if self.env.is_none() {
            self = self.env(std::env::vars_os());
        }
        let mut env = self.env.unwrap_or_default();
        for (k, v) in self.vars {
            env.insert(k, v);
        }
        if let Some(srctree) = self.srctree {
            env.insert(SRCTREE.to_owned(), srctree.to_string_lossy().into_owned());
        }
        if let Some(config_path) = self.config_path {
            env.insert(KCONFIG_CONFIG.to_owned(), config_path.to_string_lossy().into_owned());
        }
        let prefix = match self.prefix {
            Some(prefix) => prefix,
            None => env.get(CONFIG_PREFIX_VAR).cloned().unwrap_or_else(|| DEFAULT_PREFIX.to_owned()),
        };
        ResolveContext { env, prefix }
    }
}

/// The environment a schema is evaluated in.
#[derive(Debug, Clone)]
#[must_use]
pub struct ResolveContext {
    env: HashMap<String, String>,
    prefix: String,
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::no_env()
    }
}

impl ResolveContext {
    /// A context with an empty environment and the default prefix.
    pub fn no_env() -> Self {
        ResolveOptions::default().env(Vec::<(OsString, OsString)>::new()).into_context()
    }

    pub fn env(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
    pub fn srctree(&self) -> Option<&Path> {
        self.env(SRCTREE).filter(|s| !s.is_empty()).map(Path::new)
    }
    pub fn config_path(&self) -> Option<&Path> {
        self.env(KCONFIG_CONFIG).filter(|s| !s.is_empty()).map(Path::new)
    }

    /// Expands `$(VAR)` references.
    ///
    /// Undefined variables expand to an empty string. Macro functions such as
    /// `$(shell,...)` are rejected.
    pub(crate) fn expand<'a>(&self, line: &'a str) -> Result<Cow<'a, str>> {
        if !line.contains("$(") {
            return Ok(Cow::Borrowed(line));
        }
        let mut out = String::with_capacity(line.len());
        let mut rest = line;
        while let Some(start) = rest.find("$(") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find(')') else {
                bail!("unterminated `$(` in `{line}`");
            };
            let name = after[..end].trim();
            if name.is_empty() || name.contains(|c: char| c == ',' || c == '$' || c.is_whitespace()) {
                bail!("unsupported macro `$({name})`");
            }
            match self.env(name) {
                Some(v) => out.push_str(v),
                None => tracing::warn!("undefined environment variable `{name}` expands to an empty string"),
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(Cow::Owned(out))
    }
}

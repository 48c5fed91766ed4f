// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::{fs, path::Path};

use crate::{
    error::{Context as _, Result},
    eval::Resolved,
    value::{SymbolType, Tristate},
};

/// First lines of every generated CMake file.
pub const CMAKE_BANNER: &str = "\
# Generated by KConfig!
### DO NOT edit this file!! ###
### Run make config instead ###

";

impl Resolved<'_> {
    /// Renders the persisted symbols as CMake `set()` commands.
    ///
    /// `bool` and `tristate` symbols become `0` or `1` (`m` is `1`); other
    /// values are quoted as they are.
    pub fn cmake(&self) -> String {
        let prefix = self.schema.prefix();
        let mut out = String::from(CMAKE_BANNER);
        for (sym, r) in self.persisted() {
            let name = &sym.name;
            match sym.ty {
                SymbolType::Bool | SymbolType::Tristate => {
                    let v = u8::from(r.value.tristate() != Tristate::N);
                    out.push_str(&format!("set({prefix}{name} {v})\n"));
                }
                _ => out.push_str(&format!("set({prefix}{name} \"{}\")\n", r.value)),
            }
        }
        out
    }

    /// Writes [`Self::cmake`] to `path` unless the file already has exactly
    /// that content, so that an unchanged configuration does not trigger a
    /// rebuild.
    ///
    /// Returns `true` if the file was written.
    pub fn write_cmake(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        let text = self.cmake();
        if fs::read(path).is_ok_and(|old| old == text.as_bytes()) {
            tracing::debug!("`{}` is up to date", path.display());
            return Ok(false);
        }
        fs::write(path, text)
            .with_context(|| format!("failed to write CMake config `{}`", path.display()))?;
        Ok(true)
    }
}

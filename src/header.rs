// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{Context as _, Result},
    eval::Resolved,
    value::{SymbolType, Tristate},
};

/// File name of the generated C header.
pub const HEADER_FILE_NAME: &str = "sdkconfig.h";

impl Resolved<'_> {
    /// Renders the persisted symbols as C preprocessor definitions.
    pub fn header(&self) -> String {
        let prefix = self.schema.prefix();
        let mut out = String::from("/* Automatically generated file; DO NOT EDIT. */\n");
        for (sym, r) in self.persisted() {
            let name = &sym.name;
            let value = r.value.as_str();
            match sym.ty {
                SymbolType::Bool | SymbolType::Tristate => match r.value.tristate() {
                    Tristate::Y => out.push_str(&format!("#define {prefix}{name} 1\n")),
                    Tristate::M => out.push_str(&format!("#define {prefix}{name}_MODULE 1\n")),
                    Tristate::N => {}
                },
                SymbolType::String => out.push_str(&format!("#define {prefix}{name} \"{value}\"\n")),
                SymbolType::Hex if !(value.starts_with("0x") || value.starts_with("0X")) => {
                    out.push_str(&format!("#define {prefix}{name} 0x{value}\n"));
                }
                SymbolType::Int | SymbolType::Hex => {
                    out.push_str(&format!("#define {prefix}{name} {value}\n"));
                }
            }
        }
        out
    }

    /// Writes [`Self::header`] to `sdkconfig.h` in `dir`, creating `dir` if
    /// needed.
    ///
    /// Returns the path of the written file.
    pub fn write_header(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory `{}`", dir.display()))?;
        let path = dir.join(HEADER_FILE_NAME);
        fs::write(&path, self.header())
            .with_context(|| format!("failed to write C header `{}`", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use crate::{value::UserValue, Config, ResolveContext, Schema};

    #[test]
    fn render() {
        let schema = Schema::parse(
            "Kconfig",
            r#"
config ON
    bool "on"
    default y
config OFF
    bool "off"
config MOD
    tristate "mod"
config NAME
    string "name"
    default "demo"
config COUNT
    int "count"
    default -3
config MASK
    hex "mask"
    default ff
config ADDR
    hex "addr"
    default 0X10
"#,
            &ResolveContext::no_env(),
        )
        .unwrap();
        let mut config = Config::new(schema);
        config.set_value("MOD", UserValue::new("m", None)).unwrap();
        assert_eq!(config.resolve().unwrap().header(), "\
/* Automatically generated file; DO NOT EDIT. */
#define CONFIG_ON 1
#define CONFIG_MOD_MODULE 1
#define CONFIG_NAME \"demo\"
#define CONFIG_COUNT -3
#define CONFIG_MASK 0xff
#define CONFIG_ADDR 0X10
");
    }

    #[test]
    fn write() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("build/config");
        let config = Config::new(
            Schema::parse("Kconfig", "config A\n    bool\n    default y\n", &ResolveContext::no_env())
                .unwrap(),
        );
        let path = config.resolve().unwrap().write_header(&dir).unwrap();
        assert_eq!(path, dir.join("sdkconfig.h"));
        assert!(fs_err::read_to_string(&path).unwrap().ends_with("#define CONFIG_A 1\n"));
    }
}

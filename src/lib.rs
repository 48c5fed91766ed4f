// SPDX-License-Identifier: Apache-2.0 OR MIT

/*!
Resolve [Kconfig](https://docs.kernel.org/kbuild/kconfig-language.html)-style
option schemas and generate the build configuration of an SDK project.

The resolution layers, from lowest to highest precedence:

- schema defaults,
- defaults files (`sdkconfig.default`, then any additional ones; the first
  file that assigns a symbol wins),
- the project config (`sdkconfig`),
- edits made in the interactive editor.

The result is written back to `sdkconfig`, and optionally as CMake `set()`
commands (`proj.conf`) and as a C header (`sdkconfig.h`).

## Examples

```no_run
# fn main() -> anyhow::Result<()> {
use sdkconfig::GenerateOptions;

let options = GenerateOptions::default()
    .sdk_path("../sdk")
    .project_dir("app")
    .cmake(true)
    .header_dir("app/build/include");
let report = sdkconfig::generate(&options)?;
println!("{}", report.config.display());
# Ok(()) }
```

The lower-level pieces can be used on their own:

```
# fn main() -> anyhow::Result<()> {
use sdkconfig::{Config, ResolveContext, Schema, UserValue};

let schema = Schema::parse(
    "Kconfig",
    "config FOO\n    bool \"foo\"\nconfig BAR\n    string \"bar\"\n    depends on FOO\n    default \"x\"\n",
    &ResolveContext::no_env(),
)?;
let mut config = Config::new(schema);
config.set_value("FOO", UserValue::new("y", None))?;
let resolved = config.resolve()?;
assert_eq!(resolved.value("BAR")?.as_str(), "x");
print!("{}", resolved.cmake());
# Ok(()) }
```
*/

#![doc(test(
    no_crate_inject,
    attr(
        deny(warnings, rust_2018_idioms, single_use_lifetimes),
        allow(dead_code, unused_variables)
    )
))]
#![forbid(unsafe_code)]
#![warn(
    // Lints that may help when writing public library.
    missing_debug_implementations,
    // missing_docs,
    clippy::alloc_instead_of_core,
    clippy::exhaustive_enums,
    clippy::exhaustive_structs,
    clippy::impl_trait_in_params,
    // clippy::missing_inline_in_public_items,
    // clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
)]
#![allow(clippy::must_use_candidate)]

// Refs:
// - https://docs.kernel.org/kbuild/kconfig-language.html
// - https://github.com/ulfalizer/Kconfiglib

#[macro_use]
mod error;

mod cmake;
mod conf;
mod config;
mod driver;
mod eval;
mod expr;
mod header;
mod menu;
mod merge;
mod resolve;
mod schema;
mod value;

pub use crate::{
    cmake::CMAKE_BANNER,
    config::Config,
    driver::{
        generate, generate_with, GenerateOptions, Report, CMAKE_FILE_NAME, CONFIG_FILE_NAME,
        DEFAULT_CONFIG_FILE_NAME, SCHEMA_PATH,
    },
    error::Error,
    eval::{Resolved, ResolvedSymbol},
    header::HEADER_FILE_NAME,
    menu::edit,
    resolve::{ResolveContext, ResolveOptions, CONFIG_PREFIX_VAR, KCONFIG_CONFIG, SRCTREE},
    schema::{Schema, Symbol},
    value::{Definition, SymbolType, Tristate, UserValue, Value},
};

#[cfg(test)]
mod assert_impl {
    use static_assertions::assert_impl_all as assert_impl;

    use crate::*;

    assert_impl!(Config: Send, Sync, Unpin);
    assert_impl!(Schema: Send, Sync, Unpin);
    assert_impl!(Resolved<'static>: Send, Sync, Unpin);
    assert_impl!(ResolveContext: Send, Sync, Unpin, Clone);
    assert_impl!(ResolveOptions: Send, Sync, Unpin, Clone, Default);
    assert_impl!(GenerateOptions: Send, Sync, Unpin, Clone, Default);
    assert_impl!(Error: Send, Sync, Unpin, std::error::Error);
    assert_impl!(Value: Send, Sync, Clone, PartialEq);
}

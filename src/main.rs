// SPDX-License-Identifier: Apache-2.0 OR MIT

// Command-line front end: resolve the project configuration and write
// sdkconfig, proj.conf and sdkconfig.h.

use std::{ffi::OsString, path::PathBuf};

use anyhow::{bail, Result};
use lexopt::{
    Arg::{Long, Short},
    ValueExt as _,
};
use sdkconfig::GenerateOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static USAGE: &str = "gensdkconfig
Usage: gensdkconfig [OPTIONS]

Options:
      --sdkpath <PATH>        SDK directory containing cmake/SDKconfig [default: ../../]
      --projectdir <PATH>     Project directory [default: .]
      --defaults <FILE>       Additional defaults file, relative to the project directory (may be repeated)
      --env <VAR=VALUE>       Variable for the schema (may be repeated)
      --menuconfig <VALUE>    Run the interactive editor before writing if VALUE is non-empty
      --cmake <VALUE>         Write proj.conf into the project directory if VALUE is non-empty
      --header <DIR>          Write sdkconfig.h into DIR
  -h, --help                  Print help information
  -V, --version               Print version information
";

fn main() {
    init_logging();
    if let Err(e) = try_main() {
        eprintln!("error: {e:#}");
        std::process::exit(1)
    }
}

fn try_main() -> Result<()> {
    let options = Args::parse()?.into_options();
    let report = sdkconfig::generate(&options)?;
    if let Some((path, false)) = &report.cmake {
        tracing::info!("{} is up to date", path.display());
    }
    Ok(())
}

// Log lines go to stdout, like the rest of the output. `RUST_LOG` overrides
// the default `info` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().without_time().with_target(false);
    // Only fails if a subscriber is already set.
    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}

#[derive(Default)]
struct Args {
    sdk_path: Option<PathBuf>,
    project_dir: Option<PathBuf>,
    defaults: Vec<PathBuf>,
    env: Vec<(String, String)>,
    menuconfig: bool,
    cmake: bool,
    header: Option<PathBuf>,
}

impl Args {
    fn parse() -> Result<Self> {
        Self::parse_from(std::env::args_os().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = impl Into<OsString>>) -> Result<Self> {
        let mut parser = lexopt::Parser::from_args(args);
        let mut args = Self::default();
        while let Some(arg) = parser.next()? {
            match arg {
                Long("sdkpath") => args.sdk_path = Some(parser.value()?.into()),
                Long("projectdir") => args.project_dir = Some(parser.value()?.into()),
                Long("defaults") => args.defaults.push(parser.value()?.into()),
                Long("env") => {
                    let pair = parser.value()?.string()?;
                    let Some((k, v)) = pair.split_once('=') else {
                        bail!("--env expects VAR=VALUE, but found `{pair}`");
                    };
                    args.env.push((k.to_owned(), v.to_owned()));
                }
                Long("menuconfig") => args.menuconfig = truthy(&parser.value()?.string()?),
                Long("cmake") => args.cmake = truthy(&parser.value()?.string()?),
                Long("header") => {
                    let dir = parser.value()?.string()?;
                    args.header = truthy(&dir).then(|| dir.into());
                }
                Short('h') | Long("help") => {
                    print!("{USAGE}");
                    std::process::exit(0);
                }
                Short('V') | Long("version") => {
                    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                    std::process::exit(0);
                }
                _ => return Err(arg.unexpected().into()),
            }
        }
        Ok(args)
    }

    fn into_options(self) -> GenerateOptions {
        let mut options = GenerateOptions::default().menuconfig(self.menuconfig).cmake(self.cmake);
        if let Some(path) = self.sdk_path {
            options = options.sdk_path(path);
        }
        if let Some(path) = self.project_dir {
            options = options.project_dir(path);
        }
        for path in self.defaults {
            options = options.defaults(path);
        }
        for (k, v) in self.env {
            options = options.env(k, v);
        }
        if let Some(dir) = self.header {
            options = options.header_dir(dir);
        }
        options
    }
}

// Any non-empty value enables a flag, `0` included.
fn truthy(s: &str) -> bool {
    !s.is_empty()
}

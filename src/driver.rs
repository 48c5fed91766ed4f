// SPDX-License-Identifier: Apache-2.0 OR MIT

// Resolution pipeline: load the schema, layer the defaults files and the
// project config, optionally edit, then write the outputs.

use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use crate::{
    config::Config,
    error::{Context as _, Result},
    menu,
    resolve::ResolveOptions,
    schema::Schema,
};

/// Defaults file that is always tried first.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "sdkconfig.default";
/// Name of the project config in the project directory.
pub const CONFIG_FILE_NAME: &str = "sdkconfig";
/// Name of the generated CMake file in the project directory.
pub const CMAKE_FILE_NAME: &str = "proj.conf";
/// Location of the root schema relative to the SDK directory.
pub const SCHEMA_PATH: &str = "cmake/SDKconfig";

/// Options for [`generate`].
#[derive(Debug, Clone)]
#[must_use]
pub struct GenerateOptions {
    sdk_path: PathBuf,
    project_dir: PathBuf,
    defaults: Vec<PathBuf>,
    env: Vec<(String, String)>,
    resolve: ResolveOptions,
    menuconfig: bool,
    cmake: bool,
    header_dir: Option<PathBuf>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            sdk_path: PathBuf::from("../../"),
            project_dir: PathBuf::from("."),
            defaults: vec![PathBuf::from(DEFAULT_CONFIG_FILE_NAME)],
            env: vec![],
            resolve: ResolveOptions::default(),
            menuconfig: false,
            cmake: false,
            header_dir: None,
        }
    }
}

impl GenerateOptions {
    /// Sets the SDK directory. The schema is `<sdk>/cmake/SDKconfig`.
    ///
    /// # Default value
    ///
    /// `../../`
    pub fn sdk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sdk_path = path.into();
        self
    }
    /// Sets the project directory, which holds the config files and the
    /// generated CMake file.
    ///
    /// # Default value
    ///
    /// `.`
    pub fn project_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_dir = path.into();
        self
    }
    /// Adds a defaults file, relative to the project directory.
    ///
    /// `sdkconfig.default` is always the first defaults file. When several
    /// files assign the same symbol, the first one wins.
    pub fn defaults(mut self, path: impl Into<PathBuf>) -> Self {
        self.defaults.push(path.into());
        self
    }
    /// Adds a variable for `$(VAR)` references in the schema.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
    /// Sets the base options the resolution context is built from.
    ///
    /// This is mainly intended for use in tests where it is necessary to
    /// replace the process environment.
    pub fn resolve_options(mut self, options: ResolveOptions) -> Self {
        self.resolve = options;
        self
    }
    /// Runs the interactive editor before writing the outputs.
    pub fn menuconfig(mut self, enable: bool) -> Self {
        self.menuconfig = enable;
        self
    }
    /// Writes `proj.conf` into the project directory.
    pub fn cmake(mut self, enable: bool) -> Self {
        self.cmake = enable;
        self
    }
    /// Writes `sdkconfig.h` into `dir`.
    pub fn header_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.header_dir = Some(dir.into());
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.project_dir.join(CONFIG_FILE_NAME)
    }
    pub fn schema_path(&self) -> PathBuf {
        self.sdk_path.join(SCHEMA_PATH)
    }
}

/// What [`generate`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Report {
    /// Defaults files that were applied, in order.
    pub defaults_loaded: Vec<PathBuf>,
    /// Defaults files that did not exist or could not be read.
    pub defaults_skipped: Vec<PathBuf>,
    /// Whether an existing project config was applied.
    pub project_config_loaded: bool,
    /// Number of changes made in the interactive editor.
    pub edits: usize,
    /// The project config, which is always written.
    pub config: PathBuf,
    /// The CMake file, if requested, and whether it was written.
    pub cmake: Option<(PathBuf, bool)>,
    /// The C header, if requested.
    pub header: Option<PathBuf>,
}

/// Resolves the project configuration and writes the outputs, using the
/// standard input and output for the interactive editor.
pub fn generate(options: &GenerateOptions) -> Result<Report> {
    let stdin = io::stdin();
    generate_with(options, stdin.lock(), io::stdout())
}

/// Like [`generate`], but the interactive editor uses `input` and `output`.
pub fn generate_with(
    options: &GenerateOptions,
    input: impl BufRead,
    output: impl Write,
) -> Result<Report> {
    let config_path = options.config_path();
    tracing::info!("Project config file path: {}", config_path.display());

    let mut resolve = options.resolve.clone();
    for (k, v) in &options.env {
        resolve = resolve.var(k, v);
    }
    let cx = resolve.srctree(&options.project_dir).config_path(&config_path).into_context();

    let schema_path = options.schema_path();
    let schema = Schema::load(&schema_path, &cx)
        .with_context(|| format!("failed to load schema `{}`", schema_path.display()))?;
    let mut config = Config::new(schema);

    let mut report = Report {
        defaults_loaded: vec![],
        defaults_skipped: vec![],
        project_config_loaded: false,
        edits: 0,
        config: config_path.clone(),
        cmake: None,
        header: None,
    };

    for defaults in &options.defaults {
        let path = options.project_dir.join(defaults);
        tracing::info!("Attempting to load default config: {}", path.display());
        if !path.exists() {
            tracing::warn!("default config file not found: {}", path.display());
            report.defaults_skipped.push(path);
            continue;
        }
        tracing::info!("Load default config: {}", path.display());
        match config.load(&path, false) {
            Ok(()) => report.defaults_loaded.push(path),
            Err(e) => {
                tracing::warn!("{e:#}");
                report.defaults_skipped.push(path);
            }
        }
    }

    if config_path.exists() {
        tracing::info!("Load project config: {}", config_path.display());
        config.load(&config_path, true)?;
        report.project_config_loaded = true;
    } else {
        tracing::debug!("no project config at {}", config_path.display());
    }

    if options.menuconfig {
        report.edits = menu::edit(&mut config, input, output)?;
    }

    let resolved = config.resolve()?;
    tracing::info!("Write project config to: {}", config_path.display());
    write_file(&config_path, &config.render(&resolved))?;

    if options.cmake {
        let path = options.project_dir.join(CMAKE_FILE_NAME);
        tracing::info!("Write CMake config to: {}", path.display());
        let written = resolved.write_cmake(&path)?;
        report.cmake = Some((path, written));
    }
    if let Some(dir) = &options.header_dir {
        tracing::info!("Write C header file at: {}", dir.join(crate::HEADER_FILE_NAME).display());
        report.header = Some(resolved.write_header(dir)?);
    }
    Ok(report)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config `{}`", path.display()))
}

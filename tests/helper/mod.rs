// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::{
    path::{Path, PathBuf},
    process::Command,
    str,
};

use anyhow::{bail, Context as _, Result};
pub(crate) use fs_err as fs;
use sdkconfig::{GenerateOptions, ResolveOptions};

pub(crate) fn fixtures_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures"))
}

/// Copies `tests/fixtures/<model>` into a temporary directory.
pub(crate) fn test_project(model: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let tmpdir = tempfile::tempdir()?;
    let model_path = fixtures_path().join(model);
    for entry in walkdir::WalkDir::new(&model_path).sort_by_file_name() {
        let entry = entry?;
        let to = tmpdir.path().join(entry.path().strip_prefix(&model_path)?);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
    }
    let root = tmpdir.path().to_path_buf();
    Ok((tmpdir, root))
}

/// Options for the `basic` fixture, isolated from the process environment.
pub(crate) fn basic_options(root: &Path) -> GenerateOptions {
    GenerateOptions::default()
        .sdk_path(root.join("sdk"))
        .project_dir(root.join("app"))
        .resolve_options(ResolveOptions::default().env([("BOARD", "demo")]))
}

/// Runs the `gensdkconfig` binary in `dir` and returns its standard output.
pub(crate) fn gensdkconfig(dir: &Path, args: &[&str]) -> Result<String> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gensdkconfig"));
    cmd.args(args).current_dir(dir).env_remove("RUST_LOG");
    let output = cmd.output().with_context(|| format!("could not execute process `{cmd:?}`"))?;
    if !output.status.success() {
        bail!(
            "process didn't exit successfully: `{cmd:?}`:\n\nSTDOUT:\n{0}\n{1}\n{0}\n\nSTDERR:\n{0}\n{2}\n{0}\n",
            "-".repeat(60),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
    Ok(str::from_utf8(&output.stdout)?.to_owned())
}

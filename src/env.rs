use crate::io_adapters::Console;
use anyhow::{Context, Result};
use std::env as stdenv;
use std::ffi::OsString;
use std::path::{Component, MAIN_SEPARATOR_STR, Path, PathBuf};

/// Process-level settings shared by every menu.
///
/// - `current_dir`: the directory relative operator input is resolved against.
/// - `bin_dir`: the directory the pipeline executables are looked up in.
#[derive(Debug, Clone)]
pub struct Environment {
    pub current_dir: PathBuf,
    pub bin_dir: PathBuf,
}

impl Environment {
    /// Capture the current working directory; executables are expected next to it.
    ///
    /// Fails when the working directory cannot be determined, since every
    /// data path is resolved against it.
    pub fn new() -> Result<Self> {
        let current_dir =
            stdenv::current_dir().context("cannot determine the current working directory")?;
        Ok(Self {
            current_dir,
            bin_dir: PathBuf::from("."),
        })
    }

    pub fn with_bin_dir(mut self, bin_dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = bin_dir.into();
        self
    }

    /// Absolute form of the stage directory.
    pub fn resolved_bin_dir(&self) -> PathBuf {
        absolute_path(&self.current_dir, &self.bin_dir)
    }

    /// Resolve operator input to an absolute path and check it is a directory.
    ///
    /// On failure the rejected absolute path is returned so it can be reported.
    pub fn check_directory(&self, input: &str) -> Result<PathBuf, PathBuf> {
        let path = absolute_path(&self.current_dir, Path::new(input));
        if path.is_dir() { Ok(path) } else { Err(path) }
    }
}

/// The operator's working data folder.
///
/// Only ever holds an absolute path that was a directory when it was set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    data_path: PathBuf,
}

impl Session {
    pub(crate) fn new(data_path: PathBuf) -> Self {
        Self { data_path }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub(crate) fn set_data_path(&mut self, data_path: PathBuf) {
        self.data_path = data_path;
    }
}

/// Join `input` onto `base` and fold `.` and `..` without touching the filesystem.
///
/// Trailing separators are dropped and symlinks are left unresolved.
pub fn absolute_path(base: &Path, input: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base.join(input).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// The argument handed to a pipeline executable: the folder plus a trailing separator.
pub fn with_trailing_separator(path: &Path) -> OsString {
    let mut arg = path.as_os_str().to_owned();
    arg.push(MAIN_SEPARATOR_STR);
    arg
}

/// Keep asking for a folder until the operator names an existing directory.
///
/// `preset` is tried before the first prompt. Returns `None` if input ends
/// before a valid directory was given.
pub fn acquire_directory(
    console: &mut Console,
    env: &Environment,
    prompt: &str,
    preset: Option<&str>,
) -> Result<Option<PathBuf>> {
    let mut candidate = preset.map(str::to_string);
    loop {
        let input = match candidate.take() {
            Some(input) => input,
            None => match console.prompt(prompt)? {
                Some(line) => line,
                None => return Ok(None),
            },
        };
        match env.check_directory(&input) {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "directory accepted");
                return Ok(Some(path));
            }
            Err(rejected) => {
                tracing::debug!(path = %rejected.display(), "directory rejected");
                console.say(format_args!(" {} is not a valid folder!", rejected.display()))?;
            }
        }
    }
}

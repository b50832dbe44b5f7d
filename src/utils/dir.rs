use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

const APPLICATION_DIR: &str = "timetrace";

/// Directory holding the ledger and the logs. `override_dir` wins over the platform default,
/// which is `%APPDATA%` on Windows and `$XDG_STATE_HOME` or `$HOME/.local/state` elsewhere.
pub fn application_path(override_dir: Option<PathBuf>) -> Result<PathBuf> {
    let path = match override_dir {
        Some(path) => path,
        None => default_base()?.join(APPLICATION_DIR),
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

#[cfg(windows)]
fn default_base() -> Result<PathBuf> {
    env::var("APPDATA")
        .map(PathBuf::from)
        .map_err(|_| anyhow!("APPDATA should be present on Windows"))
}

#[cfg(not(windows))]
fn default_base() -> Result<PathBuf> {
    env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".local/state")))
        .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))
}

/// Directories searched for repositories when none are configured, relative to the home directory.
pub const DEFAULT_ROOTS: [&str; 6] = ["projects", "code", "dev", "src", "work", "repos"];

/// [DEFAULT_ROOTS] under the home directory. Empty when the home directory is unknown.
pub fn default_roots() -> Vec<PathBuf> {
    let home = if cfg!(windows) {
        env::var("USERPROFILE")
    } else {
        env::var("HOME")
    };
    match home {
        Ok(home) => DEFAULT_ROOTS
            .iter()
            .map(|v| PathBuf::from(&home).join(v))
            .collect(),
        Err(_) => vec![],
    }
}

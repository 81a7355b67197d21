// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory and config file location.

use std::path::{Path, PathBuf};

/// Name of the settings file inside the data directory.
pub const CONFIG_FILE: &str = "qrprint.json";

/// Return the application data directory. Not created here.
pub fn data_dir() -> PathBuf {
    data_dir_from(|key| std::env::var(key).ok())
}

/// Default location of the settings file.
pub fn default_config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

/// Create the parent directory of `path` if it is missing.
pub fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn data_dir_from(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    base_dir(lookup).join("qrprint")
}

fn base_dir(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    // XDG data dir, then the conventional spot under home
    if let Some(xdg) = lookup("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = lookup("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    std::env::temp_dir()
}

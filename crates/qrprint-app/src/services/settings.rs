// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Effective settings: config file, then environment, then command-line flags.

use std::path::{Path, PathBuf};

use tracing::info;

use qrprint_core::AppConfig;
use qrprint_core::error::Result;

use super::data_dir;

/// Values given on the command line that override the file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub printer: Option<String>,
}

impl Overrides {
    /// The config file these overrides point at.
    pub fn config_path(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(data_dir::default_config_path)
    }
}

/// Load and validate the effective configuration.
pub fn load(overrides: &Overrides) -> Result<AppConfig> {
    load_with_env(overrides, |key| std::env::var(key).ok())
}

/// [`load`] with `lookup` standing in for the process environment.
pub fn load_with_env(
    overrides: &Overrides,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig> {
    let mut config = AppConfig::load(&overrides.config_path())?;
    config.apply_env_from(lookup);
    if let Some(printer) = overrides.printer.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        config.printer.printer = Some(printer.to_owned());
    }
    config.validate()?;
    Ok(config)
}

/// Store `printer` as the default printer in the config file at `path`.
///
/// Only the file's own contents are rewritten; environment overrides are not
/// baked in.
pub fn save_default_printer(path: &Path, printer: &str) -> Result<()> {
    let mut config = AppConfig::load(path)?;
    config.printer.printer = Some(printer.trim().to_owned());
    config.validate()?;
    data_dir::ensure_parent(path)?;
    config.save(path)?;
    info!(path = %path.display(), printer = %printer.trim(), "default printer saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrprint_core::QrPrintError;
    use qrprint_core::config::ENV_PRINTER;

    fn overrides(dir: &Path, printer: Option<&str>) -> Overrides {
        Overrides {
            config_path: Some(dir.join("qrprint.json")),
            printer: printer.map(String::from),
        }
    }

    #[test]
    fn flag_beats_environment_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        save_default_printer(&dir.path().join("qrprint.json"), "from-file").unwrap();
        let env = |key: &str| (key == ENV_PRINTER).then(|| "from-env".to_string());

        let config = load_with_env(&overrides(dir.path(), None), |_| None).unwrap();
        assert_eq!(config.printer.printer.as_deref(), Some("from-file"));

        let config = load_with_env(&overrides(dir.path(), None), env).unwrap();
        assert_eq!(config.printer.printer.as_deref(), Some("from-env"));

        let config = load_with_env(&overrides(dir.path(), Some("from-flag")), env).unwrap();
        assert_eq!(config.printer.printer.as_deref(), Some("from-flag"));
    }

    #[test]
    fn saved_printer_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("qrprint.json");
        save_default_printer(&path, "  office  ").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.printer.printer.as_deref(), Some("office"));
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qrprint.json");
        std::fs::write(&path, r#"{ "dispatch_timeout_secs": 0 }"#).unwrap();

        let err = load_with_env(&overrides(dir.path(), None), |_| None).unwrap_err();
        assert!(matches!(err, QrPrintError::Config(_)));
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Loaded once at start-up (JSON file, then environment overrides, then CLI
// flags in the binary) and shared read-only for the lifetime of the process.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{QrPrintError, Result};
use crate::types::{ErrorCorrection, PaperSize};

/// Environment variable naming the printer (URI or queue name).
pub const ENV_PRINTER: &str = "QRPRINT_PRINTER";
/// Legacy variable consulted when [`ENV_PRINTER`] is unset.
pub const ENV_PRINTER_NAME: &str = "PRINTER_NAME";
/// Environment variable overriding the CUPS server URI.
pub const ENV_CUPS_SERVER: &str = "QRPRINT_CUPS_SERVER";

/// Largest accepted `code.module_px`.
pub const MAX_MODULE_PX: u32 = 32;
/// Largest accepted `code.quiet_zone`, in modules.
pub const MAX_QUIET_ZONE: u32 = 16;

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Sheet the label is composed on.
    pub paper_size: PaperSize,
    pub printer: PrinterSettings,
    pub code: CodeOptions,
    pub layout: LayoutOptions,
    /// Deadline for the spooler to accept a submitted job.
    pub dispatch_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::default(),
            printer: PrinterSettings::default(),
            code: CodeOptions::default(),
            layout: LayoutOptions::default(),
            dispatch_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self = serde_json::from_str(&data).map_err(|e| {
            QrPrintError::Config(format!("{}: {e}", path.display()))
        })?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` as the environment.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(printer) = non_empty(ENV_PRINTER).or_else(|| non_empty(ENV_PRINTER_NAME)) {
            debug!(printer = %printer, "printer overridden from environment");
            self.printer.printer = Some(printer.trim().to_owned());
        }
        if let Some(server) = non_empty(ENV_CUPS_SERVER) {
            self.printer.cups_server = server.trim().to_owned();
        }
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.paper_size.dimensions_mm();
        if !(w > 0.0 && h > 0.0) {
            return Err(QrPrintError::Config(format!(
                "paper size must be positive, got {w}x{h} mm"
            )));
        }
        if !(1..=MAX_MODULE_PX).contains(&self.code.module_px) {
            return Err(QrPrintError::Config(format!(
                "code.module_px must be between 1 and {MAX_MODULE_PX}, got {}",
                self.code.module_px
            )));
        }
        if self.code.quiet_zone > MAX_QUIET_ZONE {
            return Err(QrPrintError::Config(format!(
                "code.quiet_zone must be at most {MAX_QUIET_ZONE}, got {}",
                self.code.quiet_zone
            )));
        }
        if !(1..=40).contains(&self.code.max_version) {
            return Err(QrPrintError::Config(format!(
                "code.max_version must be between 1 and 40, got {}",
                self.code.max_version
            )));
        }
        if self.layout.margin_mm < 0.0 || self.layout.code_size_mm <= 0.0 {
            return Err(QrPrintError::Config(
                "layout margin must be non-negative and code size positive".into(),
            ));
        }
        if self.layout.font_size_pt <= 0.0 || self.layout.line_height_pt < self.layout.font_size_pt {
            return Err(QrPrintError::Config(
                "layout line height must be at least the font size".into(),
            ));
        }
        if self.dispatch_timeout_secs == 0 {
            return Err(QrPrintError::Config("dispatch_timeout_secs must be positive".into()));
        }
        if self.printer.probe_timeout_secs == 0 {
            return Err(QrPrintError::Config(
                "printer.probe_timeout_secs must be positive".into(),
            ));
        }
        if self.printer.discovery_timeout_secs == 0 {
            return Err(QrPrintError::Config(
                "printer.discovery_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}

/// How printers are enumerated when none is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMethod {
    /// Ask the CUPS server for its queues (CUPS-Get-Printers).
    #[default]
    Cups,
    /// Browse `_ipp._tcp` / `_ipps._tcp` on the local network.
    Mdns,
}

/// Printer selection settings handed to the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterSettings {
    /// Printer URI, or a CUPS queue name. `None` means auto-discover.
    pub printer: Option<String>,
    /// CUPS server used for queue names and enumeration.
    pub cups_server: String,
    pub discovery: DiscoveryMethod,
    /// Check a configured printer answers before composing the job for it.
    pub probe_configured: bool,
    pub probe_timeout_secs: u64,
    /// Bound on enumeration (CUPS round trip or mDNS browse window).
    pub discovery_timeout_secs: u64,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            printer: None,
            cups_server: "ipp://localhost:631".into(),
            discovery: DiscoveryMethod::Cups,
            probe_configured: false,
            probe_timeout_secs: 5,
            discovery_timeout_secs: 5,
        }
    }
}

impl PrinterSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }
}

/// QR encoder parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeOptions {
    pub error_correction: ErrorCorrection,
    /// Pixels per module edge.
    pub module_px: u32,
    /// Quiet zone in modules. Values below 4 are raised to 4.
    pub quiet_zone: u32,
    /// Largest symbol version allowed (1..=40).
    pub max_version: i16,
}

impl Default for CodeOptions {
    fn default() -> Self {
        Self {
            error_correction: ErrorCorrection::M,
            module_px: 10,
            quiet_zone: 4,
            max_version: 40,
        }
    }
}

/// Page layout parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub margin_mm: f32,
    /// Printed edge length of the code, quiet zone included.
    pub code_size_mm: f32,
    /// Space between the code and the first text line.
    pub text_gap_mm: f32,
    pub font_size_pt: f32,
    pub line_height_pt: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            margin_mm: 10.0,
            code_size_mm: 60.0,
            text_gap_mm: 5.0,
            font_size_pt: 12.0,
            line_height_pt: 14.0,
        }
    }
}

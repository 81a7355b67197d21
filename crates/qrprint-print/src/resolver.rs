// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer resolution: decide which printer a job goes to.
//
// A configured printer wins and is trusted without a liveness check unless
// probing is switched on. Without one, the first printer the spooler lists is
// used.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use qrprint_core::config::PrinterSettings;
use qrprint_core::error::{QrPrintError, Result};
use qrprint_core::types::PrinterTarget;

use crate::ipp_client::parse_printer_uri;
use crate::spooler::PrintSpooler;

/// Slack added on top of the discovery window before enumeration is abandoned.
const LISTING_GRACE: Duration = Duration::from_secs(2);

/// Characters CUPS does not allow in queue names.
const FORBIDDEN_QUEUE_CHARS: &[char] = &['/', '#', '\\', '?', '\'', '"'];

/// Chooses the [`PrinterTarget`] for a request.
pub struct PrinterResolver {
    settings: PrinterSettings,
    spooler: Arc<dyn PrintSpooler>,
}

impl PrinterResolver {
    pub fn new(settings: PrinterSettings, spooler: Arc<dyn PrintSpooler>) -> Self {
        Self { settings, spooler }
    }

    /// Resolve the target printer.
    ///
    /// Fails with `NoPrinterAvailable` when nothing is configured and the
    /// spooler lists nothing, or `PrinterUnreachable` when the configured
    /// value is unusable or (with probing on) does not answer in time.
    #[instrument(skip(self), fields(configured = ?self.settings.printer))]
    pub async fn resolve(&self) -> Result<PrinterTarget> {
        match self.settings.printer.as_deref().map(str::trim) {
            Some(configured) if !configured.is_empty() => self.resolve_configured(configured).await,
            _ => self.resolve_first_listed().await,
        }
    }

    async fn resolve_configured(&self, configured: &str) -> Result<PrinterTarget> {
        let target = configured_target(configured, &self.settings.cups_server)?;
        debug!(uri = %target.uri, "using configured printer");

        if self.settings.probe_configured {
            let timeout = self.settings.probe_timeout();
            match tokio::time::timeout(timeout, self.spooler.probe(&target)).await {
                Ok(Ok(())) => debug!(uri = %target.uri, "configured printer answered probe"),
                Ok(Err(QrPrintError::PrinterUnreachable { uri, reason })) => {
                    warn!(uri = %uri, reason = %reason, "configured printer failed probe");
                    return Err(QrPrintError::PrinterUnreachable { uri, reason });
                }
                Ok(Err(e)) => {
                    warn!(uri = %target.uri, error = %e, "configured printer failed probe");
                    return Err(QrPrintError::PrinterUnreachable {
                        uri: target.uri,
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!(uri = %target.uri, "configured printer probe timed out");
                    return Err(QrPrintError::PrinterUnreachable {
                        uri: target.uri,
                        reason: format!("no answer within {}s", timeout.as_secs_f32()),
                    });
                }
            }
        }

        info!(printer = %target.identifier, uri = %target.uri, "printer resolved from configuration");
        Ok(target)
    }

    async fn resolve_first_listed(&self) -> Result<PrinterTarget> {
        let bound = self.settings.discovery_timeout() + LISTING_GRACE;
        let printers = match tokio::time::timeout(bound, self.spooler.list_printers()).await {
            Ok(Ok(printers)) => printers,
            Ok(Err(QrPrintError::NoPrinterAvailable(reason))) => {
                return Err(QrPrintError::NoPrinterAvailable(reason));
            }
            Ok(Err(e)) => {
                return Err(QrPrintError::NoPrinterAvailable(format!(
                    "printer enumeration failed: {e}"
                )));
            }
            Err(_) => {
                return Err(QrPrintError::NoPrinterAvailable(format!(
                    "printer enumeration did not finish within {}s",
                    bound.as_secs_f32()
                )));
            }
        };

        debug!(count = printers.len(), "printers enumerated");
        let first = printers.into_iter().next().ok_or_else(|| {
            QrPrintError::NoPrinterAvailable("no printer configured and none found".into())
        })?;

        info!(printer = %first.identifier, uri = %first.uri, "printer resolved by enumeration");
        Ok(first)
    }
}

/// Turn a configured printer value into a target.
///
/// Absolute printer URIs are used as-is; bare names are taken as CUPS queue
/// names on `cups_server`.
pub fn configured_target(configured: &str, cups_server: &str) -> Result<PrinterTarget> {
    if configured.contains("://") {
        let uri = parse_printer_uri(configured)?;
        let identifier = uri
            .path()
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .or_else(|| uri.host())
            .unwrap_or(configured)
            .to_owned();
        return Ok(PrinterTarget {
            identifier,
            uri: configured.to_owned(),
        });
    }

    let valid_queue = !configured.is_empty()
        && configured.len() <= 127
        && !configured
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_QUEUE_CHARS.contains(&c));
    if !valid_queue {
        return Err(QrPrintError::PrinterUnreachable {
            uri: configured.to_owned(),
            reason: "neither a printer URI nor a CUPS queue name".into(),
        });
    }

    let uri = format!("{}/printers/{configured}", cups_server.trim_end_matches('/'));
    parse_printer_uri(&uri)?;
    Ok(PrinterTarget {
        identifier: configured.to_owned(),
        uri,
    })
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The print spooler seam.
//
// Everything the pipeline needs from the host print system goes through the
// `PrintSpooler` trait: list printers, check one answers, submit a job. The
// IPP adapter below is the production implementation; tests substitute their
// own.

use async_trait::async_trait;
use tracing::debug;

use qrprint_core::config::{DiscoveryMethod, PrinterSettings};
use qrprint_core::error::{DispatchCause, QrPrintError, Result};
use qrprint_core::types::{JobReceipt, PrintJob, PrinterTarget};

use crate::discovery;
use crate::ipp_client::IppClient;

/// Capability to enumerate printers and submit jobs to them.
#[async_trait]
pub trait PrintSpooler: Send + Sync {
    /// Printers the spooler knows about, in its own listing order.
    async fn list_printers(&self) -> Result<Vec<PrinterTarget>>;

    /// Check `target` answers. Failures are `PrinterUnreachable`.
    async fn probe(&self, target: &PrinterTarget) -> Result<()>;

    /// Submit `job` once and wait for acceptance. Failures are `Dispatch`.
    async fn submit_job(&self, job: &PrintJob) -> Result<JobReceipt>;
}

/// Spooler that speaks IPP to CUPS and to network printers.
pub struct IppSpooler {
    cups_server: String,
    discovery: DiscoveryMethod,
    browse_window: std::time::Duration,
}

impl IppSpooler {
    pub fn new(settings: &PrinterSettings) -> Self {
        Self {
            cups_server: settings.cups_server.clone(),
            discovery: settings.discovery,
            browse_window: settings.discovery_timeout(),
        }
    }
}

#[async_trait]
impl PrintSpooler for IppSpooler {
    async fn list_printers(&self) -> Result<Vec<PrinterTarget>> {
        match self.discovery {
            DiscoveryMethod::Cups => {
                let client = IppClient::new(&self.cups_server).map_err(|e| {
                    QrPrintError::Config(format!("bad CUPS server URI: {e}"))
                })?;
                client.cups_printers().await
            }
            DiscoveryMethod::Mdns => {
                let window = self.browse_window;
                debug!(window_ms = window.as_millis() as u64, "browsing mDNS for printers");
                tokio::task::spawn_blocking(move || discovery::browse(window))
                    .await
                    .map_err(|e| QrPrintError::NoPrinterAvailable(format!("mDNS browse aborted: {e}")))?
            }
        }
    }

    async fn probe(&self, target: &PrinterTarget) -> Result<()> {
        IppClient::new(&target.uri)?.probe().await
    }

    async fn submit_job(&self, job: &PrintJob) -> Result<JobReceipt> {
        let client = IppClient::new(&job.target.uri)
            .map_err(|e| QrPrintError::dispatch(DispatchCause::Connection(e.to_string())))?;
        client.print_job(job).await
    }
}

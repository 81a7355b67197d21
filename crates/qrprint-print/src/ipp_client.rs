// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async IPP client for talking to printers and the CUPS scheduler.
//
// Uses the `ipp` crate's async API to send the operations the pipeline needs:
//   - Get-Printer-Attributes  (RFC 8011 §4.2.5)  liveness probe
//   - Print-Job               (RFC 8011 §4.2.1)  job submission
//   - CUPS-Get-Printers       (CUPS extension)   queue enumeration

use std::io::Cursor;

use chrono::Utc;
use ipp::prelude::*;
use tracing::{debug, error, info, instrument};

use qrprint_core::error::{DispatchCause, QrPrintError, Result};
use qrprint_core::types::{JobReceipt, PrintJob, PrinterTarget};

/// Async IPP client wrapping the `ipp` crate.
///
/// Each instance is bound to a single URI: a printer for probes and jobs, or
/// the scheduler root for enumeration.
pub struct IppClient {
    uri: Uri,
}

impl IppClient {
    /// Create a new client targeting the given URI.
    pub fn new(uri: &str) -> Result<Self> {
        let parsed = parse_printer_uri(uri)?;
        Ok(Self { uri: parsed })
    }

    /// Check the printer answers Get-Printer-Attributes with a success status.
    #[instrument(skip(self), fields(uri = %self.uri))]
    pub async fn probe(&self) -> Result<()> {
        let operation = IppOperationBuilder::get_printer_attributes(self.uri.clone()).build();
        let client = AsyncIppClient::new(self.uri.clone());

        debug!("sending Get-Printer-Attributes");
        let response = client.send(operation).await.map_err(|e| {
            QrPrintError::PrinterUnreachable {
                uri: self.uri.to_string(),
                reason: e.to_string(),
            }
        })?;

        let code = response.header().status_code();
        if !code.is_success() {
            error!(status = ?code, "Get-Printer-Attributes failed");
            return Err(QrPrintError::PrinterUnreachable {
                uri: self.uri.to_string(),
                reason: format!("printer answered {code:?}"),
            });
        }
        Ok(())
    }

    /// Submit `job` as a single Print-Job and wait for the spooler's verdict.
    ///
    /// Only acceptance is awaited; the job's later progress is not tracked.
    #[instrument(skip(self, job), fields(uri = %self.uri, title = %job.title, bytes = job.document.len()))]
    pub async fn print_job(&self, job: &PrintJob) -> Result<JobReceipt> {
        let payload = IppPayload::new(Cursor::new(job.document.clone()));

        let operation = IppOperationBuilder::print_job(self.uri.clone(), payload)
            .job_title(&job.title)
            .document_format(job.document_format)
            .build();

        let client = AsyncIppClient::new(self.uri.clone());

        info!(mime = job.document_format, hash = %job.document_hash, "sending Print-Job");
        let response = client.send(operation).await.map_err(|e| {
            error!(error = %e, "Print-Job transport failure");
            QrPrintError::dispatch(classify_transport_error(&e.to_string()))
        })?;

        let code = response.header().status_code();
        if !code.is_success() {
            let status = format!("{code:?}");
            error!(status = %status, "Print-Job refused");
            return Err(QrPrintError::dispatch(classify_status(&status)));
        }

        // CUPS always returns a job-id; bare printers occasionally omit it.
        let job_id = extract_job_id(response.attributes());
        info!(job_id = ?job_id, "print job accepted by printer");

        Ok(JobReceipt {
            job_id,
            printer: job.target.clone(),
            accepted_at: Utc::now(),
        })
    }

    /// List the scheduler's queues in the order CUPS returns them.
    #[instrument(skip(self), fields(uri = %self.uri))]
    pub async fn cups_printers(&self) -> Result<Vec<PrinterTarget>> {
        let operation = IppOperationBuilder::cups().get_printers();
        let client = AsyncIppClient::new(self.uri.clone());

        debug!("sending CUPS-Get-Printers");
        let response = client.send(operation).await.map_err(|e| {
            QrPrintError::NoPrinterAvailable(format!("CUPS at {} unreachable: {e}", self.uri))
        })?;

        let code = response.header().status_code();
        if !code.is_success() {
            // CUPS answers client-error-not-found when it has no queues.
            debug!(status = ?code, "CUPS-Get-Printers returned no printers");
            return Ok(Vec::new());
        }

        let printers = parse_printers(response.attributes());
        debug!(count = printers.len(), "received printer list");
        Ok(printers)
    }
}

/// Parse and scheme-check a printer URI.
pub fn parse_printer_uri(uri: &str) -> Result<Uri> {
    let parsed: Uri = uri.parse().map_err(|e| QrPrintError::PrinterUnreachable {
        uri: uri.to_owned(),
        reason: format!("invalid URI: {e}"),
    })?;

    let scheme_ok = matches!(parsed.scheme_str(), Some("ipp" | "ipps" | "http" | "https"));
    if !scheme_ok || parsed.host().is_none() {
        return Err(QrPrintError::PrinterUnreachable {
            uri: uri.to_owned(),
            reason: "invalid URI: expected ipp://, ipps://, http:// or https:// with a host".into(),
        });
    }
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Helper functions for classifying failures and parsing IPP responses
// ---------------------------------------------------------------------------

/// Map a non-success IPP status (in `StatusCode` debug form) to a cause.
pub(crate) fn classify_status(status: &str) -> DispatchCause {
    if status.contains("NotAuthenticated")
        || status.contains("NotAuthorized")
        || status.contains("Forbidden")
    {
        DispatchCause::Authentication(status.to_owned())
    } else {
        DispatchCause::Rejected {
            status: status.to_owned(),
        }
    }
}

/// Map a transport-level failure message to a cause.
///
/// CUPS reports missing credentials as a plain HTTP 401 before any IPP
/// response exists, so that case surfaces here rather than as a status.
pub(crate) fn classify_transport_error(detail: &str) -> DispatchCause {
    let lower = detail.to_ascii_lowercase();
    if lower.contains("401") || lower.contains("unauthorized") || lower.contains("403") {
        DispatchCause::Authentication(detail.to_owned())
    } else {
        DispatchCause::Connection(detail.to_owned())
    }
}

/// Extract the `job-id` integer from a response's Job Attributes group.
fn extract_job_id(attrs: &IppAttributes) -> Option<i32> {
    for group in attrs.groups_of(DelimiterTag::JobAttributes) {
        if let Some(attr) = group.attributes().get("job-id")
            && let IppValue::Integer(id) = attr.value()
        {
            return Some(*id);
        }
    }
    None
}

/// First textual value of an attribute, unwrapping 1setOf values.
fn first_value(value: &IppValue) -> Option<String> {
    match value {
        IppValue::Array(values) => values.first().map(|v| v.to_string()),
        other => Some(other.to_string()),
    }
    .filter(|s| !s.is_empty())
}

/// Parse a CUPS-Get-Printers response into targets, keeping group order.
///
/// Each queue is a separate Printer Attributes group; queues without a usable
/// `printer-uri-supported` are skipped.
fn parse_printers(attrs: &IppAttributes) -> Vec<PrinterTarget> {
    let mut printers = Vec::new();

    for group in attrs.groups_of(DelimiterTag::PrinterAttributes) {
        let attributes = group.attributes();

        let Some(uri) = attributes
            .get("printer-uri-supported")
            .and_then(|a| first_value(a.value()))
        else {
            continue;
        };

        let identifier = attributes
            .get("printer-name")
            .and_then(|a| first_value(a.value()))
            .unwrap_or_else(|| uri.clone());

        printers.push(PrinterTarget { identifier, uri });
    }

    printers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_invalid_uri() {
        assert!(IppClient::new("not a valid uri %%%").is_err());
        assert!(IppClient::new("ftp://printer/queue").is_err());
        assert!(IppClient::new("/printers/office").is_err());
    }

    #[test]
    fn new_accepts_printer_uris() {
        for uri in [
            "ipp://192.168.1.100:631/ipp/print",
            "ipps://printer.local/ipp/print",
            "http://localhost:631/printers/office",
        ] {
            assert!(IppClient::new(uri).is_ok(), "{uri}");
        }
    }

    #[test]
    fn invalid_uri_is_reported_as_unreachable() {
        assert!(matches!(
            parse_printer_uri("lpd://host/queue"),
            Err(QrPrintError::PrinterUnreachable { .. })
        ));
    }

    #[test]
    fn rejection_statuses_are_classified() {
        assert_eq!(
            classify_status("ClientErrorDocumentFormatNotSupported"),
            DispatchCause::Rejected {
                status: "ClientErrorDocumentFormatNotSupported".into()
            }
        );
        assert!(matches!(
            classify_status("ClientErrorNotAuthorized"),
            DispatchCause::Authentication(_)
        ));
    }

    #[test]
    fn transport_errors_are_classified() {
        assert!(matches!(
            classify_transport_error("HTTP error: 401 Unauthorized"),
            DispatchCause::Authentication(_)
        ));
        assert!(matches!(
            classify_transport_error("error sending request: connection refused"),
            DispatchCause::Connection(_)
        ));
    }
}

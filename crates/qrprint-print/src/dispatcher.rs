// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job dispatch.
//
// Hands a finished job to the spooler exactly once and waits, up to a bound,
// for the spooler to accept it. Whatever goes wrong comes back as a
// `Dispatch` error; nothing is retried here.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument};

use qrprint_core::error::{DispatchCause, QrPrintError, Result};
use qrprint_core::types::{JobReceipt, PrintJob};

use crate::spooler::PrintSpooler;

/// Submits print jobs through a [`PrintSpooler`].
pub struct PrintDispatcher {
    spooler: Arc<dyn PrintSpooler>,
}

impl PrintDispatcher {
    pub fn new(spooler: Arc<dyn PrintSpooler>) -> Self {
        Self { spooler }
    }

    /// Submit `job` and wait at most `timeout` for acceptance.
    #[instrument(skip(self, job), fields(printer = %job.target.identifier, job = %job.request_id))]
    pub async fn submit(&self, job: &PrintJob, timeout: Duration) -> Result<JobReceipt> {
        let outcome = tokio::time::timeout(timeout, self.spooler.submit_job(job)).await;

        let result = match outcome {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(e @ QrPrintError::Dispatch { .. })) => Err(e),
            Ok(Err(other)) => Err(QrPrintError::dispatch(DispatchCause::Connection(
                other.to_string(),
            ))),
            Err(_) => Err(QrPrintError::dispatch(DispatchCause::Timeout(timeout))),
        };

        match &result {
            Ok(receipt) => info!(job_id = ?receipt.job_id, "job accepted"),
            Err(e) => error!(error = %e, "job dispatch failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{RecordingSpooler, SubmitBehavior};
    use qrprint_core::types::{LayoutRect, Page, PaperSize, PrintRequest, PrinterTarget};

    fn job() -> PrintJob {
        let request = PrintRequest::new("https://example.org/doc", "Lab safety sheet").unwrap();
        let page = Page {
            paper: PaperSize::LABEL,
            margin_mm: 10.0,
            code_box: LayoutRect {
                x_mm: 70.0,
                y_mm: 180.0,
                width_mm: 60.0,
                height_mm: 60.0,
            },
            lines: Vec::new(),
            bytes: b"%PDF-1.7\n%%EOF".to_vec(),
        };
        let target = PrinterTarget {
            identifier: "lab".into(),
            uri: "ipp://localhost:631/printers/lab".into(),
        };
        PrintJob::new(&request, page, target)
    }

    #[tokio::test]
    async fn accepted_job_returns_receipt() {
        let spooler = Arc::new(RecordingSpooler::empty());
        let dispatcher = PrintDispatcher::new(spooler.clone());

        let receipt = dispatcher.submit(&job(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(receipt.job_id, Some(1));
        assert_eq!(receipt.printer.identifier, "lab");
        assert_eq!(spooler.accepted_jobs().len(), 1);
    }

    #[tokio::test]
    async fn rejection_is_passed_through_once() {
        let cause = DispatchCause::Rejected {
            status: "ClientErrorDocumentFormatNotSupported".into(),
        };
        let spooler = Arc::new(RecordingSpooler::empty().with_behavior(SubmitBehavior::Reject(cause.clone())));
        let dispatcher = PrintDispatcher::new(spooler.clone());

        let err = dispatcher.submit(&job(), Duration::from_secs(5)).await.unwrap_err();
        match err {
            QrPrintError::Dispatch { cause: got } => assert_eq!(got, cause),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(spooler.submit_calls(), 1);
    }

    #[tokio::test]
    async fn silent_spooler_times_out_without_retry() {
        let spooler = Arc::new(RecordingSpooler::empty().with_behavior(SubmitBehavior::Hang));
        let dispatcher = PrintDispatcher::new(spooler.clone());

        let err = dispatcher.submit(&job(), Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(
            err,
            QrPrintError::Dispatch {
                cause: DispatchCause::Timeout(_)
            }
        ));
        assert_eq!(spooler.submit_calls(), 1);
        assert!(spooler.accepted_jobs().is_empty());
    }
}

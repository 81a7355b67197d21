// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The print pipeline state machine.
//
//   Received -> Encoding -> Composing -> Resolving -> Dispatching -> Succeeded
//
// Each stage runs only after the previous one succeeded. The first failure
// moves straight to Failed, carrying the stage and the error; nothing after it
// runs and nothing is retried.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use qrprint_core::error::{ErrorKind, QrPrintError};
use qrprint_core::types::{JobReceipt, PrintJob, PrintRequest, RequestId};
use qrprint_core::AppConfig;
use qrprint_document::{CodeEncoder, DocumentComposer, ScannableCode};
use qrprint_print::{PrintDispatcher, PrintSpooler, PrinterResolver};

/// A stage that does work and can therefore fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Encoding,
    Composing,
    Resolving,
    Dispatching,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Encoding => "Encoding",
            Self::Composing => "Composing",
            Self::Resolving => "Resolving",
            Self::Dispatching => "Dispatching",
        };
        f.write_str(name)
    }
}

/// Every state a run can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Received,
    Encoding,
    Composing,
    Resolving,
    Dispatching,
    Succeeded,
    Failed(ErrorKind),
}

impl From<PipelineStage> for PipelineState {
    fn from(stage: PipelineStage) -> Self {
        match stage {
            PipelineStage::Encoding => Self::Encoding,
            PipelineStage::Composing => Self::Composing,
            PipelineStage::Resolving => Self::Resolving,
            PipelineStage::Dispatching => Self::Dispatching,
        }
    }
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    Succeeded { receipt: JobReceipt, message: String },
    Failed { stage: PipelineStage, error: QrPrintError },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Everything a finished run leaves behind.
#[derive(Debug)]
pub struct PipelineReport {
    pub request_id: RequestId,
    /// Visited states in order, starting at `Received` and ending terminal.
    pub states: Vec<PipelineState>,
    pub outcome: PipelineOutcome,
    /// The encoded code, once `Encoding` succeeded.
    pub code: Option<ScannableCode>,
    /// The composed PDF, once `Composing` succeeded.
    pub document: Option<Vec<u8>>,
}

impl PipelineReport {
    pub fn final_state(&self) -> PipelineState {
        self.states
            .last()
            .copied()
            .unwrap_or(PipelineState::Received)
    }
}

/// Turns a [`PrintRequest`] into a submitted print job.
///
/// Holds only immutable configuration and the spooler handle, so one
/// pipeline can serve any number of concurrent runs.
pub struct Pipeline {
    config: Arc<AppConfig>,
    encoder: CodeEncoder,
    composer: DocumentComposer,
    resolver: PrinterResolver,
    dispatcher: PrintDispatcher,
}

/// What a run has produced so far.
struct Progress {
    states: Vec<PipelineState>,
    code: Option<ScannableCode>,
    document: Option<Vec<u8>>,
}

impl Progress {
    fn enter(&mut self, stage: PipelineStage) {
        debug!(state = %stage, "pipeline transition");
        self.states.push(stage.into());
    }
}

impl Pipeline {
    pub fn new(config: Arc<AppConfig>, spooler: Arc<dyn PrintSpooler>) -> Self {
        Self {
            encoder: CodeEncoder::new(config.code),
            composer: DocumentComposer::new(config.layout),
            resolver: PrinterResolver::new(config.printer.clone(), Arc::clone(&spooler)),
            dispatcher: PrintDispatcher::new(spooler),
            config,
        }
    }

    /// Run `request` through every stage and report how it went.
    #[instrument(skip_all, fields(request = %request.id(), url = %request.url()))]
    pub async fn run(&self, request: &PrintRequest) -> PipelineReport {
        let mut progress = Progress {
            states: vec![PipelineState::Received],
            code: None,
            document: None,
        };
        debug!(state = "Received", "pipeline transition");

        let outcome = match self.advance(request, &mut progress).await {
            Ok(receipt) => {
                progress.states.push(PipelineState::Succeeded);
                let message = success_message(&receipt);
                info!(printer = %receipt.printer.identifier, job_id = ?receipt.job_id, "{message}");
                PipelineOutcome::Succeeded { receipt, message }
            }
            Err((stage, error)) => {
                let kind = error.kind();
                progress.states.push(PipelineState::Failed(kind));
                error!(stage = %stage, kind = %kind, error = %error, "print request failed");
                PipelineOutcome::Failed { stage, error }
            }
        };

        PipelineReport {
            request_id: request.id(),
            states: progress.states,
            outcome,
            code: progress.code,
            document: progress.document,
        }
    }

    async fn advance(
        &self,
        request: &PrintRequest,
        progress: &mut Progress,
    ) -> Result<JobReceipt, (PipelineStage, QrPrintError)> {
        progress.enter(PipelineStage::Encoding);
        let code = self
            .encoder
            .encode(request.url())
            .map_err(|e| (PipelineStage::Encoding, e))?;

        progress.enter(PipelineStage::Composing);
        let mut composer = self.composer.clone();
        composer.set_title(request.description());
        let composed = composer.compose(&code, request.description(), self.config.paper_size);
        progress.code = Some(code);
        let page = composed.map_err(|e| (PipelineStage::Composing, e))?;
        progress.document = Some(page.bytes.clone());

        progress.enter(PipelineStage::Resolving);
        let target = self
            .resolver
            .resolve()
            .await
            .map_err(|e| (PipelineStage::Resolving, e))?;

        progress.enter(PipelineStage::Dispatching);
        let job = PrintJob::new(request, page, target);
        self.dispatcher
            .submit(&job, self.config.dispatch_timeout())
            .await
            .map_err(|e| (PipelineStage::Dispatching, e))
    }
}

fn success_message(receipt: &JobReceipt) -> String {
    match receipt.job_id {
        Some(id) => format!(
            "Printed successfully on {} (job {id})",
            receipt.printer.identifier
        ),
        None => format!("Printed successfully on {}", receipt.printer.identifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrprint_core::error::DispatchCause;
    use qrprint_core::types::PrinterTarget;
    use qrprint_document::PageInspector;
    use qrprint_print::{RecordingSpooler, SubmitBehavior};

    fn lab_printer() -> PrinterTarget {
        PrinterTarget {
            identifier: "lab".into(),
            uri: "ipp://localhost:631/printers/lab".into(),
        }
    }

    fn pipeline(spooler: Arc<RecordingSpooler>) -> Pipeline {
        Pipeline::new(Arc::new(AppConfig::default()), spooler)
    }

    fn request() -> PrintRequest {
        PrintRequest::new("https://example.org/doc", "Lab safety sheet").unwrap()
    }

    #[tokio::test]
    async fn lab_sheet_is_printed() {
        let spooler = Arc::new(RecordingSpooler::new(vec![lab_printer()]));
        let report = pipeline(spooler.clone()).run(&request()).await;

        match &report.outcome {
            PipelineOutcome::Succeeded { receipt, message } => {
                assert_eq!(receipt.printer, lab_printer());
                assert!(message.contains("lab"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            report.states,
            vec![
                PipelineState::Received,
                PipelineState::Encoding,
                PipelineState::Composing,
                PipelineState::Resolving,
                PipelineState::Dispatching,
                PipelineState::Succeeded,
            ]
        );

        let jobs = spooler.accepted_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].document_format, "application/pdf");
        assert_eq!(Some(&jobs[0].document), report.document.as_ref());

        let inspector = PageInspector::from_bytes(&jobs[0].document).unwrap();
        assert_eq!(inspector.page_count(), 1);
        assert_eq!(inspector.image_count(), 1);
    }

    #[tokio::test]
    async fn no_printer_stops_at_resolving() {
        let spooler = Arc::new(RecordingSpooler::empty());
        let report = pipeline(spooler.clone()).run(&request()).await;

        match &report.outcome {
            PipelineOutcome::Failed { stage, error } => {
                assert_eq!(*stage, PipelineStage::Resolving);
                assert_eq!(error.kind(), ErrorKind::NoPrinterAvailable);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            report.final_state(),
            PipelineState::Failed(ErrorKind::NoPrinterAvailable)
        );
        assert!(!report.states.contains(&PipelineState::Dispatching));
        assert_eq!(spooler.submit_calls(), 0);
        // The document was still composed before resolution failed.
        assert!(report.document.is_some());
    }

    #[tokio::test]
    async fn rejected_job_fails_at_dispatching() {
        let spooler = Arc::new(
            RecordingSpooler::new(vec![lab_printer()]).with_behavior(SubmitBehavior::Reject(
                DispatchCause::Rejected {
                    status: "ServerErrorNotAcceptingJobs".into(),
                },
            )),
        );
        let report = pipeline(spooler.clone()).run(&request()).await;

        match &report.outcome {
            PipelineOutcome::Failed { stage, error } => {
                assert_eq!(*stage, PipelineStage::Dispatching);
                assert_eq!(error.kind(), ErrorKind::Dispatch);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(spooler.submit_calls(), 1);
        assert!(spooler.accepted_jobs().is_empty());
    }

    #[tokio::test]
    async fn layout_failure_skips_the_network() {
        let mut config = AppConfig::default();
        config.layout.code_size_mm = 500.0;
        let spooler = Arc::new(RecordingSpooler::new(vec![lab_printer()]));
        let report = Pipeline::new(Arc::new(config), spooler.clone())
            .run(&request())
            .await;

        assert!(matches!(
            report.outcome,
            PipelineOutcome::Failed {
                stage: PipelineStage::Composing,
                error: QrPrintError::Layout(_)
            }
        ));
        assert!(report.code.is_some());
        assert!(report.document.is_none());
        assert_eq!(spooler.list_calls(), 0);
        assert_eq!(spooler.submit_calls(), 0);
    }

    #[tokio::test]
    async fn encoding_failure_is_first_stage() {
        let mut config = AppConfig::default();
        config.code.max_version = 1;
        let spooler = Arc::new(RecordingSpooler::new(vec![lab_printer()]));
        let long = PrintRequest::new(
            "https://example.org/a/very/long/path/that/cannot/fit/in/version/one",
            "Too long",
        )
        .unwrap();
        let report = Pipeline::new(Arc::new(config), spooler.clone()).run(&long).await;

        assert_eq!(
            report.states,
            vec![
                PipelineState::Received,
                PipelineState::Encoding,
                PipelineState::Failed(ErrorKind::Encoding),
            ]
        );
        assert!(report.final_state().is_terminal());
        assert_eq!(spooler.list_calls(), 0);
    }
}

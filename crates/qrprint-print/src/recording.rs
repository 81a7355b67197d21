// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory spooler that records what it is asked to do.
//
// Backs `--dry-run` in the binary, where the whole pipeline runs but nothing
// reaches a printer, and stands in for CUPS in tests.

use std::io;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use qrprint_core::error::{DispatchCause, QrPrintError, Result};
use qrprint_core::types::{JobReceipt, PrintJob, PrinterTarget};

use crate::spooler::PrintSpooler;

/// What the recording spooler does with a submitted job.
#[derive(Debug, Clone)]
pub enum SubmitBehavior {
    /// Accept and hand out sequential job ids starting at 1.
    Accept,
    /// Refuse with the given cause.
    Reject(DispatchCause),
    /// Never answer.
    Hang,
}

/// How the recording spooler answers a liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeBehavior {
    Answer,
    Refuse,
    Hang,
}

/// Spooler double with a fixed printer list and scripted outcomes.
pub struct RecordingSpooler {
    printers: Vec<PrinterTarget>,
    /// When set, listing fails with a connection error carrying this text.
    listing_error: Option<String>,
    probe: ProbeBehavior,
    behavior: SubmitBehavior,
    list_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    accepted: Mutex<Vec<PrintJob>>,
}

impl RecordingSpooler {
    /// A spooler that lists `printers` and accepts every job.
    pub fn new(printers: Vec<PrinterTarget>) -> Self {
        Self {
            printers,
            listing_error: None,
            probe: ProbeBehavior::Answer,
            behavior: SubmitBehavior::Accept,
            list_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            accepted: Mutex::new(Vec::new()),
        }
    }

    /// A spooler with no printers at all.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_behavior(mut self, behavior: SubmitBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Make every liveness check fail.
    pub fn unreachable(mut self) -> Self {
        self.probe = ProbeBehavior::Refuse;
        self
    }

    /// Make every liveness check wait forever.
    pub fn silent(mut self) -> Self {
        self.probe = ProbeBehavior::Hang;
        self
    }

    /// Make enumeration fail as if the print server refused the connection.
    pub fn failing_listing(mut self, reason: impl Into<String>) -> Self {
        self.listing_error = Some(reason.into());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Jobs accepted so far, oldest first.
    pub fn accepted_jobs(&self) -> Vec<PrintJob> {
        self.accepted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl PrintSpooler for RecordingSpooler {
    async fn list_printers(&self) -> Result<Vec<PrinterTarget>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match &self.listing_error {
            Some(reason) => {
                Err(io::Error::new(io::ErrorKind::ConnectionRefused, reason.clone()).into())
            }
            None => Ok(self.printers.clone()),
        }
    }

    async fn probe(&self, target: &PrinterTarget) -> Result<()> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        match self.probe {
            ProbeBehavior::Answer => Ok(()),
            ProbeBehavior::Refuse => Err(QrPrintError::PrinterUnreachable {
                uri: target.uri.clone(),
                reason: "connection refused".into(),
            }),
            ProbeBehavior::Hang => std::future::pending().await,
        }
    }

    async fn submit_job(&self, job: &PrintJob) -> Result<JobReceipt> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            SubmitBehavior::Accept => {
                let mut accepted = self.accepted.lock().unwrap_or_else(PoisonError::into_inner);
                accepted.push(job.clone());
                let job_id = accepted.len() as i32;
                info!(job_id, printer = %job.target.identifier, "job recorded");
                Ok(JobReceipt {
                    job_id: Some(job_id),
                    printer: job.target.clone(),
                    accepted_at: Utc::now(),
                })
            }
            SubmitBehavior::Reject(cause) => Err(QrPrintError::dispatch(cause.clone())),
            SubmitBehavior::Hang => std::future::pending().await,
        }
    }
}

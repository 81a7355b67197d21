// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the outer boundary.
//
// Every pipeline error is mapped to plain English with a suggestion. The
// mapping never changes which taxonomy bucket an error belongs to; it only
// adds wording.

use crate::error::{DispatchCause, ErrorKind, QrPrintError};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or busy printer; trying again later may work.
    Transient,
    /// The user (or an administrator) must change something first.
    ActionRequired,
    /// The input itself cannot be printed.
    Permanent,
}

/// A human-readable error with a plain English message and a suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub kind: ErrorKind,
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub severity: Severity,
}

impl std::fmt::Display for HumanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.message, self.suggestion)
    }
}

/// Convert a `QrPrintError` into a `HumanError`.
pub fn humanize_error(err: &QrPrintError) -> HumanError {
    let kind = err.kind();
    let (message, suggestion, severity) = match err {
        QrPrintError::InvalidRequest(detail) => (
            "That request can't be printed.".to_owned(),
            format!("Enter a URL starting with http:// or https:// and a short description. ({detail})"),
            Severity::ActionRequired,
        ),

        QrPrintError::Encoding(_) => (
            "Failed to generate the QR code.".to_owned(),
            "The URL may be too long to fit in a code. Try a shorter link.".to_owned(),
            Severity::Permanent,
        ),

        QrPrintError::Layout(detail) => (
            "Failed to lay out the page.".to_owned(),
            format!("Try a shorter description. ({detail})"),
            Severity::Permanent,
        ),

        QrPrintError::NoPrinterAvailable(_) => (
            "No printers found.".to_owned(),
            "Check your CUPS setup, or configure a printer URI explicitly.".to_owned(),
            Severity::ActionRequired,
        ),

        QrPrintError::PrinterUnreachable { uri, .. } => (
            "The configured printer can't be reached.".to_owned(),
            format!("Check the printer at {uri} is switched on and on the same network."),
            Severity::Transient,
        ),

        QrPrintError::Dispatch { cause } => humanize_dispatch(cause),

        QrPrintError::Config(detail) => (
            "The printing service is misconfigured.".to_owned(),
            format!("Ask an administrator to check the configuration. ({detail})"),
            Severity::ActionRequired,
        ),

        QrPrintError::Io(_) | QrPrintError::Serialization(_) => (
            "Something went wrong on our side.".to_owned(),
            "Please try again.".to_owned(),
            Severity::Transient,
        ),
    };

    HumanError {
        kind,
        message,
        suggestion,
        severity,
    }
}

fn humanize_dispatch(cause: &DispatchCause) -> (String, String, Severity) {
    match cause {
        DispatchCause::Connection(_) => (
            "Printer unreachable.".to_owned(),
            "Please check your printer connection and try again.".to_owned(),
            Severity::Transient,
        ),
        DispatchCause::Timeout(_) => (
            "The printer didn't respond in time.".to_owned(),
            "The printer might be busy or turned off. Check it's on, then try again.".to_owned(),
            Severity::Transient,
        ),
        DispatchCause::Authentication(_) => (
            "The printer refused to accept the job.".to_owned(),
            "The print queue requires credentials this service does not have.".to_owned(),
            Severity::ActionRequired,
        ),
        DispatchCause::Rejected { status } => humanize_status(status),
        DispatchCause::Protocol(detail) => (
            "The printer sent a reply we couldn't understand.".to_owned(),
            format!("Try again, or try a different printer. (Detail: {detail})"),
            Severity::Transient,
        ),
    }
}

/// Map an IPP status keyword into wording.
fn humanize_status(status: &str) -> (String, String, Severity) {
    // Accept both IPP keywords and `StatusCode` debug names.
    let lower: String = status
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if lower.contains("documentformat") {
        (
            "The printer doesn't understand PDF documents.".to_owned(),
            "Pick a printer queue that accepts PDF.".to_owned(),
            Severity::Permanent,
        )
    } else if lower.contains("notaccepting") || lower.contains("notfound") {
        (
            "The printer is not accepting jobs.".to_owned(),
            "The print queue may be paused or removed. Check it in CUPS.".to_owned(),
            Severity::ActionRequired,
        )
    } else if lower.contains("busy") || lower.contains("servererror") {
        (
            "The printer reported an internal error.".to_owned(),
            "Try turning the printer off and on again, then print again.".to_owned(),
            Severity::Transient,
        )
    } else {
        (
            "Failed to send the page to the printer.".to_owned(),
            format!("Please try again. (Printer said: {status})"),
            Severity::Transient,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn keeps_error_kind() {
        let human = humanize_error(&QrPrintError::NoPrinterAvailable("empty".into()));
        assert_eq!(human.kind, ErrorKind::NoPrinterAvailable);
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn timeout_is_transient() {
        let err = QrPrintError::dispatch(DispatchCause::Timeout(Duration::from_secs(30)));
        let human = humanize_error(&err);
        assert_eq!(human.kind, ErrorKind::Dispatch);
        assert_eq!(human.severity, Severity::Transient);
    }

    #[test]
    fn unsupported_format_is_permanent() {
        let err = QrPrintError::dispatch(DispatchCause::Rejected {
            status: "ClientErrorDocumentFormatNotSupported".into(),
        });
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
    }

    #[test]
    fn unreachable_mentions_uri() {
        let err = QrPrintError::PrinterUnreachable {
            uri: "ipp://10.0.0.9/ipp/print".into(),
            reason: "timed out".into(),
        };
        assert!(humanize_error(&err).suggestion.contains("ipp://10.0.0.9/ipp/print"));
    }
}

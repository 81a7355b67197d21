// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for qrprint.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all qrprint operations.
#[derive(Debug, Error)]
pub enum QrPrintError {
    // -- Input boundary --
    #[error("invalid print request: {0}")]
    InvalidRequest(String),

    // -- Document errors --
    #[error("code encoding failed: {0}")]
    Encoding(String),

    #[error("page layout failed: {0}")]
    Layout(String),

    // -- Printer resolution --
    #[error("no printer available: {0}")]
    NoPrinterAvailable(String),

    #[error("printer {uri} unreachable: {reason}")]
    PrinterUnreachable { uri: String, reason: String },

    // -- Submission --
    #[error("print job dispatch failed: {cause}")]
    Dispatch { cause: DispatchCause },

    // -- Ambient --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QrPrintError {
    /// Shorthand for a dispatch failure.
    pub fn dispatch(cause: DispatchCause) -> Self {
        Self::Dispatch { cause }
    }

    /// Taxonomy bucket of this error, as surfaced by the pipeline.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::Layout(_) => ErrorKind::Layout,
            Self::NoPrinterAvailable(_) => ErrorKind::NoPrinterAvailable,
            Self::PrinterUnreachable { .. } => ErrorKind::PrinterUnreachable,
            Self::Dispatch { .. } => ErrorKind::Dispatch,
            Self::Config(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

/// Why a print job submission did not get accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchCause {
    /// Could not open or keep the connection to the printer.
    Connection(String),
    /// No acceptance within the caller's deadline.
    Timeout(Duration),
    /// The spooler asked for credentials or refused ours.
    Authentication(String),
    /// The spooler answered with a non-success IPP status.
    Rejected { status: String },
    /// The spooler answered, but not with anything we can interpret.
    Protocol(String),
}

impl fmt::Display for DispatchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(detail) => write!(f, "connection failed: {detail}"),
            Self::Timeout(after) => write!(f, "timed out after {}s", after.as_secs_f32()),
            Self::Authentication(detail) => write!(f, "authentication failed: {detail}"),
            Self::Rejected { status } => write!(f, "rejected by spooler: {status}"),
            Self::Protocol(detail) => write!(f, "protocol error: {detail}"),
        }
    }
}

/// Flat error taxonomy handed to the outer boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidRequest,
    Encoding,
    Layout,
    NoPrinterAvailable,
    PrinterUnreachable,
    Dispatch,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidRequest => "InvalidRequest",
            Self::Encoding => "EncodingError",
            Self::Layout => "LayoutError",
            Self::NoPrinterAvailable => "NoPrinterAvailable",
            Self::PrinterUnreachable => "PrinterUnreachable",
            Self::Dispatch => "DispatchError",
            Self::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, QrPrintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_variant() {
        assert_eq!(QrPrintError::Encoding("x".into()).kind(), ErrorKind::Encoding);
        assert_eq!(
            QrPrintError::dispatch(DispatchCause::Connection("refused".into())).kind(),
            ErrorKind::Dispatch
        );
        assert_eq!(
            QrPrintError::Config("bad".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn dispatch_message_carries_cause() {
        let err = QrPrintError::dispatch(DispatchCause::Rejected {
            status: "client-error-document-format-not-supported".into(),
        });
        assert_eq!(
            err.to_string(),
            "print job dispatch failed: rejected by spooler: client-error-document-format-not-supported"
        );
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// qrprint-document: Document generation for qrprint.
//
// Provides QR encoding and rasterisation (`code`) and single-page PDF
// composition plus read-back inspection (`pdf`).

pub mod code;
pub mod pdf;

// Re-export the primary structs so callers can use `qrprint_document::CodeEncoder` etc.
pub use code::{CodeEncoder, ScannableCode};
pub use pdf::{DocumentComposer, PageInspector};

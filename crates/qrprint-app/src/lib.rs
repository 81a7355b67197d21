// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// qrprint application layer: the print pipeline state machine and the
// settings plumbing used by the `qrprint` binary.

pub mod pipeline;
pub mod services;

pub use pipeline::{Pipeline, PipelineOutcome, PipelineReport, PipelineStage, PipelineState};

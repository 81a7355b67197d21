// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: page composition, font metrics, and read-back inspection.

pub mod composer;
pub mod inspect;
pub mod metrics;

pub use composer::DocumentComposer;
pub use inspect::PageInspector;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Code module: QR encoding and rasterisation.

pub mod encoder;

pub use encoder::{CodeEncoder, ScannableCode, encode};

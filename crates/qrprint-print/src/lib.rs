// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// qrprint Print: printer resolution and job dispatch over IPP, with CUPS and
// mDNS enumeration. This crate bridges the core domain types defined in
// `qrprint-core` and the host's network printing infrastructure.

pub mod discovery;
pub mod dispatcher;
pub mod ipp_client;
pub mod recording;
pub mod resolver;
pub mod spooler;

pub use dispatcher::PrintDispatcher;
pub use ipp_client::IppClient;
pub use recording::{RecordingSpooler, SubmitBehavior};
pub use resolver::PrinterResolver;
pub use spooler::{IppSpooler, PrintSpooler};

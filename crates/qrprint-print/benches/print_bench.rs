// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for printer URI handling and job construction in the
// qrprint-print crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use qrprint_core::types::{LayoutRect, Page, PaperSize, PrintJob, PrintRequest, PrinterTarget};
use qrprint_print::ipp_client::parse_printer_uri;
use qrprint_print::resolver::configured_target;

/// Benchmark parsing a typical network printer URI.
fn bench_parse_printer_uri(c: &mut Criterion) {
    c.bench_function("parse_printer_uri", |b| {
        b.iter(|| {
            let result = parse_printer_uri(black_box("ipp://192.168.1.100:631/ipp/print"));
            assert!(result.is_ok());
        });
    });
}

/// Benchmark mapping a CUPS queue name onto the scheduler URI.
fn bench_configured_queue(c: &mut Criterion) {
    c.bench_function("configured_target (queue name)", |b| {
        b.iter(|| {
            let result = configured_target(black_box("office"), black_box("ipp://localhost:631"));
            assert!(result.is_ok());
        });
    });
}

/// Benchmark building a job from a label-sized document, hashing included.
fn bench_print_job(c: &mut Criterion) {
    let request = PrintRequest::new("https://example.org/doc", "Lab safety sheet").unwrap();
    // Roughly the size of a composed label with a 300 dpi code bitmap.
    let bytes = vec![0x5Au8; 600 * 1024];
    let target = PrinterTarget {
        identifier: "lab".into(),
        uri: "ipp://localhost:631/printers/lab".into(),
    };

    c.bench_function("PrintJob::new (600 KiB)", |b| {
        b.iter(|| {
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
                bytes: bytes.clone(),
            };
            black_box(PrintJob::new(&request, page, target.clone()))
        });
    });
}

criterion_group!(
    benches,
    bench_parse_printer_uri,
    bench_configured_queue,
    bench_print_job
);
criterion_main!(benches);

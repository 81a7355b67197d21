// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the qrprint pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;
use uuid::Uuid;

use crate::error::{QrPrintError, Result};

/// Longest description accepted, counted in Unicode scalar values.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// MIME type of every document this system produces.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Longest job title sent to the spooler, in characters.
const MAX_JOB_TITLE_CHARS: usize = 100;

/// Correlation id for one user submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated (url, description) pair.
///
/// Construction is the input boundary: once a `PrintRequest` exists the rest
/// of the pipeline may assume the URL is absolute http(s) and the description
/// fits on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintRequest {
    id: RequestId,
    url: String,
    description: String,
}

impl PrintRequest {
    /// Validate and build a request. Both fields are trimmed first.
    pub fn new(url: &str, description: &str) -> Result<Self> {
        let url = url.trim();
        let description = description.trim();

        if url.is_empty() || description.is_empty() {
            return Err(QrPrintError::InvalidRequest(
                "both URL and description are required".into(),
            ));
        }

        let parsed = Url::parse(url)
            .map_err(|e| QrPrintError::InvalidRequest(format!("invalid URL '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(QrPrintError::InvalidRequest(format!(
                "invalid URL '{url}': must start with http:// or https:// and name a host"
            )));
        }

        let chars = description.chars().count();
        if chars > MAX_DESCRIPTION_CHARS {
            return Err(QrPrintError::InvalidRequest(format!(
                "description is {chars} characters, limit is {MAX_DESCRIPTION_CHARS}"
            )));
        }

        Ok(Self {
            id: RequestId::new(),
            url: url.to_owned(),
            description: description.to_owned(),
        })
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// QR error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ErrorCorrection {
    /// ~7% recovery.
    L,
    /// ~15% recovery.
    #[default]
    M,
    /// ~25% recovery.
    Q,
    /// ~30% recovery.
    H,
}

impl std::str::FromStr for ErrorCorrection {
    type Err = QrPrintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "L" => Ok(Self::L),
            "M" => Ok(Self::M),
            "Q" => Ok(Self::Q),
            "H" => Ok(Self::H),
            other => Err(QrPrintError::Config(format!(
                "unknown error correction level '{other}' (expected L, M, Q or H)"
            ))),
        }
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// The label sheet the pipeline prints on unless configured otherwise.
    pub const LABEL: Self = Self::Custom {
        width_mm: 200.0,
        height_mm: 250.0,
    };

    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::A5 => (148.0, 210.0),
            Self::Letter => (215.9, 279.4),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

impl Default for PaperSize {
    fn default() -> Self {
        Self::LABEL
    }
}

/// Axis-aligned rectangle on the page, in millimetres, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutRect {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

impl LayoutRect {
    pub fn right_mm(&self) -> f32 {
        self.x_mm + self.width_mm
    }

    pub fn top_mm(&self) -> f32 {
        self.y_mm + self.height_mm
    }

    pub fn center_x_mm(&self) -> f32 {
        self.x_mm + self.width_mm / 2.0
    }
}

/// One line of description text as placed on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    /// Left edge of the line.
    pub x_mm: f32,
    /// Text baseline.
    pub baseline_mm: f32,
    /// Measured advance width of the line.
    pub width_mm: f32,
}

/// A composed single-page document ready for the spooler.
///
/// Keeps the layout geometry alongside the PDF bytes so callers can reason
/// about placement without re-parsing the document.
#[derive(Debug, Clone)]
pub struct Page {
    pub paper: PaperSize,
    pub margin_mm: f32,
    pub code_box: LayoutRect,
    pub lines: Vec<PlacedLine>,
    pub bytes: Vec<u8>,
}

impl Page {
    /// The area inside the margins.
    pub fn printable_area(&self) -> LayoutRect {
        let (w, h) = self.paper.dimensions_mm();
        LayoutRect {
            x_mm: self.margin_mm,
            y_mm: self.margin_mm,
            width_mm: w - 2.0 * self.margin_mm,
            height_mm: h - 2.0 * self.margin_mm,
        }
    }
}

/// A printer the job will be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterTarget {
    /// Queue or service name, for display and logs.
    pub identifier: String,
    /// `ipp://`, `ipps://`, `http://` or `https://` printer URI.
    pub uri: String,
}

/// One print job, built from exactly one composed page.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub request_id: RequestId,
    pub document: Vec<u8>,
    pub document_format: &'static str,
    /// SHA-256 of `document`, lowercase hex.
    pub document_hash: String,
    pub target: PrinterTarget,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl PrintJob {
    /// Consume `page` into a job for `target`.
    pub fn new(request: &PrintRequest, page: Page, target: PrinterTarget) -> Self {
        let document = page.bytes;
        let document_hash = hash_bytes(&document);
        Self {
            request_id: request.id(),
            document,
            document_format: PDF_MIME_TYPE,
            document_hash,
            target,
            title: job_title(request.description()),
            created_at: Utc::now(),
        }
    }
}

/// Acknowledgement that the spooler accepted a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReceipt {
    /// Spooler-assigned job id, when the response carried one.
    pub job_id: Option<i32>,
    pub printer: PrinterTarget,
    pub accepted_at: DateTime<Utc>,
}

/// Compute the SHA-256 hash of `data` as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn job_title(description: &str) -> String {
    let title: String = description.chars().take(MAX_JOB_TITLE_CHARS).collect();
    format!("qrprint: {title}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_http_and_https() {
        assert!(PrintRequest::new("https://example.org/doc", "Lab safety sheet").is_ok());
        assert!(PrintRequest::new("http://intranet.local", "Wiki").is_ok());
    }

    #[test]
    fn request_trims_fields() {
        let req = PrintRequest::new("  https://example.org  ", "  hello ").unwrap();
        assert_eq!(req.url(), "https://example.org");
        assert_eq!(req.description(), "hello");
    }

    #[test]
    fn request_rejects_other_schemes_and_relative_urls() {
        for url in ["ftp://example.org", "example.org/doc", "mailto:a@b.c", "https://"] {
            let err = PrintRequest::new(url, "x").unwrap_err();
            assert!(matches!(err, QrPrintError::InvalidRequest(_)), "{url}");
        }
    }

    #[test]
    fn request_requires_both_fields() {
        assert!(PrintRequest::new("", "desc").is_err());
        assert!(PrintRequest::new("https://example.org", "   ").is_err());
    }

    #[test]
    fn description_limit_counts_characters_not_bytes() {
        let at_limit = "é".repeat(MAX_DESCRIPTION_CHARS);
        assert!(PrintRequest::new("https://example.org", &at_limit).is_ok());

        let over = "a".repeat(MAX_DESCRIPTION_CHARS + 1);
        assert!(PrintRequest::new("https://example.org", &over).is_err());
    }

    #[test]
    fn error_correction_parses_case_insensitively() {
        assert_eq!("h".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::H);
        assert!("X".parse::<ErrorCorrection>().is_err());
    }

    #[test]
    fn job_takes_page_bytes_and_hashes_them() {
        let req = PrintRequest::new("https://example.org", "Lab safety sheet").unwrap();
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
            bytes: b"hello".to_vec(),
        };
        let target = PrinterTarget {
            identifier: "office".into(),
            uri: "ipp://localhost:631/printers/office".into(),
        };
        let job = PrintJob::new(&req, page, target);
        assert_eq!(job.request_id, req.id());
        assert_eq!(job.document, b"hello");
        assert_eq!(
            job.document_hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(job.title, "qrprint: Lab safety sheet");
        assert_eq!(job.document_format, "application/pdf");
    }

    #[test]
    fn printable_area_excludes_margins() {
        let page = Page {
            paper: PaperSize::LABEL,
            margin_mm: 10.0,
            code_box: LayoutRect {
                x_mm: 0.0,
                y_mm: 0.0,
                width_mm: 0.0,
                height_mm: 0.0,
            },
            lines: Vec::new(),
            bytes: Vec::new(),
        };
        let area = page.printable_area();
        assert_eq!(area.width_mm, 180.0);
        assert_eq!(area.height_mm, 230.0);
        assert_eq!(area.top_mm(), 240.0);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page inspector: reads a composed PDF back with `lopdf` to confirm its
// shape before it leaves the process.

use lopdf::{Dictionary, Document, Object, ObjectId};
use qrprint_core::error::{QrPrintError, Result};
use tracing::{debug, instrument};

use super::metrics::MM_PER_PT;

/// Guard against malformed `/Parent` cycles.
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Font descriptor keys that hold an embedded font program.
const FONT_FILE_KEYS: [&[u8]; 3] = [b"FontFile", b"FontFile2", b"FontFile3"];

/// Read-only view over a PDF produced by the composer.
pub struct PageInspector {
    document: Document,
}

impl PageInspector {
    /// Parse PDF bytes held in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| QrPrintError::Layout(format!("composed PDF is unreadable: {err}")))?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Media box of the first page as (width, height) in millimetres.
    ///
    /// Follows `/Parent` links when the box is inherited from the page tree.
    pub fn media_box_mm(&self) -> Result<(f32, f32)> {
        let first: ObjectId = *self
            .document
            .get_pages()
            .values()
            .next()
            .ok_or_else(|| QrPrintError::Layout("composed PDF has no pages".into()))?;

        let mut dict = self.dictionary(first)?;
        for _ in 0..MAX_PAGE_TREE_DEPTH {
            if let Ok(media_box) = dict.get(b"MediaBox") {
                return media_box_dimensions(media_box);
            }
            let parent = dict
                .get(b"Parent")
                .and_then(Object::as_reference)
                .map_err(|_| QrPrintError::Layout("page has no MediaBox".into()))?;
            dict = self.dictionary(parent)?;
        }
        Err(QrPrintError::Layout("page tree too deep".into()))
    }

    /// Number of image XObjects anywhere in the file.
    pub fn image_count(&self) -> usize {
        self.document
            .objects
            .values()
            .filter(|object| match object {
                Object::Stream(stream) => stream
                    .dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .is_ok_and(|name| name == b"Image"),
                _ => false,
            })
            .count()
    }

    /// Number of font descriptors that carry an embedded font program.
    pub fn embedded_font_count(&self) -> usize {
        self.document
            .objects
            .values()
            .filter_map(|object| object.as_dict().ok())
            .filter(|dict| {
                dict.get(b"Type")
                    .and_then(Object::as_name)
                    .is_ok_and(|name| name == b"FontDescriptor")
            })
            .filter(|dict| FONT_FILE_KEYS.iter().any(|key| dict.has(key)))
            .count()
    }

    /// Check the document is what the pipeline promises to send: exactly one
    /// page of `expected` size carrying at least one image.
    pub fn verify_single_page(&self, expected_mm: (f32, f32)) -> Result<()> {
        let pages = self.page_count();
        if pages != 1 {
            return Err(QrPrintError::Layout(format!("expected 1 page, found {pages}")));
        }
        let (w, h) = self.media_box_mm()?;
        if (w - expected_mm.0).abs() > 0.5 || (h - expected_mm.1).abs() > 0.5 {
            return Err(QrPrintError::Layout(format!(
                "page is {w:.1}x{h:.1} mm, expected {:.1}x{:.1} mm",
                expected_mm.0, expected_mm.1
            )));
        }
        if self.image_count() == 0 {
            return Err(QrPrintError::Layout("page carries no code image".into()));
        }
        Ok(())
    }

    fn dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.document
            .get_object(id)
            .and_then(Object::as_dict)
            .map_err(|err| QrPrintError::Layout(format!("bad page object {id:?}: {err}")))
    }
}

fn media_box_dimensions(object: &Object) -> Result<(f32, f32)> {
    let values = object
        .as_array()
        .map_err(|err| QrPrintError::Layout(format!("bad MediaBox: {err}")))?;
    let coords: Vec<f32> = values.iter().filter_map(|v| v.as_float().ok()).collect();
    match coords.as_slice() {
        [llx, lly, urx, ury] => Ok(((urx - llx) * MM_PER_PT, (ury - lly) * MM_PER_PT)),
        _ => Err(QrPrintError::Layout(format!(
            "MediaBox has {} numeric entries, expected 4",
            coords.len()
        ))),
    }
}

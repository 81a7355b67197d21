// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page composer: lays a QR code and its description onto one fixed-size page
// using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use image::DynamicImage;
use printpdf::{
    Mm, Op, ParsedFont, PdfDocument, PdfPage, PdfParseErrorSeverity, PdfSaveOptions, PdfWarnMsg,
    Point, Pt, RawImage, RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use qrprint_core::config::LayoutOptions;
use qrprint_core::error::{QrPrintError, Result};
use qrprint_core::types::{LayoutRect, MAX_DESCRIPTION_CHARS, Page, PaperSize, PlacedLine};
use tracing::{debug, info, instrument, warn};

use super::metrics::{FontMetrics, LABEL_FONT_TTF, MM_PER_PT, sanitize};
use crate::code::ScannableCode;

/// Resolution the code bitmap is declared at before scaling.
const IMAGE_DPI: f32 = 300.0;

/// Lays out a [`ScannableCode`] and a description on a single page.
///
/// The code sits horizontally centred against the top margin; the
/// description is word-wrapped and centred line by line beneath it. Anything
/// that does not fit is rejected rather than truncated.
#[derive(Debug, Clone)]
pub struct DocumentComposer {
    layout: LayoutOptions,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: String,
}

impl Default for DocumentComposer {
    fn default() -> Self {
        Self::new(LayoutOptions::default())
    }
}

impl DocumentComposer {
    pub fn new(layout: LayoutOptions) -> Self {
        Self {
            layout,
            title: "qrprint label".into(),
        }
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Compose `code` and `description` onto one page of `paper`.
    #[instrument(skip(self, code, description), fields(desc_chars = description.chars().count()))]
    pub fn compose(
        &self,
        code: &ScannableCode,
        description: &str,
        paper: PaperSize,
    ) -> Result<Page> {
        let font = FontMetrics::label_font()?;
        let (code_box, lines) = self.plan(&font, description, paper)?;
        let bytes = self.render(code, &code_box, &lines, paper)?;

        info!(
            bytes = bytes.len(),
            lines = lines.len(),
            "page composed"
        );

        Ok(Page {
            paper,
            margin_mm: self.layout.margin_mm,
            code_box,
            lines,
            bytes,
        })
    }

    /// Work out where everything goes, or why it cannot fit.
    fn plan(
        &self,
        font: &FontMetrics,
        description: &str,
        paper: PaperSize,
    ) -> Result<(LayoutRect, Vec<PlacedLine>)> {
        let chars = description.chars().count();
        if chars > MAX_DESCRIPTION_CHARS {
            return Err(QrPrintError::Layout(format!(
                "description is {chars} characters, limit is {MAX_DESCRIPTION_CHARS}"
            )));
        }

        let LayoutOptions {
            margin_mm,
            code_size_mm,
            text_gap_mm,
            font_size_pt,
            line_height_pt,
        } = self.layout;
        let (page_w, page_h) = paper.dimensions_mm();
        let usable_w = page_w - 2.0 * margin_mm;
        let usable_h = page_h - 2.0 * margin_mm;

        if code_size_mm > usable_w || code_size_mm > usable_h {
            return Err(QrPrintError::Layout(format!(
                "{code_size_mm} mm code does not fit the {usable_w}x{usable_h} mm printable area"
            )));
        }

        let code_box = LayoutRect {
            x_mm: (page_w - code_size_mm) / 2.0,
            y_mm: page_h - margin_mm - code_size_mm,
            width_mm: code_size_mm,
            height_mm: code_size_mm,
        };

        let font_mm = font_size_pt * MM_PER_PT;
        let line_mm = line_height_pt * MM_PER_PT;
        let first_baseline = code_box.y_mm - text_gap_mm - font_mm;

        let text = sanitize(description);
        let missing = font.missing_glyphs(&text);
        if !missing.is_empty() {
            warn!(?missing, "label font has no glyph for some characters");
        }

        let wrapped = font.wrap_text(&text, font_size_pt, usable_w);
        let lines: Vec<PlacedLine> = wrapped
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let width_mm = font.text_width_mm(&text, font_size_pt);
                PlacedLine {
                    x_mm: (page_w - width_mm) / 2.0,
                    baseline_mm: first_baseline - i as f32 * line_mm,
                    width_mm,
                    text,
                }
            })
            .collect();

        if let Some(last) = lines.last() {
            let bottom = last.baseline_mm - font.descent() * font_mm;
            if bottom < margin_mm {
                return Err(QrPrintError::Layout(format!(
                    "{} lines of text run {:.1} mm past the bottom margin",
                    lines.len(),
                    margin_mm - bottom
                )));
            }
        }

        debug!(
            code_x = code_box.x_mm,
            code_y = code_box.y_mm,
            lines = lines.len(),
            "layout planned"
        );
        Ok((code_box, lines))
    }

    /// Serialise the planned layout to PDF.
    fn render(
        &self,
        code: &ScannableCode,
        code_box: &LayoutRect,
        lines: &[PlacedLine],
        paper: PaperSize,
    ) -> Result<Vec<u8>> {
        let (page_w, page_h) = paper.dimensions_mm();
        let mut doc = PdfDocument::new(&self.title);

        let mut font_warnings: Vec<PdfWarnMsg> = Vec::new();
        let font = ParsedFont::from_bytes(LABEL_FONT_TTF, 0, &mut font_warnings)
            .ok_or_else(|| QrPrintError::Layout("label font could not be loaded".into()))?;
        log_warnings("loading the label font", &font_warnings);
        let font_id = doc.add_font(&font);

        // printpdf wants RGB samples; values stay strictly 0 or 255.
        let rgb = DynamicImage::ImageLuma8(code.image().clone()).to_rgb8();
        let side_px = code.size_px() as usize;
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: side_px,
            height: side_px,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let xobject_id = doc.add_image(&raw);

        let native_pt = side_px as f32 / IMAGE_DPI * 72.0;
        let scale = Mm(code_box.width_mm).into_pt().0 / native_pt;

        let mut ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Mm(code_box.x_mm).into_pt()),
                translate_y: Some(Mm(code_box.y_mm).into_pt()),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                rotate: None,
            },
        }];

        for line in lines {
            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Mm(line.x_mm).into_pt(),
                    y: Mm(line.baseline_mm).into_pt(),
                },
            });
            ops.push(Op::SetFontSize {
                size: Pt(self.layout.font_size_pt),
                font: font_id.clone(),
            });
            ops.push(Op::WriteText {
                items: vec![TextItem::Text(line.text.clone())],
                font: font_id.clone(),
            });
            ops.push(Op::EndTextSection);
        }

        doc.with_pages(vec![PdfPage::new(Mm(page_w), Mm(page_h), ops)]);

        // Lossy image recompression would introduce grey levels.
        let options = PdfSaveOptions {
            image_optimization: None,
            ..PdfSaveOptions::default()
        };
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&options, &mut warnings);
        log_warnings("saving", &warnings);
        Ok(output)
    }
}

fn log_warnings(during: &str, warnings: &[PdfWarnMsg]) {
    for w in warnings
        .iter()
        .filter(|w| w.severity != PdfParseErrorSeverity::Info)
    {
        warn!(severity = ?w.severity, "printpdf {during}: {}", w.msg);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label font and width-aware word wrapping.
//
// The description is set in Montserrat Regular, bundled with the crate and
// embedded into every PDF. Widths come from the font's own `hmtx` table, so
// what `wrap_text` measures is what the printer draws.

use owned_ttf_parser::{Face, GlyphId};
use qrprint_core::error::{QrPrintError, Result};

/// Millimetres per PostScript point.
pub const MM_PER_PT: f32 = 25.4 / 72.0;

/// Montserrat Regular, SIL Open Font License 1.1 (`assets/fonts/OFL.txt`).
pub(crate) static LABEL_FONT_TTF: &[u8] =
    include_bytes!("../../assets/fonts/Montserrat-Regular.ttf");

/// Horizontal metrics of the label font.
pub struct FontMetrics {
    face: Face<'static>,
    units_per_em: f32,
}

impl FontMetrics {
    /// Metrics of the bundled label font.
    pub fn label_font() -> Result<Self> {
        Self::from_bytes(LABEL_FONT_TTF)
    }

    /// Parse the first face of a TrueType or OpenType file.
    pub fn from_bytes(data: &'static [u8]) -> Result<Self> {
        let face = Face::parse(data, 0)
            .map_err(|err| QrPrintError::Layout(format!("label font is unreadable: {err}")))?;
        let units_per_em = f32::from(face.units_per_em());
        Ok(Self { face, units_per_em })
    }

    /// Depth of the descender below the baseline, as a fraction of the font size.
    pub fn descent(&self) -> f32 {
        -f32::from(self.face.descender()) / self.units_per_em
    }

    /// Whether the font has a glyph for `c`.
    pub fn has_glyph(&self, c: char) -> bool {
        self.face.glyph_index(c).is_some()
    }

    /// Characters of `text` that will print as the missing-glyph box.
    pub fn missing_glyphs(&self, text: &str) -> Vec<char> {
        let mut missing: Vec<char> = text
            .chars()
            .filter(|c| !c.is_whitespace() && !self.has_glyph(*c))
            .collect();
        missing.dedup();
        missing
    }

    fn advance_units(&self, c: char) -> u16 {
        let glyph = self.face.glyph_index(c).unwrap_or(GlyphId(0));
        self.face.glyph_hor_advance(glyph).unwrap_or(0)
    }

    /// Advance width of `text` at `font_size_pt`, in millimetres.
    pub fn text_width_mm(&self, text: &str, font_size_pt: f32) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(self.advance_units(c))).sum();
        units as f32 / self.units_per_em * font_size_pt * MM_PER_PT
    }

    /// Word-wrap `text` so that no line is wider than `max_width_mm`.
    ///
    /// Words wider than a whole line are broken at character boundaries.
    pub fn wrap_text(&self, text: &str, font_size_pt: f32, max_width_mm: f32) -> Vec<String> {
        let fits = |s: &str| self.text_width_mm(s, font_size_pt) <= max_width_mm;
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in text.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_owned()
            } else {
                format!("{current} {word}")
            };
            if fits(&candidate) {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if fits(word) {
                current.push_str(word);
                continue;
            }

            // Force-break the oversized word.
            for c in word.chars() {
                current.push(c);
                if !fits(&current) && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }
}

/// Drop control characters and fold whitespace runs into single spaces.
pub fn sanitize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR encoder: turns text into a module matrix with the `qrcode` crate, then
// rasterises it into a strictly black-on-white bitmap with `image` and
// `imageproc`.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use qrcode::{Color, EcLevel, QrCode, Version};
use qrprint_core::config::CodeOptions;
use qrprint_core::error::{QrPrintError, Result};
use qrprint_core::types::ErrorCorrection;
use tracing::{debug, instrument};

/// Smallest quiet zone scanners reliably cope with, in modules.
pub const MIN_QUIET_ZONE: u32 = 4;

/// Largest bitmap edge the encoder will allocate, in pixels.
pub const MAX_SIDE_PX: u32 = 16_384;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// An encoded and rasterised QR symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannableCode {
    /// Row-major module matrix, `true` is dark. Quiet zone not included.
    modules: Vec<bool>,
    /// Modules per side.
    width: usize,
    version: i16,
    error_correction: ErrorCorrection,
    module_px: u32,
    quiet_zone: u32,
    image: GrayImage,
}

impl ScannableCode {
    /// Modules per side, quiet zone excluded.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Symbol version (1..=40).
    pub fn version(&self) -> i16 {
        self.version
    }

    pub fn error_correction(&self) -> ErrorCorrection {
        self.error_correction
    }

    pub fn module_px(&self) -> u32 {
        self.module_px
    }

    /// Quiet zone actually rendered, in modules.
    pub fn quiet_zone(&self) -> u32 {
        self.quiet_zone
    }

    /// Whether the module at column `x`, row `y` is dark.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }

    /// The rendered bitmap, quiet zone included.
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Edge length of the bitmap in pixels.
    pub fn size_px(&self) -> u32 {
        self.image.width()
    }

    /// Encode the bitmap as PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| QrPrintError::Encoding(format!("PNG encoding failed: {e}")))?;
        Ok(buffer.into_inner())
    }
}

/// Encodes text into [`ScannableCode`]s with fixed parameters.
#[derive(Debug, Clone, Copy)]
pub struct CodeEncoder {
    options: CodeOptions,
}

impl Default for CodeEncoder {
    fn default() -> Self {
        Self::new(CodeOptions::default())
    }
}

impl CodeEncoder {
    pub fn new(options: CodeOptions) -> Self {
        Self { options }
    }

    /// Default parameters at the given error-correction level.
    pub fn with_error_correction(error_correction: ErrorCorrection) -> Self {
        Self::new(CodeOptions {
            error_correction,
            ..CodeOptions::default()
        })
    }

    /// Encode `data` into the smallest symbol that holds it.
    ///
    /// Fails with [`QrPrintError::Encoding`] when `data` is empty or does not
    /// fit at the configured level within `max_version`.
    #[instrument(skip(self, data), fields(data_len = data.len(), ec = ?self.options.error_correction))]
    pub fn encode(&self, data: &str) -> Result<ScannableCode> {
        if data.is_empty() {
            return Err(QrPrintError::Encoding("nothing to encode".into()));
        }
        if self.options.module_px == 0 {
            return Err(QrPrintError::Encoding("module size must be at least 1 pixel".into()));
        }

        let level = self.options.error_correction;
        let code = QrCode::with_error_correction_level(data.as_bytes(), ec_level(level)).map_err(
            |e| {
                QrPrintError::Encoding(format!(
                    "{} bytes at level {level:?}: {e}",
                    data.len()
                ))
            },
        )?;

        let version = match code.version() {
            Version::Normal(v) | Version::Micro(v) => v,
        };
        if version > self.options.max_version {
            return Err(QrPrintError::Encoding(format!(
                "{} bytes at level {level:?} need version {version}, limit is {}",
                data.len(),
                self.options.max_version
            )));
        }

        let width = code.width();
        let modules: Vec<bool> = code
            .to_colors()
            .into_iter()
            .map(|c| c == Color::Dark)
            .collect();

        let quiet_zone = self.options.quiet_zone.max(MIN_QUIET_ZONE);
        let image = rasterize(&modules, width, self.options.module_px, quiet_zone)?;

        debug!(version, width, size_px = image.width(), "code encoded");

        Ok(ScannableCode {
            modules,
            width,
            version,
            error_correction: level,
            module_px: self.options.module_px,
            quiet_zone,
            image,
        })
    }
}

/// Encode `data` with default parameters at `error_correction`.
pub fn encode(data: &str, error_correction: ErrorCorrection) -> Result<ScannableCode> {
    CodeEncoder::with_error_correction(error_correction).encode(data)
}

fn ec_level(level: ErrorCorrection) -> EcLevel {
    match level {
        ErrorCorrection::L => EcLevel::L,
        ErrorCorrection::M => EcLevel::M,
        ErrorCorrection::Q => EcLevel::Q,
        ErrorCorrection::H => EcLevel::H,
    }
}

/// Edge length in pixels of a `width`-module symbol, or `None` when it
/// overflows or exceeds [`MAX_SIDE_PX`].
fn side_px(width: usize, module_px: u32, quiet_zone: u32) -> Option<u32> {
    u32::try_from(width)
        .ok()?
        .checked_add(quiet_zone.checked_mul(2)?)?
        .checked_mul(module_px)
        .filter(|side| *side <= MAX_SIDE_PX)
}

/// Paint each dark module as a `module_px` square on a white canvas that
/// leaves `quiet_zone` modules clear on every edge.
fn rasterize(
    modules: &[bool],
    width: usize,
    module_px: u32,
    quiet_zone: u32,
) -> Result<GrayImage> {
    let side = side_px(width, module_px, quiet_zone).ok_or_else(|| {
        QrPrintError::Encoding(format!(
            "{width} modules at {module_px} px with a {quiet_zone}-module quiet zone \
             exceed the {MAX_SIDE_PX} px bitmap limit"
        ))
    })?;
    let mut img = GrayImage::from_pixel(side, side, LIGHT);

    for (i, dark) in modules.iter().enumerate() {
        if !dark {
            continue;
        }
        let x = (i % width) as u32 + quiet_zone;
        let y = (i / width) as u32 + quiet_zone;
        let rect = Rect::at((x * module_px) as i32, (y * module_px) as i32)
            .of_size(module_px, module_px);
        draw_filled_rect_mut(&mut img, rect, DARK);
    }

    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_code() {
        let a = encode("https://example.org/doc", ErrorCorrection::L).unwrap();
        let b = encode("https://example.org/doc", ErrorCorrection::L).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = encode("", ErrorCorrection::M).unwrap_err();
        assert!(matches!(err, QrPrintError::Encoding(_)));
    }

    #[test]
    fn byte_capacity_limits_per_level() {
        // Version 40 byte-mode capacity: L = 2953, H = 1273.
        assert!(encode(&"x".repeat(2953), ErrorCorrection::L).is_ok());
        assert!(matches!(
            encode(&"x".repeat(2954), ErrorCorrection::L),
            Err(QrPrintError::Encoding(_))
        ));
        assert!(encode(&"x".repeat(1273), ErrorCorrection::H).is_ok());
        assert!(matches!(
            encode(&"x".repeat(1274), ErrorCorrection::H),
            Err(QrPrintError::Encoding(_))
        ));
    }

    #[test]
    fn max_version_caps_capacity() {
        let encoder = CodeEncoder::new(CodeOptions {
            max_version: 2,
            ..CodeOptions::default()
        });
        assert_eq!(encoder.encode("hi").unwrap().version(), 1);
        assert!(encoder.encode(&"x".repeat(200)).is_err());
    }

    #[test]
    fn short_url_uses_small_version() {
        let code = encode("https://example.org/doc", ErrorCorrection::M).unwrap();
        assert_eq!(code.version(), 2);
        assert_eq!(code.width(), 25);
    }

    #[test]
    fn bitmap_is_pure_black_and_white() {
        let code = encode("https://example.org/doc", ErrorCorrection::Q).unwrap();
        assert!(code.image().pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn bitmap_has_quiet_zone_and_scaled_modules() {
        let code = encode("https://example.org/doc", ErrorCorrection::M).unwrap();
        let px = code.module_px();
        let qz = code.quiet_zone();
        assert_eq!(code.size_px(), (code.width() as u32 + 2 * qz) * px);

        // Whole quiet-zone band along the top is white.
        for y in 0..qz * px {
            for x in 0..code.size_px() {
                assert_eq!(code.image().get_pixel(x, y).0[0], 255);
            }
        }
        // Top-left finder pattern corner is dark and spans a full module.
        assert!(code.is_dark(0, 0));
        for dy in 0..px {
            for dx in 0..px {
                assert_eq!(code.image().get_pixel(qz * px + dx, qz * px + dy).0[0], 0);
            }
        }
    }

    #[test]
    fn quiet_zone_is_never_below_four_modules() {
        let encoder = CodeEncoder::new(CodeOptions {
            quiet_zone: 1,
            ..CodeOptions::default()
        });
        assert_eq!(encoder.encode("hello").unwrap().quiet_zone(), MIN_QUIET_ZONE);
    }

    #[test]
    fn oversized_bitmap_is_an_encoding_error() {
        for (module_px, quiet_zone) in [(40_000_000, 4), (u32::MAX, 4), (10, u32::MAX / 2)] {
            let encoder = CodeEncoder::new(CodeOptions {
                module_px,
                quiet_zone,
                ..CodeOptions::default()
            });
            let err = encoder.encode("https://example.org/doc").unwrap_err();
            assert!(matches!(err, QrPrintError::Encoding(_)), "{module_px} px: {err:?}");
        }
    }

    #[test]
    fn side_length_checks_overflow_and_limit() {
        assert_eq!(side_px(25, 10, 4), Some(330));
        assert_eq!(side_px(177, 32, 16), Some(6688));
        assert_eq!(side_px(25, u32::MAX, 4), None);
        assert_eq!(side_px(25, 1, u32::MAX), None);
        assert_eq!(side_px(25, 1000, 4), None);
    }

    #[test]
    fn png_export_has_signature() {
        let code = encode("hello", ErrorCorrection::L).unwrap();
        let png = code.to_png_bytes().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}

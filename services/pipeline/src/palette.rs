//! Dominant-color palette extraction from poster image bytes.

use crate::error::PipelineError;
use color_thief::ColorFormat;
use serde::{Deserialize, Serialize};

/// A single palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Capability seam over the external color quantizer.
///
/// The pipeline only cares about getting an ordered list of representative
/// colors out of raw image bytes; how they are computed is a black box.
pub trait PaletteExtractor: Send + Sync {
    /// Extract up to `color_count` dominant colors from encoded image bytes.
    fn extract(&self, bytes: &[u8], color_count: usize) -> Result<Vec<Rgb>, PipelineError>;
}

/// Production extractor backed by the color-thief quantizer.
#[derive(Debug, Clone)]
pub struct ColorThiefExtractor {
    /// Quantizer quality, 1 (best) to 10 (fastest)
    pub quality: u8,
}

impl Default for ColorThiefExtractor {
    fn default() -> Self {
        Self { quality: 10 }
    }
}

impl ColorThiefExtractor {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }
}

impl PaletteExtractor for ColorThiefExtractor {
    fn extract(&self, bytes: &[u8], color_count: usize) -> Result<Vec<Rgb>, PipelineError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| PipelineError::Decode(e.to_string()))?
            .to_rgb8();

        let mut colors = color_thief::get_palette(
            decoded.as_raw(),
            ColorFormat::Rgb,
            self.quality,
            color_count as u8,
        )
        .map_err(|e| PipelineError::Quantize(format!("{e:?}")))?
        .into_iter()
        .map(|c| Rgb::new(c.r, c.g, c.b))
        .collect::<Vec<_>>();

        // The quantizer may hand back more boxes than asked for; the renderer
        // requires an exact match with the layout's cell count.
        colors.truncate(color_count);
        Ok(colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undecodable_bytes_fail_with_decode_error() {
        let extractor = ColorThiefExtractor::default();
        let result = extractor.extract(b"definitely not an image", 5);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_rich_image_yields_requested_color_count() {
        // Smooth gradient gives the quantizer plenty of distinct colors.
        let gradient = image::RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8])
        });
        let mut bytes = Vec::new();
        gradient
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();

        let extractor = ColorThiefExtractor::default();
        let palette = extractor.extract(&bytes, 5).unwrap();
        assert!(!palette.is_empty());
        assert!(palette.len() <= 5);
    }
}

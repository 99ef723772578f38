//! Palette grid rendering.
//!
//! Turns an ordered palette into a fixed-layout PNG: the canvas is split into
//! equal cells in row-major order and cell `i` is filled with `palette[i]`.
//! Pure function of (palette, layout, output path); no randomness, no I/O
//! beyond the final file write.

use crate::palette::Rgb;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while rendering the palette image
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("palette has {actual} colors but the layout needs {expected}")]
    InsufficientColors { expected: usize, actual: usize },

    #[error("failed to encode palette image: {0}")]
    Encode(String),
}

/// Fixed grid layout for the rendered palette image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GridLayout {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Number of cell rows
    pub rows: u32,
    /// Number of cell columns
    pub columns: u32,
}

impl GridLayout {
    /// Single-row five-cell strip used for reply posts.
    pub const fn reply_strip() -> Self {
        Self {
            width: 1600,
            height: 900,
            rows: 1,
            columns: 5,
        }
    }

    /// Two-column eight-cell grid used for discovery posts.
    pub const fn discovery_grid() -> Self {
        Self {
            width: 1600,
            height: 1400,
            rows: 4,
            columns: 2,
        }
    }

    /// Total number of cells, which also fixes the required palette length.
    pub fn cell_count(&self) -> usize {
        (self.rows * self.columns) as usize
    }

    /// Pixel bounds of cell `index` as (x0, y0, x1, y1), exclusive on the
    /// high edge. Cells are laid out row-major; the last row and column
    /// absorb any remainder so the canvas is fully covered.
    pub fn cell_rect(&self, index: usize) -> (u32, u32, u32, u32) {
        let row = index as u32 / self.columns;
        let col = index as u32 % self.columns;
        let cell_w = self.width / self.columns;
        let cell_h = self.height / self.rows;

        let x0 = col * cell_w;
        let y0 = row * cell_h;
        let x1 = if col + 1 == self.columns {
            self.width
        } else {
            x0 + cell_w
        };
        let y1 = if row + 1 == self.rows {
            self.height
        } else {
            y0 + cell_h
        };
        (x0, y0, x1, y1)
    }
}

/// Render `palette` into a solid-color grid and write it to `path` as PNG.
///
/// Fails without touching the filesystem when the palette length does not
/// match the layout's cell count; overwrites any existing file on success.
pub fn render_palette(
    palette: &[Rgb],
    layout: &GridLayout,
    path: &Path,
) -> Result<PathBuf, RenderError> {
    if palette.len() != layout.cell_count() {
        return Err(RenderError::InsufficientColors {
            expected: layout.cell_count(),
            actual: palette.len(),
        });
    }

    let mut canvas = image::RgbImage::new(layout.width, layout.height);
    for (index, color) in palette.iter().enumerate() {
        let (x0, y0, x1, y1) = layout.cell_rect(index);
        for y in y0..y1 {
            for x in x0..x1 {
                canvas.put_pixel(x, y, image::Rgb([color.r, color.g, color.b]));
            }
        }
    }

    canvas
        .save(path)
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    debug!(path = %path.display(), cells = layout.cell_count(), "Palette image written");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_center(path: &Path, layout: &GridLayout, index: usize) -> Rgb {
        let img = image::open(path).unwrap().to_rgb8();
        let (x0, y0, x1, y1) = layout.cell_rect(index);
        let pixel = img.get_pixel((x0 + x1) / 2, (y0 + y1) / 2);
        Rgb::new(pixel[0], pixel[1], pixel[2])
    }

    #[test]
    fn test_reply_strip_cell_colors_match_palette_order() {
        let layout = GridLayout::reply_strip();
        let palette = vec![
            Rgb::new(255, 0, 0),
            Rgb::new(0, 255, 0),
            Rgb::new(0, 0, 255),
            Rgb::new(255, 255, 0),
            Rgb::new(0, 255, 255),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palette.png");

        render_palette(&palette, &layout, &path).unwrap();

        for (i, expected) in palette.iter().enumerate() {
            assert_eq!(sample_center(&path, &layout, i), *expected);
        }
    }

    #[test]
    fn test_discovery_grid_is_row_major() {
        let layout = GridLayout::discovery_grid();
        let palette: Vec<Rgb> = (0..8).map(|i| Rgb::new(i as u8 * 30, 10, 200)).collect();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.png");

        render_palette(&palette, &layout, &path).unwrap();

        // Cell 2 starts the second row: left column, second band down.
        assert_eq!(layout.cell_rect(2), (0, 350, 800, 700));
        for (i, expected) in palette.iter().enumerate() {
            assert_eq!(sample_center(&path, &layout, i), *expected);
        }
    }

    #[test]
    fn test_short_palette_is_rejected_without_writing() {
        let layout = GridLayout::reply_strip();
        let palette = vec![Rgb::new(1, 2, 3); 3];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rejected.png");

        let result = render_palette(&palette, &layout, &path);
        assert!(matches!(
            result,
            Err(RenderError::InsufficientColors {
                expected: 5,
                actual: 3
            })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_last_column_absorbs_remainder() {
        let layout = GridLayout {
            width: 100,
            height: 30,
            rows: 1,
            columns: 3,
        };
        assert_eq!(layout.cell_rect(0), (0, 0, 33, 30));
        assert_eq!(layout.cell_rect(2), (66, 0, 100, 30));
    }
}

//! In-memory bitmap canvas shared by all renderers
//!
//! Charts are drawn into an RGB buffer with the plotters bitmap backend,
//! cropped to their content and only then optionally written as PNG.

use image::{ImageFormat, Rgb, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Errors that can occur during chart rendering
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Bitmap buffer does not match {width}x{height}")]
    Buffer { width: u32, height: u32 },

    #[error("Failed to save chart: {0}")]
    Save(#[from] image::ImageError),
}

impl RenderError {
    pub fn drawing(err: impl Display) -> Self {
        RenderError::Drawing(err.to_string())
    }
}

/// A finished, cropped chart image.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    image: RgbImage,
}

impl RenderedChart {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True when no pixel differs from the background.
    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| *p == BACKGROUND)
    }

    /// Encode as PNG at `path`.
    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        self.image.save_with_format(path, ImageFormat::Png)?;
        log::info!(
            "Chart saved as {} ({}x{} px)",
            path.display(),
            self.width(),
            self.height()
        );
        Ok(())
    }

    /// Save when an output path is given, then hand the chart back.
    pub fn save_to(self, output: Option<&Path>) -> Result<Self, RenderError> {
        if let Some(path) = output {
            self.save(path)?;
        }
        Ok(self)
    }
}

/// Draw onto a white `size` canvas and crop the result to its content plus
/// `pad` pixels on every side.
pub fn render_bitmap<F>(size: (u32, u32), pad: u32, draw: F) -> Result<RenderedChart, RenderError>
where
    F: for<'a> FnOnce(&DrawingArea<BitMapBackend<'a>, Shift>) -> Result<(), RenderError>,
{
    let (width, height) = size;
    let mut buffer = vec![255u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area();
        root.fill(&WHITE).map_err(RenderError::drawing)?;
        draw(&root)?;
        root.present().map_err(RenderError::drawing)?;
    }

    let image =
        RgbImage::from_raw(width, height, buffer).ok_or(RenderError::Buffer { width, height })?;
    let chart = RenderedChart {
        image: crop_to_content(image, pad),
    };
    if chart.is_blank() {
        log::warn!("Rendered chart has no visible content");
    }
    Ok(chart)
}

/// Tight bounding box: keep the smallest rectangle holding every
/// non-background pixel, grown by `pad` and clamped to the image.
pub fn crop_to_content(image: RgbImage, pad: u32) -> RgbImage {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if *pixel == BACKGROUND {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    let Some((x0, y0, x1, y1)) = bounds else {
        return image;
    };

    let left = x0.saturating_sub(pad);
    let top = y0.saturating_sub(pad);
    let right = (x1 + pad).min(image.width() - 1);
    let bottom = (y1 + pad).min(image.height() - 1);

    image::imageops::crop_imm(&image, left, top, right - left + 1, bottom - top + 1).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_to_content_with_padding() {
        let mut image = RgbImage::from_pixel(100, 80, BACKGROUND);
        image.put_pixel(40, 30, Rgb([0, 0, 0]));
        image.put_pixel(60, 35, Rgb([10, 20, 30]));

        let cropped = crop_to_content(image, 5);

        assert_eq!(cropped.dimensions(), (31, 16));
        assert_eq!(*cropped.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_crop_clamps_to_edges() {
        let mut image = RgbImage::from_pixel(20, 20, BACKGROUND);
        image.put_pixel(0, 19, Rgb([0, 0, 0]));

        let cropped = crop_to_content(image, 4);

        assert_eq!(cropped.dimensions(), (5, 5));
    }

    #[test]
    fn test_crop_keeps_blank_image() {
        let image = RgbImage::from_pixel(12, 9, BACKGROUND);
        assert_eq!(crop_to_content(image, 3).dimensions(), (12, 9));
    }

    #[test]
    fn test_render_bitmap_shapes_only() {
        let chart = render_bitmap((200, 100), 2, |root| {
            root.draw(&Rectangle::new([(50, 20), (80, 40)], BLACK.filled()))
                .map_err(RenderError::drawing)
        })
        .unwrap();

        assert!(!chart.is_blank());
        assert!((34..=36).contains(&chart.width()), "width {}", chart.width());
        assert!((24..=26).contains(&chart.height()), "height {}", chart.height());
    }

    #[test]
    fn test_save_writes_png() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chart.png");
        let chart = render_bitmap((50, 50), 0, |root| {
            root.draw(&Circle::new((25, 25), 10, RED.filled()))
                .map_err(RenderError::drawing)
        })
        .unwrap();

        chart.clone().save_to(Some(&path)).unwrap();

        let reloaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(reloaded.dimensions(), (chart.width(), chart.height()));
    }
}

//! Chart presentation settings
//!
//! A single [`ChartStyle`] value is passed to each renderer; nothing here is
//! process-wide state. Sizes are given in typographic points and figure sizes
//! in inches, converted to pixels with the configured DPI.

use plotters::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Highest accepted output resolution
pub const MAX_DPI: u32 = 1200;

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("Failed to read style file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid style file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid style: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    /// Output resolution
    pub dpi: u32,
    pub font_family: String,
    /// Base text size (annotations, statistics boxes)
    pub font_size: f64,
    /// Axis descriptions
    pub label_size: f64,
    pub title_size: f64,
    /// Tick labels
    pub tick_size: f64,
    pub legend_size: f64,
    pub node_label_size: f64,
    /// Series and box colours, cycled by index
    pub palette: Vec<[u8; 3]>,
    pub grid_color: [u8; 3],
    /// Width and height in inches
    pub line_chart_size: (f64, f64),
    pub boxplot_size: (f64, f64),
    pub network_size: (f64, f64),
    /// Whitespace kept around the cropped drawing, in inches
    pub pad_inches: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            dpi: 300,
            font_family: "sans-serif".to_string(),
            font_size: 12.0,
            label_size: 14.0,
            title_size: 16.0,
            tick_size: 12.0,
            legend_size: 12.0,
            node_label_size: 10.0,
            palette: vec![
                [0x00, 0x3f, 0x5c],
                [0x2f, 0x4b, 0x7c],
                [0x66, 0x51, 0x91],
                [0xa0, 0x51, 0x95],
                [0xd4, 0x50, 0x87],
                [0xf9, 0x5d, 0x6a],
                [0xff, 0x7c, 0x43],
                [0xff, 0xa6, 0x00],
            ],
            grid_color: [0xcc, 0xcc, 0xcc],
            line_chart_size: (14.0, 8.0),
            boxplot_size: (14.0, 8.0),
            network_size: (14.0, 10.0),
            pad_inches: 0.1,
        }
    }
}

impl ChartStyle {
    /// Read a JSON file; fields it leaves out keep their defaults.
    pub fn load(path: &Path) -> Result<Self, StyleError> {
        let text = fs::read_to_string(path)?;
        let style: ChartStyle = serde_json::from_str(&text)?;
        style.validate()?;
        Ok(style)
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn validate(&self) -> Result<(), StyleError> {
        if self.dpi == 0 {
            return Err(StyleError::Invalid("dpi must be positive".into()));
        }
        if self.dpi > MAX_DPI {
            return Err(StyleError::Invalid(format!("dpi must be at most {}", MAX_DPI)));
        }
        if self.palette.is_empty() {
            return Err(StyleError::Invalid("palette must not be empty".into()));
        }
        for (name, (w, h)) in [
            ("line_chart_size", self.line_chart_size),
            ("boxplot_size", self.boxplot_size),
            ("network_size", self.network_size),
        ] {
            if !(w > 0.0 && h > 0.0) {
                return Err(StyleError::Invalid(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }

    /// Points to pixels.
    pub fn px(&self, points: f64) -> f64 {
        points * self.dpi as f64 / 72.0
    }

    /// Points to whole pixels, never less than one.
    pub fn px_u32(&self, points: f64) -> u32 {
        (self.px(points).round() as u32).max(1)
    }

    /// Figure size in inches to pixel dimensions.
    pub fn figure_pixels(&self, inches: (f64, f64)) -> (u32, u32) {
        let dpi = self.dpi as f64;
        (
            ((inches.0 * dpi).round() as u32).max(1),
            ((inches.1 * dpi).round() as u32).max(1),
        )
    }

    pub fn pad_pixels(&self) -> u32 {
        (self.pad_inches * self.dpi as f64).round() as u32
    }

    pub fn color(&self, index: usize) -> RGBColor {
        let [r, g, b] = self.palette[index % self.palette.len()];
        RGBColor(r, g, b)
    }

    pub fn grid(&self) -> RGBColor {
        let [r, g, b] = self.grid_color;
        RGBColor(r, g, b)
    }

    /// Font of `points` size in the configured family.
    pub fn font(&self, points: f64) -> FontDesc<'_> {
        (self.font_family.as_str(), self.px(points)).into_font()
    }

    pub fn bold_font(&self, points: f64) -> FontDesc<'_> {
        self.font(points).style(FontStyle::Bold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_point_and_inch_conversion() {
        let style = ChartStyle::default();
        assert_eq!(style.px(72.0), 300.0);
        assert_eq!(style.figure_pixels(style.line_chart_size), (4200, 2400));
        assert_eq!(style.pad_pixels(), 30);
        assert_eq!(style.with_dpi(100).figure_pixels((14.0, 10.0)), (1400, 1000));
    }

    #[test]
    fn test_palette_cycles() {
        let style = ChartStyle::default();
        assert_eq!(style.color(0), RGBColor(0x00, 0x3f, 0x5c));
        assert_eq!(style.color(8), style.color(0));
    }

    #[test]
    fn test_load_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"dpi": 150, "title_size": 20.0}}"#).unwrap();

        let style = ChartStyle::load(file.path()).unwrap();

        assert_eq!(style.dpi, 150);
        assert_eq!(style.title_size, 20.0);
        assert_eq!(style.font_size, 12.0);
    }

    #[test]
    fn test_load_rejects_zero_dpi() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"dpi": 0}}"#).unwrap();

        assert!(matches!(
            ChartStyle::load(file.path()),
            Err(StyleError::Invalid(_))
        ));
    }

    #[test]
    fn test_dpi_above_limit_is_rejected() {
        assert!(ChartStyle::default().with_dpi(MAX_DPI).validate().is_ok());
        assert!(matches!(
            ChartStyle::default().with_dpi(100_000).validate(),
            Err(StyleError::Invalid(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"dpi": 100000}}"#).unwrap();
        assert!(matches!(
            ChartStyle::load(file.path()),
            Err(StyleError::Invalid(_))
        ));
    }
}

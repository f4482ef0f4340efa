//! Yearly boxplot with a sampled scatter and per-year summary text.

use crate::charts::canvas::{self, RenderError, RenderedChart};
use crate::charts::style::ChartStyle;
use crate::data::{DataProcessor, Observation};
use crate::stats::{BoxSummary, GroupStats, JitteredPoint, StatsCalculator};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use rand::Rng;
use std::path::Path;

/// Seed for the scatter sample. Changing it changes which points are drawn.
pub const SAMPLE_SEED: u64 = 42;
pub const MAX_SAMPLE_POINTS: usize = 30;
/// Horizontal jitter of sampled points, in category units.
pub const JITTER: f64 = 0.2;

const BOX_WIDTH: f64 = 0.7;
/// Summary text offset from the year's minimum, in rate units.
const STATS_TEXT_DROP: f64 = 0.15;
const STATS_TEXT_SHIFT: f64 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct YearDistribution {
    pub year: i32,
    pub stats: GroupStats,
    pub summary: BoxSummary,
    pub sample: Vec<JitteredPoint>,
}

impl YearDistribution {
    pub fn stats_text(&self) -> String {
        format!(
            "Média: {:.2}\nMed: {:.2}\nDP: {:.2}",
            self.stats.mean, self.stats.median, self.stats.std
        )
    }
}

pub struct DistributionChart;

impl DistributionChart {
    /// Per-year summaries in ascending year order, sampled with `rng`.
    pub fn summarize<R: Rng>(observations: &[Observation], rng: &mut R) -> Vec<YearDistribution> {
        DataProcessor::rates_by_year(observations)
            .into_iter()
            .filter_map(|(year, rates)| {
                let summary = StatsCalculator::box_summary(&rates)?;
                Some(YearDistribution {
                    year,
                    stats: StatsCalculator::compute_descriptive_stats(&rates),
                    summary,
                    sample: StatsCalculator::sample_jittered(&rates, MAX_SAMPLE_POINTS, JITTER, rng),
                })
            })
            .collect()
    }

    pub fn render(
        observations: &[Observation],
        style: &ChartStyle,
        output: Option<&Path>,
    ) -> Result<RenderedChart, RenderError> {
        log::info!("Creating yearly boxplot (descriptive statistics)...");
        if observations.is_empty() {
            return Err(RenderError::InvalidData(
                "boxplot needs at least one observation".to_string(),
            ));
        }

        let mut rng = StatsCalculator::seeded_rng(SAMPLE_SEED);
        let years = Self::summarize(observations, &mut rng);
        for year in &years {
            log::debug!(
                "Year {}: {} readings, IQR {:.2}-{:.2}, {} outliers",
                year.year,
                year.stats.count,
                year.stats.q1,
                year.stats.q3,
                year.summary.outliers.len()
            );
        }

        let chart = canvas::render_bitmap(
            style.figure_pixels(style.boxplot_size),
            style.pad_pixels(),
            |root| Self::draw(root, &years, style),
        )?;
        chart.save_to(output)
    }

    fn draw<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        years: &[YearDistribution],
        style: &ChartStyle,
    ) -> Result<(), RenderError> {
        let (first, last) = match (years.first(), years.last()) {
            (Some(first), Some(last)) => (first.year, last.year),
            _ => return Err(RenderError::InvalidData("no yearly groups".to_string())),
        };

        let (lo, hi) = years.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
            (lo.min(y.stats.min), hi.max(y.stats.max))
        });
        let pad = ((hi - lo) * 0.05).max(0.05);
        let y_range = (lo - STATS_TEXT_DROP - pad)..(hi + pad);
        let x_range = -0.6..(years.len() as f64 - 0.4);

        let mut chart = ChartBuilder::on(root)
            .caption(
                format!("Distribuição da Taxa de Câmbio USD/BRL por Ano ({}-{})", first, last),
                style.bold_font(style.title_size),
            )
            .margin(style.px_u32(12.0))
            .x_label_area_size(style.px_u32(42.0))
            .y_label_area_size(style.px_u32(56.0))
            .build_cartesian_2d(x_range, y_range)
            .map_err(RenderError::drawing)?;

        let year_label = |x: &f64| {
            let index = x.round();
            if (x - index).abs() > 1e-6 || index < 0.0 {
                return String::new();
            }
            years
                .get(index as usize)
                .map(|y| y.year.to_string())
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(years.len() + 1)
            .x_label_formatter(&year_label)
            .y_labels(10)
            .x_desc("Ano")
            .y_desc("Taxa de Câmbio (USD/BRL)")
            .axis_desc_style(style.font(style.label_size))
            .label_style(style.font(style.tick_size))
            .bold_line_style(style.grid().mix(0.7))
            .light_line_style(TRANSPARENT)
            .draw()
            .map_err(RenderError::drawing)?;

        let outline = BLACK.stroke_width(style.px_u32(1.5));
        let half = BOX_WIDTH / 2.0;

        for (i, year) in years.iter().enumerate() {
            let x = i as f64;
            let summary = &year.summary;

            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x - half, summary.q1), (x + half, summary.q3)],
                    style.color(i).filled(),
                )))
                .map_err(RenderError::drawing)?;

            let segments = [
                vec![
                    (x - half, summary.q1),
                    (x + half, summary.q1),
                    (x + half, summary.q3),
                    (x - half, summary.q3),
                    (x - half, summary.q1),
                ],
                vec![(x - half, summary.median), (x + half, summary.median)],
                vec![(x, summary.q1), (x, summary.whisker_low)],
                vec![(x, summary.q3), (x, summary.whisker_high)],
                vec![(x - half / 2.0, summary.whisker_low), (x + half / 2.0, summary.whisker_low)],
                vec![(x - half / 2.0, summary.whisker_high), (x + half / 2.0, summary.whisker_high)],
            ];
            chart
                .draw_series(segments.into_iter().map(|points| PathElement::new(points, outline)))
                .map_err(RenderError::drawing)?;

            // Fliers
            chart
                .draw_series(summary.outliers.iter().map(|&v| {
                    Circle::new((x, v), style.px_u32(2.5), BLACK.stroke_width(style.px_u32(0.8)))
                }))
                .map_err(RenderError::drawing)?;
        }

        let dot = BLACK.mix(0.5).filled();
        chart
            .draw_series(years.iter().enumerate().flat_map(|(i, year)| {
                year.sample
                    .iter()
                    .map(move |p| Circle::new((i as f64 + p.offset, p.value), style.px_u32(1.5), dot))
            }))
            .map_err(RenderError::drawing)?;

        Self::draw_stats_boxes(root, &mut chart, years, style)
    }

    /// Summary text whose last line sits on `(index - 0.4, min - 0.15)`.
    fn draw_stats_boxes<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
        years: &[YearDistribution],
        style: &ChartStyle,
    ) -> Result<(), RenderError> {
        let text_style = style.font(style.font_size * 0.75).color(&BLACK);
        let line_height = style.px(style.font_size * 0.75 * 1.25) as i32;
        let pad = style.px(style.font_size * 0.4) as i32;

        for (i, year) in years.iter().enumerate() {
            let text = year.stats_text();
            let lines: Vec<&str> = text.lines().collect();
            let mut text_width = 0i32;
            for line in &lines {
                let (w, _) = root
                    .estimate_text_size(line, &text_style)
                    .map_err(RenderError::drawing)?;
                text_width = text_width.max(w as i32);
            }
            let top = -(lines.len() as i32) * line_height;
            let anchor = (i as f64 - STATS_TEXT_SHIFT, year.stats.min - STATS_TEXT_DROP);
            let corners = [(-pad, top - pad), (text_width + pad, pad)];

            chart
                .draw_series(std::iter::once(
                    EmptyElement::at(anchor)
                        + Rectangle::new(corners, WHITE.mix(0.8).filled())
                        + Rectangle::new(corners, BLACK.stroke_width(1)),
                ))
                .map_err(RenderError::drawing)?;
            for (n, line) in lines.iter().enumerate() {
                chart
                    .draw_series(std::iter::once(
                        EmptyElement::at(anchor)
                            + Text::new(
                                line.to_string(),
                                (0, top + n as i32 * line_height),
                                text_style.clone(),
                            ),
                    ))
                    .map_err(RenderError::drawing)?;
            }
        }
        Ok(())
    }
}

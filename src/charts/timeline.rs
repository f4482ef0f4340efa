//! Line chart of the exchange rate over time with moving averages and
//! annotated market events.

use crate::charts::canvas::{self, RenderError, RenderedChart};
use crate::charts::style::ChartStyle;
use crate::data::Observation;
use crate::stats::StatsCalculator;
use chrono::{Datelike, Days, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::path::Path;

pub const SHORT_WINDOW: usize = 30;
pub const LONG_WINDOW: usize = 90;

/// A dated event to annotate when the dataset has a reading on that exact day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketEvent {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub label: &'static str,
    /// Height of the annotation text in rate units
    pub text_y: f64,
}

impl MarketEvent {
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

pub const MARKET_EVENTS: [MarketEvent; 3] = [
    MarketEvent {
        year: 2015,
        month: 9,
        day: 24,
        label: "Rebaixamento\ndo Brasil",
        text_y: 4.2,
    },
    MarketEvent {
        year: 2016,
        month: 5,
        day: 12,
        label: "Impeachment\nDilma",
        text_y: 3.5,
    },
    MarketEvent {
        year: 2018,
        month: 10,
        day: 28,
        label: "Eleição\nBolsonaro",
        text_y: 3.7,
    },
];

/// An event matched to the reading it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub date: NaiveDate,
    pub rate: f64,
    pub label: &'static str,
    pub text_y: f64,
}

/// Everything the line chart draws, computed ahead of rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSeries {
    pub points: Vec<(NaiveDate, f64)>,
    pub short_average: Vec<Option<f64>>,
    pub long_average: Vec<Option<f64>>,
    pub annotations: Vec<Annotation>,
}

impl TimelineSeries {
    /// `observations` must already be sorted by date.
    pub fn from_observations(observations: &[Observation]) -> Self {
        let points: Vec<(NaiveDate, f64)> = observations
            .iter()
            .map(|obs| (obs.date, obs.exchange_rate))
            .collect();
        let rates: Vec<f64> = points.iter().map(|&(_, rate)| rate).collect();

        Self {
            short_average: StatsCalculator::moving_average(&rates, SHORT_WINDOW),
            long_average: StatsCalculator::moving_average(&rates, LONG_WINDOW),
            annotations: Self::place_annotations(observations, &MARKET_EVENTS),
            points,
        }
    }

    /// Match each event to the first reading on exactly its date.
    /// Events without such a reading are left out.
    pub fn place_annotations(observations: &[Observation], events: &[MarketEvent]) -> Vec<Annotation> {
        events
            .iter()
            .filter_map(|event| {
                let date = event.date()?;
                let obs = observations.iter().find(|obs| obs.date == date)?;
                Some(Annotation {
                    date,
                    rate: obs.exchange_rate,
                    label: event.label,
                    text_y: event.text_y,
                })
            })
            .collect()
    }

    /// Points of an average series where it is defined.
    pub fn defined(&self, averages: &[Option<f64>]) -> Vec<(NaiveDate, f64)> {
        self.points
            .iter()
            .zip(averages)
            .filter_map(|(&(date, _), avg)| avg.map(|v| (date, v)))
            .collect()
    }

    fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.points.first()?.0, self.points.last()?.0))
    }

    /// Y range covering every rate and annotation label, with a margin.
    fn value_span(&self) -> (f64, f64) {
        let values = self
            .points
            .iter()
            .map(|&(_, rate)| rate)
            .chain(self.annotations.iter().map(|a| a.text_y));
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let pad = ((max - min) * 0.05).max(0.1);
        (min - pad, max + pad)
    }
}

/// Renders the exchange-rate line chart.
pub struct TimelineChart;

impl TimelineChart {
    pub fn render(
        observations: &[Observation],
        style: &ChartStyle,
        output: Option<&Path>,
    ) -> Result<RenderedChart, RenderError> {
        log::info!("Creating line chart (temporal visualization)...");
        if observations.is_empty() {
            return Err(RenderError::InvalidData(
                "line chart needs at least one observation".to_string(),
            ));
        }

        let series = TimelineSeries::from_observations(observations);
        log::debug!("Placed {} event annotations", series.annotations.len());

        let chart = canvas::render_bitmap(
            style.figure_pixels(style.line_chart_size),
            style.pad_pixels(),
            |root| Self::draw(root, &series, style),
        )?;
        chart.save_to(output)
    }

    fn draw<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        series: &TimelineSeries,
        style: &ChartStyle,
    ) -> Result<(), RenderError> {
        let (first, last) = series
            .date_span()
            .ok_or_else(|| RenderError::InvalidData("no observations".to_string()))?;
        let end = last.checked_add_days(Days::new(1)).unwrap_or(last);
        let (y_min, y_max) = series.value_span();
        let title = format!(
            "Evolução da Taxa de Câmbio USD/BRL ({}-{})",
            first.year(),
            last.year()
        );

        let mut chart = ChartBuilder::on(root)
            .caption(title, style.bold_font(style.title_size))
            .margin(style.px_u32(12.0))
            .x_label_area_size(style.px_u32(42.0))
            .y_label_area_size(style.px_u32(56.0))
            .build_cartesian_2d((first..end).yearly(), y_min..y_max)
            .map_err(RenderError::drawing)?;

        let year_label = |date: &NaiveDate| date.format("%Y").to_string();
        chart
            .configure_mesh()
            .x_labels(32)
            .y_labels(10)
            .x_label_formatter(&year_label)
            .x_desc("Data")
            .y_desc("Taxa de Câmbio (USD/BRL)")
            .axis_desc_style(style.font(style.label_size))
            .label_style(style.font(style.tick_size))
            .bold_line_style(style.grid().mix(0.7))
            .light_line_style(TRANSPARENT)
            .draw()
            .map_err(RenderError::drawing)?;

        let legend_len = style.px(20.0) as i32;

        let raw_style = style.color(0).stroke_width(style.px_u32(2.0));
        chart
            .draw_series(LineSeries::new(series.points.iter().copied(), raw_style))
            .map_err(RenderError::drawing)?
            .label("USD/BRL Diário")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + legend_len, y)], raw_style));

        let short_style = style.color(5).stroke_width(style.px_u32(2.0));
        chart
            .draw_series(DashedLineSeries::new(
                series.defined(&series.short_average),
                style.px_u32(6.0),
                style.px_u32(3.0),
                short_style,
            ))
            .map_err(RenderError::drawing)?
            .label(format!("Média Móvel ({} dias)", SHORT_WINDOW))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + legend_len, y)], short_style));

        let long_style = style.color(7).stroke_width(style.px_u32(3.0));
        chart
            .draw_series(DashedLineSeries::new(
                series.defined(&series.long_average),
                style.px_u32(12.0),
                style.px_u32(4.0),
                long_style,
            ))
            .map_err(RenderError::drawing)?
            .label(format!("Média Móvel ({} dias)", LONG_WINDOW))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + legend_len, y)], long_style));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font(style.font(style.legend_size))
            .margin(style.px_u32(8.0))
            .legend_area_size(style.px_u32(26.0))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(RenderError::drawing)?;

        // Event boxes: text centred vertically on text_y, connector to the reading
        let text_style = style.font(style.font_size).color(&BLACK);
        let line_height = style.px(style.font_size * 1.25) as i32;
        let pad = style.px(style.font_size * 0.5) as i32;
        let connector = RED.stroke_width(style.px_u32(1.2));

        for annotation in &series.annotations {
            let lines: Vec<&str> = annotation.label.lines().collect();
            let mut text_width = 0i32;
            for line in &lines {
                let (w, _) = root
                    .estimate_text_size(line, &text_style)
                    .map_err(RenderError::drawing)?;
                text_width = text_width.max(w as i32);
            }
            let box_height = lines.len() as i32 * line_height;
            let top = -box_height / 2;
            let anchor = (annotation.date, annotation.text_y);
            let target = (annotation.date, annotation.rate);

            chart
                .draw_series(std::iter::once(PathElement::new(vec![anchor, target], connector)))
                .map_err(RenderError::drawing)?;
            chart
                .draw_series(std::iter::once(Circle::new(
                    target,
                    style.px_u32(2.5),
                    RED.filled(),
                )))
                .map_err(RenderError::drawing)?;

            let corners = [(-pad, top - pad), (text_width + pad, top + box_height + pad)];
            chart
                .draw_series(std::iter::once(
                    EmptyElement::at(anchor)
                        + Rectangle::new(corners, YELLOW.mix(0.7).filled())
                        + Rectangle::new(corners, BLACK.stroke_width(style.px_u32(0.8))),
                ))
                .map_err(RenderError::drawing)?;

            for (i, line) in lines.iter().enumerate() {
                chart
                    .draw_series(std::iter::once(
                        EmptyElement::at(anchor)
                            + Text::new(
                                line.to_string(),
                                (0, top + i as i32 * line_height),
                                text_style.clone(),
                            ),
                    ))
                    .map_err(RenderError::drawing)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataProcessor, RawRecord};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Daily readings from 2010-01-01 to 2019-12-31, uniform in [2.5, 4.2].
    fn decade_of_daily_data() -> Vec<Observation> {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2019, 12, 31).unwrap();
        let rows = start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|date| RawRecord {
                date,
                exchange_rate: rng.gen_range(2.5..=4.2),
                year: None,
                month: None,
            })
            .collect();
        DataProcessor::prepare(rows)
    }

    fn without_date(observations: &[Observation], date: NaiveDate) -> Vec<Observation> {
        observations.iter().filter(|o| o.date != date).cloned().collect()
    }

    #[test]
    fn test_long_average_starts_at_ninetieth_point() {
        let observations = decade_of_daily_data();
        let series = TimelineSeries::from_observations(&observations);
        let rates: Vec<f64> = observations.iter().map(|o| o.exchange_rate).collect();

        assert_eq!(series.long_average.len(), rates.len());
        assert!(series.long_average[..89].iter().all(Option::is_none));
        let expected = rates[..90].iter().sum::<f64>() / 90.0;
        assert_eq!(series.long_average[89], Some(expected));

        assert!(series.short_average[..29].iter().all(Option::is_none));
        assert!(series.short_average[29].is_some());
        assert_eq!(series.defined(&series.long_average).len(), rates.len() - 89);
    }

    #[test]
    fn test_all_events_found_in_full_decade() {
        let series = TimelineSeries::from_observations(&decade_of_daily_data());

        let labels: Vec<&str> = series.annotations.iter().map(|a| a.label).collect();
        assert_eq!(
            labels,
            vec!["Rebaixamento\ndo Brasil", "Impeachment\nDilma", "Eleição\nBolsonaro"]
        );
    }

    #[test]
    fn test_annotation_attaches_to_exact_reading() {
        let observations = decade_of_daily_data();
        let downgrade = NaiveDate::from_ymd_opt(2015, 9, 24).unwrap();
        let reading = observations.iter().find(|o| o.date == downgrade).unwrap();

        let annotations = TimelineSeries::place_annotations(&observations, &MARKET_EVENTS);

        let placed = annotations
            .iter()
            .find(|a| a.label.starts_with("Rebaixamento"))
            .unwrap();
        assert_eq!(placed.date, downgrade);
        assert_eq!(placed.rate, reading.exchange_rate);
        assert_eq!(placed.text_y, 4.2);
    }

    #[test]
    fn test_missing_event_date_is_skipped_not_approximated() {
        let downgrade = NaiveDate::from_ymd_opt(2015, 9, 24).unwrap();
        let observations = without_date(&decade_of_daily_data(), downgrade);

        let annotations = TimelineSeries::place_annotations(&observations, &MARKET_EVENTS);

        assert_eq!(annotations.len(), 2);
        assert!(annotations.iter().all(|a| a.date != downgrade));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let result = TimelineChart::render(&[], &ChartStyle::default(), None);
        assert!(matches!(result, Err(RenderError::InvalidData(_))));
    }

    #[test]
    fn test_render_decade_line_chart() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("grafico_linhas.png");
        let style = ChartStyle::default().with_dpi(40);

        let chart = TimelineChart::render(&decade_of_daily_data(), &style, Some(&path)).unwrap();

        assert!(!chart.is_blank());
        assert!(chart.width() > 0 && chart.height() > 0);
        assert!(path.exists());
    }

    #[test]
    fn test_render_without_event_dates_in_memory() {
        let downgrade = NaiveDate::from_ymd_opt(2015, 9, 24).unwrap();
        let observations = without_date(&decade_of_daily_data(), downgrade);
        let style = ChartStyle::default().with_dpi(40);

        let chart = TimelineChart::render(&observations, &style, None).unwrap();

        assert!(!chart.is_blank());
    }
}

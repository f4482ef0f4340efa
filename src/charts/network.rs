//! Bipartite year ↔ value-bucket network drawn with a spring layout.

use crate::charts::canvas::{self, RenderError, RenderedChart};
use crate::charts::style::ChartStyle;
use crate::data::Observation;
use crate::network::{BipartiteGraph, Position, SpringLayout};
use petgraph::visit::EdgeRef;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

const YEAR_COLOR: RGBColor = RGBColor(135, 206, 235);
const BUCKET_COLOR: RGBColor = RGBColor(144, 238, 144);
const EDGE_COLOR: RGBColor = RGBColor(128, 128, 128);

/// Marker areas in square points
const YEAR_NODE_AREA: f64 = 800.0;
const BUCKET_NODE_AREA: f64 = 700.0;
const NODE_ALPHA: f64 = 0.8;
const EDGE_ALPHA: f64 = 0.7;
/// Observations per point of edge stroke width
const EDGE_WEIGHT_DIVISOR: f64 = 50.0;
const VIEW_LIMIT: f64 = 1.15;

/// Stroke width of an edge in points.
pub fn edge_width_points(weight: usize) -> f64 {
    weight as f64 / EDGE_WEIGHT_DIVISOR
}

/// Radius in points of a marker covering `area` square points.
fn marker_radius_points(area: f64) -> f64 {
    area.sqrt() / 2.0
}

pub struct NetworkChart;

impl NetworkChart {
    pub fn render(
        observations: &[Observation],
        style: &ChartStyle,
        output: Option<&Path>,
    ) -> Result<RenderedChart, RenderError> {
        log::info!("Creating network graph (year and value range relations)...");

        let graph = BipartiteGraph::from_observations(observations);
        if graph.is_empty() {
            return Err(RenderError::InvalidData("network graph has no nodes".to_string()));
        }
        log::debug!(
            "Graph has {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        let unbucketed = observations.len() - graph.total_weight();
        if unbucketed > 0 {
            log::warn!("{} observations fall outside every value range", unbucketed);
        }

        let positions = SpringLayout::default().compute(&graph);
        if positions.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(RenderError::InvalidData(
                "spring layout produced non-finite positions".to_string(),
            ));
        }

        let chart = canvas::render_bitmap(
            style.figure_pixels(style.network_size),
            style.pad_pixels(),
            |root| Self::draw(root, &graph, &positions, style),
        )?;
        chart.save_to(output)
    }

    fn draw<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        graph: &BipartiteGraph,
        positions: &[Position],
        style: &ChartStyle,
    ) -> Result<(), RenderError> {
        let mut chart = ChartBuilder::on(root)
            .caption(
                "Relações entre Anos e Faixas de Valor do Câmbio USD/BRL",
                style.bold_font(style.title_size),
            )
            .margin(style.px_u32(12.0))
            .build_cartesian_2d(-VIEW_LIMIT..VIEW_LIMIT, -VIEW_LIMIT..VIEW_LIMIT)
            .map_err(RenderError::drawing)?;

        chart
            .draw_series(graph.graph().edge_references().map(|edge| {
                let width = style.px_u32(edge_width_points(*edge.weight()));
                PathElement::new(
                    vec![positions[edge.source().index()], positions[edge.target().index()]],
                    EDGE_COLOR.mix(EDGE_ALPHA).stroke_width(width),
                )
            }))
            .map_err(RenderError::drawing)?;

        let year_radius = style.px_u32(marker_radius_points(YEAR_NODE_AREA));
        let year_fill = YEAR_COLOR.mix(NODE_ALPHA).filled();
        chart
            .draw_series(
                graph
                    .year_indices()
                    .map(|i| Circle::new(positions[i.index()], year_radius, year_fill)),
            )
            .map_err(RenderError::drawing)?
            .label("Anos")
            .legend(move |(x, y)| Circle::new((x, y), year_radius / 2, year_fill));

        let bucket_radius = style.px_u32(marker_radius_points(BUCKET_NODE_AREA));
        let bucket_fill = BUCKET_COLOR.mix(NODE_ALPHA).filled();
        chart
            .draw_series(
                graph
                    .bucket_indices()
                    .map(|i| Circle::new(positions[i.index()], bucket_radius, bucket_fill)),
            )
            .map_err(RenderError::drawing)?
            .label("Faixas de Valor")
            .legend(move |(x, y)| Circle::new((x, y), bucket_radius / 2, bucket_fill));

        let label_style = style
            .bold_font(style.node_label_size)
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center));
        chart
            .draw_series(
                graph.graph().node_indices().map(|i| {
                    Text::new(
                        graph.kind(i).to_string(),
                        positions[i.index()],
                        label_style.clone(),
                    )
                }),
            )
            .map_err(RenderError::drawing)?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font(style.font(style.legend_size))
            .margin(style.px_u32(8.0))
            .legend_area_size(style.px_u32(20.0))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(RenderError::drawing)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataProcessor, RawRecord};
    use chrono::NaiveDate;

    fn observations() -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2010, 1, 4).unwrap();
        let rows = (0..900u64)
            .map(|i| RawRecord {
                date: start + chrono::Days::new(i * 4),
                exchange_rate: 1.6 + i as f64 * 0.003,
                year: None,
                month: None,
            })
            .collect();
        DataProcessor::prepare(rows)
    }

    #[test]
    fn test_edge_width_scales_with_weight() {
        assert_eq!(edge_width_points(50), 1.0);
        assert_eq!(edge_width_points(125), 2.5);
        assert_eq!(edge_width_points(0), 0.0);
    }

    #[test]
    fn test_year_markers_are_larger_than_bucket_markers() {
        assert!(marker_radius_points(YEAR_NODE_AREA) > marker_radius_points(BUCKET_NODE_AREA));
        assert!((marker_radius_points(400.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let result = NetworkChart::render(&[], &ChartStyle::default(), None);
        assert!(matches!(result, Err(RenderError::InvalidData(_))));
    }

    #[test]
    fn test_render_network_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("grafo_rede.png");
        let style = ChartStyle::default().with_dpi(40);

        let chart = NetworkChart::render(&observations(), &style, Some(&path)).unwrap();

        assert!(!chart.is_blank());
        assert!(path.exists());
    }
}

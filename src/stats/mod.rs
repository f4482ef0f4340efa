//! Statistics module

mod calculator;

pub use calculator::{BoxSummary, GroupStats, JitteredPoint, StatsCalculator};

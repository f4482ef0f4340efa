//! Charts module - static chart rendering

mod canvas;
mod distribution;
mod network;
mod style;
mod timeline;

pub use distribution::DistributionChart;
pub use network::NetworkChart;
pub use style::ChartStyle;
pub use timeline::TimelineChart;

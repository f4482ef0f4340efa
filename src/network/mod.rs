//! Network module - year/value-bucket graph and its layout

mod graph;
mod layout;

pub use graph::BipartiteGraph;
pub use layout::{Position, SpringLayout};

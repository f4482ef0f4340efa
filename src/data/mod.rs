//! Data module - CSV loading and preparation

mod loader;
mod processor;

pub use loader::{DataLoader, LoadOptions};
pub use processor::{DataProcessor, Observation, RawRecord, ValueBucket};

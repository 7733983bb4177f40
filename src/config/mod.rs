//! Configuration module for the shift-scout engine.

mod optimizer;
mod persistence;

// Re-export commonly used items
pub use optimizer::{DpSettings, OPTIMIZER, OptimizerConfig, RateSettings};
pub use persistence::{PERSISTENCE, PersistenceConfig, graph_snapshot_filename};

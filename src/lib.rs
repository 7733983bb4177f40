#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]

// Core modules
pub mod cache;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod models;
pub mod signals;
pub mod utils;

// Re-export commonly used types outside of crate
pub use cache::{CacheStack, MemoryTier, SqliteTier};
pub use data::{GraphStore, JsonDirectorySource};
pub use domain::{CityId, StartZone, Zone, ZoneId};
pub use engine::{CachedSolver, MobilityOptimizer, RateModel, RecommendationService, SolveRequest};
pub use error::EngineError;
pub use models::{SolveOutcome, ZoneGraph};

mod recommendation;
mod zone_graph;

pub use recommendation::{
    BestZone, OptimalTime, OutlookDay, PathStep, SolveOutcome, TimeScore, ZoneScore,
};
pub use zone_graph::{EdgeStats, HOURS, ZoneGraph};

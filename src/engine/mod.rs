mod optimizer;
mod rate;
mod service;
mod solver;

pub use {
    optimizer::{MobilityOptimizer, SolveRequest},
    rate::{RateBreakdown, RateModel, TransitionMatrix},
    service::RecommendationService,
    solver::CachedSolver,
};

//! Optimizer and rate-model configuration

use serde::{Deserialize, Serialize};

/// Parameters for the earning-rate computation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RateSettings {
    /// Laplace smoothing constant for transition probabilities.
    /// Turn UP to give under-sampled zones more probability mass.
    /// Turn DOWN (towards 0.0) to trust the raw counts.
    pub epsilon: f64,

    /// Floor on the hourly outgoing demand rate when deriving wait time.
    /// Prevents division by zero for dead hours: wait_min = 60 / max(demand, floor).
    pub lambda_floor: f64,
}

/// Parameters for the backward-induction solve.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DpSettings {
    /// Per-step discount on future earnings (0 < gamma <= 1).
    pub gamma: f64,

    /// Two candidate values closer than this are a tie; ties go to the
    /// lexicographically smaller destination zone id so repeated solves
    /// are reproducible.
    pub value_tolerance: f64,
}

/// The Master Optimizer Configuration
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub rate: RateSettings,
    pub dp: DpSettings,
}

pub const OPTIMIZER: OptimizerConfig = OptimizerConfig {
    rate: RateSettings {
        // EPSILON TUNING GUIDE:
        // 1.0  = every zone pair keeps visible probability mass even with
        //        zero observed trips in that hour
        // 0.1  = close to the raw counts, sparse hours become near-greedy
        // 0.0  = raw counts only; zones with no trips in an hour fall back
        //        to the city-wide average distribution
        epsilon: 1.0,
        lambda_floor: 0.5,
    },
    dp: DpSettings {
        gamma: 0.95,
        value_tolerance: 1e-9,
    },
};

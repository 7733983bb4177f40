use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{BoundingBox, Coordinate, ZoneId};

/// The answer to one solve: expected earnings over the shift, the zone
/// sequence that achieves them, and the start zone actually used (relevant
/// when the caller asked for the best starting position).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub expected_earnings: f64,
    pub path: Vec<ZoneId>,
    pub start_zone: ZoneId,
}

/// Score for one candidate start hour.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeScore {
    /// Start hour (0-23)
    pub time: u8,
    pub score: f64,
    /// Hours of the preferred start window still usable once this start
    /// hour plus the work duration have passed.
    pub remaining_hours: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OptimalTime {
    pub optimal_time: u8,
    pub score: f64,
    pub remaining_hours: u8,
}

/// Ranked entry for one zone at a fixed start hour.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ZoneScore {
    pub zone_id: ZoneId,
    pub score: f64,
    pub expected_earnings: f64,
    pub expected_hourly_rate: f64,
    pub centroid: Coordinate,
    pub bounds: BoundingBox,
    pub path_length: usize,
}

/// The best zone for a given hour, with everything the map display needs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BestZone {
    pub zone_id: ZoneId,
    pub score: f64,
    pub expected_earnings: f64,
    pub expected_hourly_rate: f64,
    pub centroid: Coordinate,
    pub bounds: BoundingBox,
    pub path_length: usize,
    pub optimal_path: Vec<ZoneId>,
}

/// One leg of a recommended path, with the timing and earnings breakdown
/// behind it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PathStep {
    pub step: usize,
    pub from_zone: ZoneId,
    pub to_zone: ZoneId,
    pub hour: u8,
    pub date: NaiveDate,
    pub base_fare: f64,
    pub surge_multiplier: f64,
    pub weather_multiplier: f64,
    pub final_fare: f64,
    pub travel_minutes: f64,
    pub wait_minutes: f64,
    pub cumulative_minutes: f64,
    pub cumulative_earnings: f64,
    pub running_hourly_rate: f64,
}

/// One day of the weekly outlook.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutlookDay {
    pub date: NaiveDate,
    pub day_of_week: String,
    pub expected_earnings: f64,
    pub hourly_rate: f64,
    pub start_zone: ZoneId,
    /// Number of distinct zones the optimal path visits.
    pub path_diversity: usize,
}

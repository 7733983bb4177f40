//! Expected earning rates per (zone, hour).
//!
//! Combines the graph's historical trip statistics with the surge and
//! weather signals into the per-trip economics the optimizer maximizes:
//! transition probabilities, expected fare, expected travel and wait time.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;

use crate::config::RateSettings;
use crate::domain::CityId;
use crate::models::ZoneGraph;
use crate::signals::{SurgeProvider, WeatherProvider};
use crate::utils::TimeUtils;

/// Smoothed transition probabilities for one (city, hour): `row(i)[j]` is
/// the probability a trip starting in zone i ends in zone j. Each row sums
/// to 1 across all zones in the city, self included.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    rows: Vec<Vec<f64>>,
}

impl TransitionMatrix {
    pub fn row(&self, origin: usize) -> &[f64] {
        &self.rows[origin]
    }
}

/// Itemized inputs behind one earning-rate figure, for display layers.
#[derive(Debug, Clone, PartialEq)]
pub struct RateBreakdown {
    pub expected_fare: f64,
    pub expected_travel_minutes: f64,
    pub expected_wait_minutes: f64,
    pub surge_multiplier: f64,
    pub weather_multiplier: f64,
    pub rate_per_hour: f64,
}

pub struct RateModel {
    settings: RateSettings,
    surge: Arc<dyn SurgeProvider>,
    weather: Arc<dyn WeatherProvider>,

    /// Recomputing transition probabilities per DP step is the dominant
    /// cost driver; they are cached per (city, hour) for the lifetime of
    /// the graph and cleared when a city is invalidated.
    transition_cache: RwLock<HashMap<(CityId, u8), Arc<TransitionMatrix>>>,
}

impl RateModel {
    pub fn new(
        settings: RateSettings,
        surge: Arc<dyn SurgeProvider>,
        weather: Arc<dyn WeatherProvider>,
    ) -> Self {
        Self {
            settings,
            surge,
            weather,
            transition_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn surge_multiplier(&self, city_id: CityId, zone_id: &str, hour: u8) -> f64 {
        self.surge.multiplier(city_id, zone_id, hour)
    }

    pub fn weather_multiplier(&self, city_id: CityId, date: NaiveDate, hour: u8) -> f64 {
        self.weather.multiplier(city_id, date, hour)
    }

    pub fn transition_matrix(&self, graph: &ZoneGraph, hour: u8) -> Arc<TransitionMatrix> {
        let cache_key = (graph.city_id, hour);
        if let Some(matrix) = self.transition_cache.read().unwrap().get(&cache_key) {
            return matrix.clone();
        }

        let matrix = Arc::new(self.compute_transition_matrix(graph, hour));
        self.transition_cache
            .write()
            .unwrap()
            .insert(cache_key, matrix.clone());
        matrix
    }

    /// Laplace-smoothed normalization:
    /// `P(i->j | h) = (count[i][j][h] + eps) / (total_out[i][h] + eps * n)`.
    ///
    /// With eps = 0 a zone with zero outgoing trips in the hour has an
    /// ill-defined denominator; such rows fall back to the city-wide
    /// average distribution for that hour (uniform if the whole city is
    /// silent).
    fn compute_transition_matrix(&self, graph: &ZoneGraph, hour: u8) -> TransitionMatrix {
        let n = graph.zone_count();
        let eps = self.settings.epsilon;
        let mut rows = Vec::with_capacity(n);
        let mut fallback: Option<Vec<f64>> = None;

        for i in 0..n {
            let total = graph.out_total(i, hour) as f64;
            let denominator = total + eps * n as f64;

            if denominator <= 0.0 {
                let row = fallback
                    .get_or_insert_with(|| Self::city_average_row(graph, hour))
                    .clone();
                rows.push(row);
                continue;
            }

            let mut row = vec![eps / denominator; n];
            for edge in graph.edges_from(i) {
                row[edge.dest] = (edge.trips_at(hour) as f64 + eps) / denominator;
            }
            rows.push(row);
        }

        TransitionMatrix { rows }
    }

    fn city_average_row(graph: &ZoneGraph, hour: u8) -> Vec<f64> {
        let n = graph.zone_count();
        let mut totals = vec![0.0; n];
        let mut grand_total = 0.0;
        for i in 0..n {
            for edge in graph.edges_from(i) {
                let trips = edge.trips_at(hour) as f64;
                totals[edge.dest] += trips;
                grand_total += trips;
            }
        }

        if grand_total <= 0.0 {
            return vec![1.0 / n as f64; n];
        }
        totals.iter_mut().for_each(|t| *t /= grand_total);
        totals
    }

    /// Expected wait for the next request in a zone, derived from the
    /// zone's total outgoing demand at that hour: higher demand, shorter
    /// wait. Floor-clamped so dead hours don't divide by zero.
    pub fn wait_minutes(&self, graph: &ZoneGraph, zone_idx: usize, hour: u8) -> f64 {
        let demand = graph.out_total(zone_idx, hour) as f64;
        TimeUtils::MINUTES_IN_H as f64 / demand.max(self.settings.lambda_floor)
    }

    /// Probability-weighted average fare out of a zone, before surge and
    /// weather. Probability mass on destinations without an observed edge
    /// contributes zero fare.
    pub fn expected_fare(&self, graph: &ZoneGraph, zone_idx: usize, hour: u8) -> f64 {
        let matrix = self.transition_matrix(graph, hour);
        let probs = matrix.row(zone_idx);
        graph
            .edges_from(zone_idx)
            .iter()
            .map(|edge| probs[edge.dest] * edge.fare_at(hour))
            .sum()
    }

    pub fn expected_travel_minutes(&self, graph: &ZoneGraph, zone_idx: usize, hour: u8) -> f64 {
        let matrix = self.transition_matrix(graph, hour);
        let probs = matrix.row(zone_idx);
        graph
            .edges_from(zone_idx)
            .iter()
            .map(|edge| probs[edge.dest] * edge.duration_at(hour))
            .sum()
    }

    /// Expected euros-per-hour for a driver idling in a zone at an hour:
    /// `(fare * surge * weather) / (travel_time + wait_time)`.
    pub fn earning_rate(
        &self,
        graph: &ZoneGraph,
        zone_idx: usize,
        hour: u8,
        date: NaiveDate,
    ) -> f64 {
        self.breakdown(graph, zone_idx, hour, date).rate_per_hour
    }

    pub fn breakdown(
        &self,
        graph: &ZoneGraph,
        zone_idx: usize,
        hour: u8,
        date: NaiveDate,
    ) -> RateBreakdown {
        let surge = self.surge_multiplier(graph.city_id, graph.zone_id(zone_idx), hour);
        let weather = self.weather_multiplier(graph.city_id, date, hour);

        let expected_fare = self.expected_fare(graph, zone_idx, hour);
        let travel = self.expected_travel_minutes(graph, zone_idx, hour);
        let wait = self.wait_minutes(graph, zone_idx, hour);
        let total_minutes = travel + wait;

        let rate_per_hour = if total_minutes <= 0.0 {
            0.0
        } else {
            expected_fare * surge * weather / (total_minutes / TimeUtils::MINUTES_IN_H as f64)
        };

        RateBreakdown {
            expected_fare,
            expected_travel_minutes: travel,
            expected_wait_minutes: wait,
            surge_multiplier: surge,
            weather_multiplier: weather,
            rate_per_hour,
        }
    }

    pub fn clear_city(&self, city_id: CityId) {
        self.transition_cache
            .write()
            .unwrap()
            .retain(|(city, _), _| *city != city_id);
    }
}

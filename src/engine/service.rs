//! The query surface the client layers consume.
//!
//! Pure orchestration: every answer is one or more cache-wrapped solves,
//! reshaped into the response values. Optimizer failures that mean "there
//! is nothing to recommend" (an empty city graph) come back as `None` /
//! empty rather than errors; only a city with no usable data at all fails
//! the request.

use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::domain::{CityId, StartZone};
use crate::engine::optimizer::SolveRequest;
use crate::engine::solver::CachedSolver;
use crate::error::EngineError;
use crate::models::{BestZone, OptimalTime, OutlookDay, TimeScore, ZoneScore};
use crate::utils::TimeUtils;

pub struct RecommendationService {
    solver: CachedSolver,
}

impl RecommendationService {
    pub fn new(solver: CachedSolver) -> Self {
        Self { solver }
    }

    pub fn solver(&self) -> &CachedSolver {
        &self.solver
    }

    fn deadline(timeout: Option<Duration>) -> Option<Instant> {
        timeout.map(|t| Instant::now() + t)
    }

    /// Best start hour within the driver's preferred window.
    pub async fn optimal_start_time(
        &self,
        city_id: CityId,
        start: StartZone,
        earliest_hour: u8,
        latest_hour: u8,
        duration_hours: u8,
        date: NaiveDate,
        timeout: Option<Duration>,
    ) -> Result<Option<OptimalTime>, EngineError> {
        let scores = self
            .all_time_scores(
                city_id,
                start,
                earliest_hour,
                latest_hour,
                duration_hours,
                date,
                timeout,
            )
            .await?;

        // Ranked best-first; equal scores resolved to the earliest start.
        Ok(scores.into_iter().next().map(|s| OptimalTime {
            optimal_time: s.time,
            score: s.score,
            remaining_hours: s.remaining_hours,
        }))
    }

    /// Every candidate start hour in the window, ranked best-first.
    pub async fn all_time_scores(
        &self,
        city_id: CityId,
        start: StartZone,
        earliest_hour: u8,
        latest_hour: u8,
        duration_hours: u8,
        date: NaiveDate,
        timeout: Option<Duration>,
    ) -> Result<Vec<TimeScore>, EngineError> {
        let result = self
            .solver
            .score_start_hours(
                city_id,
                start,
                earliest_hour,
                latest_hour,
                duration_hours,
                date,
                Self::deadline(timeout),
            )
            .await;

        let mut scores = match result {
            Ok(scores) => scores,
            Err(EngineError::NoReachableZones { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };

        // Stable on candidate order, so ties keep the earlier window slot.
        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(scores)
    }

    /// Best zone to position in for a shift starting at `start_hour`.
    pub async fn best_zone_for_time(
        &self,
        city_id: CityId,
        start_hour: u8,
        duration_hours: u8,
        date: NaiveDate,
    ) -> Result<Option<BestZone>, EngineError> {
        let req = SolveRequest {
            city_id,
            start: StartZone::Best,
            start_hour,
            duration_hours,
            date,
        };

        let outcome = match self.solver.solve(&req).await {
            Ok(outcome) => outcome,
            Err(EngineError::NoReachableZones { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let graph = self.solver.optimizer().graphs().load(city_id)?;
        let Some(idx) = graph.index_of(&outcome.start_zone) else {
            // Cached path from a since-rebuilt graph; treat as unavailable.
            log::warn!(
                "Cached best zone {} no longer exists in city {}",
                outcome.start_zone,
                city_id
            );
            return Ok(None);
        };
        let zone = graph.zone(idx);

        Ok(Some(BestZone {
            zone_id: outcome.start_zone.clone(),
            score: outcome.expected_earnings,
            expected_earnings: outcome.expected_earnings,
            expected_hourly_rate: if duration_hours > 0 {
                outcome.expected_earnings / duration_hours as f64
            } else {
                0.0
            },
            centroid: zone.centroid,
            bounds: zone.bounds,
            path_length: outcome.path.len(),
            optimal_path: outcome.path,
        }))
    }

    /// All zones ranked for a given start hour.
    pub async fn all_zone_scores(
        &self,
        city_id: CityId,
        start_hour: u8,
        duration_hours: u8,
        date: NaiveDate,
        timeout: Option<Duration>,
    ) -> Result<Vec<ZoneScore>, EngineError> {
        match self
            .solver
            .score_zones(
                city_id,
                start_hour,
                duration_hours,
                date,
                Self::deadline(timeout),
            )
            .await
        {
            Ok(scores) => Ok(scores),
            Err(EngineError::NoReachableZones { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// The same shift solved across 7 consecutive dates, for planning
    /// displays. Days that fail to solve are skipped.
    pub async fn weekly_outlook(
        &self,
        city_id: CityId,
        start: StartZone,
        start_hour: u8,
        duration_hours: u8,
        from_date: NaiveDate,
    ) -> Result<Vec<OutlookDay>, EngineError> {
        let mut days = Vec::with_capacity(7);

        for day_offset in 0..7 {
            let date = from_date + chrono::Days::new(day_offset);
            let req = SolveRequest {
                city_id,
                start: start.clone(),
                start_hour,
                duration_hours,
                date,
            };

            match self.solver.solve(&req).await {
                Ok(outcome) => {
                    let mut distinct = outcome.path.clone();
                    distinct.sort();
                    distinct.dedup();

                    days.push(OutlookDay {
                        date,
                        day_of_week: TimeUtils::weekday_name(date).to_string(),
                        expected_earnings: outcome.expected_earnings,
                        hourly_rate: if duration_hours > 0 {
                            outcome.expected_earnings / duration_hours as f64
                        } else {
                            0.0
                        },
                        start_zone: outcome.start_zone,
                        path_diversity: distinct.len(),
                    });
                }
                Err(e @ EngineError::DataUnavailable { .. }) => return Err(e),
                Err(e) => {
                    log::warn!("Skipping {} for city {}: {}", date, city_id, e);
                }
            }
        }

        Ok(days)
    }
}

//! Read-through/write-through wrapper around the optimizer, plus the bulk
//! scoring operations built on it.
//!
//! Every query path goes through here so repeated questions are answered
//! from cache. A miss computes synchronously (the DP is CPU-bound and
//! solve-local) and writes through to every tier before returning.

use std::time::Instant;

use chrono::NaiveDate;

use crate::cache::{CacheCategory, CacheKey, CacheScope, CacheStack};
use crate::domain::{CityId, StartZone};
use crate::engine::optimizer::{MobilityOptimizer, SolveRequest};
use crate::error::EngineError;
use crate::models::{SolveOutcome, TimeScore, ZoneScore};
use crate::utils::TimeUtils;

fn cache_key(req: &SolveRequest) -> CacheKey {
    CacheKey {
        category: match req.start {
            StartZone::Best => CacheCategory::BestStart,
            StartZone::Zone(_) => CacheCategory::Solve,
        },
        city_id: req.city_id,
        start: req.start.clone(),
        start_hour: req.start_hour,
        duration_hours: req.duration_hours,
        date: req.date,
    }
}

pub struct CachedSolver {
    optimizer: MobilityOptimizer,
    cache: CacheStack,
}

impl CachedSolver {
    pub fn new(optimizer: MobilityOptimizer, cache: CacheStack) -> Self {
        Self { optimizer, cache }
    }

    pub fn optimizer(&self) -> &MobilityOptimizer {
        &self.optimizer
    }

    pub async fn solve(&self, req: &SolveRequest) -> Result<SolveOutcome, EngineError> {
        let key = cache_key(req);
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let outcome = self.optimizer.solve(req)?;
        self.cache.put(&key, &outcome).await;
        Ok(outcome)
    }

    /// Score every candidate start hour in the (wrap-aware) window.
    ///
    /// `remaining_hours` reports how much of the start window is still
    /// usable once the candidate start plus the work duration have passed.
    /// A per-hour failure drops that hour, not the batch; an expired
    /// deadline returns whatever was scored so far.
    pub async fn score_start_hours(
        &self,
        city_id: CityId,
        start: StartZone,
        earliest_hour: u8,
        latest_hour: u8,
        duration_hours: u8,
        date: NaiveDate,
        deadline: Option<Instant>,
    ) -> Result<Vec<TimeScore>, EngineError> {
        let window = TimeUtils::hours_between(earliest_hour, latest_hour);
        let mut scores = Vec::with_capacity(window as usize + 1);

        for offset in 0..=window {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                log::warn!(
                    "Hour scoring for city {} hit its deadline after {} of {} candidates",
                    city_id,
                    scores.len(),
                    window + 1
                );
                break;
            }

            let hour = (earliest_hour + offset) % TimeUtils::HOURS_IN_DAY;
            let req = SolveRequest {
                city_id,
                start: start.clone(),
                start_hour: hour,
                duration_hours,
                date,
            };

            match self.solve(&req).await {
                Ok(outcome) => scores.push(TimeScore {
                    time: hour,
                    score: outcome.expected_earnings,
                    remaining_hours: (window - offset).saturating_sub(duration_hours),
                }),
                Err(e @ EngineError::DataUnavailable { .. }) => return Err(e),
                Err(e) => {
                    log::warn!("Skipping hour {} for city {}: {}", hour, city_id, e);
                }
            }
        }

        Ok(scores)
    }

    /// Solve pinned to every zone of the city for ranking displays,
    /// best first. Same batch semantics as hour scoring.
    pub async fn score_zones(
        &self,
        city_id: CityId,
        start_hour: u8,
        duration_hours: u8,
        date: NaiveDate,
        deadline: Option<Instant>,
    ) -> Result<Vec<ZoneScore>, EngineError> {
        let graph = self.optimizer.graphs().load(city_id)?;

        let mut scores = Vec::with_capacity(graph.zone_count());
        for idx in 0..graph.zone_count() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                log::warn!(
                    "Zone scoring for city {} hit its deadline after {} of {} zones",
                    city_id,
                    scores.len(),
                    graph.zone_count()
                );
                break;
            }

            let zone = graph.zone(idx);
            let req = SolveRequest {
                city_id,
                start: StartZone::Zone(zone.id.clone()),
                start_hour,
                duration_hours,
                date,
            };

            match self.solve(&req).await {
                Ok(outcome) => scores.push(ZoneScore {
                    zone_id: zone.id.clone(),
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
                }),
                Err(e @ EngineError::DataUnavailable { .. }) => return Err(e),
                Err(e) => {
                    log::warn!("Skipping zone {} for city {}: {}", zone.id, city_id, e);
                }
            }
        }

        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.zone_id.cmp(&b.zone_id))
        });
        Ok(scores)
    }

    /// Force recomputation for a city after its upstream statistics change:
    /// graph, snapshot, rate caches and both result-cache tiers.
    pub async fn invalidate_city(&self, city_id: CityId) -> u64 {
        self.optimizer.invalidate_city(city_id);
        self.cache.invalidate(&CacheScope::City(city_id)).await
    }

    pub async fn invalidate_category(&self, category: CacheCategory) -> u64 {
        self.cache.invalidate(&CacheScope::Category(category)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OPTIMIZER;
    use crate::data::{CityTables, GraphStore, InMemorySource, TripStatRecord, ZoneRecord};
    use crate::engine::rate::RateModel;
    use crate::signals::{NeutralSurge, NeutralWeather};
    use std::sync::Arc;

    fn solver() -> CachedSolver {
        let tables = CityTables {
            zones: vec![
                ZoneRecord {
                    zone_id: "c_1_a".into(),
                    city_id: 1,
                    lat: 0.0,
                    lon: 0.0,
                    lat_min: 0.0,
                    lat_max: 0.0,
                    lon_min: 0.0,
                    lon_max: 0.0,
                },
                ZoneRecord {
                    zone_id: "c_1_b".into(),
                    city_id: 1,
                    lat: 0.0,
                    lon: 0.0,
                    lat_min: 0.0,
                    lat_max: 0.0,
                    lon_min: 0.0,
                    lon_max: 0.0,
                },
            ],
            trips: vec![TripStatRecord {
                origin: "c_1_a".into(),
                destination: "c_1_b".into(),
                hour: 8,
                trips: 10,
                avg_fare: 10.0,
                avg_duration_min: 10.0,
            }],
        };
        let source = InMemorySource::new().with_city(1, tables);
        let graphs = Arc::new(GraphStore::new(Box::new(source), "unused").without_snapshots());
        let rates = RateModel::new(
            OPTIMIZER.rate,
            Arc::new(NeutralSurge),
            Arc::new(NeutralWeather),
        );
        CachedSolver::new(
            MobilityOptimizer::new(graphs, rates, OPTIMIZER.dp),
            CacheStack::disabled(),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()
    }

    #[tokio::test]
    async fn expired_deadline_returns_partial_results() {
        let solver = solver();
        let deadline = Some(Instant::now() - std::time::Duration::from_millis(1));

        let scores = solver
            .score_start_hours(1, StartZone::Best, 6, 12, 2, date(), deadline)
            .await
            .unwrap();
        assert!(scores.is_empty());

        let zones = solver.score_zones(1, 8, 2, date(), deadline).await.unwrap();
        assert!(zones.is_empty());
    }

    #[tokio::test]
    async fn per_entry_failures_skip_the_entry_not_the_batch() {
        let solver = solver();

        // A pinned start zone the city does not have fails every candidate
        // hour; the batch itself still succeeds.
        let scores = solver
            .score_start_hours(1, StartZone::Zone("c_1_ghost".into()), 6, 12, 2, date(), None)
            .await
            .unwrap();
        assert!(scores.is_empty());
    }

    #[tokio::test]
    async fn window_wraps_midnight() {
        let solver = solver();

        let scores = solver
            .score_start_hours(1, StartZone::Best, 22, 2, 1, date(), None)
            .await
            .unwrap();

        let hours: Vec<u8> = scores.iter().map(|s| s.time).collect();
        assert_eq!(hours, vec![22, 23, 0, 1, 2]);
    }
}

//! Finite-horizon backward-induction solver.
//!
//! States are (ticks-remaining, zone). The value table is filled from the
//! terminal level t = 0 upward: every transition strictly decreases the
//! remaining ticks, so level t only reads levels below it. Cost is
//! O(ticks x zones^2) per solve, which is why results are cached one layer
//! up.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::sync::Arc;

use crate::config::DpSettings;
use crate::data::GraphStore;
use crate::domain::{CityId, StartZone, ZoneId};
use crate::engine::rate::RateModel;
use crate::error::EngineError;
use crate::models::{PathStep, SolveOutcome, ZoneGraph};
use crate::utils::TimeUtils;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SolveRequest {
    pub city_id: CityId,
    pub start: StartZone,
    pub start_hour: u8,
    pub duration_hours: u8,
    pub date: NaiveDate,
}

/// One value-table level: best value and best decision per zone.
/// A decision is (destination index, ticks consumed); `None` means hold —
/// nothing reachable fits in the remaining time.
struct Level {
    values: Vec<f64>,
    decisions: Vec<Option<(usize, usize)>>,
}

pub struct MobilityOptimizer {
    graphs: Arc<GraphStore>,
    rates: RateModel,
    dp: DpSettings,
}

impl MobilityOptimizer {
    pub fn new(graphs: Arc<GraphStore>, rates: RateModel, dp: DpSettings) -> Self {
        Self { graphs, rates, dp }
    }

    pub fn graphs(&self) -> &Arc<GraphStore> {
        &self.graphs
    }

    pub fn rates(&self) -> &RateModel {
        &self.rates
    }

    /// Drop the city's graph, snapshot and derived rate caches so the next
    /// solve rebuilds from refreshed upstream statistics.
    pub fn invalidate_city(&self, city_id: CityId) {
        self.graphs.invalidate(city_id);
        self.rates.clear_city(city_id);
    }

    pub fn solve(&self, req: &SolveRequest) -> Result<SolveOutcome, EngineError> {
        let graph = self.graphs.load(req.city_id)?;
        if graph.is_empty() {
            return Err(EngineError::NoReachableZones { city: req.city_id });
        }

        let start_idx = match &req.start {
            StartZone::Zone(id) => Some(graph.index_of(id).ok_or_else(|| {
                EngineError::UnknownZone {
                    city: req.city_id,
                    zone: id.clone(),
                }
            })?),
            StartZone::Best => None,
        };

        let budget = TimeUtils::hours_to_ticks(req.duration_hours);
        let levels = self.fill_value_table(&graph, budget, req.start_hour, req.date);

        // Pinned start, or the zone maximizing the full-budget value.
        let start = match start_idx {
            Some(idx) => idx,
            None => Self::argmax_start(&levels[budget].values, self.dp.value_tolerance),
        };

        let expected_earnings = levels[budget].values[start];
        let path = Self::extract_path(&levels, budget, start)
            .into_iter()
            .map(|idx| graph.zone_id(idx).clone())
            .collect();

        Ok(SolveOutcome {
            expected_earnings,
            path,
            start_zone: graph.zone_id(start).clone(),
        })
    }

    fn fill_value_table(
        &self,
        graph: &ZoneGraph,
        budget: usize,
        start_hour: u8,
        date: NaiveDate,
    ) -> Vec<Level> {
        let n = graph.zone_count();
        let gamma = self.dp.gamma;
        let tol = self.dp.value_tolerance;

        let mut levels = Vec::with_capacity(budget + 1);
        // Terminal condition: no time left, no further earnings.
        levels.push(Level {
            values: vec![0.0; n],
            decisions: vec![None; n],
        });

        for t in 1..=budget {
            let elapsed = budget - t;
            let hour = TimeUtils::hour_after_ticks(start_hour, elapsed);
            let date_now = TimeUtils::date_after_ticks(date, start_hour, elapsed);
            let weather = self.rates.weather_multiplier(graph.city_id, date_now, hour);

            // Levels below t are final; origins at level t are independent.
            let computed: Vec<(f64, Option<(usize, usize)>)> = (0..n)
                .into_par_iter()
                .map(|i| {
                    let surge =
                        self.rates
                            .surge_multiplier(graph.city_id, graph.zone_id(i), hour);

                    // Holding still earns nothing; any transition must beat it.
                    let mut best_value = 0.0;
                    let mut best_decision = None;

                    // Wait for the pickup in the origin zone, then drive.
                    let wait = self.rates.wait_minutes(graph, i, hour);

                    // Destination order is lexicographic, so a tie keeps
                    // the smaller zone id.
                    for edge in graph.edges_from(i) {
                        let travel = edge.duration_at(hour);
                        let ticks = TimeUtils::minutes_to_ticks(wait + travel);
                        if ticks > t {
                            continue;
                        }

                        let fare = edge.fare_at(hour) * surge * weather;
                        let value = fare + gamma * levels[t - ticks].values[edge.dest];
                        if value > best_value + tol {
                            best_value = value;
                            best_decision = Some((edge.dest, ticks));
                        }
                    }

                    (best_value, best_decision)
                })
                .collect();

            let (values, decisions) = computed.into_iter().unzip();
            levels.push(Level { values, decisions });
        }

        levels
    }

    fn argmax_start(values: &[f64], tol: f64) -> usize {
        // Ascending index = ascending zone id; strict improvement required,
        // so ties keep the lexicographically smaller id.
        let mut best = 0;
        for (i, &v) in values.iter().enumerate().skip(1) {
            if v > values[best] + tol {
                best = i;
            }
        }
        best
    }

    fn extract_path(levels: &[Level], budget: usize, start: usize) -> Vec<usize> {
        let mut path = vec![start];
        let mut t = budget;
        let mut current = start;

        while let Some((next, ticks)) = levels[t].decisions[current] {
            current = next;
            t -= ticks; // every decision consumes at least one tick
            path.push(current);
        }

        path
    }

    /// Step-by-step timing and earnings for a recommended path, replaying
    /// the same fare/travel/wait arithmetic the solve used.
    pub fn path_timing(
        &self,
        city_id: CityId,
        path: &[ZoneId],
        start_hour: u8,
        date: NaiveDate,
    ) -> Result<Vec<PathStep>, EngineError> {
        let graph = self.graphs.load(city_id)?;

        let mut steps = Vec::new();
        let mut cumulative_minutes = 0.0;
        let mut cumulative_earnings = 0.0;

        for (step, pair) in path.windows(2).enumerate() {
            let from = graph
                .index_of(&pair[0])
                .ok_or_else(|| EngineError::UnknownZone {
                    city: city_id,
                    zone: pair[0].clone(),
                })?;
            let to = graph
                .index_of(&pair[1])
                .ok_or_else(|| EngineError::UnknownZone {
                    city: city_id,
                    zone: pair[1].clone(),
                })?;

            let elapsed_ticks = (cumulative_minutes / TimeUtils::TICK_MINUTES as f64) as usize;
            let hour = TimeUtils::hour_after_ticks(start_hour, elapsed_ticks);
            let date_now = TimeUtils::date_after_ticks(date, start_hour, elapsed_ticks);

            let Some(edge) = graph.edge(from, to) else {
                log::warn!(
                    "Path step {} -> {} has no edge in city {}; stopping breakdown",
                    pair[0],
                    pair[1],
                    city_id
                );
                break;
            };

            let surge = self
                .rates
                .surge_multiplier(city_id, graph.zone_id(from), hour);
            let weather = self.rates.weather_multiplier(city_id, date_now, hour);
            let base_fare = edge.fare_at(hour);
            let final_fare = base_fare * surge * weather;
            let travel_minutes = edge.duration_at(hour);
            let wait_minutes = self.rates.wait_minutes(&graph, from, hour);

            cumulative_minutes += wait_minutes + travel_minutes;
            cumulative_earnings += final_fare;

            steps.push(PathStep {
                step: step + 1,
                from_zone: pair[0].clone(),
                to_zone: pair[1].clone(),
                hour,
                date: date_now,
                base_fare,
                surge_multiplier: surge,
                weather_multiplier: weather,
                final_fare,
                travel_minutes,
                wait_minutes,
                cumulative_minutes,
                cumulative_earnings,
                running_hourly_rate: if cumulative_minutes > 0.0 {
                    cumulative_earnings / (cumulative_minutes / TimeUtils::MINUTES_IN_H as f64)
                } else {
                    0.0
                },
            });
        }

        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OPTIMIZER;
    use crate::data::{CityTables, InMemorySource, TripStatRecord, ZoneRecord};
    use crate::signals::{NeutralSurge, NeutralWeather, SurgeProvider, SurgeRecord, SurgeTable};
    use std::sync::Arc;

    fn zone_rec(id: &str, city: CityId) -> ZoneRecord {
        ZoneRecord {
            zone_id: id.to_string(),
            city_id: city,
            lat: 0.0,
            lon: 0.0,
            lat_min: 0.0,
            lat_max: 0.0,
            lon_min: 0.0,
            lon_max: 0.0,
        }
    }

    fn trip(origin: &str, dest: &str, hour: u8, trips: u32, fare: f64, mins: f64) -> TripStatRecord {
        TripStatRecord {
            origin: origin.to_string(),
            destination: dest.to_string(),
            hour,
            trips,
            avg_fare: fare,
            avg_duration_min: mins,
        }
    }

    /// 2-zone city: the only edge is A -> B at hour 8 (10 trips, fare 10,
    /// 10 minutes).
    fn two_zone_tables() -> CityTables {
        CityTables {
            zones: vec![zone_rec("c_1_a", 1), zone_rec("c_1_b", 1)],
            trips: vec![trip("c_1_a", "c_1_b", 8, 10, 10.0, 10.0)],
        }
    }

    fn optimizer_for(
        city: CityId,
        tables: CityTables,
        surge: Arc<dyn SurgeProvider>,
    ) -> MobilityOptimizer {
        let source = InMemorySource::new().with_city(city, tables);
        let graphs = Arc::new(GraphStore::new(Box::new(source), "unused").without_snapshots());
        let rates = RateModel::new(OPTIMIZER.rate, surge, Arc::new(NeutralWeather));
        MobilityOptimizer::new(graphs, rates, OPTIMIZER.dp)
    }

    fn request(start: StartZone, hour: u8, duration: u8) -> SolveRequest {
        SolveRequest {
            city_id: 1,
            start,
            start_hour: hour,
            duration_hours: duration,
            date: NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
        }
    }

    #[test]
    fn two_zone_city_takes_the_single_trip_then_holds() {
        let opt = optimizer_for(1, two_zone_tables(), Arc::new(NeutralSurge));
        let outcome = opt
            .solve(&request(StartZone::Zone("c_1_a".into()), 8, 1))
            .unwrap();

        // One A -> B transition; B has no outgoing edges so the shift ends
        // there. With neutral signals and V[B] = 0 the value is the bare fare.
        assert_eq!(outcome.path, vec!["c_1_a".to_string(), "c_1_b".to_string()]);
        assert!((outcome.expected_earnings - 10.0).abs() < 1e-9);
    }

    #[test]
    fn surge_and_weather_scale_the_fare() {
        let surge = SurgeTable::from_records(vec![SurgeRecord {
            city_id: 1,
            hour: 8,
            surge_multiplier: 1.5,
        }]);
        let opt = optimizer_for(1, two_zone_tables(), Arc::new(surge));
        let outcome = opt
            .solve(&request(StartZone::Zone("c_1_a".into()), 8, 1))
            .unwrap();

        assert!((outcome.expected_earnings - 15.0).abs() < 1e-9);
    }

    #[test]
    fn zero_budget_earns_nothing() {
        let opt = optimizer_for(1, two_zone_tables(), Arc::new(NeutralSurge));
        let outcome = opt
            .solve(&request(StartZone::Zone("c_1_a".into()), 8, 0))
            .unwrap();

        assert_eq!(outcome.expected_earnings, 0.0);
        assert_eq!(outcome.path, vec!["c_1_a".to_string()]);
    }

    #[test]
    fn unreachable_transitions_are_never_chosen() {
        // One trip per hour means a 60 min pickup wait, plus 120 min
        // travel = 36 ticks; a 1-hour budget (12 ticks) cannot fit it.
        let tables = CityTables {
            zones: vec![zone_rec("c_1_a", 1), zone_rec("c_1_b", 1)],
            trips: vec![trip("c_1_a", "c_1_b", 8, 1, 50.0, 120.0)],
        };
        let opt = optimizer_for(1, tables, Arc::new(NeutralSurge));
        let outcome = opt
            .solve(&request(StartZone::Zone("c_1_a".into()), 8, 1))
            .unwrap();

        assert_eq!(outcome.expected_earnings, 0.0);
        assert_eq!(outcome.path, vec!["c_1_a".to_string()]);
    }

    #[test]
    fn more_time_never_earns_less() {
        let tables = CityTables {
            zones: vec![zone_rec("c_1_a", 1), zone_rec("c_1_b", 1), zone_rec("c_1_c", 1)],
            trips: vec![
                trip("c_1_a", "c_1_b", 8, 10, 10.0, 10.0),
                trip("c_1_b", "c_1_a", 9, 8, 9.0, 12.0),
                trip("c_1_b", "c_1_c", 10, 6, 14.0, 20.0),
                trip("c_1_c", "c_1_a", 11, 6, 13.0, 18.0),
            ],
        };
        let opt = optimizer_for(1, tables, Arc::new(NeutralSurge));

        let mut previous = 0.0;
        for duration in 1..=8 {
            let outcome = opt
                .solve(&request(StartZone::Zone("c_1_a".into()), 8, duration))
                .unwrap();
            assert!(
                outcome.expected_earnings >= previous - 1e-9,
                "duration {} earned {} after {}",
                duration,
                outcome.expected_earnings,
                previous
            );
            previous = outcome.expected_earnings;
        }
    }

    #[test]
    fn repeated_solves_are_bit_identical() {
        let opt = optimizer_for(1, two_zone_tables(), Arc::new(NeutralSurge));
        let req = request(StartZone::Best, 8, 2);

        let first = opt.solve(&req).unwrap();
        let second = opt.solve(&req).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.expected_earnings.to_bits(),
            second.expected_earnings.to_bits()
        );
    }

    #[test]
    fn best_start_ties_prefer_smaller_zone_id() {
        // Two identical origins feeding the same sink.
        let tables = CityTables {
            zones: vec![zone_rec("c_1_a", 1), zone_rec("c_1_b", 1), zone_rec("c_1_sink", 1)],
            trips: vec![
                trip("c_1_a", "c_1_sink", 8, 5, 10.0, 10.0),
                trip("c_1_b", "c_1_sink", 8, 5, 10.0, 10.0),
            ],
        };
        let opt = optimizer_for(1, tables, Arc::new(NeutralSurge));
        let outcome = opt.solve(&request(StartZone::Best, 8, 1)).unwrap();

        assert_eq!(outcome.start_zone, "c_1_a");
    }

    #[test]
    fn unknown_start_zone_is_an_error() {
        let opt = optimizer_for(1, two_zone_tables(), Arc::new(NeutralSurge));
        let err = opt
            .solve(&request(StartZone::Zone("c_1_ghost".into()), 8, 1))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::UnknownZone {
                city: 1,
                zone: "c_1_ghost".into()
            }
        );
    }

    #[test]
    fn empty_city_is_no_reachable_zones() {
        let opt = optimizer_for(1, CityTables::default(), Arc::new(NeutralSurge));
        let err = opt.solve(&request(StartZone::Best, 8, 1)).unwrap_err();
        assert_eq!(err, EngineError::NoReachableZones { city: 1 });
    }

    #[test]
    fn path_timing_matches_solve_arithmetic() {
        let opt = optimizer_for(1, two_zone_tables(), Arc::new(NeutralSurge));
        let outcome = opt
            .solve(&request(StartZone::Zone("c_1_a".into()), 8, 1))
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        let steps = opt.path_timing(1, &outcome.path, 8, date).unwrap();
        assert_eq!(steps.len(), 1);
        let step = &steps[0];
        assert_eq!(step.hour, 8);
        assert!((step.final_fare - 10.0).abs() < 1e-9);
        assert!((step.travel_minutes - 10.0).abs() < 1e-9);
        assert!((step.cumulative_earnings - outcome.expected_earnings).abs() < 1e-9);
    }
}

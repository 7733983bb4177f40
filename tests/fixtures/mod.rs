//! Shared fixtures: a small synthetic city with enough structure for the
//! optimizer to make real choices.

use std::sync::Arc;

use shift_scout::cache::{CacheStack, CacheTier, MemoryTier};
use shift_scout::config::OPTIMIZER;
use shift_scout::data::{CityTables, GraphStore, InMemorySource, TripStatRecord, ZoneRecord};
use shift_scout::engine::{CachedSolver, MobilityOptimizer, RateModel, RecommendationService};
use shift_scout::signals::{NeutralSurge, NeutralWeather, SurgeProvider, WeatherProvider};

pub const CITY: u32 = 3;

pub fn zone(id: &str, lat: f64, lon: f64) -> ZoneRecord {
    ZoneRecord {
        zone_id: id.to_string(),
        city_id: CITY,
        lat,
        lon,
        lat_min: lat - 0.01,
        lat_max: lat + 0.01,
        lon_min: lon - 0.01,
        lon_max: lon + 0.01,
    }
}

pub fn trip(origin: &str, dest: &str, hour: u8, trips: u32, fare: f64, mins: f64) -> TripStatRecord {
    TripStatRecord {
        origin: origin.to_string(),
        destination: dest.to_string(),
        hour,
        trips,
        avg_fare: fare,
        avg_duration_min: mins,
    }
}

/// Three zones: a busy center, a airport with high fares, a quiet suburb.
/// Morning flows center<->airport, evening flows through the suburb.
pub fn demo_tables() -> CityTables {
    CityTables {
        zones: vec![
            zone("c_3_airport", 48.35, 11.78),
            zone("c_3_center", 48.14, 11.58),
            zone("c_3_suburb", 48.08, 11.46),
        ],
        trips: vec![
            trip("c_3_center", "c_3_airport", 8, 12, 22.0, 25.0),
            trip("c_3_center", "c_3_airport", 9, 8, 22.0, 30.0),
            trip("c_3_center", "c_3_suburb", 8, 4, 9.0, 15.0),
            trip("c_3_center", "c_3_center", 8, 6, 6.0, 10.0),
            trip("c_3_airport", "c_3_center", 9, 10, 21.0, 25.0),
            trip("c_3_airport", "c_3_center", 10, 9, 21.0, 25.0),
            trip("c_3_suburb", "c_3_center", 18, 7, 10.0, 15.0),
            trip("c_3_center", "c_3_suburb", 17, 9, 10.0, 15.0),
        ],
    }
}

pub fn demo_store() -> Arc<GraphStore> {
    let source = InMemorySource::new().with_city(CITY, demo_tables());
    Arc::new(GraphStore::new(Box::new(source), "unused").without_snapshots())
}

pub fn neutral_optimizer() -> MobilityOptimizer {
    optimizer_with_signals(Arc::new(NeutralSurge), Arc::new(NeutralWeather))
}

pub fn optimizer_with_signals(
    surge: Arc<dyn SurgeProvider>,
    weather: Arc<dyn WeatherProvider>,
) -> MobilityOptimizer {
    let rates = RateModel::new(OPTIMIZER.rate, surge, weather);
    MobilityOptimizer::new(demo_store(), rates, OPTIMIZER.dp)
}

pub fn service_with_tiers(tiers: Vec<Box<dyn CacheTier>>) -> RecommendationService {
    let solver = CachedSolver::new(neutral_optimizer(), CacheStack::new(tiers));
    RecommendationService::new(solver)
}

pub fn memory_cached_service() -> RecommendationService {
    service_with_tiers(vec![Box::new(MemoryTier::new())])
}

pub fn uncached_service() -> RecommendationService {
    let solver = CachedSolver::new(neutral_optimizer(), CacheStack::disabled());
    RecommendationService::new(solver)
}

pub fn date() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()
}

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::CityId;

/// One zone row from the upstream clustering job.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ZoneRecord {
    pub zone_id: String,
    pub city_id: CityId,
    pub lat: f64,
    pub lon: f64,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// One aggregated trip-statistics row: all historical trips from `origin`
/// to `destination` starting during `hour`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TripStatRecord {
    pub origin: String,
    pub destination: String,
    pub hour: u8,
    pub trips: u32,
    pub avg_fare: f64,
    pub avg_duration_min: f64,
}

/// Everything the upstream job produced for one city.
#[derive(Debug, Clone, Default)]
pub struct CityTables {
    pub zones: Vec<ZoneRecord>,
    pub trips: Vec<TripStatRecord>,
}

/// Seam between the engine and the upstream data. The engine never
/// validates input quality beyond tolerating missing/zero rows; stale
/// tables are fine between snapshot rebuilds.
pub trait TripDataSource: Send + Sync {
    fn signature(&self) -> &'static str;

    /// Whether any source data exists for the city at all.
    fn has_city(&self, city_id: CityId) -> bool;

    fn load_city(&self, city_id: CityId) -> Result<CityTables>;
}

/// Reads the upstream tables from `<root>/city_<id>/zones.json` and
/// `<root>/city_<id>/trip_stats.json`.
pub struct JsonDirectorySource {
    root: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn city_dir(&self, city_id: CityId) -> PathBuf {
        self.root.join(format!("city_{}", city_id))
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).with_context(|| format!("Failed to parse {:?}", path))
    }
}

impl TripDataSource for JsonDirectorySource {
    fn signature(&self) -> &'static str {
        "JSON Tables"
    }

    fn has_city(&self, city_id: CityId) -> bool {
        self.city_dir(city_id).join("zones.json").exists()
    }

    fn load_city(&self, city_id: CityId) -> Result<CityTables> {
        let dir = self.city_dir(city_id);
        let zones: Vec<ZoneRecord> = Self::read_json(&dir.join("zones.json"))?;
        let trips: Vec<TripStatRecord> = Self::read_json(&dir.join("trip_stats.json"))?;
        Ok(CityTables { zones, trips })
    }
}

/// In-memory tables for tests and demos.
#[derive(Default)]
pub struct InMemorySource {
    cities: std::collections::HashMap<CityId, CityTables>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(mut self, city_id: CityId, tables: CityTables) -> Self {
        self.cities.insert(city_id, tables);
        self
    }
}

impl TripDataSource for InMemorySource {
    fn signature(&self) -> &'static str {
        "In-Memory Tables"
    }

    fn has_city(&self, city_id: CityId) -> bool {
        self.cities.contains_key(&city_id)
    }

    fn load_city(&self, city_id: CityId) -> Result<CityTables> {
        self.cities
            .get(&city_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no in-memory tables for city {}", city_id))
    }
}

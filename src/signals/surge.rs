use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::CityId;

/// Surge multiplier signal. Defaults to neutral: a missing table, a missing
/// row, or no provider at all must never fail a solve.
pub trait SurgeProvider: Send + Sync {
    fn multiplier(&self, _city_id: CityId, _zone_id: &str, _hour: u8) -> f64 {
        1.0
    }
}

/// The always-neutral provider, for callers without surge data.
pub struct NeutralSurge;

impl SurgeProvider for NeutralSurge {}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SurgeRecord {
    pub city_id: CityId,
    pub hour: u8,
    pub surge_multiplier: f64,
}

/// Hourly surge multipliers per city. The upstream feed publishes one value
/// per (city, hour); it applies to every zone in the city.
#[derive(Default)]
pub struct SurgeTable {
    lookup: HashMap<(CityId, u8), f64>,
}

impl SurgeTable {
    pub fn from_records(records: Vec<SurgeRecord>) -> Self {
        let lookup = records
            .into_iter()
            .map(|r| ((r.city_id, r.hour), r.surge_multiplier))
            .collect();
        Self { lookup }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read surge table {:?}", path))?;
        let records: Vec<SurgeRecord> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse surge table {:?}", path))?;
        log::info!("Loaded {} surge rows from {:?}", records.len(), path);
        Ok(Self::from_records(records))
    }
}

impl SurgeProvider for SurgeTable {
    fn multiplier(&self, city_id: CityId, _zone_id: &str, hour: u8) -> f64 {
        self.lookup.get(&(city_id, hour)).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_are_neutral() {
        let table = SurgeTable::from_records(vec![SurgeRecord {
            city_id: 3,
            hour: 8,
            surge_multiplier: 1.4,
        }]);

        assert_eq!(table.multiplier(3, "c_3_0", 8), 1.4);
        assert_eq!(table.multiplier(3, "c_3_0", 9), 1.0);
        assert_eq!(table.multiplier(1, "c_1_0", 8), 1.0);
    }
}

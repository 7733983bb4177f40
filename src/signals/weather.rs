use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::domain::CityId;

/// Weather multiplier signal by (city, date, hour). Defaults to neutral.
pub trait WeatherProvider: Send + Sync {
    fn multiplier(&self, _city_id: CityId, _date: NaiveDate, _hour: u8) -> f64 {
        1.0
    }
}

/// The always-neutral provider, for callers without weather data.
pub struct NeutralWeather;

impl WeatherProvider for NeutralWeather {}

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString,
)]
pub enum WeatherCondition {
    Clear,
    Rain,
    Snow,
}

impl WeatherCondition {
    /// Demand lift per condition: bad weather means more ride requests.
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Clear => 1.0,
            Self::Rain => 1.2,
            Self::Snow => 1.3,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WeatherRecord {
    pub city_id: CityId,
    pub date: NaiveDate,
    pub condition: WeatherCondition,
}

struct CityWeather {
    /// Daily observations sorted by date.
    history: Vec<(NaiveDate, WeatherCondition)>,
    /// First-order transition counts: (today, tomorrow) -> occurrences.
    transitions: HashMap<(WeatherCondition, WeatherCondition), u32>,
    most_frequent: WeatherCondition,
}

/// Per-city Markov model over daily conditions, trained from the daily
/// weather history table. Prediction for a date follows the most likely
/// transition from the last observed condition before that date, falling
/// back to the city's most frequent condition, falling back to Clear.
#[derive(Default)]
pub struct WeatherModel {
    cities: HashMap<CityId, CityWeather>,
}

impl WeatherModel {
    pub fn from_records(records: Vec<WeatherRecord>) -> Self {
        let mut by_city: HashMap<CityId, Vec<(NaiveDate, WeatherCondition)>> = HashMap::new();
        for rec in records {
            by_city
                .entry(rec.city_id)
                .or_default()
                .push((rec.date, rec.condition));
        }

        let cities = by_city
            .into_iter()
            .map(|(city, mut history)| {
                history.sort_by_key(|(date, _)| *date);

                let mut transitions = HashMap::new();
                for ((_, today), (_, tomorrow)) in history.iter().tuple_windows() {
                    *transitions.entry((*today, *tomorrow)).or_insert(0) += 1;
                }

                let mut counts: HashMap<WeatherCondition, u32> = HashMap::new();
                for &(_, cond) in &history {
                    *counts.entry(cond).or_insert(0) += 1;
                }
                let most_frequent = counts
                    .into_iter()
                    .max_by_key(|&(cond, count)| (count, std::cmp::Reverse(cond.to_string())))
                    .map(|(cond, _)| cond)
                    .unwrap_or(WeatherCondition::Clear);

                (
                    city,
                    CityWeather {
                        history,
                        transitions,
                        most_frequent,
                    },
                )
            })
            .collect();

        Self { cities }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read weather history {:?}", path))?;
        let records: Vec<WeatherRecord> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse weather history {:?}", path))?;
        log::info!("Loaded {} weather rows from {:?}", records.len(), path);
        Ok(Self::from_records(records))
    }

    pub fn predict(&self, city_id: CityId, date: NaiveDate) -> WeatherCondition {
        let Some(city) = self.cities.get(&city_id) else {
            return WeatherCondition::Clear;
        };

        // Last observation strictly before the target date.
        let last = city
            .history
            .iter()
            .rev()
            .find(|(d, _)| *d < date)
            .map(|(_, cond)| *cond);

        let Some(last) = last else {
            return city.most_frequent;
        };

        city.transitions
            .iter()
            .filter(|((from, _), _)| *from == last)
            .max_by_key(|&(&(_, to), &count)| (count, std::cmp::Reverse(to.to_string())))
            .map(|(&(_, to), _)| to)
            .unwrap_or(city.most_frequent)
    }
}

impl WeatherProvider for WeatherModel {
    fn multiplier(&self, city_id: CityId, date: NaiveDate, _hour: u8) -> f64 {
        self.predict(city_id, date).multiplier()
    }
}

use crate::domain::CityId;

/// Engine-level failure taxonomy.
///
/// Anything below this (snapshot I/O, cache backends, signal tables) is an
/// anyhow error at its own seam and never escapes as a request failure:
/// cache errors degrade to misses, signal errors degrade to neutral
/// multipliers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No source tables and no snapshot exist for the requested city.
    /// Fatal to the request; not retried automatically.
    DataUnavailable { city: CityId },

    /// The city graph has no zones at all. The service layer turns this
    /// into a zero-earnings "no recommendation" answer rather than an
    /// error the client sees.
    NoReachableZones { city: CityId },

    /// The requested start zone is not part of the city's zone set.
    UnknownZone { city: CityId, zone: String },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataUnavailable { city } => {
                write!(f, "no trip data or snapshot available for city {}", city)
            }
            Self::NoReachableZones { city } => {
                write!(f, "city {} has an empty zone graph", city)
            }
            Self::UnknownZone { city, zone } => {
                write!(f, "zone {} not found in city {}", zone, city)
            }
        }
    }
}

impl std::error::Error for EngineError {}

use serde::{Deserialize, Serialize};

pub type CityId = u32;

/// Zone identifiers come from the upstream clustering job as opaque strings
/// (e.g. `c_3_2`). Ordering on the raw string is the tie-break order used
/// everywhere in the engine.
pub type ZoneId = String;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// Lat/lon extent of a zone, for map display.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// A clustered demand hotspot. Immutable once the city graph is built.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub city_id: CityId,
    pub centroid: Coordinate,
    pub bounds: BoundingBox,
}

/// Where a solve begins: a pinned zone, or a search across every zone for
/// the best starting position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StartZone {
    Best,
    Zone(ZoneId),
}

impl StartZone {
    pub fn from_option(zone: Option<String>) -> Self {
        match zone {
            Some(id) => Self::Zone(id),
            None => Self::Best,
        }
    }
}

impl std::fmt::Display for StartZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Best => write!(f, "best"),
            Self::Zone(id) => write!(f, "{}", id),
        }
    }
}

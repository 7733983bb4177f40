use serde::{Deserialize, Serialize};

use crate::domain::{CityId, Zone, ZoneId};

pub const HOURS: usize = 24;

/// Per-hour statistics for one ordered zone pair.
///
/// `dest` is a dense index into the owning graph's zone vector, assigned at
/// build time so the DP inner loops run on plain array indexing instead of
/// string-keyed maps.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EdgeStats {
    pub dest: usize,

    /// Trip-weighted averages across all hours. Fallback values for hours
    /// with no observed trips.
    pub avg_fare: f64,
    pub avg_duration_min: f64,

    pub hourly_trips: [u32; HOURS],
    pub hourly_fare: [f64; HOURS],
    pub hourly_duration: [f64; HOURS],
}

impl EdgeStats {
    pub fn new(dest: usize) -> Self {
        Self {
            dest,
            avg_fare: 0.0,
            avg_duration_min: 0.0,
            hourly_trips: [0; HOURS],
            hourly_fare: [0.0; HOURS],
            hourly_duration: [0.0; HOURS],
        }
    }

    pub fn trips_at(&self, hour: u8) -> u32 {
        self.hourly_trips[hour as usize]
    }

    /// Average fare for the hour, falling back to the overall average when
    /// the hour has no observed trips.
    pub fn fare_at(&self, hour: u8) -> f64 {
        if self.hourly_trips[hour as usize] > 0 {
            self.hourly_fare[hour as usize]
        } else {
            self.avg_fare
        }
    }

    pub fn duration_at(&self, hour: u8) -> f64 {
        if self.hourly_trips[hour as usize] > 0 {
            self.hourly_duration[hour as usize]
        } else {
            self.avg_duration_min
        }
    }
}

/// Directed weighted graph of one city's demand zones.
///
/// Zones are sorted by id and addressed by dense index everywhere below the
/// public API. Edge rows are sorted by destination index, which (because
/// zones are sorted by id) is also lexicographic destination order — the
/// deterministic tie-break order of the optimizer.
///
/// Read-only after construction: the store hands out `Arc<ZoneGraph>` and
/// any number of solves may read it concurrently.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ZoneGraph {
    pub city_id: CityId,
    zones: Vec<Zone>,
    edges: Vec<Vec<EdgeStats>>,
    hourly_out_totals: Vec<[u32; HOURS]>,
}

impl ZoneGraph {
    /// Assemble a graph from already-indexed parts. Callers are expected to
    /// have sorted `zones` by id and edge rows by destination index; this
    /// is checked in debug builds only.
    pub fn from_parts(
        city_id: CityId,
        zones: Vec<Zone>,
        edges: Vec<Vec<EdgeStats>>,
        hourly_out_totals: Vec<[u32; HOURS]>,
    ) -> Self {
        debug_assert_eq!(zones.len(), edges.len());
        debug_assert_eq!(zones.len(), hourly_out_totals.len());
        debug_assert!(zones.windows(2).all(|w| w[0].id < w[1].id));
        debug_assert!(
            edges
                .iter()
                .all(|row| row.windows(2).all(|w| w[0].dest < w[1].dest))
        );

        Self {
            city_id,
            zones,
            edges,
            hourly_out_totals,
        }
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, idx: usize) -> &Zone {
        &self.zones[idx]
    }

    pub fn zone_id(&self, idx: usize) -> &ZoneId {
        &self.zones[idx].id
    }

    pub fn index_of(&self, zone_id: &str) -> Option<usize> {
        self.zones
            .binary_search_by(|z| z.id.as_str().cmp(zone_id))
            .ok()
    }

    /// Outgoing edges from a zone, in destination-id order.
    pub fn edges_from(&self, idx: usize) -> &[EdgeStats] {
        &self.edges[idx]
    }

    pub fn edge(&self, from: usize, to: usize) -> Option<&EdgeStats> {
        let row = &self.edges[from];
        row.binary_search_by(|e| e.dest.cmp(&to))
            .ok()
            .map(|pos| &row[pos])
    }

    /// Total observed outgoing trips from a zone during an hour, across all
    /// destinations. The demand figure behind expected wait time and
    /// probability normalization.
    pub fn out_total(&self, idx: usize, hour: u8) -> u32 {
        self.hourly_out_totals[idx][hour as usize]
    }
}

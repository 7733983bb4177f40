//! Singleton-per-city registry of zone graphs.
//!
//! `load` is idempotent and returns the same `Arc` for a city for the rest
//! of the process lifetime. First access builds the graph exactly once even
//! under concurrent load: callers racing on a cold city serialize on the
//! city's build lock and all but one find the graph already present when
//! they acquire it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use crate::data::graph_builder::build_city_graph;
use crate::data::snapshot;
use crate::data::source::TripDataSource;
use crate::domain::CityId;
use crate::error::EngineError;
use crate::models::ZoneGraph;

#[derive(Default)]
struct CitySlot {
    build_lock: Mutex<()>,
    graph: RwLock<Option<Arc<ZoneGraph>>>,
}

pub struct GraphStore {
    source: Box<dyn TripDataSource>,
    snapshot_dir: PathBuf,
    use_snapshots: bool,
    slots: Mutex<HashMap<CityId, Arc<CitySlot>>>,
}

impl GraphStore {
    pub fn new(source: Box<dyn TripDataSource>, snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            snapshot_dir: snapshot_dir.into(),
            use_snapshots: true,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Skip snapshot reads AND writes; always reconstruct from source.
    /// Used by the CLI's --rebuild flag and by tests.
    pub fn without_snapshots(mut self) -> Self {
        self.use_snapshots = false;
        self
    }

    fn slot(&self, city_id: CityId) -> Arc<CitySlot> {
        let mut slots = self.slots.lock().unwrap();
        slots.entry(city_id).or_default().clone()
    }

    pub fn load(&self, city_id: CityId) -> Result<Arc<ZoneGraph>, EngineError> {
        let slot = self.slot(city_id);

        // Fast path: already built.
        if let Some(graph) = slot.graph.read().unwrap().as_ref() {
            return Ok(graph.clone());
        }

        // Single-flight: one builder per city, everyone else waits here.
        let _guard = slot.build_lock.lock().unwrap();
        if let Some(graph) = slot.graph.read().unwrap().as_ref() {
            return Ok(graph.clone());
        }

        let graph = Arc::new(self.build(city_id)?);
        *slot.graph.write().unwrap() = Some(graph.clone());
        Ok(graph)
    }

    fn build(&self, city_id: CityId) -> Result<ZoneGraph, EngineError> {
        // Snapshot read takes precedence over reconstruction.
        if self.use_snapshots {
            match snapshot::read_snapshot(&self.snapshot_dir, city_id) {
                Ok(graph) => return Ok(graph),
                Err(e) => {
                    if snapshot::snapshot_exists(&self.snapshot_dir, city_id) {
                        log::warn!("Snapshot load failed for city {}: {:#}. Rebuilding.", city_id, e);
                    }
                }
            }
        }

        if !self.source.has_city(city_id) {
            return Err(EngineError::DataUnavailable { city: city_id });
        }

        log::info!(
            "Building zone graph for city {} from {}...",
            city_id,
            self.source.signature()
        );
        let tables = self.source.load_city(city_id).map_err(|e| {
            log::error!("Source load failed for city {}: {:#}", city_id, e);
            EngineError::DataUnavailable { city: city_id }
        })?;
        let graph = build_city_graph(city_id, &tables).map_err(|e| {
            log::error!("Graph build failed for city {}: {:#}", city_id, e);
            EngineError::DataUnavailable { city: city_id }
        })?;

        // A failed snapshot write costs the next process a rebuild, nothing
        // more.
        if self.use_snapshots {
            if let Err(e) = snapshot::write_snapshot(&self.snapshot_dir, &graph) {
                log::warn!("Snapshot write failed for city {}: {:#}", city_id, e);
            }
        }

        Ok(graph)
    }

    /// Drop the in-memory instance and delete the snapshot so the next
    /// `load` reconstructs from the (possibly refreshed) source tables.
    pub fn invalidate(&self, city_id: CityId) {
        let slot = self.slot(city_id);
        let _guard = slot.build_lock.lock().unwrap();
        *slot.graph.write().unwrap() = None;

        match snapshot::delete_snapshot(&self.snapshot_dir, city_id) {
            Ok(true) => log::info!("Snapshot deleted for city {}", city_id),
            Ok(false) => {}
            Err(e) => log::warn!("Snapshot delete failed for city {}: {:#}", city_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::{CityTables, InMemorySource, TripStatRecord, ZoneRecord};

    fn tiny_tables() -> CityTables {
        CityTables {
            zones: vec![
                ZoneRecord {
                    zone_id: "c_7_0".into(),
                    city_id: 7,
                    lat: 0.0,
                    lon: 0.0,
                    lat_min: 0.0,
                    lat_max: 0.0,
                    lon_min: 0.0,
                    lon_max: 0.0,
                },
                ZoneRecord {
                    zone_id: "c_7_1".into(),
                    city_id: 7,
                    lat: 1.0,
                    lon: 1.0,
                    lat_min: 1.0,
                    lat_max: 1.0,
                    lon_min: 1.0,
                    lon_max: 1.0,
                },
            ],
            trips: vec![TripStatRecord {
                origin: "c_7_0".into(),
                destination: "c_7_1".into(),
                hour: 8,
                trips: 5,
                avg_fare: 10.0,
                avg_duration_min: 10.0,
            }],
        }
    }

    #[test]
    fn load_is_singleton_per_city() {
        let source = InMemorySource::new().with_city(7, tiny_tables());
        let store = GraphStore::new(Box::new(source), "unused").without_snapshots();

        let a = store.load(7).unwrap();
        let b = store.load(7).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn missing_city_is_data_unavailable() {
        let source = InMemorySource::new();
        let store = GraphStore::new(Box::new(source), "unused").without_snapshots();

        assert_eq!(
            store.load(99).unwrap_err(),
            EngineError::DataUnavailable { city: 99 }
        );
    }

    #[test]
    fn concurrent_first_access_builds_once() {
        let source = InMemorySource::new().with_city(7, tiny_tables());
        let store = Arc::new(GraphStore::new(Box::new(source), "unused").without_snapshots());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.load(7).unwrap())
            })
            .collect();

        let graphs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for g in &graphs[1..] {
            assert!(Arc::ptr_eq(&graphs[0], g));
        }
    }

    #[test]
    fn invalidate_forces_new_instance() {
        let source = InMemorySource::new().with_city(7, tiny_tables());
        let store = GraphStore::new(Box::new(source), "unused").without_snapshots();

        let a = store.load(7).unwrap();
        store.invalidate(7);
        let b = store.load(7).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.zone_count(), b.zone_count());
    }
}

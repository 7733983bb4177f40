//! Versioned binary snapshots of constructed zone graphs.
//!
//! A cold load builds the graph from the upstream tables and serializes it
//! here; every later process start deserializes instead of reconstructing.
//! Deleting the file (or bumping the format version) forces a rebuild.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::{PERSISTENCE, graph_snapshot_filename};
use crate::domain::CityId;
use crate::models::ZoneGraph;
use crate::utils::TimeUtils;

/// Binary snapshot file wrapper with metadata
#[derive(Serialize, Deserialize, Debug)]
struct SnapshotFile {
    pub version: f64,
    pub created_ms: i64,
    pub city_id: CityId,
    pub graph: ZoneGraph,
}

fn snapshot_path(dir: &Path, city_id: CityId) -> PathBuf {
    dir.join(graph_snapshot_filename(city_id))
}

// Helper to create a new file and any missing parent directories.
fn create_file_with_parents(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))
}

pub fn write_snapshot(dir: &Path, graph: &ZoneGraph) -> Result<PathBuf> {
    let full_path = snapshot_path(dir, graph.city_id);

    let file = create_file_with_parents(&full_path)?;
    let writer = BufWriter::new(file);

    let snapshot = SnapshotFile {
        version: PERSISTENCE.graph.version,
        created_ms: TimeUtils::now_timestamp_ms(),
        city_id: graph.city_id,
        graph: graph.clone(),
    };

    bincode::serialize_into(writer, &snapshot)
        .with_context(|| format!("Failed to serialize snapshot to: {}", full_path.display()))?;

    log::info!(
        "Snapshot written: {} ({} zones)",
        full_path.display(),
        graph.zone_count()
    );
    Ok(full_path)
}

pub fn read_snapshot(dir: &Path, city_id: CityId) -> Result<ZoneGraph> {
    let full_path = snapshot_path(dir, city_id);

    let file =
        File::open(&full_path).with_context(|| format!("Failed to open {:?}", full_path))?;
    let reader = BufReader::new(file);

    let snapshot: SnapshotFile = bincode::deserialize_from(reader)
        .with_context(|| format!("Failed to deserialize snapshot from: {:?}", full_path))?;

    if snapshot.version != PERSISTENCE.graph.version {
        bail!(
            "Snapshot version mismatch: file v{} vs required v{}",
            snapshot.version,
            PERSISTENCE.graph.version
        );
    }
    if snapshot.city_id != city_id {
        bail!(
            "Snapshot city mismatch: file has city {}, expected {}",
            snapshot.city_id,
            city_id
        );
    }

    log::info!(
        "Snapshot loaded: city {} ({} zones, written {})",
        city_id,
        snapshot.graph.zone_count(),
        snapshot.created_ms
    );
    Ok(snapshot.graph)
}

pub fn snapshot_exists(dir: &Path, city_id: CityId) -> bool {
    snapshot_path(dir, city_id).exists()
}

/// Returns true if a file was actually removed.
pub fn delete_snapshot(dir: &Path, city_id: CityId) -> Result<bool> {
    let full_path = snapshot_path(dir, city_id);
    if !full_path.exists() {
        return Ok(false);
    }
    fs::remove_file(&full_path)
        .with_context(|| format!("Failed to delete snapshot: {}", full_path.display()))?;
    Ok(true)
}

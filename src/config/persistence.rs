//! File persistence and cache configuration

/// Configuration for Zone Graph snapshot persistence
pub struct GraphPersistenceConfig {
    /// Directory path for storing graph snapshots
    pub directory: &'static str,
    /// Base filename for snapshot files (without extension)
    pub filename_base: &'static str,
    /// Current version of the snapshot serialization format
    pub version: f64,
}

/// Configuration for the shared result-cache tier
pub struct ResultCacheConfig {
    /// SQLite database file holding cached solve results
    pub db_filename: &'static str,
    /// How long a shared-tier entry stays valid
    pub ttl_secs: u64,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub graph: GraphPersistenceConfig,
    pub result_cache: ResultCacheConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    graph: GraphPersistenceConfig {
        directory: "graph_data",
        filename_base: "zg",
        version: 1.0,
    },
    result_cache: ResultCacheConfig {
        db_filename: "solve_cache.sqlite",
        ttl_secs: 3600,
    },
};

/// Generate city-specific snapshot filename
/// Example: "zg_city_3_v1.bin"
pub fn graph_snapshot_filename(city_id: u32) -> String {
    format!(
        "{}_city_{}_v{}.bin",
        PERSISTENCE.graph.filename_base, city_id, PERSISTENCE.graph.version
    )
}

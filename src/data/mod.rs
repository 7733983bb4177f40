mod graph_builder;
mod graph_store;
mod snapshot;
mod source;

pub use {
    graph_builder::build_city_graph,
    graph_store::GraphStore,
    snapshot::{delete_snapshot, read_snapshot, snapshot_exists, write_snapshot},
    source::{CityTables, InMemorySource, JsonDirectorySource, TripDataSource, TripStatRecord, ZoneRecord},
};

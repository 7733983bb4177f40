//! Builds per-city zone graphs from the upstream trip tables.
//!
//! Zones are sorted by id before indexing so dense indices are stable across
//! rebuilds of the same input, and edge rows end up in lexicographic
//! destination order — the tie-break order the optimizer relies on.

use std::collections::HashMap;

use anyhow::Result;

use crate::data::source::CityTables;
use crate::domain::{BoundingBox, CityId, Coordinate, Zone};
use crate::models::{EdgeStats, HOURS, ZoneGraph};

pub fn build_city_graph(city_id: CityId, tables: &CityTables) -> Result<ZoneGraph> {
    // 1. Zone set, sorted by id. Duplicate rows keep the first occurrence.
    let mut zones: Vec<Zone> = Vec::with_capacity(tables.zones.len());
    for rec in &tables.zones {
        if rec.city_id != city_id {
            log::warn!(
                "Zone {} tagged city {} found in tables for city {}. Skipping.",
                rec.zone_id,
                rec.city_id,
                city_id
            );
            continue;
        }
        zones.push(Zone {
            id: rec.zone_id.clone(),
            city_id,
            centroid: Coordinate {
                lat: rec.lat,
                lon: rec.lon,
            },
            bounds: BoundingBox {
                lat_min: rec.lat_min,
                lat_max: rec.lat_max,
                lon_min: rec.lon_min,
                lon_max: rec.lon_max,
            },
        });
    }
    zones.sort_by(|a, b| a.id.cmp(&b.id));
    zones.dedup_by(|a, b| a.id == b.id);

    let index: HashMap<&str, usize> = zones
        .iter()
        .enumerate()
        .map(|(i, z)| (z.id.as_str(), i))
        .collect();

    // 2. Accumulate hourly statistics per ordered pair. Rows referencing
    // unknown zones violate the graph invariant and are dropped with a
    // warning rather than failing the whole build (upstream data may be
    // stale relative to the zone table).
    let n = zones.len();
    let mut edge_map: HashMap<(usize, usize), EdgeStats> = HashMap::new();
    let mut dropped = 0usize;

    for row in &tables.trips {
        let (Some(&from), Some(&to)) = (
            index.get(row.origin.as_str()),
            index.get(row.destination.as_str()),
        ) else {
            dropped += 1;
            continue;
        };
        if row.hour as usize >= HOURS {
            dropped += 1;
            continue;
        }

        let hour = row.hour as usize;
        let edge = edge_map
            .entry((from, to))
            .or_insert_with(|| EdgeStats::new(to));
        edge.hourly_trips[hour] += row.trips;
        edge.hourly_fare[hour] = row.avg_fare;
        edge.hourly_duration[hour] = row.avg_duration_min;
    }

    if dropped > 0 {
        log::warn!(
            "City {}: dropped {} trip rows referencing unknown zones or invalid hours",
            city_id,
            dropped
        );
    }

    // 3. Overall trip-weighted averages as the fallback for unobserved
    // hours, then per-origin rows sorted by destination index.
    let mut edges: Vec<Vec<EdgeStats>> = vec![Vec::new(); n];
    let mut hourly_out_totals = vec![[0u32; HOURS]; n];

    for ((from, _to), mut edge) in edge_map {
        let total_trips: u64 = edge.hourly_trips.iter().map(|&t| t as u64).sum();
        if total_trips > 0 {
            let mut fare_sum = 0.0;
            let mut duration_sum = 0.0;
            for h in 0..HOURS {
                let t = edge.hourly_trips[h] as f64;
                fare_sum += t * edge.hourly_fare[h];
                duration_sum += t * edge.hourly_duration[h];
            }
            edge.avg_fare = fare_sum / total_trips as f64;
            edge.avg_duration_min = duration_sum / total_trips as f64;
        }

        for h in 0..HOURS {
            hourly_out_totals[from][h] += edge.hourly_trips[h];
        }
        edges[from].push(edge);
    }

    for row in &mut edges {
        row.sort_by_key(|e| e.dest);
    }

    let graph = ZoneGraph::from_parts(city_id, zones, edges, hourly_out_totals);
    log::info!(
        "City {}: built graph with {} zones, {} edges",
        city_id,
        graph.zone_count(),
        (0..graph.zone_count())
            .map(|i| graph.edges_from(i).len())
            .sum::<usize>()
    );

    Ok(graph)
}

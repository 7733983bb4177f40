//! Two-tier result cache for solve outcomes.
//!
//! Tiers are checked in order behind one interface; any tier failure is a
//! miss (reads) or a no-op (writes), so a cache outage costs latency, never
//! correctness. Entries are immutable once written.

mod memory;
mod sqlite;

pub use memory::MemoryTier;
pub use sqlite::SqliteTier;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use strum_macros::Display;

use crate::config::PERSISTENCE;
use crate::domain::{CityId, StartZone};
use crate::models::SolveOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum CacheCategory {
    /// A solve pinned to a specific start zone.
    Solve,
    /// A best-starting-position solve (searched over all zones).
    BestStart,
}

/// The full solve-parameter tuple. Any difference — including the calendar
/// date, since surge/weather signals are date-dependent — is a different
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub category: CacheCategory,
    pub city_id: CityId,
    pub start: StartZone,
    pub start_hour: u8,
    pub duration_hours: u8,
    pub date: NaiveDate,
}

impl CacheKey {
    pub fn render(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.category,
            self.city_id,
            self.start,
            self.start_hour,
            self.duration_hours,
            self.date.format("%Y-%m-%d")
        )
    }
}

/// What to wipe on invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheScope {
    All,
    City(CityId),
    Category(CacheCategory),
}

/// Abstract interface for one cache tier. Each tier is independently
/// swappable and mockable.
#[async_trait]
pub trait CacheTier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn get(&self, key: &CacheKey) -> Result<Option<SolveOutcome>>;
    async fn put(&self, key: &CacheKey, value: &SolveOutcome, ttl: Duration) -> Result<()>;
    /// Returns how many entries were removed.
    async fn invalidate(&self, scope: &CacheScope) -> Result<u64>;
}

/// The ordered tier chain. Reads stop at the first hit; writes go through
/// to every tier.
pub struct CacheStack {
    tiers: Vec<Box<dyn CacheTier>>,
    ttl: Duration,
}

impl CacheStack {
    pub fn new(tiers: Vec<Box<dyn CacheTier>>) -> Self {
        Self {
            tiers,
            ttl: Duration::from_secs(PERSISTENCE.result_cache.ttl_secs),
        }
    }

    /// No tiers at all: every read misses, every write is a no-op. Solves
    /// still work; only latency changes.
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn get(&self, key: &CacheKey) -> Option<SolveOutcome> {
        for tier in &self.tiers {
            match tier.get(key).await {
                Ok(Some(value)) => {
                    log::debug!("Cache hit [{}] {}", tier.name(), key.render());
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => {
                    // A broken tier reads as a miss.
                    log::warn!("Cache read error [{}]: {:#}", tier.name(), e);
                }
            }
        }
        None
    }

    pub async fn put(&self, key: &CacheKey, value: &SolveOutcome) {
        for tier in &self.tiers {
            if let Err(e) = tier.put(key, value, self.ttl).await {
                log::warn!("Cache write error [{}]: {:#}", tier.name(), e);
            }
        }
    }

    pub async fn invalidate(&self, scope: &CacheScope) -> u64 {
        let mut removed = 0;
        for tier in &self.tiers {
            match tier.invalidate(scope).await {
                Ok(n) => removed += n,
                Err(e) => log::warn!("Cache invalidate error [{}]: {:#}", tier.name(), e),
            }
        }
        removed
    }
}

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::{CacheCategory, CacheKey, CacheScope, CacheTier};
use crate::domain::CityId;
use crate::models::SolveOutcome;

struct MemoryEntry {
    city_id: CityId,
    category: CacheCategory,
    value: SolveOutcome,
}

/// Process-local tier. Unbounded lifetime within the process — entries
/// survive until restart or explicit invalidation; the TTL only governs the
/// shared tier.
#[derive(Default)]
pub struct MemoryTier {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheTier for MemoryTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<SolveOutcome>> {
        let entries = self.entries.read().unwrap();
        Ok(entries.get(&key.render()).map(|e| e.value.clone()))
    }

    async fn put(&self, key: &CacheKey, value: &SolveOutcome, _ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key.render(),
            MemoryEntry {
                city_id: key.city_id,
                category: key.category,
                value: value.clone(),
            },
        );
        Ok(())
    }

    async fn invalidate(&self, scope: &CacheScope) -> Result<u64> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        match scope {
            CacheScope::All => entries.clear(),
            CacheScope::City(city_id) => entries.retain(|_, e| e.city_id != *city_id),
            CacheScope::Category(category) => entries.retain(|_, e| e.category != *category),
        }
        Ok((before - entries.len()) as u64)
    }
}

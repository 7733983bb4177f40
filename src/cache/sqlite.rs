use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    Row,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous},
};

use super::{CacheCategory, CacheKey, CacheScope, CacheTier};
use crate::models::SolveOutcome;
use crate::utils::TimeUtils;

/// Shared TTL tier backed by SQLite, durable across processes and restarts.
pub struct SqliteTier {
    pool: SqlitePool,
}

impl SqliteTier {
    pub async fn new(db_path: &str) -> Result<Self> {
        let connection_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10))
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(2) // Low connection count, this is low throughput
            .connect_with(connection_options)
            .await
            .context("Failed to connect to solve cache db")?;

        let tier = Self { pool };
        tier.initialize().await?;
        Ok(tier)
    }

    /// In-memory database for tests.
    pub async fn new_in_memory() -> Result<Self> {
        let connection_options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connection_options)
            .await
            .context("Failed to open in-memory cache db")?;

        let tier = Self { pool };
        tier.initialize().await?;
        Ok(tier)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS solve_cache (
                cache_key TEXT PRIMARY KEY,
                city_id INTEGER NOT NULL,
                category TEXT NOT NULL,
                payload TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create solve_cache table")?;

        Ok(())
    }
}

#[async_trait]
impl CacheTier for SqliteTier {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<SolveOutcome>> {
        let row = sqlx::query(
            "SELECT payload, expires_at FROM solve_cache WHERE cache_key = ?",
        )
        .bind(key.render())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: i64 = row.try_get("expires_at")?;
        if expires_at <= TimeUtils::now_timestamp_ms() {
            // Expired entries are lazily reaped on read.
            sqlx::query("DELETE FROM solve_cache WHERE cache_key = ?")
                .bind(key.render())
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        let payload: String = row.try_get("payload")?;
        let outcome = serde_json::from_str(&payload).context("Corrupt cache payload")?;
        Ok(Some(outcome))
    }

    async fn put(&self, key: &CacheKey, value: &SolveOutcome, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        let expires_at = TimeUtils::now_timestamp_ms() + ttl.as_millis() as i64;

        // Last write wins; two callers racing on the same miss both write
        // the same immutable value.
        sqlx::query(
            "INSERT OR REPLACE INTO solve_cache (cache_key, city_id, category, payload, expires_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(key.render())
        .bind(key.city_id as i64)
        .bind(key.category.to_string())
        .bind(payload)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .context("Failed to write cache entry")?;

        Ok(())
    }

    async fn invalidate(&self, scope: &CacheScope) -> Result<u64> {
        let result = match scope {
            CacheScope::All => {
                sqlx::query("DELETE FROM solve_cache")
                    .execute(&self.pool)
                    .await?
            }
            CacheScope::City(city_id) => {
                sqlx::query("DELETE FROM solve_cache WHERE city_id = ?")
                    .bind(*city_id as i64)
                    .execute(&self.pool)
                    .await?
            }
            CacheScope::Category(category) => {
                sqlx::query("DELETE FROM solve_cache WHERE category = ?")
                    .bind(category.to_string())
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::StartZone;

    fn key(city: u32) -> CacheKey {
        CacheKey {
            category: CacheCategory::Solve,
            city_id: city,
            start: StartZone::Zone("c_1_0".into()),
            start_hour: 8,
            duration_hours: 4,
            date: NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
        }
    }

    fn outcome() -> SolveOutcome {
        SolveOutcome {
            expected_earnings: 99.25,
            path: vec!["c_1_0".into(), "c_1_1".into()],
            start_zone: "c_1_0".into(),
        }
    }

    #[tokio::test]
    async fn roundtrip_preserves_payload_exactly() {
        let tier = SqliteTier::new_in_memory().await.unwrap();

        tier.put(&key(1), &outcome(), Duration::from_secs(60))
            .await
            .unwrap();

        let hit = tier.get(&key(1)).await.unwrap().unwrap();
        assert_eq!(hit, outcome());
    }

    #[tokio::test]
    async fn expired_entries_read_as_misses() {
        let tier = SqliteTier::new_in_memory().await.unwrap();

        tier.put(&key(1), &outcome(), Duration::from_millis(0))
            .await
            .unwrap();

        assert!(tier.get(&key(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidates_by_city() {
        let tier = SqliteTier::new_in_memory().await.unwrap();
        let ttl = Duration::from_secs(60);

        tier.put(&key(1), &outcome(), ttl).await.unwrap();
        tier.put(&key(2), &outcome(), ttl).await.unwrap();

        let removed = tier.invalidate(&CacheScope::City(1)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(tier.get(&key(1)).await.unwrap().is_none());
        assert!(tier.get(&key(2)).await.unwrap().is_some());
    }
}

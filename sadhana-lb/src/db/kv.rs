//! Persistence gateway
//!
//! A narrow get/set/delete interface over the `kv_store` table. Values
//! are JSON-encoded; `set` takes an optional TTL in seconds, while
//! `set_permanent` is the write path for durable records. Expiry is
//! honored lazily at read time.
//!
//! There is no compare-and-swap: concurrent writers to the same key are
//! last-writer-wins, matching the rare, human-serialized cadence of
//! sync operations.

use chrono::Utc;
use sadhana_common::records::ActivityType;
use sadhana_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;

/// Keys used by the sync and read paths
pub mod keys {
    pub const MEDITATION: &str = "data:meditation";
    pub const PRACTICE: &str = "data:practice";
    pub const CLASS: &str = "data:class";
    pub const META: &str = "data:meta";
    pub const TEAMS: &str = "data:teams";
    pub const ACTIVITIES_ALL: &str = "activities:all";
    pub const SUBMISSIONS_ALL: &str = "submissions:all";
    pub const MEMBERS_ALL: &str = "members:all";
    pub const MEMBERS_SYNCED: &str = "members:synced";
}

/// Per-type table key for an activity type
pub fn table_key(activity: ActivityType) -> &'static str {
    match activity {
        ActivityType::Meditation => keys::MEDITATION,
        ActivityType::Practice => keys::PRACTICE,
        ActivityType::Class => keys::CLASS,
    }
}

/// Key-value gateway over the shared SQLite pool
#[derive(Clone)]
pub struct Store {
    db: SqlitePool,
}

impl Store {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Read a value; expired keys read as absent and are removed
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row: Option<(String, Option<i64>)> =
            sqlx::query_as("SELECT value, expires_at FROM kv_store WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.db)
                .await
                .map_err(Error::Database)?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };

        if let Some(expires_at) = expires_at {
            if expires_at <= Utc::now().timestamp() {
                tracing::debug!(key, "Expired key read, removing");
                self.delete(key).await?;
                return Ok(None);
            }
        }

        let parsed = serde_json::from_str(&value)?;
        Ok(Some(parsed))
    }

    /// Read a value, degrading any failure to the type's default
    ///
    /// Read-path failures are logged and treated as "no cached data".
    pub async fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.get(key).await {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Store read failed, using default");
                T::default()
            }
        }
    }

    /// Write a value with an optional TTL in seconds
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<i64>,
    ) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        let expires_at = ttl_seconds.map(|ttl| Utc::now().timestamp() + ttl);

        sqlx::query(
            "INSERT INTO kv_store (key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(encoded)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    /// Write a durable record with no expiry
    pub async fn set_permanent<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, value, None).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.db)
            .await
            .map_err(Error::Database)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_store() -> Store {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        Store::new(pool)
    }

    #[tokio::test]
    async fn round_trips_json_values() {
        let store = setup_store().await;

        store
            .set_permanent(keys::TEAMS, &vec!["lotus".to_string(), "cedar".to_string()])
            .await
            .unwrap();

        let teams: Option<Vec<String>> = store.get(keys::TEAMS).await.unwrap();
        assert_eq!(teams, Some(vec!["lotus".to_string(), "cedar".to_string()]));
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let store = setup_store().await;
        let value: Option<String> = store.get("data:absent").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let store = setup_store().await;

        store.set_permanent("data:x", &1i64).await.unwrap();
        store.set_permanent("data:x", &2i64).await.unwrap();

        let value: Option<i64> = store.get("data:x").await.unwrap();
        assert_eq!(value, Some(2));
    }

    #[tokio::test]
    async fn expired_key_reads_as_absent() {
        let store = setup_store().await;

        store.set("data:ttl", &"soon gone", Some(-1)).await.unwrap();

        let value: Option<String> = store.get("data:ttl").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = setup_store().await;

        store.set_permanent("data:x", &1i64).await.unwrap();
        store.delete("data:x").await.unwrap();

        let value: Option<i64> = store.get("data:x").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn get_or_default_degrades_to_empty() {
        let store = setup_store().await;

        // Nothing cached
        let table: sadhana_common::records::ParsedTable =
            store.get_or_default(keys::MEDITATION).await;
        assert!(table.members.is_empty());

        // Corrupt payload also degrades rather than propagating
        sqlx::query("INSERT INTO kv_store (key, value, expires_at) VALUES (?, ?, NULL)")
            .bind(keys::MEDITATION)
            .bind("not json")
            .execute(store.pool())
            .await
            .unwrap();

        let table: sadhana_common::records::ParsedTable =
            store.get_or_default(keys::MEDITATION).await;
        assert!(table.members.is_empty());
    }
}

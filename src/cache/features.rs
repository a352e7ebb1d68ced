//! Track feature cache.
//!
//! Maps a track id to its resolved [`FeatureRecord`]. Tombstones
//! (`lookup-service-not-found`) count as present so the enrichment
//! pipeline never asks the lookup service about the same track twice.

use std::collections::HashMap;

use sqlx::sqlite::SqlitePool;

use super::CacheError;
use crate::model::{FeatureRecord, FeatureSource};

/// SQLite caps bound parameters per statement; stay well below it.
const MAX_IDS_PER_QUERY: usize = 500;

/// Database row for the track_features table.
#[derive(Debug, sqlx::FromRow)]
struct FeatureRow {
    id: String,
    record: String,
}

impl TryFrom<FeatureRow> for FeatureRecord {
    type Error = CacheError;

    fn try_from(row: FeatureRow) -> Result<Self, Self::Error> {
        serde_json::from_str(&row.record).map_err(|e| CacheError::corrupt(row.id, e))
    }
}

/// Record counts by source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureStats {
    pub metadata_provider: u64,
    pub lookup_service: u64,
    pub not_found: u64,
}

impl FeatureStats {
    pub fn total(&self) -> u64 {
        self.metadata_provider + self.lookup_service + self.not_found
    }
}

/// Persistent store of feature records keyed by track id.
#[derive(Debug, Clone)]
pub struct FeatureCache {
    pool: SqlitePool,
}

impl FeatureCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Cached record for a track, tombstones included.
    pub async fn get(&self, id: &str) -> Result<Option<FeatureRecord>, CacheError> {
        let row: Option<FeatureRow> =
            sqlx::query_as("SELECT id, record FROM track_features WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(FeatureRecord::try_from).transpose()
    }

    /// Store a record, overwriting any earlier one for the same id.
    pub async fn put(&self, record: &FeatureRecord) -> Result<(), CacheError> {
        let blob = serde_json::to_string(record).map_err(|e| CacheError::encode(&record.id, e))?;
        let checked_at = record.checked_at.map(|t| t.to_rfc3339());

        sqlx::query(
            r#"
            INSERT INTO track_features (id, source, record, checked_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                source = excluded.source,
                record = excluded.record,
                checked_at = excluded.checked_at
            "#,
        )
        .bind(&record.id)
        .bind(record.source.as_str())
        .bind(&blob)
        .bind(checked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records for every requested id that has one; absent ids are omitted.
    pub async fn get_many<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<HashMap<String, FeatureRecord>, CacheError> {
        let mut found = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
            let mut query =
                sqlx::QueryBuilder::<sqlx::Sqlite>::new("SELECT id, record FROM track_features WHERE id IN (");
            let mut separated = query.separated(", ");
            for id in chunk {
                separated.push_bind(id.as_ref());
            }
            separated.push_unseparated(")");

            let rows: Vec<FeatureRow> = query.build_query_as().fetch_all(&self.pool).await?;
            for row in rows {
                let record = FeatureRecord::try_from(row)?;
                found.insert(record.id.clone(), record);
            }
        }

        Ok(found)
    }

    /// Drop every tombstone so those tracks become eligible for lookup again.
    pub async fn clear_tombstones(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM track_features WHERE source = ?")
            .bind(FeatureSource::LookupServiceNotFound.as_str())
            .execute(&self.pool)
            .await?;
        tracing::info!("Cleared {} not-found markers", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Wipe every feature record.
    pub async fn clear(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM track_features")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Counts by source.
    pub async fn stats(&self) -> Result<FeatureStats, CacheError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT source, COUNT(*) FROM track_features GROUP BY source")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = FeatureStats::default();
        for (source, count) in rows {
            let count = count.max(0) as u64;
            match source.as_str() {
                "metadata-provider" => stats.metadata_provider = count,
                "lookup-service" => stats.lookup_service = count,
                "lookup-service-not-found" => stats.not_found = count,
                other => tracing::warn!("Unknown feature source in cache: {}", other),
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_features, temp_db};
    use chrono::Utc;

    #[tokio::test]
    async fn test_get_missing() {
        let (pool, _dir) = temp_db().await;
        let cache = FeatureCache::new(pool);
        assert_eq!(cache.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (pool, _dir) = temp_db().await;
        let cache = FeatureCache::new(pool);

        let record = mock_features("t1", 128.0);
        cache.put(&record).await.unwrap();
        assert_eq!(cache.get("t1").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_later_write_overwrites() {
        let (pool, _dir) = temp_db().await;
        let cache = FeatureCache::new(pool);

        cache.put(&FeatureRecord::not_found("t1", Utc::now())).await.unwrap();
        let hit = mock_features("t1", 100.0);
        cache.put(&hit).await.unwrap();

        let stored = cache.get("t1").await.unwrap().unwrap();
        assert_eq!(stored.source, FeatureSource::LookupService);
        assert_eq!(stored.playable_tempo(), Some(100.0));
    }

    #[tokio::test]
    async fn test_get_many_omits_absent_ids() {
        let (pool, _dir) = temp_db().await;
        let cache = FeatureCache::new(pool);

        cache.put(&mock_features("t1", 120.0)).await.unwrap();
        cache.put(&FeatureRecord::not_found("t2", Utc::now())).await.unwrap();

        let found = cache.get_many(&["t1", "t2", "t3"]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found["t2"].is_tombstone());
        assert!(!found.contains_key("t3"));
    }

    #[tokio::test]
    async fn test_get_many_spans_chunks() {
        let (pool, _dir) = temp_db().await;
        let cache = FeatureCache::new(pool);

        let ids: Vec<String> = (0..(MAX_IDS_PER_QUERY + 20)).map(|i| format!("t{i}")).collect();
        for id in ids.iter().step_by(50) {
            cache.put(&mock_features(id, 90.0)).await.unwrap();
        }

        let found = cache.get_many(&ids).await.unwrap();
        assert_eq!(found.len(), ids.iter().step_by(50).count());
    }

    #[tokio::test]
    async fn test_clear_tombstones_keeps_hits() {
        let (pool, _dir) = temp_db().await;
        let cache = FeatureCache::new(pool);

        cache.put(&mock_features("t1", 120.0)).await.unwrap();
        cache.put(&FeatureRecord::not_found("t2", Utc::now())).await.unwrap();

        assert_eq!(cache.clear_tombstones().await.unwrap(), 1);
        assert!(cache.get("t1").await.unwrap().is_some());
        assert!(cache.get("t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats() {
        let (pool, _dir) = temp_db().await;
        let cache = FeatureCache::new(pool);

        cache.put(&mock_features("t1", 120.0)).await.unwrap();
        cache.put(&mock_features("t2", 121.0)).await.unwrap();
        cache.put(&FeatureRecord::not_found("t3", Utc::now())).await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.lookup_service, 2);
        assert_eq!(stats.not_found, 1);
        assert_eq!(stats.total(), 3);

        cache.clear().await.unwrap();
        assert_eq!(cache.stats().await.unwrap().total(), 0);
    }
}

//! Playlist snapshot cache.
//!
//! Playlists are large and rarely change, so a stored record is only
//! rewritten when the provider's snapshot id differs from the cached one.

use chrono::Utc;
use sqlx::sqlite::SqlitePool;

use super::CacheError;
use crate::model::PlaylistRecord;

/// Outcome of an [`SnapshotCache::upsert_if_changed`] call, by playlist id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertReport {
    /// Playlists that were not cached before
    pub inserted: Vec<String>,
    /// Playlists whose snapshot id changed and were fully replaced
    pub replaced: Vec<String>,
    /// Playlists left untouched
    pub unchanged: Vec<String>,
}

impl UpsertReport {
    /// Number of rows actually written.
    pub fn written(&self) -> usize {
        self.inserted.len() + self.replaced.len()
    }
}

/// Database row for the playlists table.
#[derive(Debug, sqlx::FromRow)]
struct PlaylistRow {
    id: String,
    record: String,
}

impl TryFrom<PlaylistRow> for PlaylistRecord {
    type Error = CacheError;

    fn try_from(row: PlaylistRow) -> Result<Self, Self::Error> {
        serde_json::from_str(&row.record).map_err(|e| CacheError::corrupt(row.id, e))
    }
}

/// Persistent store of playlist records keyed by playlist id.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    pool: SqlitePool,
}

impl SnapshotCache {
    /// Wrap an initialized pool (see [`crate::db::init_db`]).
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Everything currently cached, in first-stored order. No network access.
    pub async fn get_all(&self) -> Result<Vec<PlaylistRecord>, CacheError> {
        let rows: Vec<PlaylistRow> =
            sqlx::query_as("SELECT id, record FROM playlists ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(PlaylistRecord::try_from).collect()
    }

    /// A single cached playlist.
    pub async fn get(&self, id: &str) -> Result<Option<PlaylistRecord>, CacheError> {
        let row: Option<PlaylistRow> =
            sqlx::query_as("SELECT id, record FROM playlists WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(PlaylistRecord::try_from).transpose()
    }

    /// Cached snapshot id for a playlist, without decoding its track list.
    pub async fn snapshot_id(&self, id: &str) -> Result<Option<String>, CacheError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT snapshot_id FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(s,)| s))
    }

    /// Insert new playlists and replace those whose snapshot id changed.
    ///
    /// A record whose snapshot id matches the cached copy is skipped
    /// entirely; the stored track list is not rewritten. All writes happen
    /// in one transaction.
    pub async fn upsert_if_changed(
        &self,
        records: &[PlaylistRecord],
    ) -> Result<UpsertReport, CacheError> {
        let mut report = UpsertReport::default();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let cached: Option<(String,)> =
                sqlx::query_as("SELECT snapshot_id FROM playlists WHERE id = ?")
                    .bind(&record.id)
                    .fetch_optional(&mut *tx)
                    .await?;

            match cached {
                Some((snapshot,)) if snapshot == record.snapshot_id => {
                    report.unchanged.push(record.id.clone());
                    continue;
                }
                Some(_) => report.replaced.push(record.id.clone()),
                None => report.inserted.push(record.id.clone()),
            }

            write_record(&mut *tx, record).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            inserted = report.inserted.len(),
            replaced = report.replaced.len(),
            unchanged = report.unchanged.len(),
            "Snapshot cache upsert"
        );
        Ok(report)
    }

    /// Unconditionally replace a single playlist.
    pub async fn put(&self, record: &PlaylistRecord) -> Result<(), CacheError> {
        write_record(&self.pool, record).await
    }

    /// Wipe every cached playlist.
    pub async fn clear(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM playlists")
            .execute(&self.pool)
            .await?;
        tracing::info!("Cleared {} cached playlists", result.rows_affected());
        Ok(result.rows_affected())
    }
}

async fn write_record<'e, E>(executor: E, record: &PlaylistRecord) -> Result<(), CacheError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let blob = serde_json::to_string(record).map_err(|e| CacheError::encode(&record.id, e))?;

    sqlx::query(
        r#"
        INSERT INTO playlists (id, name, description, snapshot_id, record, stored_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            snapshot_id = excluded.snapshot_id,
            record = excluded.record,
            stored_at = excluded.stored_at
        "#,
    )
    .bind(&record.id)
    .bind(&record.name)
    .bind(&record.description)
    .bind(&record.snapshot_id)
    .bind(&blob)
    .bind(Utc::now().to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_playlist, mock_track, temp_db};

    async fn stored_at(pool: &SqlitePool, id: &str) -> String {
        let row: (String,) = sqlx::query_as("SELECT stored_at FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap();
        row.0
    }

    #[tokio::test]
    async fn test_get_all_empty() {
        let (pool, _dir) = temp_db().await;
        let cache = SnapshotCache::new(pool);
        assert!(cache.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_inserts_new_records() {
        let (pool, _dir) = temp_db().await;
        let cache = SnapshotCache::new(pool);

        let a = mock_playlist("p1", "Aggregated Cycle", "s1", vec![mock_track("t1", 3)]);
        let b = mock_playlist("p2", "2024-01-05 class", "s1", vec![]);
        let report = cache.upsert_if_changed(&[a.clone(), b.clone()]).await.unwrap();

        assert_eq!(report.inserted, vec!["p1", "p2"]);
        assert!(report.replaced.is_empty());
        assert_eq!(cache.get_all().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_unchanged_snapshot_leaves_stored_copy_untouched() {
        let (pool, _dir) = temp_db().await;
        let cache = SnapshotCache::new(pool.clone());

        let original = mock_playlist("p1", "Aggregated Cycle", "s1", vec![mock_track("t1", 3)]);
        cache.put(&original).await.unwrap();
        let before = stored_at(&pool, "p1").await;

        // Same snapshot id but a different payload: must not be written
        let incoming = mock_playlist("p1", "Aggregated Cycle", "s1", vec![mock_track("t9", 1)]);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let report = cache.upsert_if_changed(&[incoming]).await.unwrap();

        assert_eq!(report.unchanged, vec!["p1"]);
        assert_eq!(report.written(), 0);
        assert_eq!(stored_at(&pool, "p1").await, before);
        assert_eq!(cache.get("p1").await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_changed_snapshot_replaces_full_record() {
        let (pool, _dir) = temp_db().await;
        let cache = SnapshotCache::new(pool);

        cache
            .put(&mock_playlist("p1", "Old name", "s1", vec![mock_track("t1", 3), mock_track("t2", 3)]))
            .await
            .unwrap();

        let updated = mock_playlist("p1", "New name", "s2", vec![mock_track("t3", 1)]);
        let report = cache.upsert_if_changed(std::slice::from_ref(&updated)).await.unwrap();

        assert_eq!(report.replaced, vec!["p1"]);
        assert_eq!(cache.get("p1").await.unwrap(), Some(updated));
        assert_eq!(cache.snapshot_id("p1").await.unwrap().as_deref(), Some("s2"));
    }

    #[tokio::test]
    async fn test_put_keeps_original_order() {
        let (pool, _dir) = temp_db().await;
        let cache = SnapshotCache::new(pool);

        cache.put(&mock_playlist("p1", "A", "s1", vec![])).await.unwrap();
        cache.put(&mock_playlist("p2", "B", "s1", vec![])).await.unwrap();
        cache.put(&mock_playlist("p1", "A", "s2", vec![])).await.unwrap();

        let ids: Vec<_> = cache.get_all().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let (pool, _dir) = temp_db().await;
        let cache = SnapshotCache::new(pool);

        cache.put(&mock_playlist("p1", "A", "s1", vec![])).await.unwrap();
        assert_eq!(cache.clear().await.unwrap(), 1);
        assert!(cache.get_all().await.unwrap().is_empty());
        assert_eq!(cache.snapshot_id("p1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_an_error_not_absent() {
        let (pool, _dir) = temp_db().await;
        sqlx::query(
            "INSERT INTO playlists (id, name, description, snapshot_id, record, stored_at) VALUES ('p1', 'A', '', 's1', '{not json', '')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let cache = SnapshotCache::new(pool);
        assert!(matches!(cache.get("p1").await, Err(CacheError::Corrupt { .. })));
        assert!(cache.get_all().await.is_err());
    }
}

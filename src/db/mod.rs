//! Database setup for the two persisted key spaces.
//!
//! Uses SQLx with SQLite for lightweight, embedded storage. The schema
//! holds exactly two tables:
//! - `playlists` - full [`PlaylistRecord`](crate::model::PlaylistRecord) blobs keyed by playlist id
//! - `track_features` - [`FeatureRecord`](crate::model::FeatureRecord) blobs keyed by track id
//!
//! Reads and writes for each table live in [`crate::cache`].
//!
//! # Example
//!
//! ```ignore
//! use playlist_planner::db::init_db;
//!
//! let pool = init_db("sqlite:playlist_planner.db").await?;
//! ```

use std::path::Path;

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "playlist_planner.db";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

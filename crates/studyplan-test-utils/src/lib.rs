//! Shared test utilities for studyplan integration tests.
//!
//! Each test gets its own SQLite file inside a fresh temporary directory,
//! with migrations applied. The directory is removed when the returned
//! [`TestDb`] is dropped (or handed to [`drop_test_db`]).

use std::path::PathBuf;

use sqlx::SqlitePool;
use tempfile::TempDir;

use studyplan_db::config::DbConfig;
use studyplan_db::pool;

/// Handle on a temporary database. Keeps the backing directory alive.
pub struct TestDb {
    /// Path of the SQLite file.
    pub path: PathBuf,
    /// Connection URL for the SQLite file.
    pub url: String,
    _dir: TempDir,
}

/// Create a temporary database with migrations applied.
///
/// Returns `(pool, db)`. Call [`drop_test_db`] with both when the test is
/// done.
pub async fn create_test_db() -> (SqlitePool, TestDb) {
    let dir = tempfile::Builder::new()
        .prefix("studyplan_test_")
        .tempdir()
        .expect("failed to create temp dir for test database");
    let path = dir.path().join("studyplan.db");
    let url = format!("sqlite://{}", path.display());

    let config = DbConfig::new(url.clone());
    let db_pool = pool::create_pool(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to open temp database {}: {e:#}", path.display()));

    pool::run_migrations(&db_pool)
        .await
        .expect("migrations should succeed");

    (
        db_pool,
        TestDb {
            path,
            url,
            _dir: dir,
        },
    )
}

/// Close the pool and remove the temporary database.
pub async fn drop_test_db(pool: SqlitePool, db: TestDb) {
    pool.close().await;
    drop(db);
}

//! Connection pool creation and configuration.
//!
//! SQLite accepts a single writer, so the pool is capped at exactly one
//! connection. Callers on other threads queue on checkout rather than
//! running in parallel.

use std::path::Path;
use std::time::Duration;

use r2d2::{ManageConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

/// Schema version this build was compiled against.
pub const SCHEMA_VERSION: u32 = 1;

/// Runtime tunables for the store, injected at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    /// Schema version the caller expects to find in `settings`.
    pub expected_schema_version: u32,

    /// Busy timeout for the SQLite connection, in milliseconds.
    pub busy_timeout_ms: u64,

    /// How long a caller waits for the single connection, in milliseconds.
    pub connection_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            expected_schema_version: SCHEMA_VERSION,
            busy_timeout_ms: 5_000,
            connection_timeout_ms: 30_000,
        }
    }
}

/// A type alias for the single-connection SQLite pool.
pub(crate) type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub(crate) enum PoolError {
    /// SQLite refused to open or configure the file.
    #[error(transparent)]
    Connect(#[from] rusqlite::Error),

    /// Failed to build the connection pool.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Creates the single-connection pool with WAL mode and foreign keys enabled.
///
/// One connection is opened directly through the manager first. `r2d2`
/// retries failed connects until `connection_timeout`, so without this a
/// missing directory or a non-database file would stall the caller and
/// surface only as a timeout.
pub(crate) fn create_pool(db_path: &Path, settings: &StoreSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let busy_timeout_ms = settings.busy_timeout_ms;
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| {
            // In-memory databases report "memory", which is expected.
            let journal_mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            if journal_mode != "wal" && journal_mode != "memory" {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!(
                        "failed to set WAL journal mode, got: {}",
                        journal_mode
                    )),
                ));
            }
            conn.execute_batch(&format!(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = {};",
                busy_timeout_ms
            ))
        });

    drop(manager.connect()?);

    // The connection is never recycled: an in-memory store lives exactly as
    // long as its one connection.
    let pool = Pool::builder()
        .max_size(1)
        .min_idle(Some(1))
        .max_lifetime(None)
        .idle_timeout(None)
        .connection_timeout(Duration::from_millis(settings.connection_timeout_ms))
        .build(manager)?;

    Ok(pool)
}

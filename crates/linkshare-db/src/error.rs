//! Error types for the store manager.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while managing the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file could not be opened, pinged, or configured.
    #[error("failed to open database {}: {source}", .path.display())]
    Connection {
        /// Path of the store file.
        path: PathBuf,
        /// What went wrong while connecting.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The handle was closed with [`Store::close`](crate::Store::close).
    #[error("database handle is closed")]
    Closed,

    /// The single connection could not be checked out of the pool in time.
    #[error("database connection unavailable: {0}")]
    Unavailable(#[source] r2d2::Error),

    /// The `settings` table does not exist.
    #[error("database not initialized")]
    NotInitialized,

    /// The `settings` table already exists.
    #[error("database already initialized")]
    AlreadyInitialized,

    /// The bootstrap script could not be read.
    #[error("failed to read schema file {}: {source}", .path.display())]
    SchemaFile {
        /// Path of the bootstrap script.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The bootstrap script failed to execute.
    #[error("failed to initialize database: {0}")]
    Initialization(#[source] rusqlite::Error),

    /// The stored `schema-version` is missing, non-numeric, or below 1.
    #[error("invalid schema version: {0}")]
    InvalidVersion(String),

    /// The stored schema is older than this build expects.
    #[error("database schema needs updating (stored v{stored}, expected v{expected})")]
    SchemaOutdated {
        /// Version found in the store.
        stored: u32,
        /// Version this build was compiled against.
        expected: u32,
    },

    /// The stored schema is newer than this build understands.
    #[error("database schema is too new (stored v{stored}, expected v{expected})")]
    SchemaUnsupported {
        /// Version found in the store.
        stored: u32,
        /// Version this build was compiled against.
        expected: u32,
    },

    /// The setting may only be changed by an explicit migration.
    #[error("setting '{0}' is reserved")]
    ReservedSetting(String),

    /// A setting value does not parse as its declared kind.
    #[error("invalid value {value:?} for {kind} setting '{key}'")]
    InvalidSetting {
        /// Setting key.
        key: String,
        /// Declared kind.
        kind: String,
        /// Rejected value.
        value: String,
    },

    /// A backup could not be written.
    #[error("backup to {} failed: {reason}", .path.display())]
    Backup {
        /// Destination path.
        path: PathBuf,
        /// Why the backup was refused or failed.
        reason: String,
    },

    /// An SQL statement failed.
    #[error("{op} failed: {source}")]
    Database {
        /// The operation being attempted.
        op: &'static str,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// A transaction could not be started.
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] rusqlite::Error),

    /// A transaction could not be committed.
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] rusqlite::Error),

    /// Rolling back after a failed unit of work also failed.
    #[error("error rolling back transaction: {source} (original error: {original})")]
    Rollback {
        /// The rollback failure.
        source: rusqlite::Error,
        /// The error returned by the unit of work.
        original: Box<StoreError>,
    },
}

impl StoreError {
    /// Returns a mapper that tags a SQLite error with the operation name.
    ///
    /// ```rust,ignore
    /// tx.execute("DELETE FROM links WHERE id = ?1", [id])
    ///     .map_err(StoreError::db("delete link"))?;
    /// ```
    pub fn db(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Database { op, source }
    }
}

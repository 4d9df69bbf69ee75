//! The store handle: connection lifecycle, backups, and the transaction
//! primitive every higher layer goes through.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Transaction;

use crate::error::StoreError;
use crate::pool::{create_pool, DbPool, StoreSettings};

/// Handle to a single-file SQLite store.
///
/// The handle exclusively owns the underlying connection. Repositories borrow
/// it and run their statements through [`Store::transaction`].
pub struct Store {
    pool: Option<DbPool>,
    path: PathBuf,
    settings: StoreSettings,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Store {
    /// Opens the store file at `path`, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the file cannot be opened,
    /// configured, or pinged.
    pub fn open(path: impl AsRef<Path>, settings: StoreSettings) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let connection_error = |source: Box<dyn std::error::Error + Send + Sync>| {
            StoreError::Connection {
                path: path.clone(),
                source,
            }
        };

        let pool = create_pool(&path, &settings).map_err(|e| connection_error(Box::new(e)))?;

        {
            let conn = pool.get().map_err(|e| connection_error(Box::new(e)))?;
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| connection_error(Box::new(e)))?;
            let foreign_keys: i64 = conn
                .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
                .map_err(|e| connection_error(Box::new(e)))?;
            if foreign_keys != 1 {
                return Err(connection_error(
                    "failed to enable foreign key constraints".into(),
                ));
            }
        }

        tracing::info!(path = %path.display(), "opened database");

        Ok(Self {
            pool: Some(pool),
            path,
            settings,
        })
    }

    /// Opens a private in-memory store. Useful for tests.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if SQLite cannot be configured.
    pub fn open_in_memory(settings: StoreSettings) -> Result<Self, StoreError> {
        Self::open(":memory:", settings)
    }

    /// Releases the connection. Calling this on a closed handle is a no-op.
    pub fn close(&mut self) {
        if self.pool.take().is_some() {
            tracing::info!(path = %self.path.display(), "closed database");
        }
    }

    /// Whether the handle still holds its connection.
    pub fn is_open(&self) -> bool {
        self.pool.is_some()
    }

    /// Path the store was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings injected at open time.
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Checks out the single connection, waiting for other callers to
    /// release it.
    pub(crate) fn connection(
        &self,
    ) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        let pool = self.pool.as_ref().ok_or(StoreError::Closed)?;
        pool.get().map_err(StoreError::Unavailable)
    }

    /// Runs `work` inside a single database transaction.
    ///
    /// - `Ok` from `work` commits; a commit failure is returned as
    ///   `StoreError::Commit`.
    /// - `Err` from `work` rolls back and returns that error. If the rollback
    ///   itself fails, both are returned as `StoreError::Rollback`.
    /// - A panic inside `work` rolls back, then resumes unwinding into the
    ///   caller.
    ///
    /// # Errors
    ///
    /// Returns whatever `work` returns, or a transaction-level error.
    pub fn transaction<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    {
        let mut conn = self.connection()?;
        let tx = conn.transaction().map_err(StoreError::Begin)?;

        match panic::catch_unwind(AssertUnwindSafe(|| work(&tx))) {
            Ok(Ok(value)) => {
                tx.commit().map_err(StoreError::Commit)?;
                tracing::debug!("transaction committed");
                Ok(value)
            }
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "rolling back transaction");
                match tx.rollback() {
                    Ok(()) => Err(err),
                    Err(source) => Err(StoreError::Rollback {
                        source,
                        original: Box::new(err),
                    }),
                }
            }
            Err(payload) => {
                match tx.rollback() {
                    Ok(()) => tracing::error!("transaction rolled back after panic"),
                    Err(e) => tracing::error!(error = %e, "rollback after panic failed"),
                }
                panic::resume_unwind(payload)
            }
        }
    }

    /// Writes a consistent copy of the store to `destination`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backup` if the destination already exists or is
    /// not valid UTF-8, and `StoreError::Database` if the copy fails.
    pub fn backup(&self, destination: impl AsRef<Path>) -> Result<(), StoreError> {
        let destination = destination.as_ref();
        let backup_error = |reason: &str| StoreError::Backup {
            path: destination.to_path_buf(),
            reason: reason.to_string(),
        };

        if destination.exists() {
            return Err(backup_error("destination already exists"));
        }
        let target = destination
            .to_str()
            .ok_or_else(|| backup_error("path is not valid UTF-8"))?;

        let conn = self.connection()?;
        conn.execute("VACUUM INTO ?1", [target])
            .map_err(StoreError::db("backup"))?;

        tracing::info!(
            source = %self.path.display(),
            destination = %destination.display(),
            "backed up database"
        );
        Ok(())
    }
}

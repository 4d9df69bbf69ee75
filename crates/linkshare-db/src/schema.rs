//! Schema bootstrap and version checks.
//!
//! A store counts as initialized once the `settings` table exists. The
//! bootstrap script creates it together with the `schema-version` row; nothing
//! in this crate ever rewrites that row.

use std::path::Path;

use rusqlite::OptionalExtension;

use crate::error::StoreError;
use crate::store::Store;

/// File name of the bootstrap script inside the schema directory.
pub const BOOTSTRAP_SCRIPT: &str = "current.sql";

/// Settings key holding the integer schema version.
pub const SCHEMA_VERSION_KEY: &str = "schema-version";

impl Store {
    /// Applies `<schema_dir>/current.sql` to a fresh store.
    ///
    /// The script runs inside a single transaction, so a failing script
    /// leaves the store as it was. Scripts must not issue their own
    /// `BEGIN`/`COMMIT`.
    ///
    /// # Errors
    ///
    /// - `StoreError::AlreadyInitialized` if `settings` exists (checked
    ///   before anything is read or written).
    /// - `StoreError::SchemaFile` if the script cannot be read.
    /// - `StoreError::Initialization` if the script fails to execute.
    pub fn initialize(&self, schema_dir: impl AsRef<Path>) -> Result<(), StoreError> {
        match self.check_initialized() {
            Ok(()) => return Err(StoreError::AlreadyInitialized),
            Err(StoreError::NotInitialized) => {}
            Err(e) => return Err(e),
        }

        let script_path = schema_dir.as_ref().join(BOOTSTRAP_SCRIPT);
        let script =
            std::fs::read_to_string(&script_path).map_err(|source| StoreError::SchemaFile {
                path: script_path.clone(),
                source,
            })?;

        tracing::info!(script = %script_path.display(), "initializing database schema");

        self.transaction(|tx| {
            tx.execute_batch(&script)
                .map_err(StoreError::Initialization)
        })?;

        tracing::info!(path = %self.path().display(), "database initialized");
        Ok(())
    }

    /// Succeeds iff the `settings` table exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotInitialized` when it does not.
    pub fn check_initialized(&self) -> Result<(), StoreError> {
        let conn = self.connection()?;
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'settings'",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::db("check initialization"))?;

        if count == 0 {
            return Err(StoreError::NotInitialized);
        }
        Ok(())
    }

    /// Reads the stored schema version.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotInitialized` if `settings` is missing and
    /// `StoreError::InvalidVersion` if the value is absent, non-numeric, or
    /// below 1.
    pub fn schema_version(&self) -> Result<u32, StoreError> {
        self.check_initialized()?;

        let conn = self.connection()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [SCHEMA_VERSION_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::db("read schema version"))?;

        let value = value
            .ok_or_else(|| StoreError::InvalidVersion(format!("no '{SCHEMA_VERSION_KEY}' setting")))?;
        let version: i64 = value
            .trim()
            .parse()
            .map_err(|_| StoreError::InvalidVersion(format!("{value:?} is not an integer")))?;

        if version < 1 {
            return Err(StoreError::InvalidVersion(version.to_string()));
        }
        u32::try_from(version).map_err(|_| StoreError::InvalidVersion(version.to_string()))
    }

    /// Compares the stored schema version with the expected one from
    /// [`StoreSettings`](crate::StoreSettings), returning the stored version
    /// when they match.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotInitialized` if the store has no schema.
    /// - `StoreError::SchemaOutdated` if the store is older than expected; a
    ///   migration is needed.
    /// - `StoreError::SchemaUnsupported` if the store is newer than this
    ///   build.
    pub fn check_schema_version(&self) -> Result<u32, StoreError> {
        self.check_initialized()?;
        let stored = self.schema_version()?;
        let expected = self.settings().expected_schema_version;

        match stored.cmp(&expected) {
            std::cmp::Ordering::Less => Err(StoreError::SchemaOutdated { stored, expected }),
            std::cmp::Ordering::Greater => Err(StoreError::SchemaUnsupported { stored, expected }),
            std::cmp::Ordering::Equal => Ok(stored),
        }
    }
}

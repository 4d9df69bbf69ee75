//! Typed access to the `settings` table.

use rusqlite::{params, OptionalExtension, Row};

use crate::error::StoreError;
use crate::schema::SCHEMA_VERSION_KEY;
use crate::store::Store;

/// Declared kind of a setting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKind {
    Int,
    String,
    Bool,
    Json,
    Glob,
}

impl SettingKind {
    /// Returns the label stored in the `kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Json => "json",
            Self::Glob => "glob",
        }
    }

    /// Whether `value` is acceptable for this kind.
    pub fn accepts(self, value: &str) -> bool {
        match self {
            Self::Int => value.parse::<i64>().is_ok(),
            Self::Bool => matches!(value, "true" | "false"),
            Self::Json => serde_json::from_str::<serde_json::Value>(value).is_ok(),
            Self::String | Self::Glob => true,
        }
    }
}

impl std::fmt::Display for SettingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SettingKind {
    type Err = ParseSettingKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(Self::Int),
            "string" => Ok(Self::String),
            "bool" => Ok(Self::Bool),
            "json" => Ok(Self::Json),
            "glob" => Ok(Self::Glob),
            _ => Err(ParseSettingKindError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown setting kind.
#[derive(Debug, Clone)]
pub struct ParseSettingKindError(pub String);

impl std::fmt::Display for ParseSettingKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown setting kind: {}", self.0)
    }
}

impl std::error::Error for ParseSettingKindError {}

/// A single row of the `settings` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub kind: SettingKind,
}

fn map_row_to_setting(row: &Row<'_>) -> rusqlite::Result<Setting> {
    let kind: String = row.get(2)?;
    let kind: SettingKind = kind.parse().map_err(|e: ParseSettingKindError| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Setting {
        key: row.get(0)?,
        value: row.get(1)?,
        kind,
    })
}

impl Store {
    /// Looks up a single setting.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotInitialized` on a store without a schema.
    pub fn get_setting(&self, key: &str) -> Result<Option<Setting>, StoreError> {
        self.check_initialized()?;
        self.transaction(|tx| {
            tx.query_row(
                "SELECT key, value, kind FROM settings WHERE key = ?1",
                [key],
                map_row_to_setting,
            )
            .optional()
            .map_err(StoreError::db("get setting"))
        })
    }

    /// Lists every setting ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotInitialized` on a store without a schema.
    pub fn list_settings(&self) -> Result<Vec<Setting>, StoreError> {
        self.check_initialized()?;
        self.transaction(|tx| {
            let mut stmt = tx
                .prepare("SELECT key, value, kind FROM settings ORDER BY key ASC")
                .map_err(StoreError::db("list settings"))?;
            let rows = stmt
                .query_map([], map_row_to_setting)
                .map_err(StoreError::db("list settings"))?;

            let mut settings = Vec::new();
            for row in rows {
                settings.push(row.map_err(StoreError::db("list settings"))?);
            }
            Ok(settings)
        })
    }

    /// Inserts or replaces a setting.
    ///
    /// # Errors
    ///
    /// - `StoreError::ReservedSetting` for `schema-version`, which only an
    ///   explicit migration may change.
    /// - `StoreError::InvalidSetting` if `value` does not parse as `kind`.
    /// - `StoreError::NotInitialized` on a store without a schema.
    pub fn set_setting(&self, key: &str, value: &str, kind: SettingKind) -> Result<(), StoreError> {
        if key == SCHEMA_VERSION_KEY {
            return Err(StoreError::ReservedSetting(key.to_string()));
        }
        if !kind.accepts(value) {
            return Err(StoreError::InvalidSetting {
                key: key.to_string(),
                kind: kind.to_string(),
                value: value.to_string(),
            });
        }
        self.check_initialized()?;

        self.transaction(|tx| {
            tx.execute(
                "INSERT INTO settings (key, value, kind) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, kind = excluded.kind",
                params![key, value, kind.as_str()],
            )
            .map_err(StoreError::db("set setting"))?;
            Ok(())
        })?;

        tracing::info!(key, kind = kind.as_str(), "setting updated");
        Ok(())
    }
}

//! Link repository for LinkShare.
//!
//! Translates link operations into statements executed through
//! [`Store::transaction`]. The repository borrows the store and never opens
//! or closes connections itself.
//!
//! Timestamps are stored as RFC 3339 strings in UTC with second precision,
//! which keeps `ORDER BY created_at` chronological.

use chrono::{DateTime, SecondsFormat, Utc};
use linkshare_db::{Store, StoreError};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during link operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// No link has the requested id.
    #[error("link not found: {0}")]
    NotFound(i64),

    /// The store failed; the underlying error is passed through unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A stored link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    /// Assigned by the store on creation; never reused.
    pub id: i64,
    pub url: String,
    pub title: String,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    /// Absent until the first update.
    pub updated_at: Option<DateTime<Utc>>,
    /// Private links are hidden from public listings.
    pub is_private: bool,
}

const SELECT_LINK: &str = "SELECT id, url, title, created_at, updated_at, is_private FROM links";

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn map_row_to_link(row: &Row<'_>) -> rusqlite::Result<Link> {
    let created_at: String = row.get(3)?;
    let updated_at: Option<String> = row.get(4)?;

    Ok(Link {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
        updated_at: updated_at
            .map(|value| parse_timestamp(4, &value))
            .transpose()?,
        is_private: row.get(5)?,
    })
}

/// Handles link storage operations.
#[derive(Debug, Clone, Copy)]
pub struct LinkRepository<'a> {
    store: &'a Store,
}

impl<'a> LinkRepository<'a> {
    /// Creates a repository over an open store. The store stays owned by the
    /// caller.
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Inserts a new link and returns its id.
    pub fn create(&self, url: &str, title: &str, is_private: bool) -> Result<i64, LinkError> {
        let id = self.store.transaction(|tx| {
            tx.execute(
                "INSERT INTO links (url, title, created_at, is_private) VALUES (?1, ?2, ?3, ?4)",
                params![url, title, now(), is_private],
            )
            .map_err(StoreError::db("create link"))?;
            Ok(tx.last_insert_rowid())
        })?;

        tracing::debug!(id, is_private, "created link");
        Ok(id)
    }

    /// Retrieves a single link by id.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::NotFound` if no row has this id, and
    /// `LinkError::Store` if a stored timestamp is malformed.
    pub fn get(&self, id: i64) -> Result<Link, LinkError> {
        self.store
            .transaction(|tx| {
                tx.query_row(&format!("{SELECT_LINK} WHERE id = ?1"), [id], map_row_to_link)
                    .optional()
                    .map_err(StoreError::db("get link"))
            })?
            .ok_or(LinkError::NotFound(id))
    }

    /// Overwrites a link's fields and stamps `updated_at`.
    ///
    /// Updating an id that does not exist affects no rows and is not an
    /// error.
    pub fn update(
        &self,
        id: i64,
        url: &str,
        title: &str,
        is_private: bool,
    ) -> Result<(), LinkError> {
        let changed = self.store.transaction(|tx| {
            tx.execute(
                "UPDATE links SET url = ?1, title = ?2, updated_at = ?3, is_private = ?4 WHERE id = ?5",
                params![url, title, now(), is_private, id],
            )
            .map_err(StoreError::db("update link"))
        })?;

        tracing::debug!(id, changed, "updated link");
        Ok(())
    }

    /// Removes a link. Deleting an id that does not exist is not an error.
    pub fn delete(&self, id: i64) -> Result<(), LinkError> {
        let changed = self.store.transaction(|tx| {
            tx.execute("DELETE FROM links WHERE id = ?1", [id])
                .map_err(StoreError::db("delete link"))
        })?;

        tracing::debug!(id, changed, "deleted link");
        Ok(())
    }

    /// Returns up to `limit` links, most recently created first, after
    /// skipping `offset` of them.
    ///
    /// With `include_private == false` private links are filtered out before
    /// paging. Links created in the same second are ordered by descending id.
    pub fn list(
        &self,
        include_private: bool,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Link>, LinkError> {
        let filter = if include_private {
            ""
        } else {
            "WHERE is_private = 0"
        };
        let sql = format!("{SELECT_LINK} {filter} ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2");

        let links = self.store.transaction(|tx| {
            let mut stmt = tx.prepare(&sql).map_err(StoreError::db("list links"))?;
            let rows = stmt
                .query_map(params![limit, offset], map_row_to_link)
                .map_err(StoreError::db("list links"))?;

            let mut links = Vec::new();
            for row in rows {
                links.push(row.map_err(StoreError::db("list links"))?);
            }
            Ok(links)
        })?;

        Ok(links)
    }

    /// Counts the links [`list`](Self::list) would page through.
    pub fn count(&self, include_private: bool) -> Result<u64, LinkError> {
        let sql = if include_private {
            "SELECT COUNT(*) FROM links"
        } else {
            "SELECT COUNT(*) FROM links WHERE is_private = 0"
        };

        // Reading as u64 lets rusqlite reject an out-of-range value.
        let count = self.store.transaction(|tx| {
            tx.query_row(sql, [], |row| row.get::<_, u64>(0))
                .map_err(StoreError::db("count links"))
        })?;

        Ok(count)
    }
}

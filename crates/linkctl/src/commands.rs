//! Subcommand handlers.
//!
//! Each handler borrows an open [`Store`] and writes its human-readable
//! result to `out`. Opening and closing the store is the caller's job.

use std::io::Write;
use std::path::Path;

use linkshare_db::{SettingKind, Store, StoreError, SCHEMA_VERSION};
use linkshare_links::{Link, LinkError, LinkRepository};
use thiserror::Error;

/// Errors surfaced to the user by linkctl.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("setting '{0}' is not set")]
    MissingSetting(String),

    #[error("failed to locate install directory: {0}")]
    Paths(#[source] std::io::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build metadata reported by `linkctl version`.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_commit: &'static str,
    pub commit_date: &'static str,
    pub schema_version: u32,
}

impl BuildInfo {
    /// Metadata baked in at compile time.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_commit: option_env!("LINKSHARE_GIT_COMMIT").unwrap_or("unknown"),
            commit_date: option_env!("LINKSHARE_COMMIT_DATE").unwrap_or("unknown"),
            schema_version: SCHEMA_VERSION,
        }
    }
}

pub fn version(info: &BuildInfo, out: &mut impl Write) -> Result<(), CommandError> {
    writeln!(out, "Version:      {}", info.version)?;
    writeln!(out, "Git commit:   {} {}", info.git_commit, info.commit_date)?;
    writeln!(out, "Schema:       v{}", info.schema_version)?;
    Ok(())
}

// ── db ───────────────────────────────────────────────────────────────

/// Initializes the store. An already-initialized store is reported, not
/// treated as a failure.
pub fn db_init(store: &Store, schema_dir: &Path, out: &mut impl Write) -> Result<(), CommandError> {
    let path = store.path().display();
    match store.initialize(schema_dir) {
        Ok(()) => {
            let version = store.schema_version()?;
            writeln!(
                out,
                "Initialized database {path:?} with schema version {version}"
            )?;
        }
        Err(StoreError::AlreadyInitialized) => {
            writeln!(out, "Database {path:?} is already initialized")?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn db_check(store: &Store, out: &mut impl Write) -> Result<(), CommandError> {
    let version = store.check_schema_version()?;
    writeln!(
        out,
        "Database {:?} is up to date (schema v{version})",
        store.path().display()
    )?;
    Ok(())
}

pub fn db_backup(store: &Store, destination: &Path, out: &mut impl Write) -> Result<(), CommandError> {
    store.backup(destination)?;
    writeln!(out, "Backed up database to {:?}", destination.display())?;
    Ok(())
}

// ── config ───────────────────────────────────────────────────────────

pub fn config_get(store: &Store, key: &str, out: &mut impl Write) -> Result<(), CommandError> {
    let setting = store
        .get_setting(key)?
        .ok_or_else(|| CommandError::MissingSetting(key.to_string()))?;
    writeln!(out, "{}", setting.value)?;
    Ok(())
}

pub fn config_set(
    store: &Store,
    key: &str,
    value: &str,
    kind: SettingKind,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    store.set_setting(key, value, kind)?;
    writeln!(out, "{key} = {value} ({kind})")?;
    Ok(())
}

pub fn config_list(store: &Store, out: &mut impl Write) -> Result<(), CommandError> {
    for setting in store.list_settings()? {
        writeln!(out, "{} = {} ({})", setting.key, setting.value, setting.kind)?;
    }
    Ok(())
}

// ── link ─────────────────────────────────────────────────────────────

fn write_link(link: &Link, out: &mut impl Write) -> std::io::Result<()> {
    let visibility = if link.is_private { "private" } else { "public" };
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}",
        link.id,
        link.created_at.to_rfc3339(),
        visibility,
        link.title,
        link.url
    )
}

pub fn link_add(
    store: &Store,
    url: &str,
    title: &str,
    is_private: bool,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    let id = LinkRepository::new(store).create(url, title, is_private)?;
    writeln!(out, "{id}")?;
    Ok(())
}

pub fn link_get(store: &Store, id: i64, json: bool, out: &mut impl Write) -> Result<(), CommandError> {
    let link = LinkRepository::new(store).get(id)?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &link)?;
        writeln!(out)?;
    } else {
        write_link(&link, out)?;
    }
    Ok(())
}

pub fn link_update(
    store: &Store,
    id: i64,
    url: &str,
    title: &str,
    is_private: bool,
) -> Result<(), CommandError> {
    LinkRepository::new(store).update(id, url, title, is_private)?;
    Ok(())
}

pub fn link_delete(store: &Store, id: i64) -> Result<(), CommandError> {
    LinkRepository::new(store).delete(id)?;
    Ok(())
}

pub fn link_list(
    store: &Store,
    include_private: bool,
    offset: u32,
    limit: u32,
    json: bool,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    let links = LinkRepository::new(store).list(include_private, offset, limit)?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &links)?;
        writeln!(out)?;
    } else {
        for link in &links {
            write_link(link, out)?;
        }
    }
    Ok(())
}

pub fn link_count(store: &Store, include_private: bool, out: &mut impl Write) -> Result<(), CommandError> {
    let count = LinkRepository::new(store).count(include_private)?;
    writeln!(out, "{count}")?;
    Ok(())
}

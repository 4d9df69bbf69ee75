//! Store manager for LinkShare.
//!
//! Owns the single connection to the SQLite store file, bootstraps and
//! version-checks the schema, and provides the one transaction primitive
//! that every repository runs its statements through.
//!
//! # Design decisions
//!
//! - **One connection**: SQLite accepts a single writer, so the `r2d2` pool
//!   is capped at one connection. Concurrent callers queue on checkout;
//!   there is no other application-level lock.
//! - **Runtime bootstrap script**: the schema is read from
//!   `<schema_dir>/current.sql` rather than compiled in, so packagers can
//!   ship it alongside the binary.
//! - **Injected versions**: the expected schema version is part of
//!   [`StoreSettings`], not a process-wide global.
//!
//! # Usage
//!
//! ```rust,ignore
//! use linkshare_db::{Store, StoreSettings};
//!
//! let store = Store::open("linkshare.db", StoreSettings::default())?;
//! store.initialize("schema")?;
//! store.check_schema_version()?;
//! ```

mod error;
mod pool;
mod schema;
mod settings;
mod store;

pub use error::StoreError;
pub use pool::{StoreSettings, SCHEMA_VERSION};
pub use schema::{BOOTSTRAP_SCRIPT, SCHEMA_VERSION_KEY};
pub use settings::{ParseSettingKindError, Setting, SettingKind};
pub use store::Store;

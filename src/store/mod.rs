//! Durable per-spec history (`spec.db`) and the workspace-wide search index.
//!
//! Both databases run in WAL mode with a busy timeout so several processes
//! working on the same spec can share them. Every multi-row write happens in
//! one transaction.

mod harvest;
mod index;
mod queries;
pub mod schema;
pub mod types;

pub use harvest::content_hash;
pub use index::IndexStore;
pub use types::*;

use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::layout;
use crate::{spwlog_debug, spwlog_warn, Result};
use schema::{SPEC_SCHEMA_V1, SPEC_SCHEMA_VERSION};

/// Handle on one spec's `spec.db`.
pub struct Store {
    conn: Connection,
    spec_dir: PathBuf,
    name: String,
}

impl Store {
    /// Open (creating if needed) `spec.db` inside `spec_dir` with default settings.
    pub fn open(spec_dir: &Path) -> Result<Self> {
        Self::open_with(spec_dir, &StoreConfig::default())
    }

    pub fn open_with(spec_dir: &Path, config: &StoreConfig) -> Result<Self> {
        let db_path = layout::spec_db_path(spec_dir);
        let conn = Connection::open(&db_path)?;
        configure(&conn, config)?;

        let name = spec_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let store = Self {
            conn,
            spec_dir: spec_dir.to_path_buf(),
            name,
        };
        store.migrate()?;
        spwlog_debug!("opened spec store {}", db_path.display());
        Ok(store)
    }

    /// Open the store, logging and swallowing any failure.
    ///
    /// For callers where the database is a mirror of file state and must
    /// never block the file operation itself.
    pub fn try_open(spec_dir: &Path) -> Option<Self> {
        match Self::open(spec_dir) {
            Ok(store) => Some(store),
            Err(e) => {
                spwlog_warn!("spec store unavailable for {}: {}", spec_dir.display(), e);
                None
            }
        }
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }

    /// Apply the schema if `user_version` is behind. Safe to call repeatedly.
    pub fn migrate(&self) -> Result<()> {
        let version = self.schema_version()?;
        if version >= SPEC_SCHEMA_VERSION {
            return Ok(());
        }
        self.conn.execute_batch(SPEC_SCHEMA_V1)?;
        self.conn
            .pragma_update(None, "user_version", SPEC_SCHEMA_VERSION)?;
        spwlog_debug!(
            "migrated spec store {} from v{} to v{}",
            self.name,
            version,
            SPEC_SCHEMA_VERSION
        );
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        let version = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(version)
    }

    pub fn spec_dir(&self) -> &Path {
        &self.spec_dir
    }

    /// Spec name, taken from the directory name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Shared connection setup for both databases.
pub(crate) fn configure(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.busy_timeout(config.busy_timeout())?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        spwlog_warn!("journal_mode is {} instead of wal", mode);
    }
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

/// RFC 3339 UTC timestamp at second precision.
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

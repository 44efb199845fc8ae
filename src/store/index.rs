//! Workspace-wide search index (`.spw-index.db`).
//!
//! `documents` is the table of record. `documents_fts` mirrors it through
//! triggers only; nothing here writes to the FTS table directly.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use super::schema::INDEX_SCHEMA;
use super::types::{SearchResult, SpecRecord};
use super::{configure, now};
use crate::config::StoreConfig;
use crate::layout;
use crate::stage::{classify_stage, SpecStage};
use crate::{spwlog_debug, Result};

const DEFAULT_SEARCH_LIMIT: usize = 5;

pub struct IndexStore {
    conn: Connection,
    path: PathBuf,
}

impl IndexStore {
    /// Open the index file inside `dir` (normally the workspace root).
    pub fn open(dir: &Path) -> Result<Self> {
        Self::open_with(dir, &StoreConfig::default())
    }

    pub fn open_with(dir: &Path, config: &StoreConfig) -> Result<Self> {
        Self::open_path_with(&dir.join(&config.index_file), config)
    }

    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open_path_with(path, &StoreConfig::default())
    }

    fn open_path_with(path: &Path, config: &StoreConfig) -> Result<Self> {
        let conn = Connection::open(path)?;
        configure(&conn, config)?;
        conn.execute_batch(INDEX_SCHEMA)?;
        spwlog_debug!("opened index {}", path.display());
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }

    pub fn index_spec(&self, name: &str, stage: &str, db_path: &str) -> Result<()> {
        let ts = now();
        self.conn.execute(
            "INSERT INTO specs (name, stage, db_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(name) DO UPDATE SET
                stage = excluded.stage,
                db_path = excluded.db_path,
                updated_at = excluded.updated_at",
            params![name, stage, db_path, ts],
        )?;
        Ok(())
    }

    /// Register a spec directory under its classified stage.
    pub fn register_spec(&self, spec_dir: &Path) -> Result<SpecStage> {
        let name = spec_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stage = classify_stage(spec_dir);
        let db_path = layout::spec_db_path(spec_dir);
        self.index_spec(&name, stage.as_str(), &db_path.to_string_lossy())?;
        Ok(stage)
    }

    pub fn get_spec(&self, name: &str) -> Result<Option<SpecRecord>> {
        let spec = self
            .conn
            .query_row(
                "SELECT name, stage, db_path, created_at, updated_at FROM specs WHERE name = ?1",
                [name],
                map_spec_row,
            )
            .optional()?;
        Ok(spec)
    }

    pub fn list_specs(&self) -> Result<Vec<SpecRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, stage, db_path, created_at, updated_at FROM specs ORDER BY name",
        )?;
        let specs = stmt
            .query_map([], map_spec_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(specs)
    }

    /// Add a document and return its id.
    pub fn index_document(
        &self,
        spec: &str,
        doc_type: &str,
        phase: &str,
        title: &str,
        snippet: &str,
        content: &str,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO documents (spec, doc_type, phase, title, snippet, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![spec, doc_type, phase, title, snippet, content, now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Remove a spec's documents of one type, e.g. before re-indexing it.
    pub fn delete_documents(&self, spec: &str, doc_type: &str) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM documents WHERE spec = ?1 AND doc_type = ?2",
            params![spec, doc_type],
        )?;
        Ok(removed)
    }

    /// Full-text search, best match first.
    ///
    /// The query is matched as one phrase so FTS5 operators in user input
    /// are treated as text. A `limit` of 0 means the default of 5.
    pub fn search(
        &self,
        query: &str,
        spec: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let limit = if limit == 0 { DEFAULT_SEARCH_LIMIT } else { limit };
        let phrase = quote_phrase(query);

        let base = "SELECT d.spec, d.doc_type, d.phase, d.title, d.snippet, documents_fts.rank
             FROM documents_fts
             JOIN documents d ON d.id = documents_fts.rowid
             WHERE documents_fts MATCH ?1";
        let results = match spec {
            Some(spec) => {
                let sql = format!("{} AND d.spec = ?2 ORDER BY documents_fts.rank LIMIT ?3", base);
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![phrase, spec, limit as i64], map_search_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!("{} ORDER BY documents_fts.rank LIMIT ?2", base);
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![phrase, limit as i64], map_search_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        spwlog_debug!("search {:?} returned {} results", query, results.len());
        Ok(results)
    }
}

/// Wrap `query` in one FTS5 string, doubling embedded quotes.
fn quote_phrase(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}

fn map_spec_row(row: &Row) -> rusqlite::Result<SpecRecord> {
    Ok(SpecRecord {
        name: row.get(0)?,
        stage: row.get(1)?,
        db_path: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn map_search_row(row: &Row) -> rusqlite::Result<SearchResult> {
    Ok(SearchResult {
        spec: row.get(0)?,
        doc_type: row.get(1)?,
        phase: row.get(2)?,
        title: row.get(3)?,
        snippet: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        rank: row.get(5)?,
    })
}

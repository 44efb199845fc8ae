//! SQL schemas for the per-spec store and the global index.

/// Current per-spec schema version, stored in `PRAGMA user_version`.
pub const SPEC_SCHEMA_VERSION: i64 = 1;

pub const SPEC_SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS spec_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS runs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    command     TEXT NOT NULL,
    run_number  INTEGER NOT NULL,
    phase       TEXT NOT NULL,
    wave_number INTEGER,
    comms_path  TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'in_progress',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE(command, run_number, wave_number)
);
CREATE INDEX IF NOT EXISTS idx_runs_command ON runs(command, run_number);

CREATE TABLE IF NOT EXISTS subagents (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id      INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    brief       TEXT,
    report      TEXT,
    status      TEXT,
    summary     TEXT,
    status_json TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE(run_id, name)
);

CREATE TABLE IF NOT EXISTS handoffs (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id     INTEGER NOT NULL UNIQUE REFERENCES runs(id) ON DELETE CASCADE,
    content    TEXT NOT NULL,
    all_pass   INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS waves (
    wave_number    INTEGER PRIMARY KEY,
    status         TEXT NOT NULL,
    exec_runs      INTEGER NOT NULL DEFAULT 0,
    check_runs     INTEGER NOT NULL DEFAULT 0,
    summary_status TEXT,
    summary_text   TEXT,
    summary_source TEXT,
    stale_flag     INTEGER NOT NULL DEFAULT 0,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    task_id     TEXT PRIMARY KEY,
    title       TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL,
    wave        INTEGER,
    depends_on  TEXT,
    files       TEXT,
    tdd         INTEGER NOT NULL DEFAULT 0,
    is_deferred INTEGER NOT NULL DEFAULT 0,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artifacts (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    phase         TEXT NOT NULL,
    rel_path      TEXT NOT NULL UNIQUE,
    artifact_type TEXT NOT NULL,
    content       TEXT NOT NULL,
    content_hash  TEXT NOT NULL,
    metadata      TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_artifacts_phase ON artifacts(phase);

CREATE TABLE IF NOT EXISTS impl_logs (
    task_id      TEXT PRIMARY KEY,
    content      TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS completion_summary (
    id           INTEGER PRIMARY KEY CHECK (id = 1),
    frontmatter  TEXT NOT NULL,
    body         TEXT NOT NULL,
    generated_at TEXT NOT NULL
);
"#;

/// Global index schema. `documents_fts` is only ever written by the triggers.
pub const INDEX_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS specs (
    name       TEXT PRIMARY KEY,
    stage      TEXT NOT NULL,
    db_path    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    spec       TEXT NOT NULL,
    doc_type   TEXT NOT NULL,
    phase      TEXT NOT NULL,
    title      TEXT NOT NULL,
    snippet    TEXT,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_spec ON documents(spec, doc_type);

CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    title, content, spec, doc_type,
    content=documents, content_rowid=id
);

CREATE TRIGGER IF NOT EXISTS documents_ai AFTER INSERT ON documents BEGIN
    INSERT INTO documents_fts(rowid, title, content, spec, doc_type)
    VALUES (new.id, new.title, new.content, new.spec, new.doc_type);
END;

CREATE TRIGGER IF NOT EXISTS documents_ad AFTER DELETE ON documents BEGIN
    INSERT INTO documents_fts(documents_fts, rowid, title, content, spec, doc_type)
    VALUES ('delete', old.id, old.title, old.content, old.spec, old.doc_type);
END;

CREATE TRIGGER IF NOT EXISTS documents_au AFTER UPDATE ON documents BEGIN
    INSERT INTO documents_fts(documents_fts, rowid, title, content, spec, doc_type)
    VALUES ('delete', old.id, old.title, old.content, old.spec, old.doc_type);
    INSERT INTO documents_fts(rowid, title, content, spec, doc_type)
    VALUES (new.id, new.title, new.content, new.spec, new.doc_type);
END;
"#;

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;

use super::types::{
    ArtifactRecord, CompletionRecord, HandoffRecord, ImplLogRecord, RunRecord, RunStatus,
    SubagentRecord, TaskRecord, WaveRecord,
};
use super::{now, Store};
use crate::layout::{self, Command};
use crate::tasks::{Document, Task, TaskStatus};
use crate::{spwlog_debug, Result};

const RUN_COLUMNS: &str =
    "id, command, run_number, phase, wave_number, comms_path, status, created_at, updated_at";
const SUBAGENT_COLUMNS: &str =
    "id, run_id, name, brief, report, status, summary, status_json, created_at, updated_at";
const ARTIFACT_COLUMNS: &str =
    "id, phase, rel_path, artifact_type, content, content_hash, metadata, created_at, updated_at";
const WAVE_COLUMNS: &str = "wave_number, status, exec_runs, check_runs, summary_status, \
     summary_text, summary_source, stale_flag, updated_at";
const TASK_COLUMNS: &str =
    "task_id, title, status, wave, depends_on, files, tdd, is_deferred, updated_at";

impl Store {
    // --- meta ---

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM spec_meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO spec_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    // --- runs ---

    /// Register a run before its directory is harvested. Returns the existing
    /// id if the run is already known.
    pub fn create_run(&self, command: Command, run_number: u32, wave: Option<u32>) -> Result<i64> {
        if let Some(run) = self.get_run(command, run_number, wave)? {
            return Ok(run.id);
        }
        let run_dir = command
            .comms_path(&self.spec_dir, wave)
            .join(layout::run_dir_name(run_number));
        let comms_path = run_dir
            .strip_prefix(&self.spec_dir)
            .unwrap_or(&run_dir)
            .to_string_lossy()
            .into_owned();
        let ts = now();
        self.conn.execute(
            "INSERT INTO runs
                (command, run_number, phase, wave_number, comms_path, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                command.as_str(),
                run_number,
                command.phase().as_str(),
                wave,
                comms_path,
                RunStatus::InProgress.as_str(),
                ts
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_run(
        &self,
        command: Command,
        run_number: u32,
        wave: Option<u32>,
    ) -> Result<Option<RunRecord>> {
        let sql = format!(
            "SELECT {} FROM runs WHERE command = ?1 AND run_number = ?2 AND wave_number IS ?3",
            RUN_COLUMNS
        );
        let run = self
            .conn
            .query_row(&sql, params![command.as_str(), run_number, wave], map_run_row)
            .optional()?;
        Ok(run)
    }

    /// Highest-numbered run of `command` across all waves.
    pub fn latest_run(&self, command: Command) -> Result<Option<RunRecord>> {
        let sql = format!(
            "SELECT {} FROM runs WHERE command = ?1
             ORDER BY wave_number DESC, run_number DESC LIMIT 1",
            RUN_COLUMNS
        );
        let run = self
            .conn
            .query_row(&sql, [command.as_str()], map_run_row)
            .optional()?;
        Ok(run)
    }

    pub fn list_runs(&self, command: Command) -> Result<Vec<RunRecord>> {
        let sql = format!(
            "SELECT {} FROM runs WHERE command = ?1 ORDER BY wave_number, run_number",
            RUN_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map([command.as_str()], map_run_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    pub fn update_run_status(&self, run_id: i64, status: RunStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now(), run_id],
        )?;
        Ok(())
    }

    // --- subagents / handoffs ---

    pub fn list_subagents(&self, run_id: i64) -> Result<Vec<SubagentRecord>> {
        let sql = format!(
            "SELECT {} FROM subagents WHERE run_id = ?1 ORDER BY name",
            SUBAGENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([run_id], map_subagent_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_handoff(&self, run_id: i64) -> Result<Option<HandoffRecord>> {
        let handoff = self
            .conn
            .query_row(
                "SELECT id, run_id, content, all_pass, created_at FROM handoffs WHERE run_id = ?1",
                [run_id],
                |row| {
                    Ok(HandoffRecord {
                        id: row.get(0)?,
                        run_id: row.get(1)?,
                        content: row.get(2)?,
                        all_pass: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(handoff)
    }

    // --- artifacts / impl logs ---

    pub fn get_artifact(&self, rel_path: &str) -> Result<Option<ArtifactRecord>> {
        let sql = format!("SELECT {} FROM artifacts WHERE rel_path = ?1", ARTIFACT_COLUMNS);
        let artifact = self
            .conn
            .query_row(&sql, [rel_path], map_artifact_row)
            .optional()?;
        Ok(artifact)
    }

    pub fn list_artifacts(&self, phase: &str) -> Result<Vec<ArtifactRecord>> {
        let sql = format!(
            "SELECT {} FROM artifacts WHERE phase = ?1 ORDER BY rel_path",
            ARTIFACT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([phase], map_artifact_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_impl_log(&self, task_id: &str) -> Result<Option<ImplLogRecord>> {
        let log = self
            .conn
            .query_row(
                "SELECT task_id, content, content_hash, updated_at FROM impl_logs WHERE task_id = ?1",
                [task_id],
                |row| {
                    Ok(ImplLogRecord {
                        task_id: row.get(0)?,
                        content: row.get(1)?,
                        content_hash: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(log)
    }

    // --- waves ---

    pub fn upsert_wave(&self, wave: &WaveRecord) -> Result<()> {
        write_wave(&self.conn, wave, &now())
    }

    pub fn get_wave(&self, wave_number: u32) -> Result<Option<WaveRecord>> {
        let sql = format!("SELECT {} FROM waves WHERE wave_number = ?1", WAVE_COLUMNS);
        let wave = self
            .conn
            .query_row(&sql, [wave_number], map_wave_row)
            .optional()?;
        Ok(wave)
    }

    pub fn list_waves(&self) -> Result<Vec<WaveRecord>> {
        let sql = format!("SELECT {} FROM waves ORDER BY wave_number", WAVE_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_wave_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // --- tasks ---

    pub fn sync_task(&self, task: &Task) -> Result<()> {
        write_task(&self.conn, &TaskRecord::from(task), &now())
    }

    /// Mirror every task of a parsed document in one transaction.
    ///
    /// Rows for tasks no longer in the document are removed. Returns the
    /// number of tasks written.
    pub fn sync_document(&mut self, doc: &Document) -> Result<usize> {
        let ts = now();
        let tx = self.conn.transaction()?;
        let keep: HashSet<&str> = doc.tasks.iter().map(|t| t.id.as_str()).collect();

        let stale: Vec<String> = {
            let mut stmt = tx.prepare("SELECT task_id FROM tasks")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids.into_iter().filter(|id| !keep.contains(id.as_str())).collect()
        };
        for id in &stale {
            tx.execute("DELETE FROM tasks WHERE task_id = ?1", [id])?;
        }
        for task in &doc.tasks {
            write_task(&tx, &TaskRecord::from(task), &ts)?;
        }
        tx.commit()?;

        spwlog_debug!(
            "synced {} tasks into {} ({} removed)",
            doc.tasks.len(),
            self.name,
            stale.len()
        );
        Ok(doc.tasks.len())
    }

    /// Set a task's status, creating a bare row if the task is not yet known.
    pub fn update_task_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tasks (task_id, status, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(task_id) DO UPDATE SET
                status = excluded.status,
                updated_at = excluded.updated_at",
            params![task_id, status.as_str(), now()],
        )?;
        Ok(())
    }

    pub fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>> {
        let sql = format!("SELECT {} FROM tasks WHERE task_id = ?1", TASK_COLUMNS);
        let task = self
            .conn
            .query_row(&sql, [task_id], map_task_row)
            .optional()?;
        Ok(task)
    }

    /// Tasks in the order they were first recorded.
    pub fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        let sql = format!("SELECT {} FROM tasks ORDER BY rowid", TASK_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_task_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // --- completion summary ---

    pub fn get_completion_summary(&self) -> Result<Option<CompletionRecord>> {
        let summary = self
            .conn
            .query_row(
                "SELECT frontmatter, body, generated_at FROM completion_summary WHERE id = 1",
                [],
                |row| {
                    Ok(CompletionRecord {
                        frontmatter: row.get(0)?,
                        body: row.get(1)?,
                        generated_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }

    pub fn save_completion_summary(&self, frontmatter: &str, body: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO completion_summary (id, frontmatter, body, generated_at)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                frontmatter = excluded.frontmatter,
                body = excluded.body,
                generated_at = excluded.generated_at",
            params![frontmatter, body, now()],
        )?;
        Ok(())
    }
}

fn write_task(conn: &Connection, task: &TaskRecord, ts: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO tasks
            (task_id, title, status, wave, depends_on, files, tdd, is_deferred, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(task_id) DO UPDATE SET
            title = excluded.title,
            status = excluded.status,
            wave = excluded.wave,
            depends_on = excluded.depends_on,
            files = excluded.files,
            tdd = excluded.tdd,
            is_deferred = excluded.is_deferred,
            updated_at = excluded.updated_at",
        params![
            task.task_id,
            task.title,
            task.status,
            task.wave,
            task.depends_on,
            task.files,
            task.tdd,
            task.is_deferred,
            ts
        ],
    )?;
    Ok(())
}

pub(super) fn write_wave(conn: &Connection, wave: &WaveRecord, ts: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO waves
            (wave_number, status, exec_runs, check_runs, summary_status,
             summary_text, summary_source, stale_flag, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(wave_number) DO UPDATE SET
            status = excluded.status,
            exec_runs = excluded.exec_runs,
            check_runs = excluded.check_runs,
            summary_status = excluded.summary_status,
            summary_text = excluded.summary_text,
            summary_source = excluded.summary_source,
            stale_flag = excluded.stale_flag,
            updated_at = excluded.updated_at",
        params![
            wave.wave_number,
            wave.status,
            wave.exec_runs,
            wave.check_runs,
            wave.summary_status,
            wave.summary_text,
            wave.summary_source,
            wave.stale_flag,
            ts
        ],
    )?;
    Ok(())
}

fn map_run_row(row: &Row) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        command: row.get(1)?,
        run_number: row.get(2)?,
        phase: row.get(3)?,
        wave_number: row.get(4)?,
        comms_path: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_subagent_row(row: &Row) -> rusqlite::Result<SubagentRecord> {
    Ok(SubagentRecord {
        id: row.get(0)?,
        run_id: row.get(1)?,
        name: row.get(2)?,
        brief: row.get(3)?,
        report: row.get(4)?,
        status: row.get(5)?,
        summary: row.get(6)?,
        status_json: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn map_artifact_row(row: &Row) -> rusqlite::Result<ArtifactRecord> {
    Ok(ArtifactRecord {
        id: row.get(0)?,
        phase: row.get(1)?,
        rel_path: row.get(2)?,
        artifact_type: row.get(3)?,
        content: row.get(4)?,
        content_hash: row.get(5)?,
        metadata: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_wave_row(row: &Row) -> rusqlite::Result<WaveRecord> {
    Ok(WaveRecord {
        wave_number: row.get(0)?,
        status: row.get(1)?,
        exec_runs: row.get(2)?,
        check_runs: row.get(3)?,
        summary_status: row.get(4)?,
        summary_text: row.get(5)?,
        summary_source: row.get(6)?,
        stale_flag: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_task_row(row: &Row) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        task_id: row.get(0)?,
        title: row.get(1)?,
        status: row.get(2)?,
        wave: row.get(3)?,
        depends_on: row.get(4)?,
        files: row.get(5)?,
        tdd: row.get(6)?,
        is_deferred: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

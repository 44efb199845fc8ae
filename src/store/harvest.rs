use rusqlite::{params, OptionalExtension, Transaction};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::queries::write_wave;
use super::types::{ArtifactType, RunStatus, WaveRecord};
use super::{now, Store};
use crate::layout::{self, Command, StatusDoc};
use crate::wave::{scan_waves_with, CheckpointResolver, DiskFs};
use crate::{spwlog, spwlog_debug, spwlog_trace, Error, Result};

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl Store {
    /// Record one `run-NNN` directory with its subagents and handoff.
    ///
    /// Runs in a single transaction and returns the run's row id. Re-harvesting
    /// the same directory updates the existing rows.
    pub fn harvest_run_dir(
        &mut self,
        run_dir: &Path,
        command: Command,
        wave: Option<u32>,
    ) -> Result<i64> {
        let dir_name = run_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let run_number = layout::parse_run_number(&dir_name)
            .ok_or_else(|| Error::InvalidRunDir(run_dir.display().to_string()))?;

        let comms_path = run_dir
            .strip_prefix(&self.spec_dir)
            .unwrap_or(run_dir)
            .to_string_lossy()
            .into_owned();

        let mut subagent_dirs: Vec<(String, std::path::PathBuf)> = fs::read_dir(run_dir)
            .map_err(|source| Error::FileRead {
                path: run_dir.to_path_buf(),
                source,
            })?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| {
                let name = e.file_name().into_string().ok()?;
                (!name.starts_with('_')).then(|| (name, e.path()))
            })
            .collect();
        subagent_dirs.sort();

        let ts = now();
        let tx = self.conn.transaction()?;
        let run_id = upsert_run(&tx, command, run_number, wave, &comms_path, &ts)?;

        let mut all_pass = !subagent_dirs.is_empty();
        for (name, dir) in &subagent_dirs {
            let brief = read_optional(&dir.join(layout::BRIEF_MD));
            let report = read_optional(&dir.join(layout::REPORT_MD));
            let status_json = read_optional(&dir.join(layout::STATUS_JSON));
            let doc: Option<StatusDoc> = status_json
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok());
            let status = doc.as_ref().map(|d| d.status.clone()).filter(|s| !s.is_empty());
            let summary = doc.map(|d| d.summary).filter(|s| !s.is_empty());

            if status.as_deref() != Some("pass") {
                all_pass = false;
            }

            tx.execute(
                "INSERT INTO subagents
                    (run_id, name, brief, report, status, summary, status_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                 ON CONFLICT(run_id, name) DO UPDATE SET
                    brief = excluded.brief,
                    report = excluded.report,
                    status = excluded.status,
                    summary = excluded.summary,
                    status_json = excluded.status_json,
                    updated_at = excluded.updated_at
                 WHERE subagents.brief IS NOT excluded.brief
                    OR subagents.report IS NOT excluded.report
                    OR subagents.status_json IS NOT excluded.status_json",
                params![run_id, name, brief, report, status, summary, status_json, ts],
            )?;
            spwlog_trace!("harvested subagent {} ({:?})", name, status);
        }

        if let Some(handoff) = read_optional(&run_dir.join(layout::HANDOFF_MD)) {
            tx.execute(
                "INSERT INTO handoffs (run_id, content, all_pass, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(run_id) DO UPDATE SET
                    content = excluded.content,
                    all_pass = excluded.all_pass",
                params![run_id, handoff, all_pass, ts],
            )?;
            let status = if all_pass {
                RunStatus::Pass
            } else {
                RunStatus::Blocked
            };
            tx.execute(
                "UPDATE runs SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), ts, run_id],
            )?;
        }

        tx.commit()?;
        spwlog!(
            "harvested {} run {} ({} subagents) into {}",
            command,
            run_number,
            subagent_dirs.len(),
            self.name
        );
        Ok(run_id)
    }

    /// Store a file under its spec-relative path.
    ///
    /// Returns `false` when the stored content hash already matches, in which
    /// case nothing is written.
    pub fn harvest_artifact(&self, phase: &str, rel_path: &str, abs_path: &Path) -> Result<bool> {
        let bytes = read_bytes(abs_path)?;
        let hash = content_hash(&bytes);
        let content = String::from_utf8_lossy(&bytes);
        let ts = now();

        let changed = self.conn.execute(
            "INSERT INTO artifacts
                (phase, rel_path, artifact_type, content, content_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(rel_path) DO UPDATE SET
                content = excluded.content,
                content_hash = excluded.content_hash,
                updated_at = excluded.updated_at
             WHERE artifacts.content_hash != excluded.content_hash",
            params![
                phase,
                rel_path,
                ArtifactType::infer(rel_path).as_str(),
                content,
                hash,
                ts
            ],
        )?;
        spwlog_trace!("artifact {} changed={}", rel_path, changed > 0);
        Ok(changed > 0)
    }

    /// Store a task implementation log. Same hash gating as artifacts.
    pub fn harvest_impl_log(&self, task_id: &str, abs_path: &Path) -> Result<bool> {
        let bytes = read_bytes(abs_path)?;
        let hash = content_hash(&bytes);
        let content = String::from_utf8_lossy(&bytes);

        let changed = self.conn.execute(
            "INSERT INTO impl_logs (task_id, content, content_hash, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(task_id) DO UPDATE SET
                content = excluded.content,
                content_hash = excluded.content_hash,
                updated_at = excluded.updated_at
             WHERE impl_logs.content_hash != excluded.content_hash",
            params![task_id, content, hash, now()],
        )?;
        Ok(changed > 0)
    }

    /// Scan the wave tree and persist one row per wave in a single
    /// transaction. `subagent` is the checkpoint subagent whose verdict is
    /// authoritative. Returns the wave count.
    pub fn harvest_waves(&mut self, subagent: &str) -> Result<usize> {
        let resolver = CheckpointResolver::new(&DiskFs, subagent);
        let records: Vec<WaveRecord> = scan_waves_with(&DiskFs, &self.spec_dir, subagent)
            .iter()
            .map(|state| match &state.checkpoint {
                Some(checkpoint) => WaveRecord::from_scan(state, Some(checkpoint)),
                None => {
                    let checkpoint = resolver.resolve(&self.spec_dir, state.wave);
                    WaveRecord::from_scan(state, Some(&checkpoint))
                }
            })
            .collect();

        let ts = now();
        let tx = self.conn.transaction()?;
        for record in &records {
            write_wave(&tx, record, &ts)?;
        }
        tx.commit()?;

        spwlog_debug!("harvested {} waves into {}", records.len(), self.name);
        Ok(records.len())
    }
}

fn upsert_run(
    tx: &Transaction<'_>,
    command: Command,
    run_number: u32,
    wave: Option<u32>,
    comms_path: &str,
    ts: &str,
) -> Result<i64> {
    // UNIQUE treats NULL wave numbers as distinct, so look the row up with IS.
    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM runs WHERE command = ?1 AND run_number = ?2 AND wave_number IS ?3",
            params![command.as_str(), run_number, wave],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        tx.execute(
            "UPDATE runs SET comms_path = ?1, updated_at = ?2 WHERE id = ?3",
            params![comms_path, ts, id],
        )?;
        return Ok(id);
    }

    tx.execute(
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
    Ok(tx.last_insert_rowid())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Missing or empty files read as `None`.
fn read_optional(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CHECKPOINT_SUBAGENT;
    use std::path::PathBuf;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn run_with_subagents(spec: &Path, statuses: &[(&str, &str)], handoff: bool) -> PathBuf {
        let run = layout::checkpoint_run_path(spec, 1, 1);
        for (name, status) in statuses {
            write(&run.join(name).join("brief.md"), "# Brief\n");
            write(
                &run.join(name).join("status.json"),
                &format!(r#"{{"status":"{}","summary":"{} done"}}"#, status, name),
            );
        }
        if handoff {
            write(&run.join("_handoff.md"), "# Handoff\n");
        }
        run
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_harvest_run_blocked() {
        let temp = TempDir::new().unwrap();
        let run = run_with_subagents(temp.path(), &[("gate", "blocked"), ("tester", "pass")], true);
        let mut store = Store::open(temp.path()).unwrap();

        let run_id = store.harvest_run_dir(&run, Command::Checkpoint, Some(1)).unwrap();
        let record = store.get_run(Command::Checkpoint, 1, Some(1)).unwrap().unwrap();
        assert_eq!(record.id, run_id);
        assert_eq!(record.status, RunStatus::Blocked);
        assert_eq!(record.phase, "execution");
        assert_eq!(record.comms_path, "execution/waves/wave-01/checkpoint/run-001");

        let subagents = store.list_subagents(run_id).unwrap();
        assert_eq!(subagents.len(), 2);
        assert_eq!(subagents[0].name, "gate");
        assert_eq!(subagents[0].summary.as_deref(), Some("gate done"));
        assert!(!store.get_handoff(run_id).unwrap().unwrap().all_pass);
    }

    #[test]
    fn test_harvest_run_all_pass() {
        let temp = TempDir::new().unwrap();
        let run = run_with_subagents(temp.path(), &[("gate", "pass")], true);
        let mut store = Store::open(temp.path()).unwrap();

        let run_id = store.harvest_run_dir(&run, Command::Checkpoint, Some(1)).unwrap();
        assert_eq!(
            store.get_run(Command::Checkpoint, 1, Some(1)).unwrap().unwrap().status,
            RunStatus::Pass
        );
        assert!(store.get_handoff(run_id).unwrap().unwrap().all_pass);
    }

    #[test]
    fn test_harvest_run_without_handoff_stays_in_progress() {
        let temp = TempDir::new().unwrap();
        let run = run_with_subagents(temp.path(), &[("gate", "pass")], false);
        let mut store = Store::open(temp.path()).unwrap();

        let run_id = store.harvest_run_dir(&run, Command::Checkpoint, Some(1)).unwrap();
        let record = store.get_run(Command::Checkpoint, 1, Some(1)).unwrap().unwrap();
        assert_eq!(record.status, RunStatus::InProgress);
        assert!(store.get_handoff(run_id).unwrap().is_none());
    }

    #[test]
    fn test_reharvest_does_not_duplicate() {
        let temp = TempDir::new().unwrap();
        let run = temp.path().join("planning/_comms/tasks-plan/run-002");
        write(&run.join("writer/report.md"), "# Report\n");
        write(&run.join("_inline-audit/notes.md"), "ignored");
        let mut store = Store::open(temp.path()).unwrap();

        let first = store.harvest_run_dir(&run, Command::TasksPlan, None).unwrap();
        write(&run.join("writer/status.json"), r#"{"status":"pass"}"#);
        let second = store.harvest_run_dir(&run, Command::TasksPlan, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list_runs(Command::TasksPlan).unwrap().len(), 1);
        let subagents = store.list_subagents(first).unwrap();
        assert_eq!(subagents.len(), 1);
        assert_eq!(subagents[0].status.as_deref(), Some("pass"));
    }

    #[test]
    fn test_harvest_rejects_bad_dir_name() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("latest");
        fs::create_dir_all(&dir).unwrap();
        let mut store = Store::open(temp.path()).unwrap();
        let err = store.harvest_run_dir(&dir, Command::Exec, Some(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidRunDir(_)));
    }

    #[test]
    fn test_harvest_artifact_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("design.md");
        fs::write(&path, "# Design\n").unwrap();
        let store = Store::open(temp.path()).unwrap();

        assert!(store.harvest_artifact("design", "design.md", &path).unwrap());
        let first = store.get_artifact("design.md").unwrap().unwrap();
        assert_eq!(first.artifact_type, "document");

        thread::sleep(Duration::from_millis(1100));
        assert!(!store.harvest_artifact("design", "design.md", &path).unwrap());
        let second = store.get_artifact("design.md").unwrap().unwrap();
        assert_eq!(first.updated_at, second.updated_at);
        assert_eq!(first.id, second.id);

        fs::write(&path, "# Design v2\n").unwrap();
        assert!(store.harvest_artifact("design", "design.md", &path).unwrap());
        let third = store.get_artifact("design.md").unwrap().unwrap();
        assert_eq!(third.content, "# Design v2\n");
        assert_ne!(third.content_hash, first.content_hash);
    }

    #[test]
    fn test_harvest_impl_log() {
        let temp = TempDir::new().unwrap();
        let path = layout::impl_log_path(temp.path(), "1");
        write(&path, "# Task 1\n");
        let store = Store::open(temp.path()).unwrap();

        assert!(store.harvest_impl_log("1", &path).unwrap());
        assert!(!store.harvest_impl_log("1", &path).unwrap());
        let log = store.get_impl_log("1").unwrap().unwrap();
        assert_eq!(log.content_hash, content_hash(b"# Task 1\n"));
    }

    #[test]
    fn test_harvest_missing_file() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        let err = store
            .harvest_artifact("qa", "qa/x.md", &temp.path().join("qa/x.md"))
            .unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_harvest_waves() {
        let temp = TempDir::new().unwrap();
        let run = run_with_subagents(temp.path(), &[("release-gate-decider", "pass")], false);
        assert!(run.exists());
        fs::create_dir_all(layout::wave_path(temp.path(), 2)).unwrap();
        let mut store = Store::open(temp.path()).unwrap();

        assert_eq!(store.harvest_waves(DEFAULT_CHECKPOINT_SUBAGENT).unwrap(), 2);
        let waves = store.list_waves().unwrap();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].status, "complete");
        assert_eq!(waves[0].summary_status.as_deref(), Some("pass"));
        assert_eq!(waves[0].summary_source.as_deref(), Some("dir_scan"));
        assert_eq!(waves[1].status, "pending");
        assert_eq!(waves[1].summary_status.as_deref(), Some("missing"));
    }

    #[test]
    fn test_harvest_waves_uses_configured_subagent() {
        let temp = TempDir::new().unwrap();
        run_with_subagents(temp.path(), &[("arbiter", "blocked"), ("lint", "pass")], false);
        let mut store = Store::open(temp.path()).unwrap();

        store.harvest_waves("lint").unwrap();
        let wave = store.get_wave(1).unwrap().unwrap();
        assert_eq!(wave.status, "complete");
        assert_eq!(wave.summary_status.as_deref(), Some("pass"));

        store.harvest_waves("arbiter").unwrap();
        let wave = store.get_wave(1).unwrap().unwrap();
        assert_eq!(wave.status, "blocked");
        assert_eq!(wave.summary_status.as_deref(), Some("blocked"));
    }

    #[test]
    fn test_harvest_waves_rolls_back_on_failure() {
        let temp = TempDir::new().unwrap();
        run_with_subagents(temp.path(), &[("release-gate-decider", "pass")], false);
        fs::create_dir_all(layout::wave_path(temp.path(), 2)).unwrap();
        let mut store = Store::open(temp.path()).unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_wave_two BEFORE INSERT ON waves
                 WHEN NEW.wave_number = 2
                 BEGIN SELECT RAISE(ABORT, 'wave rejected'); END;",
            )
            .unwrap();

        assert!(store.harvest_waves(DEFAULT_CHECKPOINT_SUBAGENT).is_err());
        assert!(store.list_waves().unwrap().is_empty());
    }

    #[test]
    fn test_harvest_run_rolls_back_on_failure() {
        let temp = TempDir::new().unwrap();
        let run = run_with_subagents(temp.path(), &[("gate", "pass"), ("tester", "pass")], true);
        let mut store = Store::open(temp.path()).unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_handoff BEFORE INSERT ON handoffs
                 BEGIN SELECT RAISE(ABORT, 'handoff rejected'); END;",
            )
            .unwrap();

        let err = store
            .harvest_run_dir(&run, Command::Checkpoint, Some(1))
            .unwrap_err();
        assert!(matches!(err, Error::Sqlite(_)));

        let count = |table: &str| -> i64 {
            store
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .unwrap()
        };
        assert_eq!(count("runs"), 0);
        assert_eq!(count("subagents"), 0);
        assert_eq!(count("handoffs"), 0);
    }
}

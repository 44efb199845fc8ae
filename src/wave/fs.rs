//! Read-only filesystem access for wave resolution.
//!
//! Resolvers never touch `std::fs` directly; they go through [`WaveFs`] so
//! the precedence logic can run against [`MemoryFs`] in tests and tools.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::layout::{self, LatestDoc, StatusDoc};
use crate::spwlog_trace;

/// The handful of read operations wave resolution needs.
pub trait WaveFs {
    fn is_dir(&self, path: &Path) -> bool;
    /// File contents, or `None` if missing or unreadable.
    fn read_to_string(&self, path: &Path) -> Option<String>;
    /// Names of immediate subdirectories, sorted. Empty if `path` is not a directory.
    fn child_dirs(&self, path: &Path) -> Vec<String>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFs;

impl WaveFs for DiskFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_to_string(&self, path: &Path) -> Option<String> {
        spwlog_trace!("DiskFs::read {}", path.display());
        std::fs::read_to_string(path).ok()
    }

    fn child_dirs(&self, path: &Path) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(path) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }
}

/// In-memory tree. Adding a file implicitly creates its parent directories.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
        self
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> &mut Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files.insert(path.to_path_buf(), contents.into());
        self
    }
}

impl WaveFs for MemoryFs {
    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn read_to_string(&self, path: &Path) -> Option<String> {
        self.files.get(path).cloned()
    }

    fn child_dirs(&self, path: &Path) -> Vec<String> {
        // BTreeSet iteration keeps the result sorted.
        self.dirs
            .iter()
            .filter(|d| d.parent() == Some(path))
            .filter_map(|d| d.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect()
    }
}

/// A wave directory found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveDirEntry {
    pub number: u32,
    pub path: PathBuf,
}

/// Wave directories under `execution/waves`, ascending by wave number.
pub fn list_wave_dirs<F: WaveFs + ?Sized>(fs: &F, spec_dir: &Path) -> Vec<WaveDirEntry> {
    let waves = layout::waves_path(spec_dir);
    let mut entries: Vec<WaveDirEntry> = fs
        .child_dirs(&waves)
        .into_iter()
        .filter_map(|name| {
            layout::parse_wave_number(&name).map(|number| WaveDirEntry {
                number,
                path: waves.join(&name),
            })
        })
        .collect();
    entries.sort_by_key(|e| e.number);
    entries
}

/// Highest-numbered `run-NNN` directory in `dir`, as `(name, number)`.
pub fn latest_run_dir<F: WaveFs + ?Sized>(fs: &F, dir: &Path) -> Option<(String, u32)> {
    fs.child_dirs(dir)
        .into_iter()
        .filter_map(|name| layout::parse_run_number(&name).map(|n| (name, n)))
        .max_by_key(|(_, n)| *n)
}

/// Number of `run-NNN` directories in `dir` (zero when absent).
pub fn count_run_dirs<F: WaveFs + ?Sized>(fs: &F, dir: &Path) -> u32 {
    fs.child_dirs(dir)
        .iter()
        .filter(|name| layout::parse_run_number(name).is_some())
        .count() as u32
}

/// Parse a `status.json`-shaped file. Missing or corrupt files yield `None`.
pub fn read_status_doc<F: WaveFs + ?Sized>(fs: &F, path: &Path) -> Option<StatusDoc> {
    let raw = fs.read_to_string(path)?;
    match serde_json::from_str(&raw) {
        Ok(doc) => Some(doc),
        Err(e) => {
            spwlog_trace!("ignoring invalid status file {}: {}", path.display(), e);
            None
        }
    }
}

/// Parse a `_latest.json`. Missing or corrupt files yield `None`.
pub fn read_latest_doc<F: WaveFs + ?Sized>(fs: &F, path: &Path) -> Option<LatestDoc> {
    let raw = fs.read_to_string(path)?;
    match serde_json::from_str(&raw) {
        Ok(doc) => Some(doc),
        Err(e) => {
            spwlog_trace!("ignoring invalid latest file {}: {}", path.display(), e);
            None
        }
    }
}

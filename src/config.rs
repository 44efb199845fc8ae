use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{spwlog_debug, Result};

pub const DEFAULT_CHECKPOINT_SUBAGENT: &str = "release-gate-decider";
pub const DEFAULT_INDEX_FILE: &str = ".spw-index.db";
const CONFIG_FILE: &str = "spw-config.toml";

/// Workspace configuration read from `.spec-workflow/spw-config.toml`.
///
/// Only the sections the core reads are modelled; anything else in the file
/// (model routing, hook settings) is ignored on load.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Subagent whose `status.json` decides a checkpoint run.
    pub checkpoint_subagent: String,
    /// Refuse to mark a task done without its implementation log.
    pub require_impl_log: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            checkpoint_subagent: DEFAULT_CHECKPOINT_SUBAGENT.to_string(),
            require_impl_log: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub busy_timeout_ms: u64,
    pub index_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
            index_file: DEFAULT_INDEX_FILE.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Config {
    /// Canonical config location for a workspace.
    pub fn config_path(workspace: &Path) -> PathBuf {
        workspace.join(".spec-workflow").join(CONFIG_FILE)
    }

    /// Location used by older workspaces.
    pub fn legacy_config_path(workspace: &Path) -> PathBuf {
        workspace.join(".spw").join(CONFIG_FILE)
    }

    /// Resolve which config file applies, preferring the canonical path.
    pub fn resolve_path(workspace: &Path) -> Option<PathBuf> {
        [Self::config_path(workspace), Self::legacy_config_path(workspace)]
            .into_iter()
            .find(|p| p.is_file())
    }

    pub fn load(workspace: &Path) -> Result<Self> {
        let Some(path) = Self::resolve_path(workspace) else {
            spwlog_debug!(
                "Config file not found under {}, using defaults",
                workspace.display()
            );
            return Ok(Self::default());
        };
        spwlog_debug!("Config::load path={}", path.display());
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        spwlog_debug!(
            "Config loaded: checkpoint_subagent={}, require_impl_log={}, busy_timeout_ms={}",
            config.execution.checkpoint_subagent,
            config.execution.require_impl_log,
            config.store.busy_timeout_ms
        );
        Ok(config)
    }
}

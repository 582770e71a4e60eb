//! Optional session settings read from the state directory

use std::path::Path;
use std::time::Duration;

use ccsync_fs::constants::DEFAULT_STATE_DIR;
use ccsync_fs::{ConfigStore, NormalizedPath, RetryPolicy, RobustnessConfig, StateFile};
use serde::{Deserialize, Serialize};

use super::ProjectLayout;
use crate::Result;

/// Settings for one session; every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub layout: ProjectLayout,
    pub snapshot: SnapshotSettings,
}

/// How snapshot files are read and written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSettings {
    pub read_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub lock_timeout_ms: u64,
    pub fsync: bool,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        let robustness = RobustnessConfig::default();
        Self {
            read_attempts: retry.max_attempts,
            retry_base_delay_ms: retry.base_delay.as_millis() as u64,
            lock_timeout_ms: robustness.lock_timeout.as_millis() as u64,
            fsync: robustness.enable_fsync,
        }
    }
}

impl SnapshotSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.read_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    pub fn robustness(&self) -> RobustnessConfig {
        RobustnessConfig {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            enable_fsync: self.fsync,
        }
    }
}

impl SessionConfig {
    /// Load `<root>/.vscode/ccsync.toml`, or defaults when it does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = NormalizedPath::new(root)
            .join(DEFAULT_STATE_DIR)
            .join(StateFile::SessionConfig.as_str());
        Ok(ConfigStore::new().load_or_default(&path)?)
    }
}

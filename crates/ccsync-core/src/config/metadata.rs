//! Remote project identity stored next to the snapshot

use ccsync_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Identity of the remote project a workspace is bound to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(
        rename = "flutterFlowFlutterVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub toolchain_version: Option<VersionStamp>,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub branch_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_file: Option<String>,
}

/// A version string and when it was last refreshed (epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStamp {
    pub value: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: i64,
}

impl ProjectMetadata {
    /// Load metadata; a missing file yields empty identifiers.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        Ok(ConfigStore::new().load_or_default(path)?)
    }

    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        Ok(ConfigStore::new().save(path, self)?)
    }

    /// Branch name as the remote expects it: the default branch is `""`.
    pub fn remote_branch_name(&self) -> &str {
        if self.branch_name == "main" {
            ""
        } else {
            &self.branch_name
        }
    }

    /// Record a freshly fetched toolchain version.
    pub fn record_toolchain_version(&mut self, value: impl Into<String>) {
        self.toolchain_version = Some(VersionStamp {
            value: value.into(),
            last_updated: chrono::Utc::now().timestamp_millis(),
        });
    }

    /// Remember which file to open when the workspace is next opened.
    pub fn set_initial_file(path: &NormalizedPath, file: impl Into<String>) -> Result<()> {
        let mut metadata = Self::load(path)?;
        metadata.initial_file = Some(file.into());
        metadata.save(path)
    }

    /// Take the remembered initial file, clearing it on disk.
    pub fn take_initial_file(path: &NormalizedPath) -> Result<Option<String>> {
        let mut metadata = Self::load(path)?;
        let initial = metadata.initial_file.take();
        metadata.save(path)?;
        Ok(initial)
    }
}

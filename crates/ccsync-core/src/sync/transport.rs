//! Remote collaborators and push outcomes

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::SyncPayload;
use crate::Result;
use crate::artifact::CodeType;

/// Sends a payload to the remote project.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Deliver the payload. `Err` means no response was obtained at all.
    async fn push(&self, payload: &SyncPayload) -> Result<PushResponse>;
}

/// Writes the remote project's custom code into a local project.
#[async_trait]
pub trait PullSource: Send + Sync {
    async fn pull_into(&self, root: &Path) -> Result<()>;
}

/// A problem the remote reported for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWarning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<CodeType>,
    pub error_message: String,
    /// Critical warnings block the baseline from advancing
    #[serde(default)]
    pub is_critical: bool,
}

/// What the remote answered to a push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    /// HTTP-like status code
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Warnings keyed by project-relative file path
    #[serde(default)]
    pub file_warnings: BTreeMap<String, Vec<FileWarning>>,
}

impl PushResponse {
    pub fn ok() -> Self {
        Self {
            status: 200,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn has_critical_warning(&self) -> bool {
        self.file_warnings
            .values()
            .flatten()
            .any(|warning| warning.is_critical)
    }

    /// Whether the remote applied the change and the baseline may advance.
    pub fn accepted(&self) -> bool {
        self.is_success() && !self.has_critical_warning()
    }
}

/// Outcome of one push as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub request_id: String,
    /// `None` when the transport failed before a response arrived
    pub status: Option<u16>,
    pub error: Option<String>,
    pub file_warnings: BTreeMap<String, Vec<FileWarning>>,
    /// The baseline advanced to the pushed state
    pub committed: bool,
}

impl PushReport {
    pub(crate) fn from_response(request_id: String, response: PushResponse) -> Self {
        let committed = response.accepted();
        Self {
            request_id,
            status: Some(response.status),
            error: response.error,
            file_warnings: response.file_warnings,
            committed,
        }
    }

    pub(crate) fn transport_failure(request_id: String, message: String) -> Self {
        Self {
            request_id,
            status: None,
            error: Some(message),
            file_warnings: BTreeMap::new(),
            committed: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.committed
    }

    pub fn has_critical_warning(&self) -> bool {
        self.file_warnings
            .values()
            .flatten()
            .any(|warning| warning.is_critical)
    }
}

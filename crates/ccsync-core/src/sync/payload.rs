//! The request body of a push

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::bundle;
use crate::Result;
use crate::manifest::ManifestIndex;

/// Everything the remote needs to apply local changes.
///
/// `file_map` and `functions_map` are JSON documents embedded as strings;
/// the remote decodes them separately from the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub project_id: String,
    /// Remote branch; the default branch is sent as `""`
    pub branch_name: String,
    pub request_id: String,
    /// Base64 zip of every present artifact plus the rendered manifests
    pub zipped_custom_code: String,
    /// Dependency manifest text
    pub serialized_yaml: String,
    pub file_map: String,
    pub functions_map: String,
    /// Regenerated manifests, kept for callers; not part of the wire format
    #[serde(skip)]
    pub manifests: Vec<ManifestIndex>,
}

impl SyncPayload {
    /// Decode the bundled files, keyed by project-relative path.
    pub fn bundled_files(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        bundle::unpack(&self.zipped_custom_code)
    }
}

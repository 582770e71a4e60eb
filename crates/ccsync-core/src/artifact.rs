//! Tracked artifact records
//!
//! One [`ArtifactRecord`] exists per tracked file, keyed by its file name.
//! The serialized field names and one-letter type codes are shared with other
//! tools reading the same state directory and must stay stable.

use serde::{Deserialize, Serialize};

use crate::extractor::DeclarationKind;

/// Category of a project file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CodeType {
    /// One action per file
    #[serde(rename = "A")]
    Action,
    /// One widget per file
    #[serde(rename = "W")]
    Widget,
    /// The shared custom functions file
    #[serde(rename = "F")]
    Function,
    /// The dependency manifest
    #[serde(rename = "D")]
    Dependencies,
    /// Anything else; never tracked
    #[serde(rename = "O")]
    Other,
}

impl CodeType {
    /// One-letter code used in the persisted file map.
    pub fn code(&self) -> char {
        match self {
            Self::Action => 'A',
            Self::Widget => 'W',
            Self::Function => 'F',
            Self::Dependencies => 'D',
            Self::Other => 'O',
        }
    }

    /// Whether files of this category are tracked at all.
    pub fn is_tracked(&self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Whether this category has a generated exports manifest.
    pub fn has_manifest(&self) -> bool {
        matches!(self, Self::Action | Self::Widget)
    }

    /// The declaration kind that names an artifact of this category.
    pub fn identifying_kind(&self) -> Option<DeclarationKind> {
        match self {
            Self::Action => Some(DeclarationKind::Function),
            Self::Widget => Some(DeclarationKind::Class),
            _ => None,
        }
    }
}

impl std::fmt::Display for CodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Tracked metadata for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Identifier at the last sync, or at creation
    #[serde(rename = "old_identifier_name")]
    pub identifier_before: String,
    /// Identifier extracted from the current content
    #[serde(rename = "new_identifier_name")]
    pub identifier_current: String,
    #[serde(rename = "type")]
    pub code_type: CodeType,
    pub is_deleted: bool,
    /// Content hash at the last sync; `None` for artifacts created since
    #[serde(
        rename = "original_checksum",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub checksum_before: Option<String>,
    #[serde(
        rename = "current_checksum",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub checksum_current: Option<String>,
}

impl ArtifactRecord {
    /// A record for an artifact that did not exist at the last sync.
    pub fn created(code_type: CodeType, identifier: String, checksum: String) -> Self {
        Self {
            identifier_before: identifier.clone(),
            identifier_current: identifier,
            code_type,
            is_deleted: false,
            checksum_before: None,
            checksum_current: Some(checksum),
        }
    }

    /// Created since the last sync.
    pub fn is_new(&self) -> bool {
        self.checksum_before.is_none()
    }

    /// Present, and its content differs from the baseline.
    pub fn is_modified(&self) -> bool {
        !self.is_deleted && self.checksum_current != self.checksum_before
    }

    /// Identifiers this artifact contributes to its category manifest.
    pub fn exports(&self) -> Vec<String> {
        if self.identifier_current.is_empty() {
            Vec::new()
        } else {
            vec![self.identifier_current.clone()]
        }
    }

    /// Advance the baseline to the current state.
    pub(crate) fn rebaseline(&mut self) {
        self.identifier_before = self.identifier_current.clone();
        self.checksum_before = self.checksum_current.clone();
    }
}

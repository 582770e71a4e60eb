//! Events flowing into and out of a session

use std::path::PathBuf;

use crate::artifact::ArtifactRecord;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Add,
    Update,
    Delete,
}

/// A filesystem change reported by a watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEvent {
    pub path: PathBuf,
    pub kind: EditKind,
}

impl EditEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EditKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EditKind::Add)
    }

    pub fn updated(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EditKind::Update)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EditKind::Delete)
    }
}

/// Published after a change has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One tracked record changed
    ArtifactChanged {
        filename: String,
        record: ArtifactRecord,
    },
    /// A push was accepted and the baseline advanced
    Synced,
    /// The whole change state was reloaded or rebuilt
    Refreshed,
}

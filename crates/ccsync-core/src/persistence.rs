//! Durable change state
//!
//! A snapshot is spread over a few files in the state directory:
//!
//! - `file_map.json`: every [`ArtifactRecord`], keyed by file name
//! - `custom_functions_baseline.dart`: the shared file as of the last sync
//!
//! plus `function_changes.json` (the last shared declaration classification)
//! beside the shared functions file and the rendered `index.dart` manifests
//! next to the artifacts. The live
//! shared file is its own `current` text and is not duplicated.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use ccsync_fs::io::{self, retry_bounded};
use ccsync_fs::{NormalizedPath, Retry, RetryPolicy, RobustnessConfig, StateFile};
use tracing::{debug, info, warn};

use crate::artifact::{ArtifactRecord, CodeType};
use crate::config::{ProjectLayout, SessionConfig};
use crate::extractor::DeclarationExtractor;
use crate::functions::{FunctionChange, SharedDeclarationSnapshot};
use crate::tracker::ChangeTracker;
use crate::{Error, Result};

/// Why reading the file map failed.
#[derive(Debug)]
enum LoadFailure {
    Corrupt(String),
    Unreadable(String),
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Corrupt(reason) => write!(f, "corrupt snapshot: {reason}"),
            Self::Unreadable(reason) => write!(f, "unreadable snapshot: {reason}"),
        }
    }
}

/// Reads and writes the snapshot of one project.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: NormalizedPath,
    layout: ProjectLayout,
    retry: RetryPolicy,
    robustness: RobustnessConfig,
}

impl SnapshotStore {
    pub fn new(root: impl AsRef<Path>, config: &SessionConfig) -> Self {
        Self {
            root: NormalizedPath::new(root),
            layout: config.layout.clone(),
            retry: config.snapshot.retry_policy(),
            robustness: config.snapshot.robustness(),
        }
    }

    /// Absolute path of a state file.
    ///
    /// Function changes sit beside the shared functions file, where the
    /// remote tooling reads them; everything else is in the state directory.
    pub fn path(&self, file: StateFile) -> NormalizedPath {
        match file {
            StateFile::FunctionChanges => self.functions_dir().join(file.as_str()),
            _ => self.root.join(&self.layout.state_dir).join(file.as_str()),
        }
    }

    fn functions_dir(&self) -> NormalizedPath {
        self.root
            .join(&self.layout.functions_file)
            .parent()
            .unwrap_or_else(|| self.root.clone())
    }

    /// Load the snapshot and reconcile it with the project files.
    ///
    /// A missing or corrupt snapshot is rebuilt from the files on disk.
    ///
    /// # Errors
    ///
    /// [`Error::SnapshotUnavailable`] when the file map exists but cannot be
    /// read within the retry budget.
    pub fn load(&self, extractor: Arc<dyn DeclarationExtractor>) -> Result<ChangeTracker> {
        let file_map_path = self.path(StateFile::FileMap);

        let outcome = retry_bounded(self.retry, || match io::read_bytes(&file_map_path) {
            Ok(bytes) => parse_file_map(&bytes)
                .map(Some)
                .map_err(|reason| Retry::Transient(LoadFailure::Corrupt(reason))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(Retry::Transient(LoadFailure::Unreadable(e.to_string()))),
        });

        let records = match outcome {
            Ok(Some(records)) => records,
            Ok(None) => {
                info!(path = %file_map_path, "No snapshot found, rebuilding from project files");
                return Ok(self.rebuild(extractor));
            }
            Err(LoadFailure::Corrupt(reason)) => {
                warn!(path = %file_map_path, reason = %reason, "Snapshot corrupt, rebuilding from project files");
                return Ok(self.rebuild(extractor));
            }
            Err(LoadFailure::Unreadable(reason)) => {
                return Err(Error::SnapshotUnavailable {
                    path: file_map_path.to_native(),
                    attempts: self.retry.max_attempts.max(1),
                    reason,
                });
            }
        };

        let current = self.read_optional(&self.root.join(&self.layout.functions_file));
        let before = match self.read_optional(&self.path(StateFile::FunctionsBaseline)) {
            Some(before) => before,
            None => {
                debug!("No functions baseline, treating the current file as synced");
                current.clone().unwrap_or_default()
            }
        };
        let changes = self.read_function_changes();

        let mut tracker = ChangeTracker::restore(
            self.root.to_native(),
            self.layout.clone(),
            extractor,
            records,
            SharedDeclarationSnapshot::from_parts(before, current.unwrap_or_default(), changes),
        );
        tracker.reconcile();
        info!(records = tracker.records().len(), "Snapshot loaded");
        Ok(tracker)
    }

    /// Rebuild from the project files, treating them all as synced.
    pub fn rebuild(&self, extractor: Arc<dyn DeclarationExtractor>) -> ChangeTracker {
        ChangeTracker::rebuild(self.root.to_native(), self.layout.clone(), extractor)
    }

    /// Write every snapshot file atomically.
    pub fn save(&self, tracker: &ChangeTracker) -> Result<()> {
        let file_map = serde_json::to_string_pretty(tracker.records())?;
        io::write_text(&self.path(StateFile::FileMap), &file_map, self.robustness)?;

        // Never create the functions directory just for the change list
        if self.functions_dir().is_dir() {
            let changes = serde_json::to_string_pretty(tracker.function_changes())?;
            io::write_text(&self.path(StateFile::FunctionChanges), &changes, self.robustness)?;
        }

        io::write_text(
            &self.path(StateFile::FunctionsBaseline),
            tracker.functions().before(),
            self.robustness,
        )?;

        for code_type in [CodeType::Action, CodeType::Widget] {
            self.write_manifest(tracker, code_type)?;
        }

        debug!(records = tracker.records().len(), "Snapshot saved");
        Ok(())
    }

    fn write_manifest(&self, tracker: &ChangeTracker, code_type: CodeType) -> Result<()> {
        let (Some(dir), Some(path), Some(manifest)) = (
            self.layout.artifact_dir(code_type),
            self.layout.manifest_path(code_type),
            tracker.manifest(code_type),
        ) else {
            return Ok(());
        };

        // Never create artifact directories just for an index
        if !self.root.join(dir.as_str()).is_dir() {
            return Ok(());
        }

        let path = self.root.join(path.as_str());
        let rendered = manifest.render();
        if self.read_optional(&path).as_deref() == Some(rendered.as_str()) {
            return Ok(());
        }
        io::write_text(&path, &rendered, self.robustness)?;
        Ok(())
    }

    fn read_function_changes(&self) -> FunctionChange {
        let path = self.path(StateFile::FunctionChanges);
        let Some(text) = self.read_optional(&path) else {
            return FunctionChange::default();
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %path, error = %e, "Function changes unreadable, recomputing");
            FunctionChange::default()
        })
    }

    fn read_optional(&self, path: &NormalizedPath) -> Option<String> {
        match io::read_text(path) {
            Ok(text) => Some(text),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                warn!(path = %path, error = %e, "State file unreadable");
                None
            }
        }
    }
}

/// Decode a file map. Bytes that are not UTF-8 are as corrupt as bad JSON.
fn parse_file_map(
    bytes: &[u8],
) -> std::result::Result<BTreeMap<String, ArtifactRecord>, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
    serde_json::from_str(text).map_err(|e| e.to_string())
}

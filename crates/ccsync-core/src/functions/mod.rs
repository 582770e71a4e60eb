//! Diffing of the shared declaration file
//!
//! Every custom function lives in one shared file, so file-level checksums
//! cannot say which functions changed. [`SharedDeclarationSnapshot`] keeps the
//! file as it was at the last sync next to its live content and classifies
//! the difference into renames, deletions and additions.

mod change;
mod similarity;

pub use change::{FunctionChange, FunctionRename, RenameOrigin};
pub use similarity::{RENAME_SIMILARITY_THRESHOLD, levenshtein, similarity};

use crate::extractor::{Declaration, DeclarationExtractor};

/// Baseline and live content of the shared declaration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedDeclarationSnapshot {
    before: String,
    current: String,
    changes: FunctionChange,
}

impl SharedDeclarationSnapshot {
    /// Restore a snapshot from persisted parts.
    pub fn from_parts(before: String, current: String, changes: FunctionChange) -> Self {
        Self {
            before,
            current,
            changes,
        }
    }

    /// A snapshot whose baseline equals `content`.
    pub fn synced(content: String) -> Self {
        Self {
            before: content.clone(),
            current: content,
            changes: FunctionChange::default(),
        }
    }

    pub fn before(&self) -> &str {
        &self.before
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// The last computed classification, including explicit renames.
    pub fn changes(&self) -> &FunctionChange {
        &self.changes
    }

    /// Replace the live content and reclassify.
    pub fn set_current(&mut self, content: String, extractor: &dyn DeclarationExtractor) {
        self.current = content;
        self.recompute(extractor);
    }

    /// Reclassify `before` against `current`, keeping explicit renames.
    pub fn recompute(&mut self, extractor: &dyn DeclarationExtractor) {
        self.changes = self.diff(extractor);
    }

    /// Fresh classification merged with the stored explicit renames.
    pub fn diff(&self, extractor: &dyn DeclarationExtractor) -> FunctionChange {
        let before = extract_or_empty(extractor, &self.before, "baseline");
        let current = extract_or_empty(extractor, &self.current, "current");
        FunctionChange::between(&before, &current).merged_with_previous(&self.changes, &current)
    }

    pub fn record_explicit_rename(&mut self, old_name: &str, new_name: &str) {
        self.changes.record_explicit_rename(old_name, new_name);
    }

    /// The live content becomes the baseline.
    pub fn commit(&mut self) {
        self.before = self.current.clone();
        self.changes = FunctionChange::default();
    }
}

fn extract_or_empty(
    extractor: &dyn DeclarationExtractor,
    source: &str,
    side: &str,
) -> Vec<Declaration> {
    match extractor.extract(source) {
        Ok(declarations) => declarations,
        Err(e) => {
            tracing::warn!(side, error = %e, "Could not extract shared declarations");
            Vec::new()
        }
    }
}

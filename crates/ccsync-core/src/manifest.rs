//! Generated export manifests for discrete artifact directories
//!
//! Each of the action and widget directories carries a generated `index.dart`
//! re-exporting the public identifier of every file in it. The index is kept
//! in memory as a [`ManifestIndex`] and patched as records change.

use std::collections::BTreeMap;

use crate::artifact::{ArtifactRecord, CodeType};

/// Filename to exported identifiers, for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestIndex {
    code_type: CodeType,
    entries: BTreeMap<String, Vec<String>>,
}

impl ManifestIndex {
    pub fn new(code_type: CodeType) -> Self {
        Self {
            code_type,
            entries: BTreeMap::new(),
        }
    }

    /// Rebuild from scratch out of the non-deleted records of `code_type`.
    pub fn regenerate(code_type: CodeType, records: &BTreeMap<String, ArtifactRecord>) -> Self {
        let entries = records
            .iter()
            .filter(|(_, record)| record.code_type == code_type && !record.is_deleted)
            .map(|(filename, record)| (filename.clone(), record.exports()))
            .collect();
        Self { code_type, entries }
    }

    pub fn code_type(&self) -> CodeType {
        self.code_type
    }

    pub fn entries(&self) -> &BTreeMap<String, Vec<String>> {
        &self.entries
    }

    /// Set the exports of one file, adding the entry if needed.
    pub fn patch(&mut self, filename: &str, identifiers: Vec<String>) {
        self.entries.insert(filename.to_string(), identifiers);
    }

    pub fn remove(&mut self, filename: &str) -> Option<Vec<String>> {
        self.entries.remove(filename)
    }

    /// Move an entry to a new filename. No-op when `old` has no entry.
    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(identifiers) = self.entries.remove(old) {
            self.entries.insert(new.to_string(), identifiers);
        }
    }

    /// Generated index text, one export line per file with exports.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (filename, identifiers) in &self.entries {
            if identifiers.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "export '{}' show {};\n",
                filename,
                identifiers.join(", ")
            ));
        }
        out
    }
}

//! Change tracking for custom code artifacts
//!
//! [`ChangeTracker`] answers "what changed since the last sync" for every
//! tracked file. Discrete artifacts (actions, widgets, the dependency
//! manifest) are tracked by checksum and extracted identifier; the shared
//! functions file is additionally diffed declaration by declaration.
//!
//! The tracker is synchronous and performs no persistence; the session owns
//! serialization of calls and writes snapshots after each mutation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use ccsync_fs::NormalizedPath;
use ccsync_fs::checksum::compute_bytes_checksum;
use tracing::{debug, info, warn};

use crate::Result;
use crate::artifact::{ArtifactRecord, CodeType};
use crate::config::{ProjectLayout, ProjectMetadata};
use crate::extractor::DeclarationExtractor;
use crate::functions::{FunctionChange, SharedDeclarationSnapshot};
use crate::manifest::ManifestIndex;
use crate::sync::{self, SyncPayload};

/// In-memory change state for one project.
pub struct ChangeTracker {
    root: NormalizedPath,
    layout: ProjectLayout,
    extractor: Arc<dyn DeclarationExtractor>,
    records: BTreeMap<String, ArtifactRecord>,
    actions: ManifestIndex,
    widgets: ManifestIndex,
    functions: SharedDeclarationSnapshot,
}

impl std::fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("root", &self.root)
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl ChangeTracker {
    /// An empty tracker: nothing tracked, empty baseline.
    pub fn new(
        root: impl AsRef<Path>,
        layout: ProjectLayout,
        extractor: Arc<dyn DeclarationExtractor>,
    ) -> Self {
        Self {
            root: NormalizedPath::new(root),
            layout,
            extractor,
            records: BTreeMap::new(),
            actions: ManifestIndex::new(CodeType::Action),
            widgets: ManifestIndex::new(CodeType::Widget),
            functions: SharedDeclarationSnapshot::default(),
        }
    }

    /// Restore persisted state. Manifests are regenerated from the records.
    pub fn restore(
        root: impl AsRef<Path>,
        layout: ProjectLayout,
        extractor: Arc<dyn DeclarationExtractor>,
        records: BTreeMap<String, ArtifactRecord>,
        functions: SharedDeclarationSnapshot,
    ) -> Self {
        let mut tracker = Self::new(root, layout, extractor);
        tracker.records = records;
        tracker.functions = functions;
        tracker.regenerate_manifests();
        tracker
    }

    /// Build a tracker from the files on disk, treating all of them as synced.
    pub fn rebuild(
        root: impl AsRef<Path>,
        layout: ProjectLayout,
        extractor: Arc<dyn DeclarationExtractor>,
    ) -> Self {
        let mut tracker = Self::new(root, layout, extractor);
        for relative in tracker.discover() {
            tracker.add_artifact(relative.to_native());
        }
        tracker.commit_sync();
        info!(
            root = %tracker.root,
            records = tracker.records.len(),
            "Rebuilt change state from project files"
        );
        tracker
    }

    /// Bring restored records up to date with the files on disk.
    ///
    /// Picks up edits, creations and removals that happened while no
    /// session was running. Returns the keys whose records changed.
    pub fn reconcile(&mut self) -> Vec<String> {
        let mut changed = Vec::new();
        let on_disk = self.discover();

        for relative in &on_disk {
            let Some(key) = relative.file_name().map(str::to_string) else {
                continue;
            };
            let previous = self.records.get(&key).cloned();
            if let Some(record) = self.update_artifact(relative.to_native())
                && previous.as_ref() != Some(&record)
            {
                changed.push(key);
            }
        }

        let missing: Vec<(String, CodeType)> = self
            .records
            .iter()
            .filter(|(_, record)| !record.is_deleted)
            .filter_map(|(key, record)| {
                let relative = self.layout.relative_path(key, record.code_type)?;
                (!on_disk.contains(&relative)).then(|| (key.clone(), record.code_type))
            })
            .collect();
        for (key, code_type) in missing {
            if let Some(relative) = self.layout.relative_path(&key, code_type)
                && self.delete_artifact(relative.to_native()).is_some()
            {
                changed.push(key);
            }
        }

        self.regenerate_manifests();
        if !changed.is_empty() {
            info!(changed = changed.len(), "Reconciled snapshot with project files");
        }
        changed
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Start tracking a newly created file.
    ///
    /// Returns `None` for untracked categories and unreadable paths. A path
    /// that is already tracked is updated instead.
    pub fn add_artifact(&mut self, path: impl AsRef<Path>) -> Option<ArtifactRecord> {
        let (relative, code_type, key) = self.locate(path.as_ref())?;

        if let Some(existing) = self.records.get(&key) {
            if existing.code_type == code_type {
                debug!(file = %key, "Already tracked, updating instead");
                return self.update_artifact(path);
            }
            warn!(
                file = %key,
                tracked_as = %existing.code_type,
                "File name already tracked in another category, ignoring"
            );
            return None;
        }

        let content = self.read(&relative)?;
        let text = String::from_utf8_lossy(&content).into_owned();
        let record = ArtifactRecord::created(
            code_type,
            self.identify(code_type, &text),
            compute_bytes_checksum(&content),
        );

        self.records.insert(key.clone(), record.clone());
        self.patch_manifest(&key, &record);
        if code_type == CodeType::Function {
            self.functions.set_current(text, self.extractor.as_ref());
        }
        debug!(file = %key, identifier = %record.identifier_current, "Artifact added");
        Some(record)
    }

    /// Refresh a tracked file from disk. Untracked files are added.
    pub fn update_artifact(&mut self, path: impl AsRef<Path>) -> Option<ArtifactRecord> {
        let (relative, code_type, key) = self.locate(path.as_ref())?;

        match self.records.get(&key) {
            None => return self.add_artifact(path),
            Some(existing) if existing.code_type != code_type => {
                warn!(file = %key, "File name already tracked in another category, ignoring");
                return None;
            }
            Some(_) => {}
        }

        let content = self.read(&relative)?;
        let text = String::from_utf8_lossy(&content).into_owned();
        let identifier = self.identify(code_type, &text);
        let checksum = compute_bytes_checksum(&content);

        let record = self.records.get_mut(&key)?;
        record.checksum_current = Some(checksum);
        record.identifier_current = identifier;
        record.is_deleted = false;
        let record = record.clone();

        self.patch_manifest(&key, &record);
        if code_type == CodeType::Function {
            self.functions.set_current(text, self.extractor.as_ref());
        }
        debug!(file = %key, modified = record.is_modified(), "Artifact updated");
        Some(record)
    }

    /// Mark a tracked file deleted, keeping its checksums and identifiers.
    pub fn delete_artifact(&mut self, path: impl AsRef<Path>) -> Option<ArtifactRecord> {
        let (_, code_type, key) = self.locate(path.as_ref())?;

        let record = self.records.get_mut(&key)?;
        if record.code_type != code_type {
            return None;
        }
        record.is_deleted = true;
        let record = record.clone();

        if let Some(manifest) = self.manifest_mut(code_type) {
            manifest.remove(&key);
        }
        if code_type == CodeType::Function {
            self.functions
                .set_current(String::new(), self.extractor.as_ref());
        }
        debug!(file = %key, "Artifact deleted");
        Some(record)
    }

    /// Move a record to a new file name, keeping every field.
    ///
    /// A move into another category (or out of tracking) is a delete of the
    /// old path plus an add of the new one. Identifier changes are picked up
    /// by the next update.
    pub fn rename_artifact(
        &mut self,
        old_path: impl AsRef<Path>,
        new_path: impl AsRef<Path>,
    ) -> Option<ArtifactRecord> {
        let old_relative = self.relative(old_path.as_ref())?;
        let new_relative = self.relative(new_path.as_ref())?;
        let old_type = self.layout.classify(&old_relative);
        let new_type = self.layout.classify(&new_relative);
        let old_key = old_relative.file_name()?.to_string();
        let new_key = new_relative.file_name()?.to_string();

        let tracked = self
            .records
            .get(&old_key)
            .is_some_and(|record| record.code_type == old_type);
        if !tracked {
            return self.add_artifact(new_path);
        }

        if old_type != new_type || !new_type.is_tracked() {
            self.delete_artifact(old_path);
            return self.add_artifact(new_path);
        }
        if old_key == new_key {
            return self.records.get(&old_key).cloned();
        }

        let record = self.records.remove(&old_key)?;
        if self.records.insert(new_key.clone(), record.clone()).is_some() {
            warn!(file = %new_key, "Rename replaced an existing record");
        }
        if let Some(manifest) = self.manifest_mut(new_type) {
            manifest.remove(&new_key);
            manifest.rename(&old_key, &new_key);
        }
        debug!(from = %old_key, to = %new_key, "Artifact renamed");
        Some(record)
    }

    /// Record a rename-symbol refactoring inside the shared functions file.
    pub fn record_explicit_rename(&mut self, old_name: &str, new_name: &str) {
        self.functions.record_explicit_rename(old_name, new_name);
        debug!(from = old_name, to = new_name, "Explicit function rename recorded");
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// Assemble the push payload without mutating any state.
    pub fn compute_sync_payload(
        &self,
        metadata: &ProjectMetadata,
        request_id: &str,
    ) -> Result<SyncPayload> {
        let function_changes = self.functions.diff(self.extractor.as_ref());
        let manifests = vec![
            ManifestIndex::regenerate(CodeType::Action, &self.records),
            ManifestIndex::regenerate(CodeType::Widget, &self.records),
        ];

        let mut files = BTreeMap::new();
        for (key, record) in &self.records {
            if record.is_deleted
                || !matches!(
                    record.code_type,
                    CodeType::Action | CodeType::Widget | CodeType::Function
                )
            {
                continue;
            }
            let Some(relative) = self.layout.relative_path(key, record.code_type) else {
                continue;
            };
            match ccsync_fs::io::read_bytes(&self.root.join(relative.as_str())) {
                Ok(content) => {
                    files.insert(relative.to_string(), content);
                }
                Err(e) => warn!(file = %relative, error = %e, "Skipping unreadable artifact in bundle"),
            }
        }
        for manifest in &manifests {
            if let Some(path) = self.layout.manifest_path(manifest.code_type()) {
                files.insert(path.to_string(), manifest.render().into_bytes());
            }
        }

        let dependencies_path = self.root.join(&self.layout.dependencies_file);
        let serialized_yaml = match ccsync_fs::io::read_text(&dependencies_path) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Dependency manifest unreadable, sending empty");
                String::new()
            }
        };

        Ok(SyncPayload {
            project_id: metadata.project_id.clone(),
            branch_name: metadata.remote_branch_name().to_string(),
            request_id: request_id.to_string(),
            zipped_custom_code: sync::pack(&files)?,
            serialized_yaml,
            file_map: serde_json::to_string(&self.records)?,
            functions_map: serde_json::to_string(&function_changes)?,
            manifests,
        })
    }

    /// Advance the baseline to the current state.
    ///
    /// Deleted records are purged, every record is re-baselined and the
    /// shared file's live content becomes its baseline.
    pub fn commit_sync(&mut self) {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_deleted);
        for record in self.records.values_mut() {
            record.rebaseline();
        }
        self.functions.commit();
        self.regenerate_manifests();
        debug!(
            purged = before - self.records.len(),
            records = self.records.len(),
            "Baseline advanced"
        );
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn records(&self) -> &BTreeMap<String, ArtifactRecord> {
        &self.records
    }

    pub fn record(&self, key: &str) -> Option<&ArtifactRecord> {
        self.records.get(key)
    }

    pub fn manifest(&self, code_type: CodeType) -> Option<&ManifestIndex> {
        match code_type {
            CodeType::Action => Some(&self.actions),
            CodeType::Widget => Some(&self.widgets),
            _ => None,
        }
    }

    pub fn functions(&self) -> &SharedDeclarationSnapshot {
        &self.functions
    }

    pub fn function_changes(&self) -> &FunctionChange {
        self.functions.changes()
    }

    /// Project-relative paths of present files whose content changed.
    pub fn modified_files(&self) -> Vec<NormalizedPath> {
        self.paths_where(ArtifactRecord::is_modified)
    }

    /// Project-relative paths of tracked files deleted since the last sync.
    pub fn deleted_files(&self) -> Vec<NormalizedPath> {
        self.paths_where(|record| record.is_deleted)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn paths_where(&self, predicate: impl Fn(&ArtifactRecord) -> bool) -> Vec<NormalizedPath> {
        self.records
            .iter()
            .filter(|(_, record)| predicate(record))
            .filter_map(|(key, record)| self.layout.relative_path(key, record.code_type))
            .collect()
    }

    /// Project-relative form of `path`; `None` when it lies outside the root.
    fn relative(&self, path: &Path) -> Option<NormalizedPath> {
        let normalized = NormalizedPath::new(path);
        if path.is_absolute() {
            normalized.strip_prefix(&self.root)
        } else {
            Some(normalized)
        }
    }

    /// Relative path, category and record key of a tracked path.
    fn locate(&self, path: &Path) -> Option<(NormalizedPath, CodeType, String)> {
        let relative = self.relative(path)?;
        let code_type = self.layout.classify(&relative);
        if !code_type.is_tracked() {
            debug!(path = %relative, "Not a tracked artifact");
            return None;
        }
        let key = relative.file_name()?.to_string();
        Some((relative, code_type, key))
    }

    fn read(&self, relative: &NormalizedPath) -> Option<Vec<u8>> {
        let path = self.root.join(relative.as_str());
        if path.is_dir() {
            return None;
        }
        match ccsync_fs::io::read_bytes(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!(path = %relative, error = %e, "Artifact unreadable, skipping");
                None
            }
        }
    }

    /// The public identifier naming an artifact, or `""` when none is found.
    fn identify(&self, code_type: CodeType, source: &str) -> String {
        let Some(kind) = code_type.identifying_kind() else {
            return String::new();
        };
        let declarations = match self.extractor.extract(source) {
            Ok(declarations) => declarations,
            Err(e) => {
                warn!(error = %e, "Could not extract identifier");
                return String::new();
            }
        };
        let public: Vec<_> = declarations.iter().filter(|d| d.is_public()).collect();
        public
            .iter()
            .find(|d| d.kind == kind)
            .or_else(|| public.first())
            .map(|d| d.name.clone())
            .unwrap_or_default()
    }

    /// Every tracked file currently on disk, project-relative and sorted.
    fn discover(&self) -> Vec<NormalizedPath> {
        let mut found = Vec::new();

        for code_type in [CodeType::Action, CodeType::Widget] {
            let Some(dir) = self.layout.artifact_dir(code_type) else {
                continue;
            };
            let entries = match std::fs::read_dir(self.root.join(dir.as_str()).to_native()) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(dir = %dir, error = %e, "Artifact directory not readable");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let relative = dir.join(&entry.file_name().to_string_lossy());
                if self.layout.classify(&relative) == code_type
                    && self.root.join(relative.as_str()).is_file()
                {
                    found.push(relative);
                }
            }
        }

        for single in [&self.layout.functions_file, &self.layout.dependencies_file] {
            let relative = NormalizedPath::new(single);
            if self.root.join(relative.as_str()).is_file() {
                found.push(relative);
            }
        }

        found.sort();
        found
    }

    fn manifest_mut(&mut self, code_type: CodeType) -> Option<&mut ManifestIndex> {
        match code_type {
            CodeType::Action => Some(&mut self.actions),
            CodeType::Widget => Some(&mut self.widgets),
            _ => None,
        }
    }

    fn patch_manifest(&mut self, key: &str, record: &ArtifactRecord) {
        let exports = record.exports();
        if let Some(manifest) = self.manifest_mut(record.code_type) {
            manifest.patch(key, exports);
        }
    }

    fn regenerate_manifests(&mut self) {
        self.actions = ManifestIndex::regenerate(CodeType::Action, &self.records);
        self.widgets = ManifestIndex::regenerate(CodeType::Widget, &self.records);
    }
}

//! Editing sessions
//!
//! A [`Session`] owns the change state of one project. It gates filesystem
//! events on its [`SessionState`], persists after every mutation and then
//! publishes a [`SessionEvent`]. [`SessionHandle`] shares a session between
//! tasks and [`run_event_loop`] feeds it from a watcher channel.

mod event;
mod handle;
mod state;

pub use event::{EditEvent, EditKind, SessionEvent};
pub use handle::{SessionHandle, run_event_loop};
pub use state::SessionState;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ccsync_fs::{NormalizedPath, StateFile};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::artifact::{ArtifactRecord, CodeType};
use crate::config::{ProjectMetadata, SessionConfig};
use crate::extractor::DeclarationExtractor;
use crate::functions::FunctionChange;
use crate::manifest::ManifestIndex;
use crate::persistence::SnapshotStore;
use crate::sync::{FileWarning, PullSource, PushReport, SyncTransport};
use crate::tracker::ChangeTracker;
use crate::{Error, Result};

const EVENT_CAPACITY: usize = 64;

/// Change tracking session for one project.
pub struct Session {
    root: PathBuf,
    extractor: Arc<dyn DeclarationExtractor>,
    store: SnapshotStore,
    tracker: ChangeTracker,
    metadata: ProjectMetadata,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    last_warnings: BTreeMap<String, Vec<FileWarning>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("root", &self.root)
            .field("state", &self.state())
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A session in [`SessionState::Uninitialized`]; call [`Session::initialize`].
    pub fn new(
        root: impl AsRef<Path>,
        config: SessionConfig,
        extractor: Arc<dyn DeclarationExtractor>,
    ) -> Self {
        let root = root.as_ref().to_path_buf();
        let (state, _) = watch::channel(SessionState::Uninitialized);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store: SnapshotStore::new(&root, &config),
            tracker: ChangeTracker::new(&root, config.layout, extractor.clone()),
            root,
            extractor,
            metadata: ProjectMetadata::default(),
            state,
            events,
            last_warnings: BTreeMap::new(),
        }
    }

    /// Create a session using the configuration found in the project.
    pub fn open(root: impl AsRef<Path>, extractor: Arc<dyn DeclarationExtractor>) -> Result<Self> {
        let config = SessionConfig::load(root.as_ref())?;
        Ok(Self::new(root, config, extractor))
    }

    /// Load (or rebuild) the change state and start accepting edits.
    ///
    /// If the state cannot be loaded the session moves to
    /// [`SessionState::Error`]. If only the initial save fails, the session
    /// is already editing from the in-memory state and the write error is
    /// returned; the next successful mutation persists everything.
    pub fn initialize(&mut self) -> Result<()> {
        self.metadata = self.load_metadata();

        match self.store.load(self.extractor.clone()) {
            Ok(tracker) => self.tracker = tracker,
            Err(e) => {
                error!(root = %self.root.display(), error = %e, "Could not load change state");
                self.set_state(SessionState::Error);
                return Err(e);
            }
        }

        self.set_state(SessionState::Editing);
        info!(
            root = %self.root.display(),
            records = self.tracker.records().len(),
            "Session initialized"
        );
        self.persist_and_notify(SessionEvent::Refreshed)
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Move to `next`. Unusual transitions are logged but still applied.
    pub fn set_state(&self, next: SessionState) {
        let current = self.state();
        if current == next {
            return;
        }
        if current.is_expected_transition(next) {
            info!(from = %current, to = %next, "Session state changed");
        } else {
            warn!(from = %current, to = %next, "Unexpected session state transition");
        }
        self.state.send_replace(next);
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    /// Apply one filesystem event.
    ///
    /// Events are dropped unless the session is editing. The file is
    /// re-read, so a delete of a path that still exists is an update.
    pub fn handle_event(&mut self, event: &EditEvent) -> Result<Option<ArtifactRecord>> {
        if !self.state().accepts_edits() {
            debug!(path = %event.path.display(), state = %self.state(), "Dropping edit event");
            return Ok(None);
        }
        let path = self.absolute(&event.path);
        if path.is_dir() {
            debug!(path = %path.display(), "Ignoring directory event");
            return Ok(None);
        }

        let kind = match event.kind {
            EditKind::Delete if path.exists() => EditKind::Update,
            kind => kind,
        };
        let record = match kind {
            EditKind::Add => self.tracker.add_artifact(&path),
            EditKind::Update => self.tracker.update_artifact(&path),
            EditKind::Delete => self.tracker.delete_artifact(&path),
        };

        let Some(record) = record else {
            return Ok(None);
        };
        self.persist_and_notify(SessionEvent::ArtifactChanged {
            filename: file_name(&path),
            record: record.clone(),
        })?;
        Ok(Some(record))
    }

    /// Apply a file rename reported by the editor.
    pub fn rename(
        &mut self,
        old_path: impl AsRef<Path>,
        new_path: impl AsRef<Path>,
    ) -> Result<Option<ArtifactRecord>> {
        if !self.state().accepts_edits() {
            debug!(state = %self.state(), "Dropping rename");
            return Ok(None);
        }
        let old_path = self.absolute(old_path.as_ref());
        let new_path = self.absolute(new_path.as_ref());
        let Some(record) = self.tracker.rename_artifact(&old_path, &new_path) else {
            return Ok(None);
        };

        self.persist_and_notify(SessionEvent::ArtifactChanged {
            filename: file_name(&new_path),
            record: record.clone(),
        })?;
        Ok(Some(record))
    }

    /// Record a rename-symbol refactoring of a shared function.
    pub fn record_explicit_rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if !self.state().accepts_edits() {
            debug!(state = %self.state(), "Dropping function rename");
            return Ok(());
        }
        self.tracker.record_explicit_rename(old_name, new_name);

        let functions_file = NormalizedPath::new(&self.tracker.layout().functions_file);
        let filename = functions_file.file_name().unwrap_or_default().to_string();
        match self.tracker.record(&filename).cloned() {
            Some(record) => {
                self.persist_and_notify(SessionEvent::ArtifactChanged { filename, record })
            }
            None => self.persist_and_notify(SessionEvent::Refreshed),
        }
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// Push local changes; the baseline advances only if the remote accepts.
    ///
    /// Transport failures and rejections are reported in the returned
    /// [`PushReport`], not as errors.
    pub async fn push(&mut self, transport: &dyn SyncTransport) -> Result<PushReport> {
        self.ensure_editing("push")?;
        self.set_state(SessionState::Pushing);

        let request_id = uuid::Uuid::new_v4().to_string();
        let payload = match self
            .tracker
            .compute_sync_payload(&self.metadata, &request_id)
        {
            Ok(payload) => payload,
            Err(e) => {
                self.set_state(SessionState::Editing);
                return Err(e);
            }
        };

        info!(request_id = %request_id, project = %payload.project_id, "Pushing changes");
        let report = match transport.push(&payload).await {
            Ok(response) => PushReport::from_response(request_id, response),
            Err(e) => PushReport::transport_failure(request_id, e.to_string()),
        };
        self.last_warnings = report.file_warnings.clone();

        let mut outcome = Ok(());
        if report.committed {
            self.tracker.commit_sync();
            outcome = self.persist_and_notify(SessionEvent::Synced);
            info!(request_id = %report.request_id, "Push accepted, baseline advanced");
        } else {
            warn!(
                request_id = %report.request_id,
                status = ?report.status,
                error = ?report.error,
                critical = report.has_critical_warning(),
                "Push not accepted, baseline unchanged"
            );
        }

        self.set_state(SessionState::Editing);
        outcome.map(|()| report)
    }

    /// Replace local code with the remote's and rebuild a clean baseline.
    pub async fn pull(&mut self, source: &dyn PullSource) -> Result<()> {
        self.ensure_editing("pull")?;
        self.set_state(SessionState::Pulling);

        if let Err(e) = source.pull_into(&self.root).await {
            warn!(error = %e, "Pull failed, keeping local state");
            self.set_state(SessionState::Editing);
            return Err(e);
        }

        self.metadata = self.load_metadata();
        self.tracker = self.store.rebuild(self.extractor.clone());
        self.last_warnings.clear();
        let outcome = self.persist_and_notify(SessionEvent::Refreshed);
        info!(records = self.tracker.records().len(), "Pulled remote code");

        self.set_state(SessionState::Editing);
        outcome
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    pub fn metadata(&self) -> ProjectMetadata {
        self.metadata.clone()
    }

    /// Change the project metadata and write it back.
    pub fn update_metadata(&mut self, change: impl FnOnce(&mut ProjectMetadata)) -> Result<()> {
        change(&mut self.metadata);
        self.metadata.save(&self.store.path(StateFile::Metadata))
    }

    // ------------------------------------------------------------------
    // Queries (owned snapshots)
    // ------------------------------------------------------------------

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn records(&self) -> BTreeMap<String, ArtifactRecord> {
        self.tracker.records().clone()
    }

    pub fn manifest(&self, code_type: CodeType) -> Option<ManifestIndex> {
        self.tracker.manifest(code_type).cloned()
    }

    pub fn shared_current(&self) -> String {
        self.tracker.functions().current().to_string()
    }

    pub fn function_changes(&self) -> FunctionChange {
        self.tracker.function_changes().clone()
    }

    pub fn modified_files(&self) -> Vec<NormalizedPath> {
        self.tracker.modified_files()
    }

    pub fn deleted_files(&self) -> Vec<NormalizedPath> {
        self.tracker.deleted_files()
    }

    /// Per-file warnings from the most recent push.
    pub fn last_warnings(&self) -> BTreeMap<String, Vec<FileWarning>> {
        self.last_warnings.clone()
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Persist, then publish `event`. Nothing is published if the write fails.
    fn persist_and_notify(&self, event: SessionEvent) -> Result<()> {
        if let Err(e) = self.store.save(&self.tracker) {
            error!(error = %e, "Could not persist change state");
            return Err(e);
        }
        // No subscribers is not an error
        let _ = self.events.send(event);
        Ok(())
    }

    /// Push and pull start only from [`SessionState::Editing`]; `Error`
    /// needs a fresh [`Session::initialize`].
    fn ensure_editing(&self, operation: &str) -> Result<()> {
        sync_gate(self.state(), operation)
    }

    fn load_metadata(&self) -> ProjectMetadata {
        ProjectMetadata::load(&self.store.path(StateFile::Metadata)).unwrap_or_else(|e| {
            warn!(error = %e, "Project metadata unreadable, using empty identity");
            ProjectMetadata::default()
        })
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Whether a push or pull may start in `state`.
pub(crate) fn sync_gate(state: SessionState, operation: &str) -> Result<()> {
    match state {
        SessionState::Editing => Ok(()),
        SessionState::Pushing | SessionState::Pulling => Err(Error::SyncInFlight),
        state => Err(Error::InvalidState {
            state: state.to_string(),
            operation: operation.to_string(),
        }),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

//! Shared access to a session from concurrent tasks

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, broadcast, mpsc, watch};
use tracing::{debug, warn};

use super::{EditEvent, Session, SessionEvent, SessionState, sync_gate};
use crate::artifact::ArtifactRecord;
use crate::sync::{PullSource, PushReport, SyncTransport};
use crate::Result;

/// Cloneable handle to a [`Session`].
///
/// The state is mirrored on a watch channel so callers can see that a pull
/// or push is running without waiting for the session lock.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
    state: watch::Receiver<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            state: session.subscribe_state(),
            events: session.events.clone(),
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Exclusive access for queries or operations not wrapped here.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().await
    }

    pub async fn initialize(&self) -> Result<()> {
        self.inner.lock().await.initialize()
    }

    /// Apply an edit event; dropped without locking unless editing.
    pub async fn handle_event(&self, event: &EditEvent) -> Result<Option<ArtifactRecord>> {
        let state = self.state();
        if !state.accepts_edits() {
            debug!(path = %event.path.display(), state = %state, "Dropping edit event");
            return Ok(None);
        }
        self.inner.lock().await.handle_event(event)
    }

    /// Push, rejecting immediately unless the session is editing.
    pub async fn push(&self, transport: &dyn SyncTransport) -> Result<PushReport> {
        sync_gate(self.state(), "push")?;
        self.inner.lock().await.push(transport).await
    }

    /// Pull, rejecting immediately unless the session is editing.
    pub async fn pull(&self, source: &dyn PullSource) -> Result<()> {
        sync_gate(self.state(), "pull")?;
        self.inner.lock().await.pull(source).await
    }
}

/// Feed watcher events to the session one at a time until the channel closes.
///
/// Each event is fully applied, persisted and published before the next one
/// is taken.
pub async fn run_event_loop(handle: SessionHandle, mut events: mpsc::Receiver<EditEvent>) {
    while let Some(event) = events.recv().await {
        if let Err(e) = handle.handle_event(&event).await {
            warn!(path = %event.path.display(), error = %e, "Edit event failed");
        }
    }
    debug!("Edit event stream closed");
}

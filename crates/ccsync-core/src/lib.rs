//! Change tracking and sync sessions for custom code
//!
//! This crate keeps track of what changed in the user-editable part of a
//! generated project since it was last synchronized with the remote
//! project, and builds the payload that applies those changes remotely.
//!
//! - **Change tracker**: per-file records keyed by file name, with content
//!   checksums and the public identifier each file declares
//! - **Shared declaration diff**: renames, additions and deletions inside
//!   the single shared functions file, inferred from body similarity
//! - **Manifests**: generated `index.dart` exports per artifact directory
//! - **Persistence**: atomic snapshot files with retrying reads and rebuild
//!   on corruption
//! - **Sessions**: a state machine gating filesystem events, plus push and
//!   pull orchestration
//!
//! # Architecture
//!
//! ```text
//!              watcher / editor
//!                     |
//!          SessionHandle -> Session
//!            |          |         |
//!     ChangeTracker  SnapshotStore  SyncTransport / PullSource
//!       |      |          |
//! ManifestIndex  SharedDeclarationSnapshot
//!                     |
//!            DeclarationExtractor
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ccsync_core::{DartDeclarationScanner, EditEvent, Session, SessionHandle};
//!
//! async fn example() -> ccsync_core::Result<()> {
//!     let mut session = Session::open("/path/to/project", Arc::new(DartDeclarationScanner))?;
//!     session.initialize()?;
//!     let handle = SessionHandle::new(session);
//!     handle
//!         .handle_event(&EditEvent::added("lib/custom_code/actions/my_action.dart"))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod extractor;
pub mod functions;
pub mod logging;
pub mod manifest;
pub mod persistence;
pub mod session;
pub mod sync;
pub mod tracker;

pub use artifact::{ArtifactRecord, CodeType};
pub use config::{ProjectLayout, ProjectMetadata, SessionConfig, SnapshotSettings, VersionStamp};
pub use error::{Error, Result};
pub use extractor::{DartDeclarationScanner, Declaration, DeclarationExtractor, DeclarationKind};
pub use functions::{FunctionChange, FunctionRename, RenameOrigin, SharedDeclarationSnapshot};
pub use manifest::ManifestIndex;
pub use persistence::SnapshotStore;
pub use session::{
    EditEvent, EditKind, Session, SessionEvent, SessionHandle, SessionState, run_event_loop,
};
pub use sync::{FileWarning, PullSource, PushReport, PushResponse, SyncPayload, SyncTransport};
pub use tracker::ChangeTracker;

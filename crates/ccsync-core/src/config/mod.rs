//! Session configuration
//!
//! - [`ProjectLayout`]: where tracked artifacts and state files live, and the
//!   path classifier built on it
//! - [`SessionConfig`]: optional overrides loaded from the state directory
//! - [`ProjectMetadata`]: remote project identity

mod layout;
mod metadata;
mod settings;

pub use layout::ProjectLayout;
pub use metadata::{ProjectMetadata, VersionStamp};
pub use settings::{SessionConfig, SnapshotSettings};

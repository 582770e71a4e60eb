//! Sync payloads and the remote collaborators that consume them

mod bundle;
mod payload;
mod transport;

pub use bundle::{pack, unpack};
pub use payload::SyncPayload;
pub use transport::{FileWarning, PullSource, PushReport, PushResponse, SyncTransport};

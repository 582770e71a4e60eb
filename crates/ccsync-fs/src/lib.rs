//! Filesystem primitives for custom code sync
//!
//! Provides content checksums, atomic locked writes, bounded retrying reads,
//! normalized project-relative paths and format-agnostic config loading.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;

pub use config::ConfigStore;
pub use constants::StateFile;
pub use error::{Error, Result};
pub use io::{Retry, RetryPolicy, RobustnessConfig};
pub use path::NormalizedPath;

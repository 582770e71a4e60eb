//! Shared test utilities for the custom-code-sync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fixtures`]: realistic custom code files and their project paths
//! - [`project`]: [`TestProject`](project::TestProject) builder over a temp dir

pub mod fixtures;
pub mod project;

pub use project::TestProject;

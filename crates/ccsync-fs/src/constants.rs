//! Names of the files a session keeps in its state directory.

use std::path::Path;

/// Default state directory, relative to the project root.
pub const DEFAULT_STATE_DIR: &str = ".vscode";

/// Files persisted by a session. All but the function changes live in the
/// state directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFile {
    /// Tracked artifact records keyed by filename
    FileMap,
    /// Rename/add/delete classification of shared declarations, kept beside
    /// the shared functions file
    FunctionChanges,
    /// Shared declaration file content at the last sync
    FunctionsBaseline,
    /// Remote project identity (project id, branch)
    Metadata,
    /// Optional session configuration overrides
    SessionConfig,
}

impl StateFile {
    /// Get the file name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileMap => "file_map.json",
            Self::FunctionChanges => "function_changes.json",
            Self::FunctionsBaseline => "custom_functions_baseline.dart",
            Self::Metadata => "ff_metadata.json",
            Self::SessionConfig => "ccsync.toml",
        }
    }
}

impl AsRef<Path> for StateFile {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for StateFile {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for StateFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Project layout and artifact classification

use ccsync_fs::NormalizedPath;
use ccsync_fs::constants::DEFAULT_STATE_DIR;
use serde::{Deserialize, Serialize};

use crate::artifact::CodeType;

/// Name of the generated manifest inside each discrete artifact directory.
pub const MANIFEST_FILE_NAME: &str = "index.dart";

const SOURCE_EXTENSION: &str = "dart";

/// Locations of tracked artifacts, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLayout {
    /// Directory holding one action per file
    pub actions_dir: String,
    /// Directory holding one widget per file
    pub widgets_dir: String,
    /// The shared file holding every custom function
    pub functions_file: String,
    /// The dependency manifest sent along with every sync
    pub dependencies_file: String,
    /// Where snapshot and metadata files are kept
    pub state_dir: String,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            actions_dir: "lib/custom_code/actions".to_string(),
            widgets_dir: "lib/custom_code/widgets".to_string(),
            functions_file: "lib/flutter_flow/custom_functions.dart".to_string(),
            dependencies_file: "pubspec.yaml".to_string(),
            state_dir: DEFAULT_STATE_DIR.to_string(),
        }
    }
}

impl ProjectLayout {
    /// Classify a project-relative path.
    ///
    /// Only direct children of the action and widget directories are
    /// discrete artifacts; their generated manifests are not.
    pub fn classify(&self, relative: &NormalizedPath) -> CodeType {
        let path = relative.as_str();
        if path == NormalizedPath::new(&self.functions_file).as_str() {
            return CodeType::Function;
        }
        if path == NormalizedPath::new(&self.dependencies_file).as_str() {
            return CodeType::Dependencies;
        }

        let is_source = relative.extension() == Some(SOURCE_EXTENSION)
            && relative.file_name() != Some(MANIFEST_FILE_NAME);
        if !is_source {
            return CodeType::Other;
        }

        let parent = relative.parent();
        let parent = parent.as_ref().map(NormalizedPath::as_str);
        if parent == Some(NormalizedPath::new(&self.actions_dir).as_str()) {
            CodeType::Action
        } else if parent == Some(NormalizedPath::new(&self.widgets_dir).as_str()) {
            CodeType::Widget
        } else {
            CodeType::Other
        }
    }

    /// Project-relative path of the record stored under `key`.
    pub fn relative_path(&self, key: &str, code_type: CodeType) -> Option<NormalizedPath> {
        match code_type {
            CodeType::Action => Some(NormalizedPath::new(&self.actions_dir).join(key)),
            CodeType::Widget => Some(NormalizedPath::new(&self.widgets_dir).join(key)),
            CodeType::Function => Some(NormalizedPath::new(&self.functions_file)),
            CodeType::Dependencies => Some(NormalizedPath::new(&self.dependencies_file)),
            CodeType::Other => None,
        }
    }

    /// Directory whose files make up `code_type`, for categories with a manifest.
    pub fn artifact_dir(&self, code_type: CodeType) -> Option<NormalizedPath> {
        match code_type {
            CodeType::Action => Some(NormalizedPath::new(&self.actions_dir)),
            CodeType::Widget => Some(NormalizedPath::new(&self.widgets_dir)),
            _ => None,
        }
    }

    /// Project-relative path of the generated manifest for `code_type`.
    pub fn manifest_path(&self, code_type: CodeType) -> Option<NormalizedPath> {
        self.artifact_dir(code_type)
            .map(|dir| dir.join(MANIFEST_FILE_NAME))
    }
}

//! [`TestProject`] builder for custom code sync scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::fixtures;

/// A temporary project directory with helpers for setup and assertions.
///
/// # Example
///
/// ```rust,no_run
/// use ccsync_test_utils::TestProject;
///
/// let project = TestProject::with_mock_files();
/// project.append("lib/custom_code/actions/my_action.dart", "// edited\n");
/// project.assert_file_contains("lib/custom_code/actions/index.dart", "myAction");
/// ```
pub struct TestProject {
    temp_dir: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// An empty project directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// A project holding one action, one widget, the shared functions file,
    /// both generated indexes and the dependency manifest.
    pub fn with_mock_files() -> Self {
        let project = Self::new();
        project.write(fixtures::ACTION_PATH, fixtures::MY_ACTION);
        project.write(fixtures::WIDGET_PATH, fixtures::MY_WIDGET);
        project.write(fixtures::FUNCTIONS_PATH, fixtures::CUSTOM_FUNCTIONS);
        project.write(fixtures::ACTIONS_INDEX_PATH, fixtures::ACTIONS_INDEX);
        project.write(fixtures::WIDGETS_INDEX_PATH, fixtures::WIDGETS_INDEX);
        project.write(fixtures::PUBSPEC_PATH, fixtures::PUBSPEC);
        project
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of a project-relative path.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn append(&self, relative: &str, content: &str) -> PathBuf {
        let mut existing = self.read(relative);
        existing.push_str(content);
        self.write(relative, &existing)
    }

    pub fn read(&self, relative: &str) -> String {
        let path = self.path(relative);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Could not read {}: {e}", path.display()))
    }

    pub fn remove(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        fs::remove_file(&path).unwrap();
        path
    }

    pub fn rename(&self, from: &str, to: &str) -> (PathBuf, PathBuf) {
        let (from, to) = (self.path(from), self.path(to));
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::rename(&from, &to).unwrap();
        (from, to)
    }

    /// # Panics
    /// Panics if `relative` does not exist.
    pub fn assert_file_exists(&self, relative: &str) {
        let path = self.path(relative);
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }

    /// # Panics
    /// Panics if `relative` exists.
    pub fn assert_file_not_exists(&self, relative: &str) {
        let path = self.path(relative);
        assert!(!path.exists(), "Expected file NOT to exist: {}", path.display());
    }

    /// # Panics
    /// Panics if the file cannot be read or lacks `content`.
    pub fn assert_file_contains(&self, relative: &str, content: &str) {
        let file_content = self.read(relative);
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            relative,
            content,
            file_content
        );
    }
}

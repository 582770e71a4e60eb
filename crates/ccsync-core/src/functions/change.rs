//! Rename/add/delete classification of shared declarations

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::similarity::{RENAME_SIMILARITY_THRESHOLD, similarity};
use crate::extractor::Declaration;

/// How a rename was detected.
///
/// Persisted as the `renamed_by_symbol` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenameOrigin {
    /// Guessed from body similarity; recomputed on every diff
    #[default]
    Inferred,
    /// Reported by the editor's rename-symbol command; kept across diffs
    Explicit,
}

/// One declaration renamed since the last sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRename {
    #[serde(rename = "old_function_name")]
    pub old_name: String,
    #[serde(rename = "new_function_name")]
    pub new_name: String,
    #[serde(rename = "renamed_by_symbol", default, with = "origin_flag")]
    pub origin: RenameOrigin,
}

impl FunctionRename {
    pub fn inferred(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: new_name.into(),
            origin: RenameOrigin::Inferred,
        }
    }

    pub fn explicit(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: new_name.into(),
            origin: RenameOrigin::Explicit,
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.origin == RenameOrigin::Explicit
    }
}

mod origin_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::RenameOrigin;

    pub fn serialize<S: Serializer>(origin: &RenameOrigin, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(*origin == RenameOrigin::Explicit)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RenameOrigin, D::Error> {
        Ok(if bool::deserialize(deserializer)? {
            RenameOrigin::Explicit
        } else {
            RenameOrigin::Inferred
        })
    }
}

/// Declarations renamed, deleted and added in the shared file since the
/// last sync. A name appears in at most one of `deleted`, `added` and the
/// rename targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionChange {
    #[serde(rename = "functions_to_rename", default)]
    pub renamed: Vec<FunctionRename>,
    #[serde(rename = "functions_to_delete", default)]
    pub deleted: Vec<String>,
    #[serde(rename = "functions_to_add", default)]
    pub added: Vec<String>,
}

impl FunctionChange {
    pub fn is_empty(&self) -> bool {
        self.renamed.is_empty() && self.deleted.is_empty() && self.added.is_empty()
    }

    /// Classify the differences between two declaration lists.
    ///
    /// Names present on both sides are never reported. A name that vanished
    /// is paired with the most similar newly appeared declaration, if any
    /// scores at least [`RENAME_SIMILARITY_THRESHOLD`]; each new name can be
    /// claimed once.
    pub fn between(before: &[Declaration], current: &[Declaration]) -> Self {
        let before = unique_by_name(before);
        let current = unique_by_name(current);

        let before_names: HashSet<&str> = before.iter().map(|d| d.name.as_str()).collect();
        let current_names: HashSet<&str> = current.iter().map(|d| d.name.as_str()).collect();

        let appeared: Vec<&Declaration> = current
            .iter()
            .copied()
            .filter(|d| !before_names.contains(d.name.as_str()))
            .collect();

        let mut change = Self::default();
        let mut claimed: HashSet<&str> = HashSet::new();

        for vanished in before
            .iter()
            .filter(|d| !current_names.contains(d.name.as_str()))
        {
            let mut best: Option<(&Declaration, f64)> = None;
            for candidate in appeared
                .iter()
                .filter(|d| !claimed.contains(d.name.as_str()))
            {
                let score = similarity(&vanished.body, &candidate.body);
                if score >= RENAME_SIMILARITY_THRESHOLD
                    && best.is_none_or(|(_, best_score)| score > best_score)
                {
                    best = Some((candidate, score));
                }
            }

            match best {
                Some((target, _)) => {
                    claimed.insert(target.name.as_str());
                    change
                        .renamed
                        .push(FunctionRename::inferred(&vanished.name, &target.name));
                }
                None => change.deleted.push(vanished.name.clone()),
            }
        }

        change.added = appeared
            .iter()
            .filter(|d| !claimed.contains(d.name.as_str()))
            .map(|d| d.name.clone())
            .collect();

        change
    }

    /// Combine a fresh diff with the explicit renames of the previous result.
    ///
    /// An explicit rename survives unless its target now shows up as added
    /// or deleted, its source is deleted, or neither name is declared in
    /// `current` any more. Fresh inferred renames touching a surviving
    /// explicit rename are dropped in its favour.
    pub fn merged_with_previous(
        mut self,
        previous: &FunctionChange,
        current: &[Declaration],
    ) -> Self {
        let declared: HashSet<&str> = current.iter().map(|d| d.name.as_str()).collect();
        let sticky: Vec<FunctionRename> = previous
            .renamed
            .iter()
            .filter(|rename| rename.is_explicit())
            .filter(|rename| {
                !self.deleted.contains(&rename.new_name)
                    && !self.added.contains(&rename.new_name)
                    && !self.deleted.contains(&rename.old_name)
            })
            .filter(|rename| {
                declared.contains(rename.old_name.as_str())
                    || declared.contains(rename.new_name.as_str())
            })
            .cloned()
            .collect();

        self.renamed.retain(|fresh| {
            !sticky.iter().any(|kept| {
                kept.old_name == fresh.old_name || kept.new_name == fresh.new_name
            })
        });
        self.renamed.extend(sticky);
        self
    }

    /// Record a rename reported by the editor.
    ///
    /// A rename whose target is `old_name` is retargeted, so `a -> b` followed
    /// by `b -> c` reads `a -> c`. An inferred rename of `old_name` is taken
    /// over rather than duplicated.
    pub fn record_explicit_rename(&mut self, old_name: &str, new_name: &str) {
        let existing = self
            .renamed
            .iter()
            .position(|r| r.new_name == old_name)
            .or_else(|| self.renamed.iter().position(|r| r.old_name == old_name));
        match existing {
            Some(index) => {
                let existing = &mut self.renamed[index];
                existing.new_name = new_name.to_string();
                existing.origin = RenameOrigin::Explicit;
            }
            None => self.renamed.push(FunctionRename::explicit(old_name, new_name)),
        }
    }
}

fn unique_by_name(declarations: &[Declaration]) -> Vec<&Declaration> {
    let mut seen = HashSet::new();
    declarations
        .iter()
        .filter(|d| seen.insert(d.name.as_str()))
        .collect()
}

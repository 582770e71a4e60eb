//! Shared declaration diffing through the tracker and as a pure function.

use std::collections::HashSet;
use std::sync::Arc;

use ccsync_core::{
    ChangeTracker, DartDeclarationScanner, Declaration, DeclarationKind, FunctionChange,
    FunctionRename, ProjectLayout,
};
use ccsync_test_utils::TestProject;
use ccsync_test_utils::fixtures::{FUNCTIONS_PATH, functions_file};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn synced_functions(project: &TestProject, functions: &[(&str, &str)]) -> ChangeTracker {
    project.write(FUNCTIONS_PATH, &functions_file(functions));
    ChangeTracker::rebuild(
        project.root(),
        ProjectLayout::default(),
        Arc::new(DartDeclarationScanner),
    )
}

#[test]
fn similar_function_under_new_name_is_renamed() {
    let project = TestProject::new();
    let mut tracker = synced_functions(&project, &[("testFunctionA", "print('testFunctionA');")]);

    let path = project.write(
        FUNCTIONS_PATH,
        &functions_file(&[
            ("testFunctionANew", "print('testFunctionANew');"),
            ("testFunctionB", "return;"),
        ]),
    );
    tracker.update_artifact(&path).unwrap();

    assert_eq!(
        tracker.function_changes(),
        &FunctionChange {
            renamed: vec![FunctionRename::inferred("testFunctionA", "testFunctionANew")],
            deleted: vec![],
            added: vec!["testFunctionB".to_string()],
        }
    );
}

#[test]
fn vanished_function_without_replacement_is_deleted() {
    let project = TestProject::new();
    let mut tracker = synced_functions(
        &project,
        &[
            ("testFunctionA", "print('testFunctionA');"),
            ("testFunctionB", "return;"),
        ],
    );

    let path = project.write(
        FUNCTIONS_PATH,
        &functions_file(&[("testFunctionA", "print('testFunctionA');")]),
    );
    tracker.update_artifact(&path).unwrap();

    assert_eq!(tracker.function_changes().deleted, vec!["testFunctionB"]);
    assert!(tracker.function_changes().renamed.is_empty());
    assert!(tracker.function_changes().added.is_empty());
}

#[test]
fn explicit_rename_outlives_later_edits() {
    let project = TestProject::new();
    let mut tracker = synced_functions(&project, &[("alpha", "print('alpha body');")]);

    let path = project.write(
        FUNCTIONS_PATH,
        &functions_file(&[("beta", "print('alpha body');")]),
    );
    tracker.record_explicit_rename("alpha", "beta");
    tracker.update_artifact(&path).unwrap();
    let path = project.write(
        FUNCTIONS_PATH,
        &functions_file(&[("beta", "print('alpha body!');")]),
    );
    tracker.update_artifact(&path).unwrap();

    assert_eq!(
        tracker.function_changes().renamed,
        vec![FunctionRename::explicit("alpha", "beta")]
    );
}

#[test]
fn explicit_rename_is_dropped_once_its_target_is_removed() {
    let project = TestProject::new();
    let mut tracker = synced_functions(&project, &[("a", "print('shared body');")]);

    let path = project.write(
        FUNCTIONS_PATH,
        &functions_file(&[("b", "print('shared body');")]),
    );
    tracker.update_artifact(&path).unwrap();
    tracker.record_explicit_rename("a", "b");
    assert_eq!(
        tracker.function_changes().renamed,
        vec![FunctionRename::explicit("a", "b")]
    );

    let path = project.write(
        FUNCTIONS_PATH,
        &functions_file(&[("c", "return 42 * 42 + 7;")]),
    );
    tracker.update_artifact(&path).unwrap();

    assert_eq!(
        tracker.function_changes(),
        &FunctionChange {
            renamed: vec![],
            deleted: vec!["a".to_string()],
            added: vec!["c".to_string()],
        }
    );
}

#[test]
fn deleting_the_shared_file_deletes_every_function() {
    let project = TestProject::new();
    let mut tracker = synced_functions(&project, &[("a", "return;"), ("b", "print(1);")]);

    let path = project.remove(FUNCTIONS_PATH);
    tracker.delete_artifact(&path).unwrap();

    assert_eq!(tracker.function_changes().deleted, vec!["a", "b"]);
    assert_eq!(tracker.functions().current(), "");
}

#[test]
fn commit_clears_function_changes() {
    let project = TestProject::new();
    let mut tracker = synced_functions(&project, &[("a", "return;")]);
    let path = project.write(
        FUNCTIONS_PATH,
        &functions_file(&[("a", "return;"), ("b", "print(1);")]),
    );
    tracker.update_artifact(&path).unwrap();
    assert_eq!(tracker.function_changes().added, vec!["b"]);

    tracker.commit_sync();

    assert!(tracker.function_changes().is_empty());
}

fn declarations(entries: &[(String, String)]) -> Vec<Declaration> {
    entries
        .iter()
        .map(|(name, body)| Declaration {
            name: name.clone(),
            kind: DeclarationKind::Function,
            body: body.clone(),
            start: 0,
            end: 0,
        })
        .collect()
}

fn declaration_list() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-f]{1,3}", "[a-z ();]{0,20}"), 0..8)
}

proptest! {
    #[test]
    fn diff_of_identical_lists_is_empty(entries in declaration_list()) {
        let list = declarations(&entries);
        prop_assert!(FunctionChange::between(&list, &list).is_empty());
    }

    #[test]
    fn diff_categories_are_disjoint(before in declaration_list(), current in declaration_list()) {
        let change = FunctionChange::between(&declarations(&before), &declarations(&current));

        let deleted: HashSet<&str> = change.deleted.iter().map(String::as_str).collect();
        let added: HashSet<&str> = change.added.iter().map(String::as_str).collect();
        let targets: HashSet<&str> = change.renamed.iter().map(|r| r.new_name.as_str()).collect();

        prop_assert!(deleted.is_disjoint(&added));
        prop_assert!(deleted.is_disjoint(&targets));
        prop_assert!(added.is_disjoint(&targets));
        prop_assert_eq!(targets.len(), change.renamed.len());
    }

    #[test]
    fn merged_categories_stay_disjoint(
        before in declaration_list(),
        current in declaration_list(),
        explicit in prop::collection::vec(("[a-f]{1,3}", "[a-f]{1,3}"), 0..4),
    ) {
        let mut previous = FunctionChange::default();
        for (old_name, new_name) in &explicit {
            previous.record_explicit_rename(old_name, new_name);
        }
        let current = declarations(&current);
        let change = FunctionChange::between(&declarations(&before), &current)
            .merged_with_previous(&previous, &current);

        let deleted: HashSet<&str> = change.deleted.iter().map(String::as_str).collect();
        let added: HashSet<&str> = change.added.iter().map(String::as_str).collect();
        let targets: HashSet<&str> = change.renamed.iter().map(|r| r.new_name.as_str()).collect();
        let sources: HashSet<&str> = change.renamed.iter().map(|r| r.old_name.as_str()).collect();

        prop_assert!(deleted.is_disjoint(&added));
        prop_assert!(deleted.is_disjoint(&targets));
        prop_assert!(added.is_disjoint(&targets));
        prop_assert!(deleted.is_disjoint(&sources));
    }

    #[test]
    fn every_vanished_name_is_accounted_for(before in declaration_list(), current in declaration_list()) {
        let change = FunctionChange::between(&declarations(&before), &declarations(&current));
        let current_names: HashSet<&str> = current.iter().map(|(n, _)| n.as_str()).collect();

        for (name, _) in before.iter().filter(|(n, _)| !current_names.contains(n.as_str())) {
            let reported = change.deleted.contains(name)
                || change.renamed.iter().any(|r| &r.old_name == name);
            prop_assert!(reported, "{} vanished but was not reported", name);
        }
    }
}

//! End-to-end editing sessions: initialization, event gating, persistence
//! before notification and the event loop.

use std::sync::Arc;

use ccsync_core::{
    CodeType, DartDeclarationScanner, EditEvent, Error, FunctionRename, Session, SessionConfig,
    SessionEvent, SessionHandle, SessionState, run_event_loop,
};
use ccsync_test_utils::TestProject;
use ccsync_test_utils::fixtures::{self, ACTION_PATH, WIDGET_PATH};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

fn session(project: &TestProject) -> Session {
    Session::new(
        project.root(),
        SessionConfig::default(),
        Arc::new(DartDeclarationScanner),
    )
}

fn initialized(project: &TestProject) -> Session {
    let mut session = session(project);
    session.initialize().unwrap();
    session
}

#[test]
fn initialize_moves_to_editing_and_persists() {
    let project = TestProject::with_mock_files();
    let mut session = session(&project);
    assert_eq!(session.state(), SessionState::Uninitialized);

    session.initialize().unwrap();

    assert_eq!(session.state(), SessionState::Editing);
    assert_eq!(session.records().len(), 4);
    assert!(session.modified_files().is_empty());
    project.assert_file_contains(".vscode/file_map.json", "my_widget.dart");
}

#[test]
fn events_before_initialize_are_dropped() {
    let project = TestProject::with_mock_files();
    let mut session = session(&project);

    let result = session
        .handle_event(&EditEvent::added(project.path(ACTION_PATH)))
        .unwrap();

    assert_eq!(result, None);
    assert!(session.records().is_empty());
    project.assert_file_not_exists(".vscode/file_map.json");
}

#[test]
fn initialize_failure_moves_to_error() {
    let project = TestProject::with_mock_files();
    std::fs::create_dir_all(project.path(".vscode/file_map.json")).unwrap();
    let mut config = SessionConfig::default();
    config.snapshot.retry_base_delay_ms = 1;
    let mut session = Session::new(project.root(), config, Arc::new(DartDeclarationScanner));

    let result = session.initialize();

    assert!(matches!(result, Err(Error::SnapshotUnavailable { .. })));
    assert_eq!(session.state(), SessionState::Error);
    let dropped = session
        .handle_event(&EditEvent::updated(project.path(ACTION_PATH)))
        .unwrap();
    assert_eq!(dropped, None);
}

#[test]
fn failed_initial_save_is_reported_but_editing_continues() {
    let project = TestProject::with_mock_files();
    std::fs::create_dir_all(project.path(".vscode/custom_functions_baseline.dart")).unwrap();
    let mut session = session(&project);
    let mut events = session.subscribe();

    let result = session.initialize();

    assert!(matches!(result, Err(Error::Fs(_))));
    assert_eq!(session.state(), SessionState::Editing);
    assert_eq!(session.records().len(), 4);
    assert!(events.try_recv().is_err());

    std::fs::remove_dir(project.path(".vscode/custom_functions_baseline.dart")).unwrap();
    let path = project.append(ACTION_PATH, "// edit\n");
    let record = session.handle_event(&EditEvent::updated(&path)).unwrap();
    assert!(record.is_some_and(|record| record.is_modified()));
    project.assert_file_exists(".vscode/custom_functions_baseline.dart");
}

#[tokio::test]
async fn notification_follows_persistence() {
    let project = TestProject::with_mock_files();
    let mut session = initialized(&project);
    let mut events = session.subscribe();

    let path = project.write(
        "lib/custom_code/actions/foo.dart",
        &fixtures::action_file("fooAction"),
    );
    session.handle_event(&EditEvent::added(&path)).unwrap();

    match events.recv().await.unwrap() {
        SessionEvent::ArtifactChanged { filename, record } => {
            assert_eq!(filename, "foo.dart");
            assert_eq!(record.identifier_current, "fooAction");
            assert!(record.is_new());
        }
        other => panic!("unexpected event {other:?}"),
    }
    project.assert_file_contains(".vscode/file_map.json", "\"fooAction\"");
    project.assert_file_contains(
        "lib/custom_code/actions/index.dart",
        "export 'foo.dart' show fooAction;",
    );
}

#[test]
fn delete_event_for_existing_file_is_an_update() {
    let project = TestProject::with_mock_files();
    let mut session = initialized(&project);
    project.append(ACTION_PATH, "// still here\n");

    let record = session
        .handle_event(&EditEvent::deleted(project.path(ACTION_PATH)))
        .unwrap()
        .unwrap();

    assert!(!record.is_deleted);
    assert!(record.is_modified());
}

#[test]
fn relative_event_paths_resolve_against_the_root() {
    let project = TestProject::with_mock_files();
    let mut session = initialized(&project);
    project.remove(WIDGET_PATH);

    let record = session
        .handle_event(&EditEvent::deleted(WIDGET_PATH))
        .unwrap()
        .unwrap();

    assert!(record.is_deleted);
    assert_eq!(
        session.deleted_files(),
        vec![ccsync_fs::NormalizedPath::new(WIDGET_PATH)]
    );
    assert!(
        session
            .manifest(CodeType::Widget)
            .unwrap()
            .entries()
            .is_empty()
    );
}

#[test]
fn file_rename_is_persisted_under_the_new_name() {
    let project = TestProject::with_mock_files();
    let mut session = initialized(&project);

    let (from, to) = project.rename(ACTION_PATH, "lib/custom_code/actions/renamed.dart");
    let record = session.rename(&from, &to).unwrap().unwrap();

    assert_eq!(record.identifier_current, "myAction");
    project.assert_file_contains(".vscode/file_map.json", "renamed.dart");
    project.assert_file_contains(
        "lib/custom_code/actions/index.dart",
        "export 'renamed.dart' show myAction;",
    );
}

#[test]
fn explicit_function_rename_is_persisted() {
    let project = TestProject::with_mock_files();
    let mut session = initialized(&project);

    session.record_explicit_rename("func335", "func999").unwrap();
    session.record_explicit_rename("func999", "func1000").unwrap();

    assert_eq!(
        session.function_changes().renamed,
        vec![FunctionRename::explicit("func335", "func1000")]
    );
    project.assert_file_contains(
        "lib/flutter_flow/function_changes.json",
        "\"renamed_by_symbol\": true",
    );

    let mut restarted = session_after_restart(&project);
    restarted.initialize().unwrap();
    assert_eq!(restarted.function_changes(), session.function_changes());
}

fn session_after_restart(project: &TestProject) -> Session {
    Session::open(project.root(), Arc::new(DartDeclarationScanner)).unwrap()
}

#[test]
fn metadata_updates_are_written_back() {
    let project = TestProject::with_mock_files();
    let mut session = initialized(&project);

    session
        .update_metadata(|metadata| {
            metadata.project_id = "proj-7".into();
            metadata.record_toolchain_version("3.24.2");
        })
        .unwrap();

    project.assert_file_contains(".vscode/ff_metadata.json", "\"project_id\": \"proj-7\"");
    project.assert_file_contains(".vscode/ff_metadata.json", "\"flutterFlowFlutterVersion\"");
    let mut restarted = session_after_restart(&project);
    restarted.initialize().unwrap();
    assert_eq!(restarted.metadata().project_id, "proj-7");
}

#[tokio::test]
async fn event_loop_applies_events_in_order() {
    let project = TestProject::with_mock_files();
    let handle = SessionHandle::new(initialized(&project));
    let mut notifications = handle.subscribe();
    let (sender, receiver) = mpsc::channel(16);
    let worker = tokio::spawn(run_event_loop(handle.clone(), receiver));

    let path = project.write(
        "lib/custom_code/actions/later.dart",
        &fixtures::action_file("laterAction"),
    );
    sender.send(EditEvent::added(&path)).await.unwrap();
    notifications.recv().await.unwrap();

    let path = project.write(
        "lib/custom_code/actions/later.dart",
        &fixtures::action_file("laterActionRenamed"),
    );
    sender.send(EditEvent::updated(&path)).await.unwrap();
    notifications.recv().await.unwrap();

    project.remove(ACTION_PATH);
    sender
        .send(EditEvent::deleted(project.path(ACTION_PATH)))
        .await
        .unwrap();
    notifications.recv().await.unwrap();

    drop(sender);
    worker.await.unwrap();

    let records = handle.lock().await.records();
    let later = &records["later.dart"];
    assert_eq!(later.identifier_before, "laterAction");
    assert_eq!(later.identifier_current, "laterActionRenamed");
    assert!(records["my_action.dart"].is_deleted);
}

//! Push and pull through a session with fake remote collaborators.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ccsync_core::{
    DartDeclarationScanner, EditEvent, Error, FileWarning, PullSource, PushResponse, Result,
    Session, SessionConfig, SessionEvent, SessionHandle, SessionState, SyncPayload, SyncTransport,
};
use ccsync_test_utils::TestProject;
use ccsync_test_utils::fixtures::{self, ACTION_PATH, FUNCTIONS_PATH, functions_file};
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

/// Answers every push with the same response and keeps the payloads.
struct RecordingTransport {
    response: PushResponse,
    payloads: Mutex<Vec<SyncPayload>>,
}

impl RecordingTransport {
    fn new(response: PushResponse) -> Self {
        Self {
            response,
            payloads: Mutex::new(Vec::new()),
        }
    }

    fn last_payload(&self) -> SyncPayload {
        self.payloads.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl SyncTransport for RecordingTransport {
    async fn push(&self, payload: &SyncPayload) -> Result<PushResponse> {
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(self.response.clone())
    }
}

struct UnreachableTransport;

#[async_trait]
impl SyncTransport for UnreachableTransport {
    async fn push(&self, _payload: &SyncPayload) -> Result<PushResponse> {
        Err(Error::Transport {
            message: "connection refused".to_string(),
        })
    }
}

/// Blocks inside `push` until released.
#[derive(Default)]
struct GatedTransport {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl SyncTransport for GatedTransport {
    async fn push(&self, _payload: &SyncPayload) -> Result<PushResponse> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(PushResponse::ok())
    }
}

/// Writes a fixed set of files, optionally waiting for release first.
#[derive(Default)]
struct FakeRemote {
    files: Vec<(String, String)>,
    entered: Notify,
    release: Option<Notify>,
}

#[async_trait]
impl PullSource for FakeRemote {
    async fn pull_into(&self, root: &Path) -> Result<()> {
        self.entered.notify_one();
        if let Some(release) = &self.release {
            release.notified().await;
        }
        for (relative, content) in &self.files {
            let path = root.join(relative);
            std::fs::create_dir_all(path.parent().unwrap())?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }
}

struct FailingRemote;

#[async_trait]
impl PullSource for FailingRemote {
    async fn pull_into(&self, _root: &Path) -> Result<()> {
        Err(Error::Transport {
            message: "export failed".to_string(),
        })
    }
}

fn project_with_metadata() -> TestProject {
    let project = TestProject::with_mock_files();
    project.write(
        ".vscode/ff_metadata.json",
        r#"{ "project_id": "proj-42", "branch_name": "main" }"#,
    );
    project
}

fn initialized(project: &TestProject) -> Session {
    let mut session = Session::new(
        project.root(),
        SessionConfig::default(),
        Arc::new(DartDeclarationScanner),
    );
    session.initialize().unwrap();
    session
}

fn critical(message: &str) -> BTreeMap<String, Vec<FileWarning>> {
    BTreeMap::from([(
        ACTION_PATH.to_string(),
        vec![FileWarning {
            file_type: None,
            error_message: message.to_string(),
            is_critical: true,
        }],
    )])
}

#[tokio::test]
async fn accepted_push_advances_the_baseline() {
    let project = project_with_metadata();
    let mut session = initialized(&project);
    let path = project.append(ACTION_PATH, "// edit\n");
    session.handle_event(&EditEvent::updated(&path)).unwrap();
    let path = project.write(
        FUNCTIONS_PATH,
        &format!("{}\nint added() {{\n  return 1;\n}}\n", fixtures::CUSTOM_FUNCTIONS),
    );
    session.handle_event(&EditEvent::updated(&path)).unwrap();
    let mut events = session.subscribe();
    let transport = RecordingTransport::new(PushResponse::ok());

    let report = session.push(&transport).await.unwrap();

    assert!(report.is_success());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Synced);
    assert_eq!(session.state(), SessionState::Editing);
    assert!(session.modified_files().is_empty());
    assert!(session.function_changes().is_empty());

    let payload = transport.last_payload();
    assert_eq!(payload.project_id, "proj-42");
    assert_eq!(payload.branch_name, "");
    assert_eq!(payload.request_id, report.request_id);
    let functions_map: serde_json::Value = serde_json::from_str(&payload.functions_map).unwrap();
    assert_eq!(functions_map["functions_to_add"], serde_json::json!(["added"]));
    assert!(
        payload
            .bundled_files()
            .unwrap()
            .contains_key("lib/custom_code/actions/my_action.dart")
    );

    project.assert_file_contains(".vscode/custom_functions_baseline.dart", "int added()");
}

#[tokio::test]
async fn critical_warning_keeps_the_baseline() {
    let project = project_with_metadata();
    let mut session = initialized(&project);
    let path = project.append(ACTION_PATH, "// edit\n");
    session.handle_event(&EditEvent::updated(&path)).unwrap();
    let transport = RecordingTransport::new(PushResponse {
        status: 200,
        error: None,
        file_warnings: critical("Undefined name 'foo'"),
    });

    let report = session.push(&transport).await.unwrap();

    assert!(!report.is_success());
    assert!(report.has_critical_warning());
    assert_eq!(session.state(), SessionState::Editing);
    assert_eq!(session.modified_files().len(), 1);
    assert_eq!(session.last_warnings(), critical("Undefined name 'foo'"));
}

#[tokio::test]
async fn rejected_and_unreachable_pushes_are_reported() {
    let project = project_with_metadata();
    let mut session = initialized(&project);
    let path = project.append(ACTION_PATH, "// edit\n");
    session.handle_event(&EditEvent::updated(&path)).unwrap();

    let rejected = RecordingTransport::new(PushResponse {
        status: 500,
        error: Some("internal error".into()),
        file_warnings: BTreeMap::new(),
    });
    let report = session.push(&rejected).await.unwrap();
    assert_eq!(report.status, Some(500));
    assert!(!report.is_success());

    let report = session.push(&UnreachableTransport).await.unwrap();
    assert_eq!(report.status, None);
    assert!(report.error.unwrap().contains("connection refused"));

    assert_eq!(session.state(), SessionState::Editing);
    assert_eq!(session.modified_files().len(), 1);
}

#[tokio::test]
async fn second_push_is_rejected_while_one_is_in_flight() {
    let project = project_with_metadata();
    let handle = SessionHandle::new(initialized(&project));
    let transport = Arc::new(GatedTransport::default());

    let first = {
        let handle = handle.clone();
        let transport = transport.clone();
        tokio::spawn(async move { handle.push(transport.as_ref()).await })
    };
    transport.entered.notified().await;

    assert_eq!(handle.state(), SessionState::Pushing);
    let second = handle.push(&UnreachableTransport).await;
    assert!(matches!(second, Err(Error::SyncInFlight)));

    let pull = handle.pull(&FailingRemote).await;
    assert!(matches!(pull, Err(Error::SyncInFlight)));

    let dropped = handle
        .handle_event(&EditEvent::updated(project.path(ACTION_PATH)))
        .await
        .unwrap();
    assert_eq!(dropped, None);

    transport.release.notify_one();
    let report = first.await.unwrap().unwrap();
    assert!(report.is_success());
    assert_eq!(handle.state(), SessionState::Editing);
}

#[tokio::test]
async fn pull_rebuilds_a_clean_baseline_and_drops_events_meanwhile() {
    let project = project_with_metadata();
    let mut session = initialized(&project);
    let path = project.append(ACTION_PATH, "// local edit\n");
    session.handle_event(&EditEvent::updated(&path)).unwrap();
    let handle = SessionHandle::new(session);
    let mut events = handle.subscribe();

    let remote = Arc::new(FakeRemote {
        files: vec![
            (ACTION_PATH.to_string(), fixtures::MY_ACTION.to_string()),
            (
                "lib/custom_code/actions/remote_action.dart".to_string(),
                fixtures::action_file("remoteAction"),
            ),
            (
                FUNCTIONS_PATH.to_string(),
                functions_file(&[("remoteFunction", "return;")]),
            ),
        ],
        release: Some(Notify::new()),
        ..Default::default()
    });
    let pull = {
        let handle = handle.clone();
        let remote = remote.clone();
        tokio::spawn(async move { handle.pull(remote.as_ref()).await })
    };
    remote.entered.notified().await;

    assert_eq!(handle.state(), SessionState::Pulling);
    let dropped = handle
        .handle_event(&EditEvent::updated(project.path(ACTION_PATH)))
        .await
        .unwrap();
    assert_eq!(dropped, None);

    if let Some(release) = &remote.release {
        release.notify_one();
    }
    pull.await.unwrap().unwrap();

    assert_eq!(events.recv().await.unwrap(), SessionEvent::Refreshed);
    let session = handle.lock().await;
    assert_eq!(session.state(), SessionState::Editing);
    assert!(session.modified_files().is_empty());
    assert!(session.records().contains_key("remote_action.dart"));
    assert!(session.function_changes().is_empty());
    assert!(session.shared_current().contains("remoteFunction"));
    project.assert_file_contains(
        "lib/custom_code/actions/index.dart",
        "export 'remote_action.dart' show remoteAction;",
    );
}

#[tokio::test]
async fn failed_pull_keeps_local_state() {
    let project = project_with_metadata();
    let mut session = initialized(&project);
    let path = project.append(ACTION_PATH, "// local edit\n");
    session.handle_event(&EditEvent::updated(&path)).unwrap();

    let result = session.pull(&FailingRemote).await;

    assert!(matches!(result, Err(Error::Transport { .. })));
    assert_eq!(session.state(), SessionState::Editing);
    assert_eq!(session.modified_files().len(), 1);
}

#[tokio::test]
async fn push_and_pull_are_rejected_after_a_failed_initialize() {
    let project = project_with_metadata();
    std::fs::create_dir_all(project.path(".vscode/file_map.json")).unwrap();
    let mut config = SessionConfig::default();
    config.snapshot.retry_base_delay_ms = 1;
    let mut session = Session::new(project.root(), config, Arc::new(DartDeclarationScanner));
    assert!(session.initialize().is_err());
    assert_eq!(session.state(), SessionState::Error);
    let transport = RecordingTransport::new(PushResponse::ok());

    let push = session.push(&transport).await;
    let pull = session.pull(&FakeRemote::default()).await;

    assert!(matches!(push, Err(Error::InvalidState { .. })));
    assert!(matches!(pull, Err(Error::InvalidState { .. })));
    assert!(transport.payloads.lock().unwrap().is_empty());
    assert_eq!(session.state(), SessionState::Error);
}

#[tokio::test]
async fn handle_rejects_push_before_initialize() {
    let project = project_with_metadata();
    let session = Session::new(
        project.root(),
        SessionConfig::default(),
        Arc::new(DartDeclarationScanner),
    );
    let handle = SessionHandle::new(session);
    let transport = RecordingTransport::new(PushResponse::ok());

    let result = handle.push(&transport).await;

    assert!(matches!(result, Err(Error::InvalidState { .. })));
    assert!(transport.payloads.lock().unwrap().is_empty());
    assert_eq!(handle.state(), SessionState::Uninitialized);
}

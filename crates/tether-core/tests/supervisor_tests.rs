//! Integration tests for the process supervisor.
//!
//! Services are small shell scripts written into a temporary project root.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use tether_core::process::Interpreter;
use tether_core::{
    resolve_all, LauncherRegistry, LocalService, ResolveOptions, ResolvedService, ServiceMap,
    ServiceStatus, StartOptions, Supervisor,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

#[derive(Debug)]
enum Event {
    Log(String, String),
    Error(String, String),
    Closed(String, Option<i32>),
}

fn write_script(root: &Path, name: &str, body: &str) {
    let path = root.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn start_options(root: &Path) -> (StartOptions, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (log_tx, error_tx, closed_tx) = (tx.clone(), tx.clone(), tx);

    let opts = StartOptions::new(root)
        .on_log(move |id, text| {
            let _ = log_tx.send(Event::Log(id.to_string(), text.to_string()));
        })
        .on_error(move |id, text| {
            let _ = error_tx.send(Event::Error(id.to_string(), text.to_string()));
        })
        .on_closed(move |id, code| {
            let _ = closed_tx.send(Event::Closed(id.to_string(), code));
        });
    (opts, rx)
}

async fn resolve_one(root: &Path, name: &str, src: &str) -> LocalService {
    let mut specs = ServiceMap::new();
    specs.insert(name.to_string(), src.into());
    let resolved = resolve_all(&specs, &ResolveOptions::new(root)).await;
    match &resolved[name] {
        ResolvedService::Local(local) => local.clone(),
        other => panic!("expected a local service, got {:?}", other),
    }
}

async fn next_closed(rx: &mut mpsc::UnboundedReceiver<Event>) -> (String, Option<i32>) {
    loop {
        match timeout(WAIT, rx.recv()).await.expect("timed out").expect("channel closed") {
            Event::Closed(id, code) => return (id, code),
            _ => continue,
        }
    }
}

async fn next_log(rx: &mut mpsc::UnboundedReceiver<Event>) -> String {
    loop {
        match timeout(WAIT, rx.recv()).await.expect("timed out").expect("channel closed") {
            Event::Log(_, text) => return text,
            _ => continue,
        }
    }
}

#[tokio::test]
async fn test_output_marks_alive_and_close_marks_exited() {
    let temp_dir = TempDir::new().unwrap();
    write_script(temp_dir.path(), "server", "echo ready\nexec sleep 30");

    let service = resolve_one(temp_dir.path(), "server", "./server").await;
    let (opts, mut rx) = start_options(temp_dir.path());
    let supervisor = Supervisor::new();

    let active = supervisor.start(&service, "server", &opts).await.unwrap();
    assert!(active.pid > 0);
    assert!(supervisor.is_active("server"));
    assert_eq!(supervisor.active_ids(), vec!["server".to_string()]);

    assert!(next_log(&mut rx).await.contains("ready"));
    assert_eq!(service.status.get(), ServiceStatus::Alive);

    supervisor.close(Some("server"));
    assert!(!supervisor.is_active("server"));

    let (id, _) = next_closed(&mut rx).await;
    assert_eq!(id, "server");
    assert_eq!(active.status().get(), ServiceStatus::Exited);
}

#[tokio::test]
async fn test_exit_code_is_reported_and_entry_removed() {
    let temp_dir = TempDir::new().unwrap();
    write_script(temp_dir.path(), "crash", "exit 3");

    let service = resolve_one(temp_dir.path(), "crash", "./crash").await;
    let (opts, mut rx) = start_options(temp_dir.path());
    let supervisor = Supervisor::new();

    supervisor.start(&service, "crash", &opts).await.unwrap();
    assert_eq!(next_closed(&mut rx).await, ("crash".to_string(), Some(3)));
    assert!(!supervisor.is_active("crash"));
    assert_eq!(service.status.get(), ServiceStatus::Exited);
}

#[tokio::test]
async fn test_stderr_does_not_mark_alive() {
    let temp_dir = TempDir::new().unwrap();
    write_script(temp_dir.path(), "noisy", "echo oops >&2\nexec sleep 30");

    let service = resolve_one(temp_dir.path(), "noisy", "./noisy").await;
    let (opts, mut rx) = start_options(temp_dir.path());
    let supervisor = Supervisor::new();
    supervisor.start(&service, "noisy", &opts).await.unwrap();

    match timeout(WAIT, rx.recv()).await.unwrap().unwrap() {
        Event::Error(id, text) => {
            assert_eq!(id, "noisy");
            assert!(text.contains("oops"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(service.status.get(), ServiceStatus::Pending);

    supervisor.shutdown(Duration::from_secs(2)).await;
    assert!(supervisor.active_ids().is_empty());
}

#[tokio::test]
async fn test_environment_and_working_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().canonicalize().unwrap();
    fs::write(root.join(".env"), "FROM_FILE=base\nPATH=/nowhere\n").unwrap();
    fs::write(root.join(".env.development"), "FROM_FILE=development\n").unwrap();
    write_script(
        &root,
        "env",
        "echo \"$PORT|$HOST|$FROM_FILE|$(pwd)|$PATH\"",
    );

    let service = resolve_one(&root, "env", "./env").await;
    let (opts, mut rx) = start_options(&root);
    Supervisor::new().start(&service, "env", &opts).await.unwrap();

    let line = next_log(&mut rx).await;
    let fields: Vec<&str> = line.trim_end().split('|').collect();
    assert_eq!(fields[0], service.port.to_string());
    assert_eq!(fields[1], "localhost");
    assert_eq!(fields[2], "development");
    assert_eq!(Path::new(fields[3]), root.as_path());
    // Ambient variables are inherited and win over files
    assert_eq!(fields[4], std::env::var("PATH").unwrap());
}

#[tokio::test]
async fn test_restart_keeps_new_process_tracked() {
    let temp_dir = TempDir::new().unwrap();
    write_script(temp_dir.path(), "server", "echo up\nexec sleep 30");

    let service = resolve_one(temp_dir.path(), "server", "./server").await;
    let (opts, mut rx) = start_options(temp_dir.path());
    let supervisor = Supervisor::new();

    let first = supervisor.start(&service, "server", &opts).await.unwrap();
    let second = supervisor.start(&service, "server", &opts).await.unwrap();
    assert_ne!(first.pid, second.pid);

    // The replaced process exits, but the id stays bound to its successor
    next_closed(&mut rx).await;
    assert!(supervisor.is_active("server"));
    assert_eq!(supervisor.pid("server"), Some(second.pid));

    // The successor owns the shared status cell
    let mut status = service.status.subscribe();
    timeout(WAIT, status.wait_for(|s| *s == ServiceStatus::Alive))
        .await
        .expect("successor should report output")
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(service.status.get(), ServiceStatus::Alive);

    supervisor.shutdown(Duration::from_secs(2)).await;
    assert!(!supervisor.is_active("server"));
}

#[tokio::test]
async fn test_output_after_exit_does_not_revive_status() {
    let temp_dir = TempDir::new().unwrap();
    // The background job keeps stdout open after the script itself exits
    write_script(temp_dir.path(), "detach", "(sleep 2; echo late) &\nexit 0");

    let service = resolve_one(temp_dir.path(), "detach", "./detach").await;
    let (opts, mut rx) = start_options(temp_dir.path());
    let supervisor = Supervisor::new();
    supervisor.start(&service, "detach", &opts).await.unwrap();

    assert_eq!(next_closed(&mut rx).await, ("detach".to_string(), Some(0)));
    assert_eq!(service.status.get(), ServiceStatus::Exited);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(service.status.get(), ServiceStatus::Exited);
    assert!(!supervisor.is_active("detach"));
}

#[tokio::test]
async fn test_shutdown_escalates_to_kill() {
    let temp_dir = TempDir::new().unwrap();
    write_script(temp_dir.path(), "stubborn", "trap '' TERM\necho ready\nexec sleep 30");

    let service = resolve_one(temp_dir.path(), "stubborn", "./stubborn").await;
    let (opts, mut rx) = start_options(temp_dir.path());
    let supervisor = Supervisor::new();
    supervisor.start(&service, "stubborn", &opts).await.unwrap();
    next_log(&mut rx).await;

    timeout(WAIT, supervisor.shutdown(Duration::from_millis(200)))
        .await
        .expect("shutdown should finish");

    let (id, code) = next_closed(&mut rx).await;
    assert_eq!(id, "stubborn");
    assert_eq!(code, None);
    assert!(supervisor.active_ids().is_empty());
}

#[tokio::test]
async fn test_missing_and_unknown_files_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("main.rb"), "puts 1").unwrap();
    let supervisor = Supervisor::new();
    let (opts, _rx) = start_options(temp_dir.path());

    let missing = resolve_one(temp_dir.path(), "missing", "./missing").await;
    assert!(supervisor.start(&missing, "missing", &opts).await.is_none());

    let unknown = resolve_one(temp_dir.path(), "ruby", "./main.rb").await;
    assert!(supervisor.start(&unknown, "ruby", &opts).await.is_none());
    assert!(supervisor.active_ids().is_empty());
}

#[tokio::test]
async fn test_registered_launcher() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("main.sh"), "echo from-sh\n").unwrap();

    let mut launchers = LauncherRegistry::default();
    launchers.register("sh", Interpreter::new("sh"));
    let supervisor = Supervisor::with_launchers(launchers);

    let service = resolve_one(temp_dir.path(), "script", "./main.sh").await;
    let (opts, mut rx) = start_options(temp_dir.path());
    supervisor.start(&service, "script", &opts).await.unwrap();

    assert!(next_log(&mut rx).await.contains("from-sh"));
    assert_eq!(next_closed(&mut rx).await, ("script".to_string(), Some(0)));
}

#[tokio::test]
async fn test_create_all_and_close_all() {
    let temp_dir = TempDir::new().unwrap();
    write_script(temp_dir.path(), "one", "echo one\nexec sleep 30");
    write_script(temp_dir.path(), "two", "echo two\nexec sleep 30");

    let specs: ServiceMap = serde_json::from_str(
        r#"{ "one": "./one", "two": "./two", "remote": "https://api.example.com" }"#,
    )
    .unwrap();
    let resolve = ResolveOptions::new(temp_dir.path());
    let (opts, mut rx) = start_options(temp_dir.path());

    let group = Supervisor::new().create_all(&specs, &resolve, opts).await;
    assert_eq!(group.resolved.len(), 3);
    assert_eq!(group.active.keys().collect::<Vec<_>>(), vec!["one", "two"]);
    assert_eq!(group.sanitized().len(), 3);

    group.close(None);
    assert!(group.supervisor.active_ids().is_empty());

    let mut closed = vec![next_closed(&mut rx).await.0, next_closed(&mut rx).await.0];
    closed.sort();
    assert_eq!(closed, vec!["one", "two"]);
}

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn studysync_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_studysync"));
    cmd.env_remove("STUDYSYNC_DEVICE_URL");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(tmp: &TempDir, args: &[&str]) -> Output {
    studysync_cmd()
        .current_dir(tmp.path())
        .args(args)
        .output()
        .unwrap()
}

fn init_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let output = run(&tmp, &["init"]);
    assert!(output.status.success());
    tmp
}

fn list_json(tmp: &TempDir, extra: &[&str]) -> Vec<serde_json::Value> {
    let mut args = vec!["list", "--json"];
    args.extend_from_slice(extra);
    let output = run(tmp, &args);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    parsed.as_array().unwrap().clone()
}

#[test]
fn test_init_creates_data_directory() {
    let tmp = init_project();
    assert!(tmp.path().join(".studysync").is_dir());
    assert!(tmp.path().join(".studysync/config.json").exists());
    assert!(tmp.path().join(".studysync/smart_study_notes_v1.json").exists());
}

#[test]
fn test_init_twice_fails() {
    let tmp = init_project();
    let output = run(&tmp, &["init"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Already initialized"));
}

#[test]
fn test_add_without_init_fails() {
    let tmp = TempDir::new().unwrap();
    let output = run(&tmp, &["add", "Read ch.4"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not in a studysync project"));
}

#[test]
fn test_add_and_list() {
    let tmp = init_project();

    let output = run(
        &tmp,
        &["add", "Read ch.4", "--subject=Math", "--priority=high"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Note saved locally"));

    let notes = list_json(&tmp, &[]);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["text"], "Read ch.4");
    assert_eq!(notes[0]["subject"], "Math");
    assert_eq!(notes[0]["priority"], "high");
    assert!(notes[0]["dueDate"].is_null());
    assert!(notes[0]["dueTime"].is_null());

    let output = run(&tmp, &["list"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Read ch.4"));
    assert!(stdout.contains("Priority: high"));
    assert!(stdout.contains("Due: not set"));
}

#[test]
fn test_add_blank_text_is_rejected() {
    let tmp = init_project();
    let output = run(&tmp, &["add", "   "]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Please write a note"));
    assert!(list_json(&tmp, &[]).is_empty());
}

#[test]
fn test_list_empty() {
    let tmp = init_project();
    let output = run(&tmp, &["list"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No notes yet"));
}

#[test]
fn test_delete_by_id_prefix() {
    let tmp = init_project();
    run(&tmp, &["add", "keep"]);
    run(&tmp, &["add", "drop"]);

    let notes = list_json(&tmp, &["--canonical"]);
    let id = notes[1]["id"].as_str().unwrap();

    let output = run(&tmp, &["delete", &id[..8]]);
    assert!(output.status.success());

    let remaining = list_json(&tmp, &[]);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["text"], "keep");
}

#[test]
fn test_delete_by_index() {
    let tmp = init_project();
    run(&tmp, &["add", "only"]);

    let output = run(&tmp, &["delete", "--index", "0"]);
    assert!(output.status.success());
    assert!(list_json(&tmp, &[]).is_empty());

    let output = run(&tmp, &["delete", "--index", "0"]);
    assert!(!output.status.success());
}

#[test]
fn test_delete_unknown_id_fails() {
    let tmp = init_project();
    let output = run(&tmp, &["delete", "nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Note not found"));
}

#[test]
fn test_clear_requires_force_when_not_interactive() {
    let tmp = init_project();
    run(&tmp, &["add", "a"]);

    let output = run(&tmp, &["clear"]);
    assert!(!output.status.success());
    assert_eq!(list_json(&tmp, &[]).len(), 1);
}

#[test]
fn test_clear_force() {
    let tmp = init_project();
    for text in ["a", "b", "c"] {
        run(&tmp, &["add", text]);
    }

    let output = run(&tmp, &["clear", "--force"]);
    assert!(output.status.success());
    assert!(list_json(&tmp, &[]).is_empty());

    let raw = fs::read_to_string(tmp.path().join(".studysync/smart_study_notes_v1.json")).unwrap();
    assert_eq!(raw, "[]");
}

#[test]
fn test_export() {
    let tmp = init_project();
    run(&tmp, &["add", "Lab report", "--due-date=2026-11-02"]);

    let output = run(&tmp, &["export"]);
    assert!(output.status.success());

    let raw = fs::read_to_string(tmp.path().join("study-notes.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(doc["notes"][0]["text"], "Lab report");
    assert_eq!(doc["notes"][0]["dueDate"], "2026-11-02");
}

#[test]
fn test_export_to_stdout() {
    let tmp = init_project();
    run(&tmp, &["add", "a"]);

    let output = run(&tmp, &["export", "--output", "-"]);
    assert!(output.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["notes"].as_array().unwrap().len(), 1);
}

#[test]
fn test_corrupt_storage_loads_empty() {
    let tmp = init_project();
    fs::write(
        tmp.path().join(".studysync/smart_study_notes_v1.json"),
        "{ definitely not notes",
    )
    .unwrap();

    assert!(list_json(&tmp, &[]).is_empty());

    let output = run(&tmp, &["status", "--json"]);
    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["notes"], 0);
    assert_eq!(status["storage_ok"], false);
}

#[test]
fn test_sync_wifi_unreachable_device() {
    let tmp = init_project();
    run(&tmp, &["add", "a"]);

    let output = studysync_cmd()
        .current_dir(tmp.path())
        .env("STUDYSYNC_DEVICE_URL", "http://127.0.0.1:9")
        .args(["sync", "wifi"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Wi-Fi: syncing..."));
    assert!(stdout.contains("sync failed"));
    assert_eq!(list_json(&tmp, &[]).len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_wifi_to_device() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/notes"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = init_project();
    run(&tmp, &["add", "a"]);

    let output = studysync_cmd()
        .current_dir(tmp.path())
        .env("STUDYSYNC_DEVICE_URL", server.uri())
        .args(["sync", "wifi"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Notes sent to device"));
}

#[test]
fn test_sync_bluetooth_not_supported() {
    let tmp = init_project();
    let output = run(&tmp, &["sync", "bluetooth"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Bluetooth: connection failed (not supported)"));
    assert!(!stdout.contains("connected to"));
}

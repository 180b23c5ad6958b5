use std::path::{Path, PathBuf};
use std::process::Command;

use lh_session::{SessionRecord, SessionStore, now_ms};
use serde_json::json;
use tempfile::TempDir;

fn lh_binary() -> PathBuf {
	let mut path = std::env::current_exe().expect("current_exe should resolve");
	path.pop();
	path.pop();
	path.push("lh");
	path
}

fn run_lh(sessions_dir: &Path, args: &[&str]) -> (bool, serde_json::Value, String) {
	let output = Command::new(lh_binary())
		.arg("--sessions-dir")
		.arg(sessions_dir)
		.args(args)
		.output()
		.expect("failed to execute lh");

	let stdout = String::from_utf8_lossy(&output.stdout).to_string();
	let stderr = String::from_utf8_lossy(&output.stderr).to_string();
	let parsed = serde_json::from_str::<serde_json::Value>(&stdout).unwrap_or_else(|_| json!({ "raw": stdout }));
	(output.status.success(), parsed, stderr)
}

fn seed(dir: &Path, name: &str, last_used: u64) {
	let store = SessionStore::new(dir);
	let mut record = SessionRecord::new(name);
	record.metadata.last_used = last_used;
	store.save(&record).expect("session record should be written");
}

#[test]
fn session_list_orders_by_last_used_descending() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let now = now_ms();
	seed(tmp.path(), "older", now - 60_000);
	seed(tmp.path(), "newer", now - 1_000);

	let (success, json, stderr) = run_lh(tmp.path(), &["session", "list"]);
	assert!(success, "session list failed: {stderr}");
	assert_eq!(json["ok"], true);
	assert_eq!(json["op"], "session.list");
	assert_eq!(json["data"]["count"], 2);
	assert_eq!(json["data"]["sessions"][0]["name"], "newer");
	assert_eq!(json["data"]["sessions"][1]["name"], "older");
}

#[test]
fn session_info_returns_the_full_record() {
	let tmp = TempDir::new().expect("temp dir should be created");
	seed(tmp.path(), "alpha", now_ms());

	let (success, json, stderr) = run_lh(tmp.path(), &["session", "info", "alpha"]);
	assert!(success, "session info failed: {stderr}");
	assert_eq!(json["op"], "session.info");
	assert_eq!(json["data"]["session"]["name"], "alpha");
	assert!(json["data"]["session"]["metadata"]["lastUsed"].is_u64());
}

#[test]
fn session_info_for_missing_name_fails_with_error_envelope() {
	let tmp = TempDir::new().expect("temp dir should be created");

	let (success, json, _stderr) = run_lh(tmp.path(), &["session", "info", "ghost"]);
	assert!(!success);
	assert_eq!(json["ok"], false);
	assert!(json["error"].as_str().unwrap_or_default().contains("ghost"));
}

#[test]
fn session_rename_then_delete() {
	let tmp = TempDir::new().expect("temp dir should be created");
	seed(tmp.path(), "before", now_ms());

	let (success, json, stderr) = run_lh(tmp.path(), &["session", "rename", "before", "after"]);
	assert!(success, "session rename failed: {stderr}");
	assert_eq!(json["data"]["to"], "after");

	let store = SessionStore::new(tmp.path());
	let record = store.load("after").expect("renamed record should load");
	assert_eq!(record.name, "after");
	assert!(store.load("before").is_err());

	let (success, json, stderr) = run_lh(tmp.path(), &["session", "delete", "after"]);
	assert!(success, "session delete failed: {stderr}");
	assert_eq!(json["data"]["deleted"], true);
	assert!(store.list().expect("listing should succeed").is_empty());
}

#[test]
fn cleanup_dry_run_reports_without_removing_files() {
	let tmp = TempDir::new().expect("temp dir should be created");
	let now = now_ms();
	let day = 24 * 60 * 60 * 1000;
	seed(tmp.path(), "stale", now - 30 * day);
	seed(tmp.path(), "fresh", now - day);

	let (success, json, stderr) = run_lh(tmp.path(), &["cleanup", "--dry-run"]);
	assert!(success, "cleanup failed: {stderr}");
	assert_eq!(json["op"], "cleanup");
	assert_eq!(json["data"]["result"]["dryRun"], true);
	assert_eq!(json["data"]["result"]["cleaned"], json!(["stale"]));

	let store = SessionStore::new(tmp.path());
	assert_eq!(store.list().expect("listing should succeed").len(), 2);
}

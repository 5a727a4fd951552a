mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use docchat::collections::CollectionStore;
use docchat::progress::NoProgress;

use common::{policy_pdf, KeywordEmbedder};

fn docchat_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_docchat"))
}

/// Temp root with `config/docchat.toml` pointing storage at `store/`.
/// Providers are disabled so nothing touches the network.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[storage]
base_dir = "{}/store"

[embedding]
provider = "disabled"

[llm]
provider = "disabled"
"#,
        root.display()
    );
    let config_path = config_dir.join("docchat.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docchat_in(cwd: &Path, config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docchat_binary();
    let output = Command::new(&binary)
        .current_dir(cwd)
        .env_remove("OPENAI_API_KEY")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(config_path)
        .arg("--progress")
        .arg("off")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docchat binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_docchat(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let cwd = config_path.parent().and_then(Path::parent).unwrap();
    run_docchat_in(cwd, config_path, args)
}

#[test]
fn test_list_creates_missing_base_dir() {
    let (tmp, config_path) = setup_test_env();
    let store_dir = tmp.path().join("store");
    assert!(!store_dir.exists());

    let (stdout, stderr, success) = run_docchat(&config_path, &["list"]);
    assert!(success, "list failed: {}", stderr);
    assert!(stdout.contains("No collections."));
    assert!(store_dir.is_dir());
}

#[test]
fn test_missing_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let absent = tmp.path().join("nope.toml");

    let (stdout, stderr, success) = run_docchat_in(tmp.path(), &absent, &["list"]);
    assert!(success, "list failed: {}", stderr);
    assert!(stdout.contains("No collections."));
    assert!(tmp.path().join("collections_store").is_dir());
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[embedding]\nprovider = \"magic\"\n").unwrap();

    let (_stdout, stderr, success) = run_docchat(&config_path, &["list"]);
    assert!(!success);
    assert!(stderr.contains("Unknown embedding provider"));
}

#[test]
fn test_delete_missing_collection_is_handled() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_docchat(&config_path, &["delete", "ghost"]);
    assert!(success, "delete failed: {}", stderr);
    assert!(stdout.contains("not found; nothing deleted"));
}

#[test]
fn test_info_and_ask_on_missing_collection_fail() {
    let (_tmp, config_path) = setup_test_env();

    let (_stdout, stderr, success) = run_docchat(&config_path, &["info", "ghost"]);
    assert!(!success);
    assert!(stderr.contains("collection 'ghost' not found"));

    let (_stdout, stderr, success) =
        run_docchat(&config_path, &["ask", "ghost", "What is covered?"]);
    assert!(!success);
    assert!(stderr.contains("collection 'ghost' not found"));
}

#[test]
fn test_ingest_non_pdf_fails() {
    let (tmp, config_path) = setup_test_env();
    let notes = tmp.path().join("notes.pdf");
    fs::write(&notes, "just some text").unwrap();

    let (_stdout, stderr, success) =
        run_docchat(&config_path, &["ingest", notes.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("not a PDF file"), "stderr: {}", stderr);

    let (stdout, _, _) = run_docchat(&config_path, &["list"]);
    assert!(stdout.contains("No collections."));
}

#[test]
fn test_ingest_with_disabled_embeddings_leaves_nothing() {
    let (tmp, config_path) = setup_test_env();
    let pdf = tmp.path().join("policy.pdf");
    fs::write(&pdf, policy_pdf()).unwrap();

    let (_stdout, stderr, success) = run_docchat(&config_path, &["ingest", pdf.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("embeddings are disabled"), "stderr: {}", stderr);

    let entries: Vec<_> = fs::read_dir(tmp.path().join("store")).unwrap().collect();
    assert!(entries.is_empty(), "store not empty: {:?}", entries);
}

#[tokio::test]
async fn test_cli_sees_collections_built_by_library() {
    let (tmp, config_path) = setup_test_env();
    let store = CollectionStore::open(tmp.path().join("store")).unwrap();
    let embedder = KeywordEmbedder::default();
    let ingested = store
        .ingest_pdf("policy.pdf", &policy_pdf(), &embedder, &NoProgress)
        .await
        .unwrap();
    let chunks = ingested.handle.info().await.unwrap().chunks;
    drop(ingested);

    let (stdout, stderr, success) = run_docchat(&config_path, &["list"]);
    assert!(success, "list failed: {}", stderr);
    assert_eq!(stdout.trim(), "policy");

    let (stdout, stderr, success) = run_docchat(&config_path, &["info", "policy", "--json"]);
    assert!(success, "info failed: {}", stderr);
    let info: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(info["name"], "policy");
    assert_eq!(info["chunks"], chunks);
    assert_eq!(info["embedding_model"], "keyword-test");
    assert_eq!(info["source_file"], "policy.pdf");

    let (stdout, stderr, success) = run_docchat(&config_path, &["delete", "policy"]);
    assert!(success, "delete failed: {}", stderr);
    assert!(stdout.contains("Deleted collection 'policy'"));

    let (stdout, _, _) = run_docchat(&config_path, &["list"]);
    assert!(stdout.contains("No collections."));
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

use todo_agent::config::{parse_config, Config};
use todo_agent::db;
use todo_agent::migrate;
use todo_agent::models::{Category, TaskUpdate};
use todo_agent::server;
use todo_agent::service::{CHAT_PLACEHOLDER, SUMMARY_PLACEHOLDER};
use todo_agent::state::AppState;
use todo_agent::store::{SqliteTaskStore, TaskStore};

// ─── Helpers ────────────────────────────────────────────────────────

fn test_config(tmp: &TempDir) -> Config {
    let toml_str = format!(
        r#"
[db]
path = "{}/data/todos.sqlite"

[generation]
provider = "disabled"
"#,
        tmp.path().display()
    );
    parse_config(&toml_str).unwrap()
}

fn write_config_file(tmp: &TempDir) -> PathBuf {
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let path = config_dir.join("todo.toml");
    fs::write(
        &path,
        format!(
            "[db]\npath = \"{}/data/todos.sqlite\"\n\n[generation]\nprovider = \"disabled\"\n",
            tmp.path().display()
        ),
    )
    .unwrap();
    path
}

fn run_todo(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = env!("CARGO_BIN_EXE_todo");
    let output = Command::new(binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run todo binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

async fn sqlite_store(cfg: &Config) -> SqliteTaskStore {
    let pool = db::connect(cfg).await.unwrap();
    migrate::migrate_pool(&pool).await.unwrap();
    SqliteTaskStore::new(pool)
}

/// Serve the app on an ephemeral port and return its base URL.
async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(state)).await.unwrap();
    });
    let base = format!("http://{}", addr);
    wait_for_server(&base).await;
    base
}

async fn wait_for_server(base: &str) {
    let client = reqwest::Client::new();
    let url = format!("{}/health", base);
    for _ in 0..50 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("Server did not become ready within 5 seconds");
}

// ─── SQLite store ───────────────────────────────────────────────────

#[tokio::test]
async fn test_sqlite_insert_get_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&test_config(&tmp)).await;

    let task = store
        .insert("Email the client", true, Category::Work)
        .await
        .unwrap();
    let fetched = store.get(task.id).await.unwrap().unwrap();
    assert_eq!(fetched, task);
    assert!(store.get(task.id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sqlite_ids_not_reused_after_delete() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&test_config(&tmp)).await;

    let a = store.insert("one", false, Category::Personal).await.unwrap();
    let b = store.insert("two", false, Category::Personal).await.unwrap();
    assert!(store.delete(b.id).await.unwrap());
    assert!(!store.delete(b.id).await.unwrap());
    let c = store.insert("three", false, Category::Personal).await.unwrap();
    assert!(c.id > b.id && b.id > a.id);
}

#[tokio::test]
async fn test_sqlite_partial_update_and_paging() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&test_config(&tmp)).await;
    for i in 1..=5 {
        store
            .insert(&format!("task {}", i), false, Category::Uncategorized)
            .await
            .unwrap();
    }

    let updated = store
        .update(
            2,
            &TaskUpdate {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(updated.completed);
    assert_eq!(updated.description, "task 2");
    assert_eq!(updated.category, Category::Uncategorized);

    let page = store.list(1, 2).await.unwrap();
    assert_eq!(page.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2, 3]);
    assert!(page[0].completed);

    assert!(store
        .update(99, &TaskUpdate::default())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_concurrent_writes_all_succeed() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(sqlite_store(&test_config(&tmp)).await);

    let shared_id = store
        .insert("shared", false, Category::Work)
        .await
        .unwrap()
        .id;
    let mut distinct = Vec::new();
    for i in 0..50 {
        let task = store
            .insert(&format!("task {}", i), false, Category::Personal)
            .await
            .unwrap();
        distinct.push(task.id);
    }

    let mut handles = Vec::new();
    for i in 0..100 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let update = TaskUpdate {
                description: Some(format!("shared {}", i)),
                ..Default::default()
            };
            store.update(shared_id, &update).await.map(|t| t.is_some())
        }));
    }
    for id in distinct.iter().copied() {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let update = TaskUpdate {
                completed: Some(true),
                ..Default::default()
            };
            store.update(id, &update).await.map(|t| t.is_some())
        }));
    }
    for i in 0..50 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .insert(&format!("new {}", i), false, Category::Uncategorized)
                .await
                .map(|_| true)
        }));
    }

    for handle in handles {
        let found = handle.await.unwrap().unwrap();
        assert!(found);
    }

    let shared = store.get(shared_id).await.unwrap().unwrap();
    assert!(shared.description.starts_with("shared "));
    assert_eq!(shared.category, Category::Work);
    assert!(!shared.completed);
    for id in distinct {
        let task = store.get(id).await.unwrap().unwrap();
        assert!(task.completed, "task {} lost its update", id);
        assert_eq!(task.category, Category::Personal);
    }
    assert_eq!(store.list(0, 1000).await.unwrap().len(), 101);
}

#[tokio::test]
async fn test_migrations_idempotent() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    migrate::run_migrations(&cfg).await.unwrap();
    migrate::run_migrations(&cfg).await.unwrap();
    assert!(cfg.db.path.exists());
}

// ─── HTTP server ────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_crud_flow() {
    let tmp = TempDir::new().unwrap();
    let state = AppState::from_config(&test_config(&tmp), false)
        .await
        .unwrap();
    let base = spawn_server(state).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/todos", base))
        .json(&serde_json::json!({ "description": "Urgent: finish report" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(created["category"], "Urgent");
    assert_eq!(created["completed"], false);
    let id = created["id"].as_i64().unwrap();

    let resp = client
        .patch(format!("{}/todos/{}", base, id))
        .json(&serde_json::json!({ "completed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["description"], "Urgent: finish report");

    let list: Vec<serde_json::Value> = client
        .get(format!("{}/todos?skip=0&limit=10", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);

    let resp = client
        .delete(format!("{}/todos/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Todo deleted successfully");

    let resp = client
        .get(format!("{}/todos/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Todo not found");
}

#[tokio::test]
async fn test_http_validation_errors_are_422() {
    let tmp = TempDir::new().unwrap();
    let state = AppState::from_config(&test_config(&tmp), true)
        .await
        .unwrap();
    let base = spawn_server(state).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/todos", base))
        .json(&serde_json::json!({ "description": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["detail"].is_string());

    let resp = client
        .post(format!("{}/todos", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);

    let resp = client
        .post(format!("{}/api/chat", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn test_http_ai_endpoints_fall_back_to_placeholders() {
    let tmp = TempDir::new().unwrap();
    let state = AppState::from_config(&test_config(&tmp), true)
        .await
        .unwrap();
    let base = spawn_server(state).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/tasks/summary", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["summary"], SUMMARY_PLACEHOLDER);

    let resp = client
        .post(format!(
            "{}/api/chat?query=what%20is%20left&selected_text=report",
            base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["response"], CHAT_PLACEHOLDER);
}

#[tokio::test]
async fn test_http_health() {
    let tmp = TempDir::new().unwrap();
    let state = AppState::from_config(&test_config(&tmp), true)
        .await
        .unwrap();
    let base = spawn_server(state).await;

    let body: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

// ─── CLI ────────────────────────────────────────────────────────────

#[test]
fn test_cli_init_idempotent() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config_file(&tmp);

    let (stdout, stderr, success) = run_todo(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    let (_, _, success) = run_todo(&config_path, &["init"]);
    assert!(success, "Second init failed (not idempotent)");
}

#[test]
fn test_cli_add_list_complete() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config_file(&tmp);
    run_todo(&config_path, &["init"]);

    let (stdout, stderr, success) = run_todo(&config_path, &["add", "Buy groceries for dinner"]);
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Added task 1 (Personal)"));

    let (stdout, _, success) = run_todo(&config_path, &["complete", "1"]);
    assert!(success);
    assert!(stdout.contains("Task 1 marked done"));

    let (stdout, _, success) = run_todo(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("Buy groceries for dinner"));
    assert!(stdout.contains("[x]"));
}

#[test]
fn test_cli_get_missing_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config_file(&tmp);
    run_todo(&config_path, &["init"]);

    let (_, stderr, success) = run_todo(&config_path, &["get", "42"]);
    assert!(!success);
    assert!(stderr.contains("Todo not found"));
}

#[test]
fn test_cli_categorize() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config_file(&tmp);

    let (stdout, _, success) = run_todo(&config_path, &["categorize", "Walk the dog"]);
    assert!(success);
    assert_eq!(stdout.trim(), "Uncategorized");
}

#[test]
fn test_cli_summary_placeholder() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config_file(&tmp);

    let (stdout, _, success) = run_todo(&config_path, &["--memory", "summary"]);
    assert!(success);
    assert_eq!(stdout.trim(), SUMMARY_PLACEHOLDER);
}

#[test]
fn test_cli_missing_token_names_disabled_provider() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("todo.toml");
    fs::write(
        &config_path,
        format!(
            "[db]\npath = \"{}/data/todos.sqlite\"\n\n[generation]\nprovider = \"huggingface\"\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_todo"))
        .arg("--config")
        .arg(&config_path)
        .args(["--memory", "list"])
        .env("RUST_LOG", "warn")
        .env_remove("HUGGINGFACEHUB_API_TOKEN")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("HUGGINGFACEHUB_API_TOKEN"), "stderr={}", stderr);
    assert!(stderr.contains(r#"provider = "disabled""#), "stderr={}", stderr);
}

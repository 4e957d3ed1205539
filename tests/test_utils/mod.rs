//! Test utilities for integration tests
#![allow(dead_code)]
use tokio::sync::mpsc;

use gemchat::chat::{ChatSession, Notice};
use gemchat::core::AppConfig;
use gemchat::storage::{KvStore, save_api_key};

pub const TEST_API_KEY: &str = "test-key";

/// Creates a session backed by an in-memory store that talks to
/// `api_hostname` (usually a `mockito` server). Returns the store too
/// so tests can check what was persisted.
pub async fn test_session(
    api_hostname: &str,
    api_key: Option<&str>,
) -> (ChatSession, mpsc::UnboundedReceiver<Notice>, KvStore) {
    let store = KvStore::open_in_memory()
        .await
        .expect("Failed to open in-memory store");
    if let Some(key) = api_key {
        save_api_key(&store, key).await;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let session = ChatSession::builder(api_hostname, store.clone())
        .notifications(tx)
        .build()
        .await;
    (session, rx, store)
}

/// Config pointing at a fresh temporary storage directory. Keep the
/// returned `TempDir` alive for as long as the config is used.
pub fn test_config(api_hostname: &str) -> (tempfile::TempDir, AppConfig) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let storage_path = dir.path().display().to_string();
    let mut config = AppConfig::default()
        .with_storage_path(&storage_path)
        .with_api_hostname(api_hostname)
        .with_default_model("gemini-1.5-flash");
    // Ignore any key in the environment running the tests
    config.env_api_key = None;
    (dir, config)
}

pub fn reply_body(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

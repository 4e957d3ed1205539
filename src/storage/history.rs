//! Best-effort persistence of the chat history and the API key.
//! Nothing here returns an error: failures are logged and reads fall
//! back to "nothing stored".
use anyhow::{Error, Result};

use super::kv::KvStore;
use crate::chat::models::{Message, Transcript};

pub const CHAT_HISTORY_KEY: &str = "gemini_chat_history";
pub const API_KEY_KEY: &str = "gemini_api_key";

pub async fn save_chat_history(store: &KvStore, transcript: &Transcript) {
    if let Err(e) = try_save_chat_history(store, transcript).await {
        tracing::error!("Failed to save chat history: {}", e);
    }
}

async fn try_save_chat_history(store: &KvStore, transcript: &Transcript) -> Result<(), Error> {
    let data = serde_json::to_string(transcript.as_slice())?;
    store.set(CHAT_HISTORY_KEY, &data).await
}

/// Load the stored history. A missing or corrupt entry is treated as
/// an empty history.
pub async fn load_chat_history(store: &KvStore) -> Transcript {
    let saved = match store.get(CHAT_HISTORY_KEY).await {
        Ok(Some(saved)) => saved,
        Ok(None) => return Transcript::new(),
        Err(e) => {
            tracing::error!("Failed to load chat history: {}", e);
            return Transcript::new();
        }
    };

    match serde_json::from_str::<Vec<Message>>(&saved) {
        Ok(messages) => Transcript::new_with_messages(messages),
        Err(e) => {
            tracing::error!("Failed to load chat history: {}", e);
            Transcript::new()
        }
    }
}

pub async fn clear_chat_history(store: &KvStore) {
    if let Err(e) = store.remove(CHAT_HISTORY_KEY).await {
        tracing::error!("Failed to clear chat history: {}", e);
    }
}

pub async fn save_api_key(store: &KvStore, api_key: &str) {
    if let Err(e) = store.set(API_KEY_KEY, api_key).await {
        tracing::error!("Failed to save API key: {}", e);
    }
}

pub async fn load_api_key(store: &KvStore) -> Option<String> {
    match store.get(API_KEY_KEY).await {
        Ok(key) => key.filter(|k| !k.is_empty()),
        Err(e) => {
            tracing::error!("Failed to load API key: {}", e);
            None
        }
    }
}

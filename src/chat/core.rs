use std::fmt;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;

use super::models::{Message, Transcript};
use crate::core::config::DEFAULT_MODEL;
use crate::gemini::{GeminiError, complete, default_models, list_models};
use crate::storage::{
    KvStore, clear_chat_history, load_api_key, load_chat_history, save_api_key,
    save_chat_history,
};

const SEND_FAILED_DESCRIPTION: &str =
    "Failed to send message. Please check your API key and try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    AwaitingCredential,
    Sending,
    /// Only held while a failure is being reported, then back to `Idle`
    Error,
}

/// A transient, user-visible notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub destructive: bool,
}

impl Notice {
    pub fn info(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            destructive: false,
        }
    }

    pub fn destructive(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            destructive: true,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendRejected {
    #[error("Message is empty")]
    EmptyInput,
    #[error("A message is already being sent")]
    Busy,
    #[error("API key required")]
    MissingCredential,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Rejected(#[from] SendRejected),
    #[error(transparent)]
    Failed(#[from] GeminiError),
}

/// A user message that made it past the send guard and still needs a
/// reply. Created by `ChatSession::begin_send` and handed back to
/// `ChatSession::finish_send` with the API result.
pub struct PendingSend {
    text: String,
    model: String,
    api_key: String,
}

// Keep the API key out of debug output
impl fmt::Debug for PendingSend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSend")
            .field("text", &self.text)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl PendingSend {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn dispatch(&self, api_hostname: &str) -> Result<String, GeminiError> {
        complete(&self.text, &self.model, api_hostname, &self.api_key).await
    }
}

/// Owns everything a chat needs: the transcript, the API key, the
/// selected model and the view flags. Persistence and API calls only
/// see what is passed to them from here.
///
/// Use `ChatSession::builder()` to load a session from a store.
pub struct ChatSession {
    api_hostname: String,
    store: KvStore,
    transcript: Transcript,
    api_key: Option<String>,
    selected_model: String,
    available_models: Vec<String>,
    input: String,
    state: ChatState,
    show_settings: bool,
    show_api_key: bool,
    tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl ChatSession {
    pub fn builder(api_hostname: &str, store: KvStore) -> ChatSessionBuilder {
        ChatSessionBuilder::new(api_hostname, store)
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    pub fn available_models(&self) -> &[String] {
        &self.available_models
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: &str) {
        self.input = input.to_string();
    }

    pub fn is_settings_visible(&self) -> bool {
        self.show_settings
    }

    pub fn toggle_settings(&mut self) -> bool {
        self.show_settings = !self.show_settings;
        self.show_settings
    }

    pub fn toggle_api_key_visibility(&mut self) -> bool {
        self.show_api_key = !self.show_api_key;
        self.show_api_key
    }

    /// The stored key, masked unless visibility was toggled on.
    pub fn displayed_api_key(&self) -> Option<String> {
        let key = self.api_key.as_ref()?;
        if self.show_api_key {
            Some(key.clone())
        } else {
            Some("*".repeat(key.chars().count()))
        }
    }

    fn set_state(&mut self, state: ChatState) {
        if self.state != state {
            tracing::debug!("Chat state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn notify(&self, notice: Notice) {
        tracing::debug!("Notice {}: {}", notice.title, notice.description);
        if let Some(tx) = &self.tx
            && tx.send(notice).is_err()
        {
            tracing::debug!("Notification receiver dropped");
        }
    }

    pub fn open_credential_entry(&mut self) {
        self.set_state(ChatState::AwaitingCredential);
    }

    /// Close the credential entry without submitting a key.
    pub fn dismiss_credential_entry(&mut self) {
        if self.state == ChatState::AwaitingCredential {
            self.set_state(ChatState::Idle);
        }
    }

    /// Store a new API key and refresh the model list for it. Blank
    /// keys are ignored and return `false`.
    pub async fn submit_api_key(&mut self, api_key: &str) -> bool {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return false;
        }

        save_api_key(&self.store, api_key).await;
        self.api_key = Some(api_key.to_string());
        if self.state != ChatState::Sending {
            self.set_state(ChatState::Idle);
        }
        self.notify(Notice::info(
            "API Key Set",
            "Your Gemini API key has been saved locally.",
        ));

        self.refresh_models().await;
        true
    }

    /// Reload the models available to the current key, falling back to
    /// the default list when there is no key or nothing came back.
    pub async fn refresh_models(&mut self) -> &[String] {
        let models = match &self.api_key {
            Some(api_key) => list_models(&self.api_hostname, api_key).await,
            None => Vec::new(),
        };
        self.available_models = if models.is_empty() {
            default_models()
        } else {
            models
        };
        &self.available_models
    }

    /// Select a model. Any non-blank name is accepted; the return value
    /// says whether it is in the current list of available models. A
    /// blank name keeps the current selection and returns `false`.
    pub fn select_model(&mut self, model: &str) -> bool {
        let model = model.trim();
        if model.is_empty() {
            return false;
        }
        self.selected_model = model.to_string();
        self.is_selected_model_available()
    }

    pub fn is_selected_model_available(&self) -> bool {
        self.available_models.contains(&self.selected_model)
    }

    /// Guard for sending the current input. On success the user message
    /// is already in the transcript, the input is cleared and the session
    /// is `Sending` until `finish_send` is called. Sending is allowed
    /// from any state other than `Sending` as long as there is a key.
    pub fn begin_send(&mut self) -> Result<PendingSend, SendRejected> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return Err(SendRejected::EmptyInput);
        }
        if self.state == ChatState::Sending {
            return Err(SendRejected::Busy);
        }
        let Some(api_key) = self.api_key.clone() else {
            self.notify(Notice::destructive(
                "API Key Required",
                "Please set your Gemini API key first.",
            ));
            self.set_state(ChatState::AwaitingCredential);
            return Err(SendRejected::MissingCredential);
        };

        let now = Utc::now();
        let id = self.transcript.next_id(now);
        self.transcript.push(Message::user(&id, &text, now));
        self.input.clear();
        self.set_state(ChatState::Sending);

        Ok(PendingSend {
            text,
            model: self.selected_model.clone(),
            api_key,
        })
    }

    /// Record the outcome of a send. A reply is appended as an assistant
    /// message tagged with the model that produced it. A failure is
    /// reported as a notification and the user message stays. Either way
    /// the transcript is persisted and the session ends up `Idle`.
    pub async fn finish_send(
        &mut self,
        pending: PendingSend,
        result: Result<String, GeminiError>,
    ) -> Result<Message, GeminiError> {
        let outcome = match result {
            Ok(text) => {
                let now = Utc::now();
                let id = self.transcript.next_id(now);
                let msg = Message::assistant(&id, &text, &pending.model, now);
                self.transcript.push(msg.clone());
                Ok(msg)
            }
            Err(e) => {
                tracing::error!("Error sending message: {}", e);
                self.set_state(ChatState::Error);
                self.notify(Notice::destructive("Error", SEND_FAILED_DESCRIPTION));
                Err(e)
            }
        };

        save_chat_history(&self.store, &self.transcript).await;
        self.set_state(ChatState::Idle);
        outcome
    }

    /// Send the current input and wait for the reply.
    pub async fn send(&mut self) -> Result<Message, SendError> {
        let pending = self.begin_send()?;
        let result = pending.dispatch(&self.api_hostname).await;
        Ok(self.finish_send(pending, result).await?)
    }

    pub async fn submit(&mut self, input: &str) -> Result<Message, SendError> {
        self.set_input(input);
        self.send().await
    }

    /// Drop the whole transcript, in memory and on disk.
    pub async fn clear_history(&mut self) {
        self.transcript.clear();
        clear_chat_history(&self.store).await;
        self.notify(Notice::info("Chat Cleared", "Chat history has been cleared."));
    }
}

pub struct ChatSessionBuilder {
    api_hostname: String,
    store: KvStore,
    model: String,
    fallback_api_key: Option<String>,
    tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl ChatSessionBuilder {
    pub fn new(api_hostname: &str, store: KvStore) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            store,
            model: DEFAULT_MODEL.to_string(),
            fallback_api_key: None,
            tx: None,
        }
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Key to store when none has been saved yet.
    pub fn fallback_api_key(mut self, api_key: Option<String>) -> Self {
        self.fallback_api_key = api_key;
        self
    }

    pub fn notifications(mut self, tx: mpsc::UnboundedSender<Notice>) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Load the stored transcript and key. Without a key the session
    /// starts out waiting for one.
    pub async fn build(self) -> ChatSession {
        let transcript = load_chat_history(&self.store).await;

        let mut api_key = load_api_key(&self.store).await;
        if api_key.is_none()
            && let Some(fallback) = self.fallback_api_key.filter(|k| !k.trim().is_empty())
        {
            let fallback = fallback.trim().to_string();
            save_api_key(&self.store, &fallback).await;
            api_key = Some(fallback);
        }

        let state = if api_key.is_some() {
            ChatState::Idle
        } else {
            ChatState::AwaitingCredential
        };

        ChatSession {
            api_hostname: self.api_hostname,
            store: self.store,
            transcript,
            api_key,
            selected_model: self.model,
            available_models: default_models(),
            input: String::new(),
            state,
            show_settings: false,
            show_api_key: false,
            tx: self.tx,
        }
    }
}

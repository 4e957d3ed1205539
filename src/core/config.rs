use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_HOSTNAME: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DB_FILE_NAME: &str = "gemchat.db";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub db_path: String,
    pub api_hostname: String,
    pub default_model: String,
    // Only used to seed the stored key on first run
    pub env_api_key: Option<String>,
}

impl AppConfig {
    /// Override the storage directory, keeping the database file name.
    pub fn with_storage_path(mut self, storage_path: &str) -> Self {
        self.db_path = db_path_for(storage_path);
        self.storage_path = storage_path.to_string();
        self
    }

    pub fn with_api_hostname(mut self, api_hostname: &str) -> Self {
        self.api_hostname = api_hostname.to_string();
        self
    }

    pub fn with_default_model(mut self, model: &str) -> Self {
        self.default_model = model.to_string();
        self
    }
}

fn db_path_for(storage_path: &str) -> String {
    PathBuf::from(storage_path)
        .join(DB_FILE_NAME)
        .display()
        .to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("GEMCHAT_STORAGE_PATH").unwrap_or("./".to_string());
        let db_path = db_path_for(&storage_path);
        let api_hostname = env::var("GEMCHAT_API_HOST")
            .unwrap_or_else(|_| DEFAULT_API_HOSTNAME.to_string());
        let default_model =
            env::var("GEMCHAT_DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let env_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        Self {
            storage_path,
            db_path,
            api_hostname,
            default_model,
            env_api_key,
        }
    }
}

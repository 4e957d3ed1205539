//! Model directory: which models the API key can use, plus the
//! display metadata shown next to each model name.
use serde::Deserialize;

/// Used when there is no API key yet or the lookup came back empty.
pub const DEFAULT_MODELS: [&str; 5] = [
    "gemini-1.5-flash",
    "gemini-1.5-flash-8b",
    "gemini-1.5-pro",
    "gemini-1.0-pro",
    "gemini-1.0-pro-vision",
];

const GENERATE_CONTENT_METHOD: &str = "generateContent";
const MODEL_FAMILY: &str = "gemini";
const MODEL_NAME_PREFIX: &str = "models/";

pub fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}

#[derive(Deserialize, Debug)]
struct ModelListResponse {
    #[serde(default)]
    models: Option<Vec<ModelEntry>>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

/// Keep chat-capable gemini models, drop the `models/` prefix and sort.
pub fn chat_model_names(entries: &[ModelEntry]) -> Vec<String> {
    let mut names: Vec<String> = entries
        .iter()
        .filter(|m| {
            m.supported_generation_methods
                .iter()
                .any(|method| method == GENERATE_CONTENT_METHOD)
                && m.name.contains(MODEL_FAMILY)
        })
        .map(|m| {
            m.name
                .strip_prefix(MODEL_NAME_PREFIX)
                .unwrap_or(m.name.as_str())
                .to_string()
        })
        .collect();
    names.sort();
    names
}

/// Fetch the models available to `api_key`. Any failure yields an
/// empty list so callers can fall back to `DEFAULT_MODELS`.
pub async fn list_models(api_hostname: &str, api_key: &str) -> Vec<String> {
    match fetch_models(api_hostname, api_key).await {
        Ok(Some(entries)) => chat_model_names(&entries),
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::error!("Error fetching available models: {}", e);
            Vec::new()
        }
    }
}

async fn fetch_models(
    api_hostname: &str,
    api_key: &str,
) -> Result<Option<Vec<ModelEntry>>, reqwest::Error> {
    let url = format!("{}/v1beta/models", api_hostname.trim_end_matches("/"));
    let response = reqwest::Client::new()
        .get(url)
        .query(&[("key", api_key)])
        .send()
        .await
        .map_err(|e| e.without_url())?;

    if !response.status().is_success() {
        tracing::warn!("Error fetching models: {}", response.status());
        return Ok(None);
    }

    let data: ModelListResponse = response.json().await.map_err(|e| e.without_url())?;
    Ok(data.models)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BadgeColor {
    Green,
    Blue,
    Purple,
    Orange,
    Gray,
}

impl BadgeColor {
    /// ANSI foreground color code for terminal output
    pub fn ansi_code(&self) -> u8 {
        match self {
            Self::Green => 32,
            Self::Blue => 34,
            Self::Purple => 35,
            Self::Orange => 33,
            Self::Gray => 90,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub badge: &'static str,
    pub color: BadgeColor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnownModel {
    Gemini15Flash,
    Gemini15Flash8b,
    Gemini15Pro,
    Gemini10Pro,
    Gemini10ProVision,
}

impl KnownModel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gemini-1.5-flash" => Some(Self::Gemini15Flash),
            "gemini-1.5-flash-8b" => Some(Self::Gemini15Flash8b),
            "gemini-1.5-pro" => Some(Self::Gemini15Pro),
            "gemini-1.0-pro" => Some(Self::Gemini10Pro),
            "gemini-1.0-pro-vision" => Some(Self::Gemini10ProVision),
            _ => None,
        }
    }

    pub fn info(&self) -> ModelInfo {
        let (badge, color) = match self {
            Self::Gemini15Flash => ("Fast", BadgeColor::Green),
            Self::Gemini15Flash8b => ("Ultra Fast", BadgeColor::Blue),
            Self::Gemini15Pro => ("Advanced", BadgeColor::Purple),
            Self::Gemini10Pro => ("Classic", BadgeColor::Gray),
            Self::Gemini10ProVision => ("Vision", BadgeColor::Orange),
        };
        ModelInfo { badge, color }
    }
}

const UNKNOWN_MODEL_INFO: ModelInfo = ModelInfo {
    badge: "Model",
    color: BadgeColor::Gray,
};

/// Display metadata for any model name, known or not.
pub fn model_info(name: &str) -> ModelInfo {
    KnownModel::from_name(name)
        .map(|m| m.info())
        .unwrap_or(UNKNOWN_MODEL_INFO)
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeminiError {
    /// The API answered with a non-success status code
    #[error("HTTP error! status: {0}")]
    Status(u16),
    /// The response decoded fine but carried no candidate text
    #[error("No valid response from Gemini API")]
    NoValidResponse,
    /// Built with `GeminiError::transport` so the URL, and the API key
    /// in its query string, never end up in the message
    #[error("Request to Gemini API failed: {0}")]
    Transport(reqwest::Error),
}

impl GeminiError {
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Part {
    pub text: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Content {
    pub parts: Vec<Part>,
}

impl Content {
    pub fn from_text(text: &str) -> Self {
        Content {
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryHarassment,
    HarmCategoryHateSpeech,
    HarmCategorySexuallyExplicit,
    HarmCategoryDangerousContent,
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockMediumAndAbove,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Every harm category blocked at medium and above.
pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        HarmCategory::HarmCategoryHarassment,
        HarmCategory::HarmCategoryHateSpeech,
        HarmCategory::HarmCategorySexuallyExplicit,
        HarmCategory::HarmCategoryDangerousContent,
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: HarmBlockThreshold::BlockMediumAndAbove,
    })
    .collect()
}

/// Declarative function-calling metadata. `parameters` is passed
/// through to the API untouched and any function call the model asks
/// for is not executed.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_settings: Option<Vec<SafetySetting>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

impl GenerateContentRequest {
    /// Only `message` is sent as context. Earlier turns of the chat are
    /// not included.
    pub fn new(message: &str) -> Self {
        Self {
            contents: vec![Content::from_text(message)],
            generation_config: GenerationConfig::default(),
            safety_settings: Some(default_safety_settings()),
            tools: None,
        }
    }

    /// Same generation settings but without any safety thresholds, plus
    /// the function declarations when there are any.
    pub fn new_with_tools(message: &str, functions: Option<&[FunctionDeclaration]>) -> Self {
        let tools = functions
            .filter(|f| !f.is_empty())
            .map(|f| {
                vec![Tool {
                    function_declarations: f.to_vec(),
                }]
            });
        Self {
            contents: vec![Content::from_text(message)],
            generation_config: GenerationConfig::default(),
            safety_settings: None,
            tools,
        }
    }
}

// {
//   "candidates": [
//     {
//       "content": { "parts": [{ "text": "Hello!" }], "role": "model" },
//       "finishReason": "STOP"
//     }
//   ]
// }
#[derive(Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<ResponsePart>>,
}

// Parts can also be function calls which have no text
#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub fn first_text(self) -> Option<String> {
        self.candidates?
            .into_iter()
            .next()?
            .content?
            .parts?
            .into_iter()
            .next()?
            .text
    }
}

/// Send a single message to `model` and return the reply text.
pub async fn complete(
    message: &str,
    model: &str,
    api_hostname: &str,
    api_key: &str,
) -> Result<String, GeminiError> {
    let payload = GenerateContentRequest::new(message);
    generate_content(&payload, model, api_hostname, api_key).await
}

/// Like `complete` but with optional function declarations attached.
/// Requests made this way carry no safety settings.
pub async fn complete_with_tools(
    message: &str,
    model: &str,
    api_hostname: &str,
    api_key: &str,
    functions: Option<&[FunctionDeclaration]>,
) -> Result<String, GeminiError> {
    let payload = GenerateContentRequest::new_with_tools(message, functions);
    generate_content(&payload, model, api_hostname, api_key).await
}

async fn generate_content(
    payload: &GenerateContentRequest,
    model: &str,
    api_hostname: &str,
    api_key: &str,
) -> Result<String, GeminiError> {
    let url = format!(
        "{}/v1beta/models/{}:generateContent",
        api_hostname.trim_end_matches("/"),
        model
    );
    tracing::debug!("Calling generateContent for model {}", model);

    let response = reqwest::Client::new()
        .post(url)
        .query(&[("key", api_key)])
        .header("Content-Type", "application/json")
        .json(payload)
        .send()
        .await
        .map_err(GeminiError::transport)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("Gemini API error ({}): {}", status, body);
        return Err(GeminiError::Status(status.as_u16()));
    }

    let data: GenerateContentResponse =
        response.json().await.map_err(GeminiError::transport)?;
    data.first_text().ok_or(GeminiError::NoValidResponse)
}

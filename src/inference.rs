//! Hugging Face text-generation client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Token budget for plain questions.
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 1024;

const TEMPERATURE: f64 = 0.3;
const REPETITION_PENALTY: f64 = 1.1;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Max chars of an error response body kept in [`InferenceError::Api`].
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Anything that can turn a prompt into generated text.
#[async_trait]
pub trait Inference: Send + Sync {
    async fn ask(&self, prompt: &str, max_new_tokens: u32) -> Result<String, InferenceError>;
}

pub struct InferenceClient {
    api_url: String,
    token: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f64,
    repetition_penalty: f64,
}

#[derive(Deserialize)]
struct Generation {
    #[serde(default)]
    generated_text: String,
}

impl InferenceClient {
    pub fn new(api_url: String, token: String) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::Http(e.to_string()))?;

        Ok(Self { api_url, token, http })
    }
}

#[async_trait]
impl Inference for InferenceClient {
    async fn ask(&self, prompt: &str, max_new_tokens: u32) -> Result<String, InferenceError> {
        info!("🧠 Inference request ({} chars, max_new_tokens={})", prompt.chars().count(), max_new_tokens);

        let request = GenerateRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens,
                temperature: TEMPERATURE,
                repetition_penalty: REPETITION_PENALTY,
            },
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| InferenceError::Http(e.to_string()))?;

        let status = response.status();
        debug!("Inference response status: {status}");

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| InferenceError::Http(e.to_string()))?;

        parse_generation(&body)
    }
}

/// Extract the first `generated_text` from a JSON array response.
fn parse_generation(body: &str) -> Result<String, InferenceError> {
    let generations: Vec<Generation> =
        serde_json::from_str(body).map_err(|e| InferenceError::Parse(e.to_string()))?;

    generations
        .into_iter()
        .next()
        .map(|g| g.generated_text.trim().to_string())
        .ok_or(InferenceError::Empty)
}

#[derive(Debug)]
pub enum InferenceError {
    /// Transport failure, including the request timeout.
    Http(String),
    /// Endpoint answered with something other than 200.
    Api { status: u16, body: String },
    /// Response body was not the expected JSON array.
    Parse(String),
    /// Endpoint returned an empty array.
    Empty,
}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceError::Http(e) => write!(f, "HTTP error: {e}"),
            InferenceError::Api { status, body } => write!(f, "API error {status}: {body}"),
            InferenceError::Parse(e) => write!(f, "Parse error: {e}"),
            InferenceError::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for InferenceError {}

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Low temperature for repeatable quizzes.
const TEMPERATURE: f32 = 0.3;
const TOP_P: f32 = 0.9;
const MAX_OUTPUT_TOKENS: u32 = 4000;

/// A text-generation model: prompt in, raw text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, api_base: &str, timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build LLM client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.google_api_key,
            &config.gemini_model,
            &config.gemini_api_base,
            config.llm_timeout,
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: vec![Part { text: prompt.into() }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: "application/json".into(),
            },
        };

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::GenerationError(format!("Model request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            return Err(AppError::GenerationError(format!(
                "Model responded with HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| AppError::GenerationError(format!("Invalid model response: {}", e)))?;

        response_text(&json)
    }
}

/// Concatenates the text parts of the first candidate.
fn response_text(json: &serde_json::Value) -> Result<String> {
    let parts = json["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| AppError::GenerationError("Invalid response format from LLM".to_string()))?;

    let reply: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    if reply.trim().is_empty() {
        return Err(AppError::GenerationError("LLM returned no text".to_string()));
    }

    Ok(reply.trim().to_string())
}

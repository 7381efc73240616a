//! Anthropic-backed outcome generator.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use quizwright_core::traits::{extract_json_block, OutcomeGenerator, OutcomeRequest, OutcomeResponse};

use crate::error::{error_for_status, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_TOKENS: u32 = 2048;
const SYSTEM_PROMPT: &str = "You are a curriculum designer. Respond ONLY with a JSON object of the form {\"course_outcomes\": [{\"co_title\": \"...\", \"co_description\": \"...\"}]}. Do not include any other text.";

/// Outcome generator that prompts an Anthropic model for JSON outcomes.
pub struct AnthropicOutcomeGenerator {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicOutcomeGenerator {
    pub fn new(api_key: &str, base_url: Option<String>, model: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client,
        })
    }
}

/// The user prompt for one chapter.
pub fn outcome_prompt(request: &OutcomeRequest) -> String {
    format!(
        "Generate 4 to 6 learning outcomes for the chapter \"{}\" of {} for grade {} under the {} board. \
         Each outcome needs a short title starting with an action verb and a one-sentence description.",
        request.chapter_name, request.subject, request.grade, request.board
    )
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

fn anthropic_message(body: &str) -> Option<String> {
    serde_json::from_str::<AnthropicError>(body)
        .ok()
        .map(|e| e.error.message)
}

#[async_trait]
impl OutcomeGenerator for AnthropicOutcomeGenerator {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(model = %self.model, chapter = %request.chapter_name))]
    async fn generate_outcomes(&self, request: &OutcomeRequest) -> anyhow::Result<OutcomeResponse> {
        let start = Instant::now();

        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: 0.2,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: outcome_prompt(request),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e, DEFAULT_TIMEOUT_SECS))?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &self.model, anthropic_message)
                .await
                .into());
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("failed to parse response: {e}")))?;

        let content: String = api_response
            .content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let json = extract_json_block(&content);
        let outcomes: OutcomeResponse = serde_json::from_str(&json)
            .map_err(|e| ProviderError::MalformedResponse(format!("outcome JSON: {e}")))?;

        debug!(
            count = outcomes.course_outcomes.len(),
            input_tokens = api_response.usage.input_tokens,
            output_tokens = api_response.usage.output_tokens,
            latency_ms = start.elapsed().as_millis() as u64,
            "outcomes generated"
        );
        Ok(outcomes)
    }
}

use super::{FieldExtractor, PatientFields};
use crate::{config::Config, error::PipelineError, prompt::build_prompt, recover::recover_fields};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Extraction through a hosted chat-completion API.
///
/// One single-turn request per invocation, temperature pinned to the
/// configured value (0 by default, for determinism), no retry.
pub struct OpenAiBackend {
    client: reqwest::blocking::Client,
    api_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    timeout_seconds: u64,
}

impl OpenAiBackend {
    pub fn new(cfg: &Config) -> Result<Self, PipelineError> {
        let api_key = std::env::var(&cfg.openai.api_key_env).map_err(|_| {
            PipelineError::Invocation(format!(
                "missing API credential: {} is not set",
                cfg.openai.api_key_env
            ))
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.openai.timeout_seconds))
            .build()
            .map_err(|e| PipelineError::Invocation(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: cfg.openai.api_url.clone(),
            model: cfg.openai.model.clone(),
            api_key,
            temperature: cfg.openai.temperature,
            timeout_seconds: cfg.openai.timeout_seconds,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl FieldExtractor for OpenAiBackend {
    fn extract_fields(&self, text: &str) -> Result<Option<PatientFields>, PipelineError> {
        let prompt = build_prompt(text);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    PipelineError::Invocation(format!("cannot reach {}", self.api_url))
                } else if e.is_timeout() {
                    PipelineError::Invocation(format!(
                        "request timed out after {}s",
                        self.timeout_seconds
                    ))
                } else {
                    PipelineError::Invocation(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::Invocation(format!(
                "chat completion returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| PipelineError::Invocation(format!("parsing API response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!("model raw output: {}", content.trim());

        Ok(recover_fields(&content))
    }
}

//! Blocking HTTP client for the outbound collaborators: chat completions,
//! embeddings and plain GET.
//!
//! Every request carries the configured timeout. There are no retries: a single
//! failed attempt is final.

use crate::core::config::RemoteConfig;
use crate::core::error::TaskError;
use crate::core::output::compact_line;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct RemoteClient {
    client: Client,
    api_base: String,
    token: Option<String>,
    chat_model: String,
    embedding_model: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f64>,
}

impl RemoteClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, TaskError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    /// Plain GET; the bearer credential is never sent to arbitrary URLs.
    pub fn get_text(&self, url: &str) -> Result<String, TaskError> {
        tracing::debug!(url, "remote get");
        let response = self.client.get(url).send()?;
        let response = ensure_success(response, "GET")?;
        Ok(response.text()?)
    }

    pub fn chat_completion(&self, system: &str, user: Vec<ContentPart>) -> Result<String, TaskError> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: serde_json::Value::String(system.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: serde_json::to_value(user)?,
                },
            ],
        };
        let url = format!("{}/chat/completions", self.api_base);
        tracing::debug!(url = %url, model = %self.chat_model, "chat completion");
        let response = self.authorized(self.client.post(&url)).json(&request).send()?;
        let response = ensure_success(response, "chat completion")?;
        let body: ChatResponse = response
            .json()
            .map_err(|e| TaskError::RemoteError(format!("malformed chat response: {}", e)))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| TaskError::RemoteError("chat response has no content".to_string()))
    }

    /// One vector per input, in input order.
    pub fn embeddings(&self, inputs: &[String]) -> Result<Vec<Vec<f64>>, TaskError> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: inputs,
        };
        let url = format!("{}/embeddings", self.api_base);
        tracing::debug!(url = %url, count = inputs.len(), "embeddings");
        let response = self.authorized(self.client.post(&url)).json(&request).send()?;
        let response = ensure_success(response, "embeddings")?;
        let body: EmbeddingResponse = response
            .json()
            .map_err(|e| TaskError::RemoteError(format!("malformed embeddings response: {}", e)))?;
        if body.data.len() != inputs.len() {
            return Err(TaskError::RemoteError(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                body.data.len()
            )));
        }
        let mut items = body.data;
        if items.iter().all(|i| i.index.is_some()) {
            items.sort_by_key(|i| i.index);
        }
        Ok(items.into_iter().map(|i| i.embedding).collect())
    }

    fn authorized(
        &self,
        builder: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn ensure_success(response: Response, what: &str) -> Result<Response, TaskError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(TaskError::RemoteError(format!(
        "{} returned {}: {}",
        what,
        status.as_u16(),
        compact_line(&body, 200)
    )))
}

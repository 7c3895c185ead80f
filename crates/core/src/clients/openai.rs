use crate::traits::CompletionClient;
use crate::{Completion, CompletionError, Turn};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAiCompatibleClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Arc::new(Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn request_body(&self, messages: &[Turn]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let (Some(temperature), Some(object)) = (self.temperature, body.as_object_mut()) {
            object.insert("temperature".to_string(), json!(temperature));
        }
        body
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatibleClient {
    async fn complete(&self, messages: &[Turn]) -> Result<Completion, CompletionError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                details,
            });
        }

        let payload: Value = response.json().await?;
        parse_completion(&payload)
    }
}

fn parse_completion(payload: &Value) -> Result<Completion, CompletionError> {
    let choice = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| CompletionError::MalformedResponse("response has no choices".to_string()))?;

    let content = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            CompletionError::MalformedResponse("first choice has no message content".to_string())
        })?;

    Ok(Completion {
        content: content.to_string(),
        model: payload
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

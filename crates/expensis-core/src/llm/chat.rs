use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{ChatMessage, CompletionClient, CompletionError, CompletionFuture, clamp_temperature};
use crate::Config;

/// OpenAI-style `chat/completions` client (DeepSeek by default).
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Option<Duration>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build a client from resolved configuration.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Result<Self, CompletionError> {
        let endpoint = config
            .api_url
            .clone()
            .ok_or(CompletionError::NotConfigured("DEEPSEEK_API_URL is not set"))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or(CompletionError::NotConfigured("DEEPSEEK_API_KEY is not set"))?;

        let mut chat = Self::new(client, endpoint, api_key, config.model.clone());
        if let Some(timeout) = config.request_timeout() {
            chat = chat.with_timeout(timeout);
        }
        Ok(chat)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionClient for ChatClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        temperature: f32,
    ) -> CompletionFuture<'a> {
        Box::pin(async move {
            let body = ChatRequest {
                model: &self.model,
                messages,
                temperature: clamp_temperature(temperature),
                stream: false,
            };

            let mut request = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body);
            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }

            let start = Instant::now();
            let resp = request.send().await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                tracing::error!(status = status.as_u16(), body = %body, "completion endpoint error");
                return Err(CompletionError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let text = resp.text().await?;
            let content = first_choice(&text)?;
            tracing::debug!(
                model = %self.model,
                elapsed_ms = start.elapsed().as_millis() as u64,
                chars = content.chars().count(),
                "completion received"
            );
            Ok(content)
        })
    }
}

/// Pull `choices[0].message.content` out of a response body.
fn first_choice(body: &str) -> Result<String, CompletionError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| CompletionError::MalformedResponse("no choices in response".into()))
}

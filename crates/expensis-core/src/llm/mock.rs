//! Scripted completion client for offline tests.

use std::sync::Mutex;
use std::time::Duration;

use super::{ChatMessage, CompletionClient, CompletionError, CompletionFuture};

/// What [`MockCompletion`] answers with.
#[derive(Clone, Debug)]
pub enum MockReply {
    Text(String),
    /// Simulate a non-2xx response from the endpoint.
    Status { status: u16, body: String },
}

/// A call observed by the mock.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub prompt: String,
    pub temperature: f32,
}

/// A hand-rolled [`CompletionClient`] for tests.
///
/// Replies are chosen by matching a keyword against the first line of the
/// last message, so each pipeline step can be scripted independently. Calls
/// that match no rule get the fallback reply.
pub struct MockCompletion {
    rules: Vec<(String, MockReply)>,
    fallback: MockReply,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockCompletion {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: MockReply::Text(fallback.into()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `reply` when the prompt's first line contains `keyword`.
    pub fn when(mut self, keyword: &str, reply: impl Into<String>) -> Self {
        self.rules
            .push((keyword.to_string(), MockReply::Text(reply.into())));
        self
    }

    /// Fail with an HTTP status when the prompt's first line contains `keyword`.
    pub fn fail_when(mut self, keyword: &str, status: u16, body: &str) -> Self {
        self.rules.push((
            keyword.to_string(),
            MockReply::Status {
                status,
                body: body.to_string(),
            },
        ));
        self
    }

    /// Set simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn reply_for(&self, prompt: &str) -> MockReply {
        let first_line = prompt.lines().next().unwrap_or("");
        self.rules
            .iter()
            .find(|(keyword, _)| first_line.contains(keyword.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl CompletionClient for MockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        temperature: f32,
    ) -> CompletionFuture<'a> {
        Box::pin(async move {
            let prompt = messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            let reply = self.reply_for(&prompt);

            if let Ok(mut calls) = self.calls.lock() {
                calls.push(RecordedCall {
                    prompt,
                    temperature,
                });
            }

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match reply {
                MockReply::Text(text) => Ok(text),
                MockReply::Status { status, body } => Err(CompletionError::Status { status, body }),
            }
        })
    }
}

//! Chat-completion client trait and implementations.

pub mod chat;
pub mod mock;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use chat::ChatClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message of a completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
    #[error("completion client not configured: {0}")]
    NotConfigured(&'static str),
}

/// Future returned by [`CompletionClient::complete`].
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>>;

/// A single-shot text-completion endpoint.
///
/// One call is one outbound request: no retry, no streaming, no state kept
/// between calls.
pub trait CompletionClient: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Send `messages` and return the text of the first choice.
    ///
    /// `temperature` is clamped to `[0, 1]`.
    fn complete<'a>(&'a self, messages: &'a [ChatMessage], temperature: f32)
    -> CompletionFuture<'a>;
}

pub(crate) fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        0.0
    } else {
        temperature.clamp(0.0, 1.0)
    }
}

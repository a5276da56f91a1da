//! Request/response bodies served by the relay

use serde::{Deserialize, Serialize};

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// One conversation turn. Roles from callers are passed through unchecked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ROLE_SYSTEM, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ROLE_USER, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ROLE_ASSISTANT, content)
    }
}

/// Body of POST /chat and POST /chat-stream
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatTurnRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub use_search: bool,
}

/// Body returned by POST /chat
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatTurnResponse {
    pub reply: String,
    pub history: Vec<Message>,
    /// `None` when search was not requested, otherwise the (possibly empty) snippets
    pub search_snippets: Option<Vec<String>>,
}

/// Body of POST /search
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_search_results")]
    pub max_results: usize,
}

fn default_search_results() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    pub results: Vec<String>,
}

/// Body of POST /generate-image
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageResponse {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

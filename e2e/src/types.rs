//! Shared types for the e2e test framework

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A canned answer for the next request to one of the mock providers
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub content_type: String,
}

impl MockResponse {
    /// JSON body with status 200
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: "application/json".to_string(),
        }
    }

    /// Event-stream body with status 200
    pub fn event_stream(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: "text/event-stream".to_string(),
        }
    }

    /// Create an error response
    pub fn error(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: "application/json".to_string(),
        }
    }
}

/// Which mock provider a request or queued response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Completion,
    Search,
    Image,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Completion, Provider::Search, Provider::Image];

    /// Path the relay calls on the mock server, matching test_configs/relay.yaml
    pub fn route(self) -> &'static str {
        match self {
            Provider::Completion => "/v1/chat/completions",
            Provider::Search => "/search/",
            Provider::Image => "/image",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Provider::Completion => "completion",
            Provider::Search => "search",
            Provider::Image => "image",
        }
    }
}

/// Shared state for the mock provider server
#[derive(Debug, Default)]
pub struct BackendState {
    /// Responses for /v1/chat/completions, served front to back
    pub completion_queue: VecDeque<MockResponse>,
    /// Responses for the search endpoint
    pub search_queue: VecDeque<MockResponse>,
    /// Responses for the image endpoint
    pub image_queue: VecDeque<MockResponse>,
    /// All requests received by the mock (for inspection)
    pub received_requests: Vec<ReceivedRequest>,
    /// Calls per provider since the last reset, indexed by `Provider::index`
    calls: [usize; 3],
}

impl BackendState {
    pub fn queue_mut(&mut self, provider: Provider) -> &mut VecDeque<MockResponse> {
        match provider {
            Provider::Completion => &mut self.completion_queue,
            Provider::Search => &mut self.search_queue,
            Provider::Image => &mut self.image_queue,
        }
    }

    /// Clear every provider queue and the request log before the next case
    pub fn reset(&mut self) {
        for provider in Provider::ALL {
            self.queue_mut(provider).clear();
        }
        self.received_requests.clear();
        self.calls = [0; 3];
    }

    /// Log a request and hand back the response queued for its provider, if any
    pub fn record(&mut self, request: ReceivedRequest) -> Option<MockResponse> {
        let provider = request.provider;
        self.calls[provider.index()] += 1;
        self.received_requests.push(request);
        self.queue_mut(provider).pop_front()
    }

    /// Providers with queued responses the relay never asked for
    pub fn unused_responses(&mut self) -> Vec<(Provider, usize)> {
        Provider::ALL
            .into_iter()
            .map(|p| (p, self.queue_mut(p).len()))
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    /// Calls per provider since the last reset, in `Provider::ALL` order
    pub fn request_counts(&self) -> [usize; 3] {
        self.calls
    }
}

/// A request received by the mock
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ReceivedRequest {
    pub provider: Provider,
    pub path: String,
    /// Raw query string, if any
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

pub type SharedBackendState = Arc<Mutex<BackendState>>;

/// Result of a JSON request to the relay
#[derive(Debug)]
pub struct RelayResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl RelayResponse {
    /// Get a nested field using dot notation (e.g. "history.1.content")
    pub fn get(&self, path: &str) -> Option<&serde_json::Value> {
        let mut current = &self.body;
        for part in path.split('.') {
            current = if let Ok(idx) = part.parse::<usize>() {
                current.as_array()?.get(idx)?
            } else {
                current.as_object()?.get(part)?
            };
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path)?.as_str()
    }

    pub fn detail(&self) -> &str {
        self.get_str("detail").unwrap_or("")
    }
}

/// Result of a POST /chat-stream request: the body as it arrived
#[derive(Debug)]
pub struct StreamedText {
    pub status: u16,
    pub content_type: String,
    /// Body chunks in arrival order (transport chunking, not fragment boundaries)
    pub chunks: Vec<bytes::Bytes>,
}

impl StreamedText {
    pub fn text(&self) -> String {
        let all: Vec<u8> = self.chunks.iter().flat_map(|c| c.iter().copied()).collect();
        String::from_utf8_lossy(&all).into_owned()
    }
}

/// Outcome of a single case
#[derive(Debug)]
pub struct TestResult {
    pub name: &'static str,
    pub error: Option<String>,
    /// Provider calls the relay made during the case, in `Provider::ALL` order
    pub provider_calls: [usize; 3],
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

//! Completion provider client
//!
//! One request per call, no retries. [`UpstreamClient::complete`] buffers the
//! whole reply; [`UpstreamClient::stream`] hands back the lazy fragment relay.

mod relay;

use futures::Stream;
use std::time::Duration;

pub use relay::{classify_line, relay, LineEvent, LineFramer, RelayState, StreamFragment, DATA_MARKER, SENTINEL};

use crate::api::{ChatCompletionRequest, ChatCompletionResponse, Message};
use crate::config::UpstreamConfig;
use crate::error::ServiceError;

/// Client for an OpenAI-compatible chat completions endpoint
#[derive(Clone)]
pub struct UpstreamClient {
    http_client: reqwest::Client,
    config: UpstreamConfig,
    api_key: String,
}

impl UpstreamClient {
    pub fn new(http_client: reqwest::Client, config: UpstreamConfig, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            config,
            api_key: api_key.into(),
        }
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Build the provider payload, filling in configured defaults
    fn build_request(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        temperature: Option<f32>,
        stream: bool,
    ) -> ChatCompletionRequest {
        let model = model
            .filter(|m| !m.is_empty())
            .unwrap_or(self.config.model.as_str())
            .to_string();

        ChatCompletionRequest {
            model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: temperature.unwrap_or(self.config.temperature),
            stream: stream.then_some(true),
        }
    }

    fn post(&self, body: &ChatCompletionRequest) -> reqwest::RequestBuilder {
        self.http_client
            .post(self.config.completions_url())
            .bearer_auth(&self.api_key)
            .json(body)
    }

    /// Send one non-streaming completion and return the first choice's text
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<String, ServiceError> {
        let body = self.build_request(messages, model, temperature, false);
        tracing::debug!(model = %body.model, messages = body.messages.len(), "Sending completion request");

        let mut request = self.post(&body);
        if let Some(secs) = self.config.timeout_seconds {
            request = request.timeout(Duration::from_secs(secs));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: ChatCompletionResponse =
            serde_json::from_slice(&bytes).map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

        parsed
            .first_content()
            .map(str::to_string)
            .ok_or_else(|| ServiceError::MalformedResponse("missing choices[0].message.content".to_string()))
    }

    /// Open a streaming completion.
    ///
    /// A non-success status is reported here, before any fragment exists.
    /// After that, the returned relay never fails; it only ends.
    pub async fn stream(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<impl Stream<Item = StreamFragment> + Send + 'static, ServiceError> {
        let body = self.build_request(messages, model, temperature, true);
        tracing::debug!(
            state = ?RelayState::Connecting,
            model = %body.model,
            messages = body.messages.len(),
            "Opening completion stream"
        );

        let response = self.post(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(state = ?RelayState::Streaming, "Completion stream open");
        Ok(relay(response.bytes_stream()))
    }
}

//! Image generation pass-through

use serde::Serialize;

use crate::config::ImageConfig;
use crate::error::ServiceError;

#[derive(Debug, Serialize)]
struct GenerationPayload<'a> {
    key: &'a str,
    prompt: &'a str,
    negative_prompt: &'a str,
    width: u32,
    height: u32,
    samples: u32,
    num_inference_steps: &'a str,
    enhance_prompt: &'a str,
    scheduler: &'a str,
}

/// Client for the image provider. Without a key every call fails with
/// [`ServiceError::ImageNotConfigured`].
#[derive(Clone)]
pub struct ImageClient {
    http_client: reqwest::Client,
    config: ImageConfig,
    api_key: Option<String>,
}

impl ImageClient {
    pub fn new(http_client: reqwest::Client, config: ImageConfig, api_key: Option<String>) -> Self {
        Self {
            http_client,
            config,
            api_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate one image and return its URL
    pub async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let key = self.api_key.as_deref().ok_or(ServiceError::ImageNotConfigured)?;

        let payload = GenerationPayload {
            key,
            prompt,
            negative_prompt: "",
            width: 512,
            height: 512,
            samples: 1,
            num_inference_steps: "30",
            enhance_prompt: "yes",
            scheduler: "UniPCMultistepScheduler",
        };

        let response = self.http_client.post(&self.config.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ImageUpstream {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let data: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

        data.pointer("/output/0")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ServiceError::MalformedResponse("missing output[0]".to_string()))
    }
}

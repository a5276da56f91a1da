//! HTTP client that talks to the relay the way the browser chat page does

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;

use crate::types::{RelayResponse, StreamedText};

/// Build an HTTP client (no connection pooling for test isolation)
pub fn build_client() -> Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .pool_max_idle_per_host(0)
        .build()
        .expect("Failed to build reqwest client")
}

/// POST a JSON body and parse the JSON answer
pub async fn post_json(
    client: &Client,
    relay_addr: &str,
    path: &str,
    request_body: serde_json::Value,
) -> anyhow::Result<RelayResponse> {
    let url = format!("http://{relay_addr}{path}");

    let resp = client
        .post(&url)
        .json(&request_body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to POST {}: {}", url, e))?;

    let status = resp.status().as_u16();
    let body_text = resp
        .text()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read relay response: {}", e))?;

    let body: serde_json::Value = serde_json::from_str(&body_text).map_err(|e| {
        anyhow::anyhow!(
            "Relay response is not valid JSON: {}: {}",
            e,
            &body_text[..body_text.len().min(500)]
        )
    })?;

    Ok(RelayResponse { status, body })
}

/// POST /chat-stream and collect the body chunk by chunk
pub async fn post_chat_stream(
    client: &Client,
    relay_addr: &str,
    request_body: serde_json::Value,
) -> anyhow::Result<StreamedText> {
    let url = format!("http://{relay_addr}/chat-stream");

    let resp = client
        .post(&url)
        .json(&request_body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send streaming request to relay: {}", e))?;

    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let mut stream = resp.bytes_stream();
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk.map_err(|e| anyhow::anyhow!("Stream read error: {}", e))?;
        chunks.push(chunk);
    }

    Ok(StreamedText {
        status,
        content_type,
        chunks,
    })
}

/// Send a GET request to the relay, returning status and raw body
pub async fn send_get(client: &Client, relay_addr: &str, path: &str) -> anyhow::Result<(u16, String)> {
    let url = format!("http://{relay_addr}{path}");

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to GET {}: {}", url, e))?;

    let status = resp.status().as_u16();
    let body_text = resp.text().await.unwrap_or_default();
    Ok((status, body_text))
}

//! OpenAI-compatible API type definitions (completion provider side)

use serde::{Deserialize, Serialize};

use super::Message;

/// Chat completion request sent upstream
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Chat completion response. Every field is optional so a missing
/// piece is reported as a malformed response instead of a decode error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if the provider sent one
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first()?.message.as_ref()?.content.as_deref()
    }
}

/// Response choice
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

/// Response message
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Streaming chunk
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamChunk {
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// Text delta carried by the first choice
    pub fn first_delta(&self) -> Option<&str> {
        self.choices.first()?.delta.content.as_deref()
    }
}

/// Streaming choice
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamChoice {
    pub delta: Delta,
}

/// Streaming delta
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_stream_when_unset() {
        let req = ChatCompletionRequest {
            model: "m".to_string(),
            messages: vec![Message::user("hi")],
            max_tokens: 512,
            temperature: 0.7,
            stream: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("stream").is_none());
        assert_eq!(value["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_first_content() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hello"}}]
        }))
        .unwrap();
        assert_eq!(resp.first_content(), Some("hello"));
    }

    #[test]
    fn test_first_content_missing() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert_eq!(resp.first_content(), None);

        let resp: ChatCompletionResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": null}}]})).unwrap();
        assert_eq!(resp.first_content(), None);

        let resp: ChatCompletionResponse = serde_json::from_value(json!({"error": "x"})).unwrap();
        assert_eq!(resp.first_content(), None);
    }

    #[test]
    fn test_stream_chunk_delta() {
        let chunk: StreamChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#).unwrap();
        assert_eq!(chunk.first_delta(), Some("Hel"));

        let chunk: StreamChunk = serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(chunk.first_delta(), None);
    }
}

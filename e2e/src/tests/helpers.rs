//! Common test helpers and JSON builders

use serde_json::{json, Value};

// ─── Request builders ────────────────────────────────────────────────────────

/// A fresh chat turn with no history and no search
pub fn chat_request(message: &str) -> Value {
    json!({
        "message": message,
        "history": [],
        "use_search": false
    })
}

/// A chat turn that asks for web search context
pub fn search_chat_request(message: &str) -> Value {
    json!({
        "message": message,
        "history": [],
        "use_search": true
    })
}

// ─── Provider response builders ──────────────────────────────────────────────

/// Non-streaming completion with one choice
pub fn completion_response(content: &str) -> String {
    json!({
        "id": "chatcmpl-test001",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content
            },
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

/// One `data:` event carrying a content delta
pub fn delta_event(content: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({
            "id": "chatcmpl-stream",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
        })
    )
}

/// Full event-stream body for the given deltas, ending with the sentinel
pub fn stream_body(deltas: &[&str]) -> String {
    let mut body: String = deltas.iter().map(|d| delta_event(d)).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

/// Instant-answer body with an abstract and plain related topics
pub fn search_answer(heading: &str, abstract_text: &str, topics: &[(&str, &str)]) -> String {
    let related: Vec<Value> = topics
        .iter()
        .map(|(text, url)| json!({"Text": text, "FirstURL": url}))
        .collect();
    json!({
        "Heading": heading,
        "AbstractText": abstract_text,
        "AbstractURL": format!("https://en.wikipedia.org/wiki/{}", heading.replace(' ', "_")),
        "RelatedTopics": related
    })
    .to_string()
}

pub fn image_response(url: &str) -> String {
    json!({"status": "success", "generationTime": 1.2, "id": 42, "output": [url]}).to_string()
}

// ─── Assertion helpers ────────────────────────────────────────────────────────

/// Assert two strings are equal, with context on failure
pub fn assert_eq_str(actual: &str, expected: &str, label: &str) -> anyhow::Result<()> {
    if actual != expected {
        Err(anyhow::anyhow!("{label}: expected {:?} but got {:?}", expected, actual))
    } else {
        Ok(())
    }
}

/// Assert condition is true, with message
pub fn assert_true(cond: bool, msg: &str) -> anyhow::Result<()> {
    if !cond {
        Err(anyhow::anyhow!("{}", msg))
    } else {
        Ok(())
    }
}

/// Assert the relay answered with `status`, showing the body otherwise
pub fn assert_status(actual: u16, expected: u16, body: &Value) -> anyhow::Result<()> {
    assert_true(
        actual == expected,
        &format!("Expected status {expected}, got {actual}: {body}"),
    )
}

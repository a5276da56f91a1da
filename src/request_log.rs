//! One-line summaries of chat turns for the request log

use crate::api::ChatTurnRequest;

/// Longest prefix kept when logging a message or a reply
pub const LOG_PREFIX_CHARS: usize = 100;

/// Summarize an inbound chat turn, e.g. `→ /chat model=default history=2 search`.
///
/// The message text is not part of the summary; handlers log its prefix separately.
pub fn format_turn_log(endpoint: &str, request: &ChatTurnRequest) -> String {
    let model = request.model.as_deref().filter(|m| !m.is_empty()).unwrap_or("default");

    let mut parts = vec![
        endpoint.to_string(),
        format!("model={}", model),
        format!("history={}", request.history.len()),
    ];

    if request.use_search {
        parts.push("search".to_string());
    }

    if request.system_prompt.as_deref().is_some_and(|p| !p.is_empty()) {
        parts.push("custom_system".to_string());
    }

    format!("→ {}", parts.join(" "))
}

/// First `max_chars` characters of `s`, cut on a char boundary
pub fn truncate_prefix(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

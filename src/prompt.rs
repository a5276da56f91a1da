//! Prompt assembly: system prompt + search context + history + new user turn

use crate::api::Message;

const SEARCH_CONTEXT_HEADER: &str = "\n\nYou also have access to recent web search results for the user query.\n\
Use them as factual context when relevant, but still reason critically.\n\
WEB_SEARCH_RESULTS:\n";

/// Inputs for one prompt. Borrowed so the handler keeps ownership of the request.
#[derive(Debug, Clone, Copy)]
pub struct PromptParts<'a> {
    pub message: &'a str,
    pub history: &'a [Message],
    pub system_prompt: Option<&'a str>,
    pub default_system_prompt: &'a str,
    pub search_context: Option<&'a str>,
}

/// Build the ordered message list sent upstream.
///
/// The result is always `[system, history.., user]`. An empty caller system
/// prompt falls back to the default, and empty search context is ignored.
pub fn assemble(parts: PromptParts<'_>) -> Vec<Message> {
    let mut system = parts
        .system_prompt
        .filter(|p| !p.is_empty())
        .unwrap_or(parts.default_system_prompt)
        .to_string();

    if let Some(context) = parts.search_context.filter(|c| !c.is_empty()) {
        system.push_str(SEARCH_CONTEXT_HEADER);
        system.push_str(context);
    }

    let mut messages = Vec::with_capacity(parts.history.len() + 2);
    messages.push(Message::system(system));
    messages.extend(parts.history.iter().cloned());
    messages.push(Message::user(parts.message));
    messages
}

/// Join snippets into the block appended to the system prompt
pub fn search_context(snippets: &[String]) -> Option<String> {
    if snippets.is_empty() {
        None
    } else {
        Some(snippets.join("\n\n"))
    }
}

//! Test registry - all test cases are registered here

pub mod helpers;

use crate::suite::TestCase;

/// Build and return all test cases
///
/// Tests are grouped by endpoint. Each test:
/// 1. Queues mock provider responses (completion, search, image)
/// 2. Sends a request to the REAL relay
/// 3. Validates the response and what the providers received
pub fn all_tests() -> Vec<TestCase> {
    macro_rules! test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                name: $name,
                description: $desc,
                run: Box::new(|ctx| Box::pin($func(ctx))),
            }
        };
    }

    vec![
        // ── /chat ────────────────────────────────────────────────────────────
        test!(
            "chat/plain_turn",
            "Reply and two-entry history, search_snippets null",
            chat::test_plain_turn
        ),
        test!(
            "chat/upstream_payload",
            "Configured model, temperature, max_tokens and bearer key go upstream",
            chat::test_upstream_payload
        ),
        test!(
            "chat/history_and_overrides",
            "History order, system prompt, model and temperature overrides",
            chat::test_history_and_overrides
        ),
        test!(
            "chat/search_context",
            "Search snippets returned and folded into the system prompt",
            chat::test_search_context
        ),
        test!(
            "chat/search_failure_tolerated",
            "Search provider failure still yields a reply with empty snippets",
            chat::test_search_failure_tolerated
        ),
        test!(
            "chat/upstream_error",
            "Provider error status becomes 500 with the status in detail",
            chat::test_upstream_error
        ),
        test!(
            "chat/malformed_upstream",
            "Completion without content becomes 500 Bad API response",
            chat::test_malformed_upstream
        ),

        // ── /chat-stream ──────────────────────────────────────────────────────
        test!(
            "stream/fragments_concatenate",
            "Deltas are relayed as plain text in order",
            stream::test_fragments_concatenate
        ),
        test!(
            "stream/requests_stream",
            "Relay sends stream:true upstream",
            stream::test_requests_stream
        ),
        test!(
            "stream/malformed_line_skipped",
            "Unparseable event lines are dropped without ending the stream",
            stream::test_malformed_line_skipped
        ),
        test!(
            "stream/stops_at_sentinel",
            "Nothing after [DONE] is relayed",
            stream::test_stops_at_sentinel
        ),
        test!(
            "stream/missing_sentinel",
            "Upstream close without [DONE] ends the body cleanly",
            stream::test_missing_sentinel
        ),
        test!(
            "stream/unicode_and_crlf",
            "Multi-byte text and CRLF framing survive",
            stream::test_unicode_and_crlf
        ),
        test!(
            "stream/upstream_error",
            "Error status before the body becomes 500",
            stream::test_upstream_error
        ),
        test!(
            "stream/search_context",
            "Search snippets reach the streamed prompt",
            stream::test_search_context
        ),

        // ── Other endpoints ───────────────────────────────────────────────────
        test!(
            "search/results",
            "Abstract first, related topics after, truncated to max_results",
            endpoints::test_search_results
        ),
        test!(
            "search/blank_query",
            "Blank query returns [] without calling the provider",
            endpoints::test_search_blank_query
        ),
        test!(
            "search/provider_error",
            "/search reports provider failures as 500",
            endpoints::test_search_provider_error
        ),
        test!(
            "image/generate",
            "Image URL comes from output[0]; key and prompt forwarded",
            endpoints::test_generate_image
        ),
        test!(
            "image/provider_error",
            "Image provider error status becomes 500",
            endpoints::test_generate_image_error
        ),
        test!("misc/health", "/health returns status ok", endpoints::test_health),
        test!(
            "misc/index_page",
            "GET / and /static serve the static directory",
            endpoints::test_index_page
        ),
        test!(
            "misc/cors_preflight",
            "CORS preflight allows any origin",
            endpoints::test_cors_preflight
        ),
    ]
}

//! Web search augmentation
//!
//! Search is advisory: [`SearchAugmenter::snippets`] never fails. Provider
//! errors are logged and come back as an empty snippet list.

mod duckduckgo;

use async_trait::async_trait;
use std::sync::Arc;

pub use duckduckgo::DuckDuckGoProvider;

/// One search result as returned by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub body: String,
    pub href: String,
}

impl SearchHit {
    /// Render as the short text snippet used for prompt context
    pub fn to_snippet(&self) -> String {
        format!("{} - {} ({})", self.title, self.body, self.href)
    }
}

/// Trait for web search backends
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a query, returning at most `max_results` hits in provider order
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// Name of the provider
    fn name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Search provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Search provider response could not be decoded: {0}")]
    Decode(String),
}

/// Best-effort wrapper around a provider
#[derive(Clone)]
pub struct SearchAugmenter {
    provider: Arc<dyn SearchProvider>,
}

impl SearchAugmenter {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn SearchProvider> {
        &self.provider
    }

    /// Fetch snippets for `query`. Blank queries skip the provider entirely.
    pub async fn snippets(&self, query: &str, max_results: usize) -> Vec<String> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        match self.provider.search(query, max_results).await {
            Ok(hits) => {
                tracing::debug!(provider = self.provider.name(), hits = hits.len(), "Search completed");
                hits.iter().map(SearchHit::to_snippet).collect()
            }
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "Search failed, continuing without snippets");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider returning canned hits (or failing) and counting calls
    pub struct MockProvider {
        hits: Vec<SearchHit>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockProvider {
        pub fn with_hits(hits: Vec<SearchHit>) -> Self {
            Self {
                hits,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                hits: Vec::new(),
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchProvider for MockProvider {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SearchError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(self.hits.iter().take(max_results).cloned().collect())
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    pub fn hit(n: usize) -> SearchHit {
        SearchHit {
            title: format!("Title {n}"),
            body: format!("Body {n}"),
            href: format!("https://example.com/{n}"),
        }
    }
}

//! DuckDuckGo Instant Answer provider

use async_trait::async_trait;
use serde::Deserialize;

use super::{SearchError, SearchHit, SearchProvider};

/// Queries `GET {base}/?q=..&format=json` and flattens the abstract and
/// related topics into hits
pub struct DuckDuckGoProvider {
    http_client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoProvider {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/", self.base_url);
        tracing::debug!(url = %url, query = query, max_results, "Querying DuckDuckGo");

        let resp = self
            .http_client
            .get(&url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let answer: InstantAnswer = serde_json::from_str(&body).map_err(|e| SearchError::Decode(e.to_string()))?;
        Ok(answer.into_hits(max_results))
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

#[derive(Debug, Default, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

// Groups must come first: every field of a plain entry is optional.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<TopicEntry>,
    },
    Entry(TopicEntry),
}

#[derive(Debug, Deserialize)]
struct TopicEntry {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
}

impl InstantAnswer {
    fn into_hits(self, max_results: usize) -> Vec<SearchHit> {
        let mut hits = Vec::new();

        if !self.abstract_text.is_empty() {
            hits.push(SearchHit {
                title: self.heading,
                body: self.abstract_text,
                href: self.abstract_url,
            });
        }

        let entries = self.related_topics.into_iter().flat_map(|topic| match topic {
            RelatedTopic::Group { topics } => topics,
            RelatedTopic::Entry(entry) => vec![entry],
        });

        for entry in entries {
            if entry.text.is_empty() {
                continue;
            }
            hits.push(entry.into_hit());
        }

        hits.truncate(max_results);
        hits
    }
}

impl TopicEntry {
    /// Topic text reads "<title> <description>"; the title is recovered from the URL slug
    fn into_hit(self) -> SearchHit {
        let title = self
            .first_url
            .rsplit('/')
            .next()
            .map(|slug| slug.replace('_', " "))
            .unwrap_or_default();

        let body = self
            .text
            .strip_prefix(title.as_str())
            .map(|rest| rest.trim_start_matches([' ', '-']).to_string())
            .filter(|rest| !rest.is_empty())
            .unwrap_or(self.text);

        SearchHit {
            title,
            body,
            href: self.first_url,
        }
    }
}

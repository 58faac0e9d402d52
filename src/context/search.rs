//! Web search context for personas that read the live web.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Results kept per round.
pub const MAX_SEARCH_RESULTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search provider returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .user_agent("DoubleAgent/0.1")
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Brave when a key is configured, DuckDuckGo otherwise.
pub fn web_search_provider(brave_key: Option<&str>) -> Arc<dyn SearchProvider> {
    match brave_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => Arc::new(BraveSearchProvider::new(key)),
        None => Arc::new(DuckDuckGoProvider::new()),
    }
}

/// DuckDuckGo instant answer API. Needs no key.
///
/// Instant answers are abstracts and related topics only, not web results:
/// news and other time-sensitive queries usually come back empty. Configure
/// a Brave key for ranked web results.
pub struct DuckDuckGoProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoProvider {
    pub fn new() -> Self {
        Self {
            client: http_client(),
            endpoint: "https://api.duckduckgo.com/".to_string(),
        }
    }
}

impl Default for DuckDuckGoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn name(&self) -> &str {
        "DuckDuckGo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value = response.json().await?;
        Ok(parse_instant_answer(&data, max_results))
    }
}

fn parse_instant_answer(data: &serde_json::Value, max_results: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    if let Some(abstract_text) = data.get("AbstractText").and_then(|t| t.as_str())
        && !abstract_text.is_empty()
    {
        hits.push(SearchHit {
            title: data
                .get("Heading")
                .and_then(|h| h.as_str())
                .unwrap_or("Result")
                .to_string(),
            body: abstract_text.to_string(),
        });
    }

    if let Some(topics) = data.get("RelatedTopics").and_then(|r| r.as_array()) {
        for topic in topics {
            if hits.len() >= max_results {
                break;
            }
            if let Some(text) = topic.get("Text").and_then(|t| t.as_str()) {
                hits.push(SearchHit {
                    title: text.chars().take(80).collect(),
                    body: text.to_string(),
                });
            }
        }
    }

    hits.truncate(max_results);
    hits
}

/// Brave web search API (requires a subscription token).
pub struct BraveSearchProvider {
    client: reqwest::Client,
    api_key: String,
}

impl BraveSearchProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for BraveSearchProvider {
    fn name(&self) -> &str {
        "Brave Search"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &max_results.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value = response.json().await?;
        Ok(parse_brave_results(&data, max_results))
    }
}

fn parse_brave_results(data: &serde_json::Value, max_results: usize) -> Vec<SearchHit> {
    data.get("web")
        .and_then(|w| w.get("results"))
        .and_then(|r| r.as_array())
        .map(|results| {
            results
                .iter()
                .filter_map(|item| {
                    let title = item.get("title").and_then(|t| t.as_str()).unwrap_or("");
                    let body = item.get("description").and_then(|d| d.as_str()).unwrap_or("");
                    (!body.is_empty()).then(|| SearchHit {
                        title: title.to_string(),
                        body: body.to_string(),
                    })
                })
                .take(max_results)
                .collect()
        })
        .unwrap_or_default()
}

/// Search and format up to three hits as a bullet list.
///
/// Returns an empty string when nothing is found or the provider fails.
pub async fn search_context(provider: &dyn SearchProvider, query: &str) -> String {
    let query: String = query
        .chars()
        .filter(|c| !c.is_control() || *c == ' ')
        .collect();
    if query.trim().is_empty() {
        return String::new();
    }

    match provider.search(&query, MAX_SEARCH_RESULTS).await {
        Ok(hits) => {
            tracing::debug!(provider = provider.name(), hits = hits.len(), "web search done");
            format_hits(&hits)
        }
        Err(err) => {
            tracing::warn!(provider = provider.name(), error = %err, "search failed");
            String::new()
        }
    }
}

fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .take(MAX_SEARCH_RESULTS)
        .map(|hit| format!("- {}: {}", hit.title, hit.body))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedProvider(Vec<SearchHit>);

    #[async_trait]
    impl SearchProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SearchHit>, SearchError> {
            Ok(self.0.clone())
        }
    }

    struct DownProvider;

    #[async_trait]
    impl SearchProvider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }

        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SearchHit>, SearchError> {
            Err(SearchError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        }
    }

    fn hit(title: &str, body: &str) -> SearchHit {
        SearchHit {
            title: title.into(),
            body: body.into(),
        }
    }

    #[tokio::test]
    async fn formats_at_most_three_hits() {
        let provider = FixedProvider(vec![
            hit("One", "first"),
            hit("Two", "second"),
            hit("Three", "third"),
            hit("Four", "fourth"),
        ]);
        let out = search_context(&provider, "rust news").await;
        assert_eq!(out, "- One: first\n- Two: second\n- Three: third");
    }

    #[tokio::test]
    async fn no_hits_is_empty() {
        let out = search_context(&FixedProvider(vec![]), "nothing").await;
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn provider_failure_is_swallowed() {
        let out = search_context(&DownProvider, "anything").await;
        assert_eq!(out, "");
    }

    #[test]
    fn parses_abstract_and_related_topics() {
        let data = json!({
            "Heading": "Rust",
            "AbstractText": "A language empowering everyone.",
            "RelatedTopics": [
                {"Text": "Cargo - the Rust package manager"},
                {"Name": "group without text"},
                {"Text": "Ferris - the mascot"},
                {"Text": "Clippy - the linter"}
            ]
        });
        let hits = parse_instant_answer(&data, 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Rust");
        assert_eq!(hits[2].body, "Ferris - the mascot");
    }

    #[test]
    fn parses_brave_web_results() {
        let data = json!({
            "web": { "results": [
                {"title": "Launch today", "url": "https://a", "description": "The rocket lifted off at 9:00."},
                {"title": "No snippet", "url": "https://b"},
                {"title": "Second", "url": "https://c", "description": "Crew is safe."}
            ]}
        });
        let hits = parse_brave_results(&data, 3);
        assert_eq!(hits, vec![
            hit("Launch today", "The rocket lifted off at 9:00."),
            hit("Second", "Crew is safe."),
        ]);
        assert!(parse_brave_results(&json!({}), 3).is_empty());
    }

    #[test]
    fn brave_is_used_only_with_a_key() {
        assert_eq!(web_search_provider(Some("token")).name(), "Brave Search");
        assert_eq!(web_search_provider(Some("  ")).name(), "DuckDuckGo");
        assert_eq!(web_search_provider(None).name(), "DuckDuckGo");
    }
}

use crate::traits::WebSearch;
use crate::WebSearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_SERPAPI_ENDPOINT: &str = "https://serpapi.com/search.json";

pub struct SerpApiSearch {
    client: Arc<Client>,
    endpoint: String,
    api_key: String,
}

impl SerpApiSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_SERPAPI_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    fn search_url(&self, query: &str) -> Result<Url, WebSearchError> {
        Ok(Url::parse_with_params(
            &self.endpoint,
            &[
                ("engine", "google"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
            ],
        )?)
    }
}

#[async_trait]
impl WebSearch for SerpApiSearch {
    async fn search(&self, query: &str) -> Result<Option<String>, WebSearchError> {
        // the api key rides in the query string; keep it out of error output
        let response = self
            .client
            .get(self.search_url(query)?)
            .send()
            .await
            .map_err(|error| WebSearchError::Http(error.without_url()))?;

        if !response.status().is_success() {
            return Err(WebSearchError::Status(response.status().as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|error| WebSearchError::Http(error.without_url()))?;
        Ok(answer_snippet(&payload))
    }
}

/// Used when no search credentials are configured.
#[derive(Debug, Default)]
pub struct DisabledWebSearch;

#[async_trait]
impl WebSearch for DisabledWebSearch {
    async fn search(&self, _query: &str) -> Result<Option<String>, WebSearchError> {
        Ok(None)
    }
}

/// Picks the answer box answer, then its snippet, then the top organic snippet.
fn answer_snippet(payload: &Value) -> Option<String> {
    let candidates = [
        payload.pointer("/answer_box/answer"),
        payload.pointer("/answer_box/snippet"),
        payload.pointer("/organic_results/0/snippet"),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

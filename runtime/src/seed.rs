//! HTTP seed source.
//!
//! Fetches a JSON array of `{id, title, completed}` todos with a plain GET.

use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use taskmaster_core::seed::{RemoteTodo, SeedError, SeedSource};

/// Default public endpoint serving sample todos
pub const DEFAULT_SEED_URL: &str = "https://jsonplaceholder.typicode.com/todos?_limit=5";

/// Seed source backed by an HTTP endpoint
#[derive(Clone, Debug)]
pub struct HttpSeedSource {
    client: Client,
    url: String,
}

impl HttpSeedSource {
    /// Creates a source reading from `url`
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    /// Creates a source using an existing client (timeouts, proxies, ...)
    #[must_use]
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Endpoint in use
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<RemoteTodo>, SeedError> {
        tracing::debug!(url = %self.url, "Fetching seed todos");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SeedError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SeedError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SeedError::Request(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| SeedError::Malformed(e.to_string()))
    }
}

impl SeedSource for HttpSeedSource {
    fn fetch_seed(&self) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteTodo>, SeedError>> + Send + '_>> {
        Box::pin(self.fetch())
    }
}

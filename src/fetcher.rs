//! HTTP fetch of a project's configuration file.
//!
//! The fetcher remembers the `ETag` of the last successful response and sends
//! it back as `If-None-Match`, so an unchanged configuration costs a `304`.

use reqwest::header::{ETAG, IF_NONE_MATCH, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::sync::Mutex;
use tracing::{debug, error};

/// Default CDN origin serving configuration files.
pub const BASE_URL: &str = "https://cdn.betterconfig.com";

/// User agent sent with every configuration request.
pub const SDK_USER_AGENT: &str = concat!("BetterConfigClient-Rust/", env!("CARGO_PKG_VERSION"));

/// Outcome of a single fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchResponse {
    /// A new configuration body was downloaded.
    Fetched(String),
    /// The server answered `304 Not Modified`.
    NotModified,
    /// Transport error or unexpected status code.
    Failed,
}

impl FetchResponse {
    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchResponse::Fetched(_))
    }

    pub fn is_not_modified(&self) -> bool {
        matches!(self, FetchResponse::NotModified)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchResponse::Failed)
    }

    /// The fetched body, only present for [`FetchResponse::Fetched`].
    pub fn config(&self) -> Option<&str> {
        match self {
            FetchResponse::Fetched(body) => Some(body),
            _ => None,
        }
    }
}

/// Downloads the latest configuration over HTTP.
pub struct ConfigFetcher {
    http_client: Client,
    url: String,
    etag: Mutex<Option<String>>,
}

impl ConfigFetcher {
    /// Create a fetcher for the given project on the default CDN.
    pub fn new(http_client: Client, project_secret: &str) -> Self {
        Self::with_base_url(http_client, BASE_URL, project_secret)
    }

    /// Create a fetcher for the given project on a custom origin.
    pub fn with_base_url(http_client: Client, base_url: &str, project_secret: &str) -> Self {
        let url = format!(
            "{}/configuration-files/{}/config.json",
            base_url.trim_end_matches('/'),
            project_secret
        );
        Self::with_url(http_client, url)
    }

    /// Create a fetcher that requests exactly `url` (used against mock servers).
    pub fn with_url(http_client: Client, url: impl Into<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
            etag: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn current_etag(&self) -> Option<String> {
        self.etag
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn remember_etag(&self, etag: Option<String>) {
        *self
            .etag
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = etag;
    }

    /// Fetch the configuration file.
    ///
    /// Never returns an error: transport problems and non-success status codes
    /// are logged and reported as [`FetchResponse::Failed`].
    pub async fn fetch(&self) -> FetchResponse {
        let mut request = self
            .http_client
            .get(&self.url)
            .header(USER_AGENT, SDK_USER_AGENT);

        if let Some(etag) = self.current_etag() {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(url = %self.url, error = %e, "Failed to fetch the latest configuration");
                return FetchResponse::Failed;
            }
        };

        let status = response.status();
        if status.is_success() {
            let etag = response
                .headers()
                .get(ETAG)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            return match response.text().await {
                Ok(body) => {
                    self.remember_etag(etag);
                    FetchResponse::Fetched(body)
                }
                Err(e) => {
                    error!(url = %self.url, error = %e, "Failed to read configuration body");
                    FetchResponse::Failed
                }
            };
        }

        if status == StatusCode::NOT_MODIFIED {
            return FetchResponse::NotModified;
        }

        debug!(url = %self.url, status = %status, "Non success status code");
        FetchResponse::Failed
    }
}

/// Build the default HTTP client used when the caller does not supply one.
pub fn default_http_client() -> crate::Result<Client> {
    Ok(Client::builder().user_agent(SDK_USER_AGENT).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn fetcher_for(server: &Server) -> ConfigFetcher {
        ConfigFetcher::with_url(Client::new(), format!("{}/config.json", server.url()))
    }

    #[test]
    fn test_url_for_project() {
        let fetcher = ConfigFetcher::new(Client::new(), "samples/01");
        assert_eq!(
            fetcher.url(),
            "https://cdn.betterconfig.com/configuration-files/samples/01/config.json"
        );

        let fetcher = ConfigFetcher::with_base_url(Client::new(), "http://localhost:8080/", "abc");
        assert_eq!(
            fetcher.url(),
            "http://localhost:8080/configuration-files/abc/config.json"
        );
    }

    #[tokio::test]
    async fn test_fetch_sends_etag_back() {
        let mut server = Server::new_async().await;
        let body = r#"{ "fakeKey":"fakeValue" }"#;

        let first = server
            .mock("GET", "/config.json")
            .match_header("if-none-match", Matcher::Missing)
            .with_status(200)
            .with_header("ETag", "fakeETag")
            .with_body(body)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/config.json")
            .match_header("if-none-match", "fakeETag")
            .with_status(304)
            .create_async()
            .await;

        let fetcher = fetcher_for(&server);

        let response = fetcher.fetch().await;
        assert_eq!(response.config(), Some(body));
        assert!(fetcher.fetch().await.is_not_modified());

        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/config.json")
            .match_header("user-agent", SDK_USER_AGENT)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let fetcher = fetcher_for(&server);
        assert!(fetcher.fetch().await.is_fetched());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_failed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/config.json")
            .with_status(500)
            .create_async()
            .await;

        let fetcher = fetcher_for(&server);
        let response = fetcher.fetch().await;
        assert!(response.is_failed());
        assert_eq!(response.config(), None);
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_failed() {
        let fetcher = ConfigFetcher::with_url(Client::new(), "http://127.0.0.1:1/config.json");
        assert!(fetcher.fetch().await.is_failed());
    }
}

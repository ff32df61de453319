//! Async resource fetching wrapping reqwest.
//!
//! One call, one result: no retries here. Callers decide what a failure
//! means for them (the batch requester simply drops the item).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER};

use crate::config::PreviewConfig;
use crate::types::FetchError;

/// Browser user agent sent with every request.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

/// Anything that can turn a URL into bytes.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `url` with optional query parameters.
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<Vec<u8>, FetchError>;

    /// Fetch a document and decode it as UTF-8 (lossy).
    async fn fetch_text(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String, FetchError> {
        let bytes = self.fetch(url, params).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// HTTP fetcher with the referer, cookie and timeout the gallery expects.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from the pipeline configuration.
    pub fn new(config: &PreviewConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        let referer = HeaderValue::from_str(&config.referer)
            .map_err(|e| FetchError::Transport(format!("Invalid referer header: {e}")))?;
        headers.insert(REFERER, referer);

        if let Some(session) = &config.session_cookie {
            let cookie = HeaderValue::from_str(&format!("PHPSESSID={session}"))
                .map_err(|e| FetchError::Transport(format!("Invalid session cookie: {e}")))?;
            headers.insert(COOKIE, cookie);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<Vec<u8>, FetchError> {
        let mut request = self.client.get(url);
        if !params.is_empty() {
            request = request.query(params);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("{url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Network {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(format!("{url}: {e}")))?;

        tracing::debug!("Fetched {} bytes from {url}", body.len());
        Ok(body.to_vec())
    }
}

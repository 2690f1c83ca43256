// src/page_download.rs
use crate::errors::FetchError;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::sync::Mutex;
use std::time::Duration;

// ===== fetcher
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

// ===== Live http fetcher
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(
        user_agent: &str,
        accept: &str,
        accept_language: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let mut headers: HeaderMap = HeaderMap::new();
        headers.insert(ACCEPT, header_value(accept)?);
        if let Some(language) = accept_language {
            headers.insert(ACCEPT_LANGUAGE, header_value(language)?);
        }

        let client: Client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    /// Client for the JSON feed.
    pub fn for_feed(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        Self::new(user_agent, "application/json", None, timeout)
    }

    /// Client that looks like a desktop browser, for search result pages.
    pub fn for_search(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        Self::new(
            user_agent,
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            Some("zh-CN,zh;q=0.9,en;q=0.8"),
            timeout,
        )
    }
}

fn header_value(value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value)
        .map_err(|e| FetchError::Client(format!("invalid header value '{}': {}", value, e)))
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        info!("HttpPageFetcher: fetching {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status });
        }
        let body: String = response.text().await?;
        debug!("HttpPageFetcher: {} returned {} bytes", url, body.len());
        Ok(body)
    }
}

// ===== Fake http fetcher for testing
pub struct FakeFetcher {
    response: Option<String>,
    requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: Some(response.into()), requested: Mutex::new(Vec::new()) }
    }

    /// Every request answers 503.
    pub fn unavailable() -> Self {
        Self { response: None, requested: Mutex::new(Vec::new()) }
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().map(|urls| urls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Ok(mut urls) = self.requested.lock() {
            urls.push(url.to_string());
        }
        match &self.response {
            Some(body) => Ok(body.clone()),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_fetcher_records_requests() {
        let fetcher = FakeFetcher::new("body");
        assert_eq!(fetcher.fetch("http://example.com/a").await.unwrap(), "body");
        assert_eq!(fetcher.requested_urls(), vec!["http://example.com/a".to_string()]);
    }

    #[tokio::test]
    async fn test_unavailable_fetcher_returns_status_error() {
        let fetcher = FakeFetcher::unavailable();
        let result = fetcher.fetch("http://example.com").await;
        assert!(matches!(
            result,
            Err(FetchError::Status { status: reqwest::StatusCode::SERVICE_UNAVAILABLE, .. })
        ));
    }

    #[test]
    fn test_http_fetchers_build() {
        assert!(HttpPageFetcher::for_feed("HistoryBot/1.0", Duration::from_secs(10)).is_ok());
        assert!(HttpPageFetcher::for_search("Mozilla/5.0", Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let result = HttpPageFetcher::new("ua", "bad\nvalue", None, Duration::from_secs(1));
        assert!(matches!(result, Err(FetchError::Client(_))));
    }

    // Unreachable port on localhost: the request fails fast with a transport error.
    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let fetcher = HttpPageFetcher::for_feed("HistoryBot/1.0", Duration::from_secs(2)).unwrap();
        let result = fetcher.fetch("http://127.0.0.1:9/feed").await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}

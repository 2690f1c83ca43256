// src/config.rs
use std::path::PathBuf;
use std::time::Duration;

pub const FEED_BASE_URL: &str = "https://zh.wikipedia.org/api/rest_v1/feed/onthisday/events";
pub const SEARCH_BASE_URL: &str = "https://cn.bing.com/search";

pub const FEED_USER_AGENT: &str = "HistoryBot/1.0 (today-in-history terminal client)";
pub const SEARCH_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_SEARCH_RESULTS: usize = 5;
pub const UI_TICK: Duration = Duration::from_millis(100);
pub const LOG_FILE: &str = "today_in_history.log";

/// Everything the pipeline and the terminal loop need to know up front.
/// There is no file or flag parsing; `Default` is the configuration.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub feed_base_url: String,
    pub search_base_url: String,
    pub feed_user_agent: String,
    pub search_user_agent: String,
    pub request_timeout: Duration,
    pub max_search_results: usize,
    pub ui_tick: Duration,
    pub log_file: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            feed_base_url: FEED_BASE_URL.to_string(),
            search_base_url: SEARCH_BASE_URL.to_string(),
            feed_user_agent: FEED_USER_AGENT.to_string(),
            search_user_agent: SEARCH_USER_AGENT.to_string(),
            request_timeout: REQUEST_TIMEOUT,
            max_search_results: MAX_SEARCH_RESULTS,
            ui_tick: UI_TICK,
            log_file: PathBuf::from(LOG_FILE),
        }
    }
}

impl HistoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // Builder methods
    pub fn with_feed_base_url(mut self, url: impl Into<String>) -> Self {
        self.feed_base_url = url.into();
        self
    }

    pub fn with_search_base_url(mut self, url: impl Into<String>) -> Self {
        self.search_base_url = url.into();
        self
    }

    pub fn with_max_search_results(mut self, limit: usize) -> Self {
        self.max_search_results = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_ten_second_timeout_and_five_results() {
        let config = HistoryConfig::new();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_search_results, 5);
        assert!(config.feed_base_url.starts_with("https://zh.wikipedia.org/"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = HistoryConfig::new()
            .with_feed_base_url("http://localhost/feed")
            .with_search_base_url("http://localhost/search")
            .with_max_search_results(3);
        assert_eq!(config.feed_base_url, "http://localhost/feed");
        assert_eq!(config.search_base_url, "http://localhost/search");
        assert_eq!(config.max_search_results, 3);
    }
}

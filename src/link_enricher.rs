// src/link_enricher.rs
use crate::errors::FetchError;
use crate::history::RelatedLink;
use crate::page_download::PageFetcher;
use async_trait::async_trait;
use log::{debug, info, warn};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use url::Url;

/// Supplementary links for one event. Never fails: errors come back as an
/// empty list, and the caller decides on a fallback.
#[async_trait]
pub trait LinkSource: Send + Sync {
    async fn enrich(&self, year: i32, content: &str) -> Vec<RelatedLink>;
}

pub fn search_query(year: i32, content: &str) -> String {
    format!("{} {}", year, content.trim())
}

pub fn search_url(base_url: &str, query: &str) -> Result<Url, FetchError> {
    Url::parse_with_params(base_url, &[("q", query), ("ensearch", "0")])
        .map_err(|e| FetchError::Parse(format!("invalid search url '{}': {}", base_url, e)))
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::Parse(format!("selector '{}': {}", css, e)))
}

/// Only absolute http(s) destinations are worth showing.
fn is_absolute_http(href: &str) -> bool {
    Url::parse(href).map(|u| u.scheme() == "http" || u.scheme() == "https").unwrap_or(false)
}

fn result_link(block: ElementRef<'_>, anchor: &Selector, heading: &Selector) -> Option<RelatedLink> {
    let href: &str = block.select(anchor).next()?.value().attr("href")?.trim();
    let title: String =
        block.select(heading).next()?.text().map(str::trim).collect::<String>();

    if href.is_empty() || title.is_empty() || !is_absolute_http(href) {
        debug!("extract_links: skipping result (href='{}', title='{}')", href, title);
        return None;
    }
    Some(RelatedLink::new(title, href))
}

/// Pulls titled links out of a Bing result page. Only the first `limit`
/// result blocks are looked at; ranking order is kept.
pub fn extract_links(html: &str, limit: usize) -> Result<Vec<RelatedLink>, FetchError> {
    let document = Html::parse_document(html);
    let result_block: Selector = selector("li.b_algo")?;
    let anchor: Selector = selector("a")?;
    let heading: Selector = selector("h2")?;

    Ok(document
        .select(&result_block)
        .take(limit)
        .filter_map(|block| result_link(block, &anchor, &heading))
        .collect())
}

// ===== Bing implementation
pub struct BingLinkEnricher {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
    max_results: usize,
}

impl BingLinkEnricher {
    pub fn new(fetcher: Arc<dyn PageFetcher>, base_url: impl Into<String>, max_results: usize) -> Self {
        Self { fetcher, base_url: base_url.into(), max_results }
    }

    async fn search(&self, year: i32, content: &str) -> Result<Vec<RelatedLink>, FetchError> {
        let url: Url = search_url(&self.base_url, &search_query(year, content))?;
        let body: String = self.fetcher.fetch(url.as_str()).await?;
        let links: Vec<RelatedLink> = extract_links(&body, self.max_results)?;
        if links.is_empty() {
            return Err(FetchError::NoData);
        }
        Ok(links)
    }
}

#[async_trait]
impl LinkSource for BingLinkEnricher {
    async fn enrich(&self, year: i32, content: &str) -> Vec<RelatedLink> {
        match self.search(year, content).await {
            Ok(links) => {
                info!("BingLinkEnricher: {} links for year {}", links.len(), year);
                links
            }
            Err(FetchError::NoData) => {
                debug!("BingLinkEnricher: no results for year {}", year);
                Vec::new()
            }
            Err(e) => {
                warn!("BingLinkEnricher: search for year {} failed: {}", year, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_download::FakeFetcher;

    const RESULT_PAGE: &str = r#"
        <html><body><ol id="b_results">
          <li class="b_algo"><h2><a href="https://example.com/one">First <strong>result</strong></a></h2></li>
          <li class="b_ad"><h2><a href="https://ads.example.com">Ad</a></h2></li>
          <li class="b_algo"><h2><a href="/relative/path">Relative</a></h2></li>
          <li class="b_algo"><a href="https://example.com/untitled">no heading</a></li>
          <li class="b_algo"><h2>   </h2><a href="https://example.com/blank">blank</a></li>
          <li class="b_algo"><h2><a href="http://example.com/five">Fifth</a></h2></li>
          <li class="b_algo"><h2><a href="https://example.com/six">Sixth</a></h2></li>
        </ol></body></html>
    "#;

    #[test]
    fn test_extract_links_keeps_absolute_titled_results_in_order() {
        let links = extract_links(RESULT_PAGE, 5).unwrap();
        assert_eq!(
            links,
            vec![
                RelatedLink::new("Firstresult", "https://example.com/one"),
                RelatedLink::new("Fifth", "http://example.com/five"),
            ]
        );
    }

    #[test]
    fn test_extract_links_respects_limit() {
        let links = extract_links(RESULT_PAGE, 1).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url(), "https://example.com/one");

        let all = extract_links(RESULT_PAGE, 10).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].title(), "Sixth");
    }

    #[test]
    fn test_extract_links_on_unrelated_html() {
        assert!(extract_links("<p>nothing here</p>", 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_url_encodes_query() {
        let url = search_url("https://cn.bing.com/search", &search_query(1969, "阿波罗 11号")).unwrap();
        assert_eq!(url.host_str(), Some("cn.bing.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "1969 阿波罗 11号".to_string()),
                ("ensearch".to_string(), "0".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_enrich_returns_links() {
        let fake = Arc::new(FakeFetcher::new(RESULT_PAGE));
        let enricher = BingLinkEnricher::new(fake.clone(), "http://search.test/search", 5);

        let links = enricher.enrich(1969, "Apollo").await;

        assert_eq!(links.len(), 2);
        let requested = fake.requested_urls();
        assert_eq!(requested.len(), 1);
        assert!(requested[0].starts_with("http://search.test/search?q=1969+Apollo"));
    }

    #[tokio::test]
    async fn test_enrich_failure_yields_empty() {
        let enricher =
            BingLinkEnricher::new(Arc::new(FakeFetcher::unavailable()), "http://search.test", 5);
        assert!(enricher.enrich(2001, "X").await.is_empty());

        let enricher =
            BingLinkEnricher::new(Arc::new(FakeFetcher::new("<html></html>")), "http://search.test", 5);
        assert!(enricher.enrich(2001, "X").await.is_empty());
    }

    #[tokio::test]
    async fn test_enrich_with_bad_base_url_yields_empty() {
        let fake = Arc::new(FakeFetcher::new(RESULT_PAGE));
        let enricher = BingLinkEnricher::new(fake.clone(), "not a url", 5);
        assert!(enricher.enrich(2001, "X").await.is_empty());
        assert!(fake.requested_urls().is_empty());
    }
}

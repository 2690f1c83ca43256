use anyhow::Result;
use chrono::Local;
use log::info;
use std::sync::Arc;
use today_in_history::app::{self, App};
use today_in_history::browser::SystemBrowser;
use today_in_history::config::HistoryConfig;
use today_in_history::event_fetcher::OnThisDayFetcher;
use today_in_history::history_manager::HistoryManager;
use today_in_history::link_enricher::BingLinkEnricher;
use today_in_history::logging::{init_file_logging, level_from_env};
use today_in_history::page_download::HttpPageFetcher;
use tokio::runtime::Handle;

#[tokio::main]
async fn main() -> Result<()> {
    let config = HistoryConfig::default();
    init_file_logging(&config.log_file, level_from_env(std::env::var("RUST_LOG").ok().as_deref()))?;

    let today = Local::now().date_naive();
    info!("today_in_history starting for {}", today.format("%m-%d"));

    let feed_client = HttpPageFetcher::for_feed(&config.feed_user_agent, config.request_timeout)?;
    let search_client =
        HttpPageFetcher::for_search(&config.search_user_agent, config.request_timeout)?;

    let events = Arc::new(OnThisDayFetcher::new(Arc::new(feed_client), config.feed_base_url.clone()));
    let links = Arc::new(BingLinkEnricher::new(
        Arc::new(search_client),
        config.search_base_url.clone(),
        config.max_search_results,
    ));

    // One manager per display session; its tasks are abandoned on exit.
    let manager = HistoryManager::new(today, events, links, Handle::current());
    let app = App::new(manager, Box::new(SystemBrowser));

    app::start_ui(app, config.ui_tick)
}

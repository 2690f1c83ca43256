// src/lib.rs
pub mod app;
pub mod browser;
pub mod config;
pub mod errors;
pub mod event_fetcher;
pub mod history;
pub mod history_manager;
pub mod link_enricher;
pub mod logging;
pub mod page_download;
pub mod ui;
pub mod widgets;

#[cfg(test)]
mod testing;

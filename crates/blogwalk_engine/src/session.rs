use std::sync::Arc;

use blogwalk_core::{
    LargestWidthSelector, MediaRecord, MediaSelector, WalkError, WalkFailure, WalkOptions,
};
use engine_logging::engine_info;
use futures_util::Stream;

use crate::events::EventBus;
use crate::source::FeedSource;
use crate::token::SessionTokenCache;
use crate::walker::Walker;

/// Entry point for walking blogs against one remote source.
///
/// Walks started from the same session share the event bus and the session
/// token, so the token is acquired at most once per session.
pub struct ScrapeSession {
    source: Arc<dyn FeedSource>,
    bus: Arc<EventBus>,
    tokens: Arc<SessionTokenCache>,
    selector: Arc<dyn MediaSelector>,
}

impl ScrapeSession {
    pub fn new(source: Arc<dyn FeedSource>) -> Self {
        Self {
            source,
            bus: Arc::new(EventBus::new()),
            tokens: Arc::new(SessionTokenCache::new()),
            selector: Arc::new(LargestWidthSelector),
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn MediaSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Shares an existing bus, e.g. one with listeners registered up front.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// Lazily walks `blog`. Nothing is fetched until the first record is pulled.
    pub fn walk(&self, blog: &str, options: WalkOptions) -> Result<Walker, WalkError> {
        let blog = blog.trim();
        if blog.is_empty() {
            return Err(WalkError::EmptyBlog);
        }
        engine_info!("walking {} from page {}", blog, options.start_page);
        Ok(Walker::new(
            blog.to_string(),
            Arc::clone(&self.source),
            Arc::clone(&self.bus),
            Arc::clone(&self.tokens),
            Arc::clone(&self.selector),
            options,
        ))
    }

    pub fn stream(
        &self,
        blog: &str,
        options: WalkOptions,
    ) -> Result<impl Stream<Item = Result<MediaRecord, WalkFailure>> + Send, WalkError> {
        Ok(self.walk(blog, options)?.into_stream())
    }

    /// Collects every record of at most `pages` pages. A tighter `max_index` in
    /// `options` still wins.
    pub async fn collect_pages(
        &self,
        blog: &str,
        pages: u32,
        mut options: WalkOptions,
    ) -> Result<Vec<MediaRecord>, WalkFailure> {
        options.max_index = Some(options.max_index.map_or(pages, |limit| limit.min(pages)));
        let mut walker = self.walk(blog, options).map_err(|error| WalkFailure {
            error,
            resume_from: None,
        })?;

        let mut records = Vec::new();
        while let Some(record) = walker.next_record().await? {
            records.push(record);
        }
        engine_info!(
            "collected {} records from {} pages of {}",
            records.len(),
            walker.pages_fetched(),
            blog
        );
        Ok(records)
    }

    /// Drops the cached session token; the next fetch acquires a fresh one.
    pub async fn reset_session_token(&self) {
        self.tokens.reset().await;
    }

    pub async fn has_session_token(&self) -> bool {
        self.tokens.is_cached().await
    }
}

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use blogwalk_core::{
    base_post_id, build_records, extract, parse_page, update, Cursor, Effect, ExtractionFailure,
    FetchError, MediaRecord, MediaSelector, Msg, Page, Phase, Post, StopReason, WalkError, WalkFailure,
    WalkOptions, WalkState,
};
use engine_logging::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};
use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use crate::events::EventBus;
use crate::resolver::ReblogResolver;
use crate::source::FeedSource;
use crate::token::SessionTokenCache;
use crate::types::{PageBoundary, WalkEnd, WalkErrorEvent};

/// Pull-based walk over one blog.
///
/// At most one fetch is in flight, and nothing is fetched until every record of
/// the current page has been handed out. Records are delivered in post order and
/// pages in cursor order.
pub struct Walker {
    blog: String,
    source: Arc<dyn FeedSource>,
    bus: Arc<EventBus>,
    tokens: Arc<SessionTokenCache>,
    selector: Arc<dyn MediaSelector>,
    state: WalkState,
    posts: VecDeque<Post>,
    ready: VecDeque<MediaRecord>,
    until: HashSet<String>,
    /// Posts already processed by this walk; offset paging repeats them when the blog grows.
    seen: HashSet<String>,
    cancel: CancellationToken,
    stop_reason: Option<StopReason>,
}

impl Walker {
    pub(crate) fn new(
        blog: String,
        source: Arc<dyn FeedSource>,
        bus: Arc<EventBus>,
        tokens: Arc<SessionTokenCache>,
        selector: Arc<dyn MediaSelector>,
        options: WalkOptions,
    ) -> Self {
        let until = options
            .until_post_ids
            .iter()
            .map(|id| base_post_id(id).to_string())
            .collect();
        Self {
            blog,
            source,
            bus,
            tokens,
            selector,
            state: WalkState::new(options),
            posts: VecDeque::new(),
            ready: VecDeque::new(),
            until,
            seen: HashSet::new(),
            cancel: CancellationToken::new(),
            stop_reason: None,
        }
    }

    pub fn blog(&self) -> &str {
        &self.blog
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Set once the walk has ended; `StopReason::Exhausted` is the only "complete" outcome.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn pages_fetched(&self) -> u32 {
        self.state.pages_fetched()
    }

    pub fn records_emitted(&self) -> u64 {
        self.state.records_emitted()
    }

    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.state.next_cursor()
    }

    /// Cancelling stops the walk at the next page boundary; the current page still drains.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next record, `Ok(None)` once the walk has ended.
    pub async fn next_record(&mut self) -> Result<Option<MediaRecord>, WalkFailure> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                self.bus.publish_media(&record);
                self.dispatch(Msg::RecordEmitted).await?;
                return Ok(Some(record));
            }

            match self.state.phase() {
                Phase::Idle => self.dispatch(Msg::Start).await?,
                Phase::DrainingPage => match self.posts.pop_front() {
                    Some(post) => self.process_post(post).await?,
                    None => self.dispatch(Msg::PageDrained).await?,
                },
                Phase::Done(_) | Phase::Failed => return Ok(None),
                Phase::FetchingPage | Phase::AwaitingAdvanceDecision => {
                    // dispatch settles both phases before returning
                    engine_warn!("walk of {} left in {:?}", self.blog, self.state.phase());
                    return Ok(None);
                }
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<MediaRecord, WalkFailure>> + Send {
        futures_util::stream::unfold(Some(self), |walker| async move {
            let mut walker = walker?;
            match walker.next_record().await {
                Ok(Some(record)) => Some((Ok(record), Some(walker))),
                Ok(None) => None,
                Err(failure) => Some((Err(failure), None)),
            }
        })
    }

    async fn dispatch(&mut self, msg: Msg) -> Result<(), WalkFailure> {
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            let (next, effects) = update(std::mem::take(&mut self.state), msg);
            self.state = next;

            for effect in effects {
                match effect {
                    Effect::FetchPage { cursor } => {
                        let page = match self.fetch_page(&cursor).await {
                            Ok(page) => page,
                            Err(error) => return self.fail(error),
                        };
                        let post_count = page.posts.len();
                        self.posts = page.posts.into();
                        inbox.push_back(Msg::PageFetched {
                            next_cursor: page.next_cursor,
                            post_count,
                        });
                    }
                    Effect::PublishPageBoundary {
                        next_cursor,
                        records_on_page,
                    } => {
                        let boundary = PageBoundary {
                            blog: self.blog.clone(),
                            next_cursor,
                            records_on_page,
                            pages_fetched: self.state.pages_fetched(),
                        };
                        let proceed = self.bus.vote_page_boundary(&boundary).await;
                        inbox.push_back(Msg::AdvanceDecided {
                            vetoed: !proceed,
                            cancelled: self.cancel.is_cancelled(),
                        });
                    }
                    Effect::Finish { reason } => self.finish(reason),
                }
            }
        }
        Ok(())
    }

    async fn fetch_page(&self, cursor: &Cursor) -> Result<Page, WalkError> {
        engine_info!(
            "fetching page {} (offset {}) of {}",
            cursor.page_number,
            cursor.offset,
            self.blog
        );
        let transport = |source: FetchError| WalkError::Transport {
            blog: self.blog.clone(),
            source,
        };

        let token = self
            .tokens
            .get_or_acquire(self.source.as_ref())
            .await
            .map_err(transport)?;
        let body = self
            .source
            .fetch_page(&self.blog, cursor, &token)
            .await
            .map_err(transport)?;
        let page = parse_page(body, cursor).map_err(|err| WalkError::MalformedResponse {
            context: format!("page {} of {}", cursor.page_number, self.blog),
            message: err.to_string(),
        })?;

        engine_info!(
            "page {} of {}: {} posts, more pages: {}",
            cursor.page_number,
            self.blog,
            page.posts.len(),
            page.next_cursor.is_some()
        );
        Ok(page)
    }

    async fn process_post(&mut self, post: Post) -> Result<(), WalkFailure> {
        if self.until.contains(base_post_id(&post.id)) {
            engine_info!("reached known post {} on {}", post.id, self.blog);
            self.posts.clear();
            return self.dispatch(Msg::KnownPostReached).await;
        }
        if !self.seen.insert(post.id.clone()) {
            engine_debug!("post {} already walked on {}, skipping", post.id, self.blog);
            return Ok(());
        }

        let mut candidates = extract(&post);
        if candidates.is_empty() {
            let Some(lineage) = post.reblog.clone() else {
                engine_trace!("post {} carries no media", post.id);
                return Ok(());
            };
            let token = match self.tokens.get_or_acquire(self.source.as_ref()).await {
                Ok(token) => token,
                Err(err) => return self.isolate(post.id, ExtractionFailure::ResolverFetch(err)),
            };
            let resolved = ReblogResolver::new(self.source.as_ref(), &token)
                .resolve(&lineage.root_author, &lineage.root_id)
                .await;
            match resolved {
                Ok(root) => candidates = extract(&root),
                Err(failure) => return self.isolate(post.id, failure),
            }
        }

        match build_records(
            &post,
            &candidates,
            self.selector.as_ref(),
            &self.blog,
            self.state.next_cursor(),
        ) {
            Ok(records) => {
                engine_debug!("post {} yielded {} records", post.id, records.len());
                self.ready.extend(records);
                Ok(())
            }
            Err(failure) => self.isolate(post.id, failure),
        }
    }

    /// Per-post failure: reported and skipped when someone listens for errors,
    /// otherwise raised like a fatal one.
    fn isolate(&mut self, post_id: String, failure: ExtractionFailure) -> Result<(), WalkFailure> {
        let error = WalkError::Extraction { post_id, failure };
        if !self.bus.handles_errors(&self.blog) {
            return self.fail(error);
        }
        engine_warn!("skipping post on {}: {}", self.blog, error);
        self.bus.publish_walk_error(&WalkErrorEvent {
            blog: self.blog.clone(),
            error,
            cursor: self.state.current_cursor().cloned(),
        });
        Ok(())
    }

    fn fail(&mut self, error: WalkError) -> Result<(), WalkFailure> {
        let resume_from = self.state.current_cursor().cloned();
        let raised = !self.bus.handles_errors(&self.blog);
        engine_error!("walk of {} stopped early: {}", self.blog, error);

        if !raised {
            self.bus.publish_walk_error(&WalkErrorEvent {
                blog: self.blog.clone(),
                error: error.clone(),
                cursor: resume_from.clone(),
            });
        }

        self.posts.clear();
        self.ready.clear();
        let (next, effects) = update(std::mem::take(&mut self.state), Msg::FatalError { raised });
        self.state = next;
        for effect in effects {
            if let Effect::Finish { reason } = effect {
                self.finish(reason);
            }
        }

        if raised {
            Err(WalkFailure { error, resume_from })
        } else {
            Ok(())
        }
    }

    fn finish(&mut self, reason: StopReason) {
        self.stop_reason = Some(reason);
        let resume_cursor = match reason {
            StopReason::Error => self.state.current_cursor().cloned(),
            _ => self.state.next_cursor().cloned(),
        };
        engine_info!(
            "walk of {} ended ({:?}) after {} pages, {} records",
            self.blog,
            reason,
            self.state.pages_fetched(),
            self.state.records_emitted()
        );
        self.bus.publish_walk_end(&WalkEnd {
            blog: self.blog.clone(),
            reason,
            pages_fetched: self.state.pages_fetched(),
            records_emitted: self.state.records_emitted(),
            resume_cursor,
        });
    }
}

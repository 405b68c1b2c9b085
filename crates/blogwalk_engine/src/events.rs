use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use blogwalk_core::MediaRecord;
use engine_logging::engine_trace;
use futures_util::future::{self, BoxFuture, FutureExt};

use crate::types::{
    EventKind, PageBoundary, Scope, SubscriptionId, WalkEnd, WalkErrorEvent,
};

type MediaListener = Arc<dyn Fn(&MediaRecord) + Send + Sync>;
type BoundaryListener = Arc<dyn Fn(&PageBoundary) -> BoxFuture<'static, bool> + Send + Sync>;
type ErrorListener = Arc<dyn Fn(&WalkErrorEvent) + Send + Sync>;
type EndListener = Arc<dyn Fn(&WalkEnd) + Send + Sync>;

#[derive(Clone)]
enum Listener {
    Media(MediaListener),
    PageBoundary(BoundaryListener),
    WalkError(ErrorListener),
    WalkEnd(EndListener),
}

type Registry = HashMap<(Scope, EventKind), Vec<(SubscriptionId, Listener)>>;

/// Publish/subscribe registry keyed by (scope, kind).
///
/// Every event is delivered to the listeners of its blog scope first, then to the
/// wildcard listeners. Listeners run outside the registry lock, so they may
/// subscribe or unsubscribe while being called.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    listeners: RwLock<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_media<F>(&self, scope: Scope, listener: F) -> SubscriptionId
    where
        F: Fn(&MediaRecord) + Send + Sync + 'static,
    {
        self.subscribe(scope, EventKind::Media, Listener::Media(Arc::new(listener)))
    }

    /// Returning `false` vetoes the advance to the next page.
    pub fn on_page_boundary<F>(&self, scope: Scope, listener: F) -> SubscriptionId
    where
        F: Fn(&PageBoundary) -> bool + Send + Sync + 'static,
    {
        let listener: BoundaryListener =
            Arc::new(move |boundary: &PageBoundary| future::ready(listener(boundary)).boxed());
        self.subscribe(scope, EventKind::PageBoundary, Listener::PageBoundary(listener))
    }

    /// Like [`EventBus::on_page_boundary`], for listeners that need to await before voting.
    pub fn on_page_boundary_async<F, Fut>(&self, scope: Scope, listener: F) -> SubscriptionId
    where
        F: Fn(PageBoundary) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let listener: BoundaryListener =
            Arc::new(move |boundary: &PageBoundary| listener(boundary.clone()).boxed());
        self.subscribe(scope, EventKind::PageBoundary, Listener::PageBoundary(listener))
    }

    /// Registering an error listener switches the scope to report-and-continue.
    pub fn on_walk_error<F>(&self, scope: Scope, listener: F) -> SubscriptionId
    where
        F: Fn(&WalkErrorEvent) + Send + Sync + 'static,
    {
        self.subscribe(scope, EventKind::WalkError, Listener::WalkError(Arc::new(listener)))
    }

    pub fn on_walk_end<F>(&self, scope: Scope, listener: F) -> SubscriptionId
    where
        F: Fn(&WalkEnd) + Send + Sync + 'static,
    {
        self.subscribe(scope, EventKind::WalkEnd, Listener::WalkEnd(Arc::new(listener)))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = false;
        for entries in registry.values_mut() {
            let before = entries.len();
            entries.retain(|(entry_id, _)| *entry_id != id);
            removed |= entries.len() != before;
        }
        registry.retain(|_, entries| !entries.is_empty());
        removed
    }

    /// Whether `blog` has a listener of `kind`, either scoped or wildcard.
    pub fn has_listeners(&self, blog: &str, kind: EventKind) -> bool {
        let registry = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        [Scope::blog(blog), Scope::All]
            .into_iter()
            .any(|scope| registry.get(&(scope, kind)).is_some_and(|v| !v.is_empty()))
    }

    pub fn handles_errors(&self, blog: &str) -> bool {
        self.has_listeners(blog, EventKind::WalkError)
    }

    pub fn publish_media(&self, record: &MediaRecord) {
        for listener in self.listeners_for(&record.blog, EventKind::Media) {
            if let Listener::Media(listener) = listener {
                listener(record);
            }
        }
    }

    /// Collects every vote; the advance proceeds unless at least one listener said `false`.
    pub async fn vote_page_boundary(&self, boundary: &PageBoundary) -> bool {
        let votes: Vec<_> = self
            .listeners_for(&boundary.blog, EventKind::PageBoundary)
            .into_iter()
            .filter_map(|listener| match listener {
                Listener::PageBoundary(listener) => Some(listener(boundary)),
                _ => None,
            })
            .collect();
        if votes.is_empty() {
            return true;
        }
        let results = future::join_all(votes).await;
        engine_trace!("page boundary votes for {}: {:?}", boundary.blog, results);
        results.into_iter().all(|vote| vote)
    }

    pub fn publish_walk_error(&self, event: &WalkErrorEvent) {
        for listener in self.listeners_for(&event.blog, EventKind::WalkError) {
            if let Listener::WalkError(listener) = listener {
                listener(event);
            }
        }
    }

    pub fn publish_walk_end(&self, event: &WalkEnd) {
        for listener in self.listeners_for(&event.blog, EventKind::WalkEnd) {
            if let Listener::WalkEnd(listener) = listener {
                listener(event);
            }
        }
    }

    fn subscribe(&self, scope: Scope, kind: EventKind, listener: Listener) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut registry = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        registry.entry((scope, kind)).or_default().push((id, listener));
        id
    }

    fn listeners_for(&self, blog: &str, kind: EventKind) -> Vec<Listener> {
        let registry = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        [Scope::blog(blog), Scope::All]
            .into_iter()
            .filter_map(|scope| registry.get(&(scope, kind)))
            .flat_map(|entries| entries.iter().map(|(_, listener)| listener.clone()))
            .collect()
    }
}

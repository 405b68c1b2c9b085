use blogwalk_core::{Cursor, StopReason, WalkError};

pub type SubscriptionId = u64;

/// Channel a listener is attached to: one blog, or every walk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Blog(String),
    All,
}

impl Scope {
    pub fn blog(name: impl Into<String>) -> Self {
        Scope::Blog(name.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Media,
    PageBoundary,
    WalkError,
    WalkEnd,
}

/// Published after a page drained, before the next page is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBoundary {
    pub blog: String,
    pub next_cursor: Cursor,
    pub records_on_page: usize,
    pub pages_fetched: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkErrorEvent {
    pub blog: String,
    pub error: WalkError,
    /// Cursor of the page that was being processed.
    pub cursor: Option<Cursor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEnd {
    pub blog: String,
    pub reason: StopReason,
    pub pages_fetched: u32,
    pub records_emitted: u64,
    /// Where a later walk could pick up: the failed page after an error, otherwise
    /// the next page that was not fetched.
    pub resume_cursor: Option<Cursor>,
}

//! Blogwalk engine: remote source, session token, event bus and the async walk driver.
mod events;
mod filename;
mod persist;
mod resolver;
mod session;
mod source;
mod token;
mod types;
mod walker;

pub use events::EventBus;
pub use filename::media_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use resolver::ReblogResolver;
pub use session::ScrapeSession;
pub use source::{FeedSource, FetchSettings, HttpFeedSource};
pub use token::{SessionToken, SessionTokenCache};
pub use types::{EventKind, PageBoundary, Scope, SubscriptionId, WalkEnd, WalkErrorEvent};
pub use walker::Walker;

pub use blogwalk_core::{
    CandidateKind, Cursor, ExtractionFailure, FailureKind, FetchError, LargestWidthSelector,
    MediaRecord, MediaSelector, Phase, StopReason, WalkError, WalkFailure, WalkOptions,
};

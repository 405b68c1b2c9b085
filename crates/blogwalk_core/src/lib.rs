//! Blogwalk core: data model, ingestion, media extraction and the pure walk state machine.
mod effect;
mod error;
mod extract;
mod ingest;
mod model;
mod msg;
mod normalize;
mod options;
mod select;
mod state;
mod update;

pub use effect::Effect;
pub use error::{ExtractionFailure, FailureKind, FetchError, IngestError, WalkError, WalkFailure};
pub use extract::{attribute_author, base_post_id, build_records, extract, photo_ids};
pub use ingest::{parse_page, parse_permalink, parse_post};
pub use model::{
    CandidateKind, ContentBlock, Cursor, MediaCandidate, MediaRecord, MediaVariant, Page, Post,
    ReblogLineage, TrailEntry,
};
pub use msg::Msg;
pub use normalize::{normalize_keys, to_snake_case};
pub use options::WalkOptions;
pub use select::{LargestWidthSelector, MediaSelector};
pub use state::{Phase, StopReason, WalkState};
pub use update::update;

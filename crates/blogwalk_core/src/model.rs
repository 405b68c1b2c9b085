use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One resolution of one media asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaVariant {
    /// Only used for ranking variants against each other.
    pub width: u32,
    pub url: String,
    pub media_key: Option<String>,
}

/// A single embedded element of a post or of one of its trail entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Image { variants: Vec<MediaVariant> },
    /// The video bytes are never downloaded; only the poster frame matters.
    Video { poster: Vec<MediaVariant> },
    Other,
}

impl ContentBlock {
    /// Stable content key of the block, taken from the first variant that carries one.
    pub fn media_key(&self) -> Option<&str> {
        let variants = match self {
            ContentBlock::Image { variants } => variants,
            ContentBlock::Video { poster } => poster,
            ContentBlock::Other => return None,
        };
        variants.iter().find_map(|variant| variant.media_key.as_deref())
    }
}

/// Ancestor content accumulated through a reblog chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrailEntry {
    pub blog: Option<String>,
    pub post_id: Option<String>,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReblogLineage {
    pub root_author: String,
    pub root_id: String,
    pub parent_id: Option<String>,
}

/// One unit of remote content, read-only once ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub blog: Option<String>,
    pub tags: Vec<String>,
    pub reblog: Option<ReblogLineage>,
    pub content: Vec<ContentBlock>,
    pub trail: Vec<TrailEntry>,
}

impl Post {
    /// Whether a reblog fallback fetch is possible for this post.
    pub fn has_root_reference(&self) -> bool {
        self.reblog.is_some()
    }
}

/// Continuation token for the next page of a blog.
///
/// Produced by the platform per page and consumed verbatim on the following fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub page_number: u32,
    pub offset: u64,
    /// Any further query parameters the platform asked to be echoed back.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Cursor {
    pub fn start(page_number: u32, offset: u64) -> Self {
        Self {
            page_number,
            offset,
            params: BTreeMap::new(),
        }
    }

    /// Query pairs to send with the fetch, page number and offset first.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page_number".to_string(), self.page_number.to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ];
        pairs.extend(
            self.params
                .iter()
                .filter(|(key, _)| key.as_str() != "page_number" && key.as_str() != "offset")
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        pairs
    }
}

/// One parsed page response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub posts: Vec<Post>,
    pub next_cursor: Option<Cursor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateKind {
    Image,
    VideoPoster,
}

/// A media element found in a post before a resolution has been chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCandidate {
    pub kind: CandidateKind,
    pub variants: Vec<MediaVariant>,
    pub media_key: Option<String>,
}

/// The externally visible output of a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRecord {
    pub photo_id: String,
    pub url: String,
    pub tags: Vec<String>,
    pub author: String,
    pub blog: String,
    pub post_id: String,
    pub kind: CandidateKind,
    /// Snapshot of the next-page cursor at the time this record was produced.
    pub next_cursor: Option<Cursor>,
}

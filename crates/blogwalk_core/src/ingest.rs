//! Ingestion boundary: raw platform JSON into [`Post`] and [`Page`].
//!
//! Keys are normalized once here; nothing downstream looks at raw JSON.
use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::IngestError;
use crate::model::{ContentBlock, Cursor, MediaVariant, Page, Post, ReblogLineage, TrailEntry};
use crate::normalize::{normalize_keys, to_snake_case};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(u64),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Text(text) => text,
            WireId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireBlog {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMedia {
    url: Option<String>,
    width: Option<u32>,
    media_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireBlock {
    Image { media: Option<Vec<WireMedia>> },
    Video { poster: Option<Vec<WireMedia>> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireTrailPost {
    id: Option<WireId>,
}

#[derive(Debug, Deserialize)]
struct WireTrail {
    blog: Option<WireBlog>,
    post: Option<WireTrailPost>,
    content: Option<Vec<WireBlock>>,
}

#[derive(Debug, Deserialize)]
struct WirePost {
    id_string: Option<String>,
    id: Option<WireId>,
    blog_name: Option<String>,
    blog: Option<WireBlog>,
    tags: Option<Vec<String>>,
    reblogged_root_name: Option<String>,
    reblogged_root_id: Option<WireId>,
    parent_post_id: Option<WireId>,
    reblogged_from_id: Option<WireId>,
    content: Option<Vec<WireBlock>>,
    trail: Option<Vec<WireTrail>>,
}

#[derive(Debug, Deserialize)]
struct WireNext {
    query_params: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct WireLinks {
    next: Option<WireNext>,
}

#[derive(Debug, Deserialize)]
struct WirePageBody {
    posts: Option<Vec<Value>>,
    #[serde(rename = "_links", alias = "links")]
    links: Option<WireLinks>,
}

#[derive(Debug, Deserialize)]
struct WirePageEnvelope {
    response: WirePageBody,
}

/// Parse one raw post record.
pub fn parse_post(raw: Value) -> Result<Post, IngestError> {
    let wire: WirePost = serde_json::from_value(normalize_keys(raw))?;
    post_from_wire(wire)
}

/// Parse a page response. `requested` is the cursor the page was fetched with and
/// supplies defaults for a next link that omits page number or offset.
pub fn parse_page(raw: Value, requested: &Cursor) -> Result<Page, IngestError> {
    let envelope: WirePageEnvelope = serde_json::from_value(normalize_keys(raw))?;
    let raw_posts = envelope
        .response
        .posts
        .ok_or(IngestError::MissingField("response.posts"))?;

    let mut posts = Vec::with_capacity(raw_posts.len());
    for (index, raw_post) in raw_posts.into_iter().enumerate() {
        let wire: WirePost = serde_json::from_value(raw_post)
            .map_err(|err| IngestError::Shape(format!("post #{index}: {err}")))?;
        posts.push(post_from_wire(wire)?);
    }

    let next_cursor = match envelope
        .response
        .links
        .and_then(|links| links.next)
        .and_then(|next| next.query_params)
    {
        Some(params) => Some(cursor_from_params(params, requested, posts.len())?),
        None => None,
    };

    Ok(Page { posts, next_cursor })
}

/// Parse a permalink response. `Ok(None)` means the response carried no post.
pub fn parse_permalink(raw: Value) -> Result<Option<Post>, IngestError> {
    let normalized = normalize_keys(raw);
    let response = match normalized {
        Value::Object(mut map) => map
            .remove("response")
            .ok_or(IngestError::MissingField("response"))?,
        _ => return Err(IngestError::Shape("permalink body is not an object".into())),
    };

    let candidate = match response {
        Value::Object(mut map) if map.contains_key("posts") => match map.remove("posts") {
            Some(Value::Array(posts)) => posts.into_iter().next(),
            _ => return Err(IngestError::InvalidValue {
                field: "response.posts",
                value: "not an array".into(),
            }),
        },
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => Some(Value::Object(map)),
        Value::Null => None,
        other => {
            return Err(IngestError::InvalidValue {
                field: "response",
                value: other.to_string(),
            })
        }
    };

    match candidate {
        Some(value) => {
            let wire: WirePost = serde_json::from_value(value)?;
            post_from_wire(wire).map(Some)
        }
        None => Ok(None),
    }
}

fn post_from_wire(wire: WirePost) -> Result<Post, IngestError> {
    let id = wire
        .id_string
        .or_else(|| wire.id.map(WireId::into_string))
        .filter(|id| !id.is_empty())
        .ok_or(IngestError::MissingField("id"))?;

    let blog = wire
        .blog_name
        .or_else(|| wire.blog.and_then(|blog| blog.name));

    let reblog = match (wire.reblogged_root_name, wire.reblogged_root_id) {
        (Some(root_author), Some(root_id)) if !root_author.is_empty() => Some(ReblogLineage {
            root_author,
            root_id: root_id.into_string(),
            parent_id: wire
                .parent_post_id
                .or(wire.reblogged_from_id)
                .map(WireId::into_string),
        }),
        _ => None,
    };

    let trail = wire
        .trail
        .unwrap_or_default()
        .into_iter()
        .map(|entry| TrailEntry {
            blog: entry.blog.and_then(|blog| blog.name),
            post_id: entry.post.and_then(|post| post.id).map(WireId::into_string),
            content: blocks_from_wire(entry.content),
        })
        .collect();

    Ok(Post {
        id,
        blog,
        tags: wire.tags.unwrap_or_default(),
        reblog,
        content: blocks_from_wire(wire.content),
        trail,
    })
}

fn blocks_from_wire(blocks: Option<Vec<WireBlock>>) -> Vec<ContentBlock> {
    blocks
        .unwrap_or_default()
        .into_iter()
        .map(|block| match block {
            WireBlock::Image { media } => ContentBlock::Image {
                variants: variants_from_wire(media),
            },
            WireBlock::Video { poster } => ContentBlock::Video {
                poster: variants_from_wire(poster),
            },
            WireBlock::Other => ContentBlock::Other,
        })
        .collect()
}

fn variants_from_wire(media: Option<Vec<WireMedia>>) -> Vec<MediaVariant> {
    media
        .unwrap_or_default()
        .into_iter()
        .filter_map(|media| {
            let url = media.url.filter(|url| !url.trim().is_empty())?;
            Some(MediaVariant {
                width: media.width.unwrap_or(0),
                url,
                media_key: media.media_key,
            })
        })
        .collect()
}

fn cursor_from_params(
    params: BTreeMap<String, Value>,
    requested: &Cursor,
    post_count: usize,
) -> Result<Cursor, IngestError> {
    let mut extra = BTreeMap::new();
    let mut page_number = None;
    let mut offset = None;

    for (key, value) in params {
        let text = match value {
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Null => continue,
            other => {
                return Err(IngestError::InvalidValue {
                    field: "query_params",
                    value: other.to_string(),
                })
            }
        };
        match to_snake_case(&key).as_str() {
            "page_number" => page_number = Some(parse_number::<u32>("page_number", &text)?),
            "offset" => offset = Some(parse_number::<u64>("offset", &text)?),
            _ => {
                extra.insert(key, text);
            }
        }
    }

    let page_number = match page_number {
        Some(number) => number,
        None => requested
            .page_number
            .checked_add(1)
            .ok_or_else(|| IngestError::InvalidValue {
                field: "page_number",
                value: format!("{} + 1", requested.page_number),
            })?,
    };
    let offset = match offset {
        Some(offset) => offset,
        None => requested
            .offset
            .checked_add(post_count as u64)
            .ok_or_else(|| IngestError::InvalidValue {
                field: "offset",
                value: format!("{} + {}", requested.offset, post_count),
            })?,
    };

    Ok(Cursor {
        page_number,
        offset,
        params: extra,
    })
}

fn parse_number<T: std::str::FromStr>(field: &'static str, text: &str) -> Result<T, IngestError> {
    text.trim().parse::<T>().map_err(|_| IngestError::InvalidValue {
        field,
        value: text.to_string(),
    })
}

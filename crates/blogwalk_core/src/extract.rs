use std::collections::HashSet;

use engine_logging::engine_trace;

use crate::error::ExtractionFailure;
use crate::model::{CandidateKind, ContentBlock, Cursor, MediaCandidate, MediaRecord, Post};
use crate::select::MediaSelector;

/// Ordered media candidates of a post: video posters first, then images.
///
/// Inline content and every trail entry are read as one sequence, in arrival order,
/// because media seen through a reblog only ever appears in the trail. Blocks sharing
/// a media key are kept once, at their first occurrence; keyless blocks are always kept.
pub fn extract(post: &Post) -> Vec<MediaCandidate> {
    let blocks = post
        .content
        .iter()
        .chain(post.trail.iter().flat_map(|entry| entry.content.iter()));

    let mut seen_keys = HashSet::new();
    let mut posters = Vec::new();
    let mut images = Vec::new();

    for block in blocks {
        let (kind, variants) = match block {
            ContentBlock::Image { variants } => (CandidateKind::Image, variants),
            ContentBlock::Video { poster } if !poster.is_empty() => {
                (CandidateKind::VideoPoster, poster)
            }
            ContentBlock::Video { .. } | ContentBlock::Other => continue,
        };

        let media_key = block.media_key().map(str::to_string);
        if let Some(key) = media_key.as_deref() {
            if !seen_keys.insert(key.to_string()) {
                engine_trace!("post {} repeats media key {}", post.id, key);
                continue;
            }
        }

        let candidate = MediaCandidate {
            kind,
            variants: variants.clone(),
            media_key,
        };
        match kind {
            CandidateKind::VideoPoster => posters.push(candidate),
            CandidateKind::Image => images.push(candidate),
        }
    }

    posters.extend(images);
    posters
}

/// `{post_id}` for a single item, `{post_id}_1 ..= {post_id}_N` otherwise.
pub fn photo_ids(post_id: &str, count: usize) -> Vec<String> {
    match count {
        0 => Vec::new(),
        1 => vec![post_id.to_string()],
        n => (1..=n).map(|index| format!("{post_id}_{index}")).collect(),
    }
}

/// Ultimate reblog root author for reblogs, otherwise the post's own blog.
pub fn attribute_author(post: &Post, walked_blog: &str) -> String {
    post.reblog
        .as_ref()
        .map(|lineage| lineage.root_author.clone())
        .or_else(|| post.blog.clone())
        .unwrap_or_else(|| walked_blog.to_string())
}

/// Resolve candidates into records. Identity, tags and author always come from `post`,
/// even when the candidates were extracted from a fetched reblog root.
///
/// Any candidate without a usable variant fails the whole post.
pub fn build_records(
    post: &Post,
    candidates: &[MediaCandidate],
    selector: &dyn MediaSelector,
    walked_blog: &str,
    next_cursor: Option<&Cursor>,
) -> Result<Vec<MediaRecord>, ExtractionFailure> {
    let author = attribute_author(post, walked_blog);
    let ids = photo_ids(&post.id, candidates.len());

    candidates
        .iter()
        .zip(ids)
        .map(|(candidate, photo_id)| {
            let url = selector.select(&candidate.variants)?;
            Ok(MediaRecord {
                photo_id,
                url,
                tags: post.tags.clone(),
                author: author.clone(),
                blog: walked_blog.to_string(),
                post_id: post.id.clone(),
                kind: candidate.kind,
                next_cursor: next_cursor.cloned(),
            })
        })
        .collect()
}

/// Post identifier with any `_N` item suffix removed.
pub fn base_post_id(id: &str) -> &str {
    match id.rsplit_once('_') {
        Some((base, suffix))
            if !base.is_empty()
                && !suffix.is_empty()
                && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => id,
    }
}

#[cfg(test)]
mod tests {
    use super::{base_post_id, photo_ids};

    #[test]
    fn single_item_keeps_post_id() {
        assert_eq!(photo_ids("42", 1), vec!["42"]);
        assert!(photo_ids("42", 0).is_empty());
    }

    #[test]
    fn multiple_items_are_suffixed_from_one() {
        assert_eq!(photo_ids("42", 3), vec!["42_1", "42_2", "42_3"]);
    }

    #[test]
    fn base_id_strips_item_suffix_only() {
        assert_eq!(base_post_id("42_3"), "42");
        assert_eq!(base_post_id("42"), "42");
        assert_eq!(base_post_id("abc_def"), "abc_def");
        assert_eq!(base_post_id("_1"), "_1");
    }
}

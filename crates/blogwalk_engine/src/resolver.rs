use blogwalk_core::{parse_permalink, ExtractionFailure, Post};
use engine_logging::engine_debug;

use crate::source::FeedSource;
use crate::token::SessionToken;

/// Fetches the canonical root of a reblog that carries no inline trail.
///
/// Every failure is scoped to the post being resolved.
pub struct ReblogResolver<'a> {
    source: &'a dyn FeedSource,
    token: &'a SessionToken,
}

impl<'a> ReblogResolver<'a> {
    pub fn new(source: &'a dyn FeedSource, token: &'a SessionToken) -> Self {
        Self { source, token }
    }

    pub async fn resolve(&self, root_author: &str, root_id: &str) -> Result<Post, ExtractionFailure> {
        engine_debug!("resolving reblog root {}/{}", root_author, root_id);
        let body = self
            .source
            .fetch_permalink(root_author, root_id, self.token)
            .await
            .map_err(ExtractionFailure::ResolverFetch)?;
        parse_permalink(body)
            .map_err(|err| ExtractionFailure::ResolverMalformed(err.to_string()))?
            .ok_or(ExtractionFailure::ResolverEmpty)
    }
}

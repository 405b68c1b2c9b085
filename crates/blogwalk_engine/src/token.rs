use std::fmt;

use blogwalk_core::FetchError;
use engine_logging::engine_info;
use tokio::sync::Mutex;

use crate::source::FeedSource;

/// Opaque bearer credential attached to page and permalink fetches.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// Session token shared by all walks of a session: acquired on first use, then
/// reused until [`SessionTokenCache::reset`]. Never refreshed on its own.
#[derive(Debug, Default)]
pub struct SessionTokenCache {
    token: Mutex<Option<SessionToken>>,
}

impl SessionTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_acquire(&self, source: &dyn FeedSource) -> Result<SessionToken, FetchError> {
        // Held across the acquisition so concurrent walks trigger it at most once.
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let token = source.acquire_session_token().await?;
        engine_info!("session token acquired");
        *slot = Some(token.clone());
        Ok(token)
    }

    pub async fn reset(&self) {
        *self.token.lock().await = None;
    }

    pub async fn is_cached(&self) -> bool {
        self.token.lock().await.is_some()
    }
}

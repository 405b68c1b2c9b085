use std::time::Duration;

use blogwalk_core::{Cursor, FailureKind, FetchError};
use bytes::Bytes;
use engine_logging::{engine_debug, engine_trace};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use scraper::{Html, Selector};
use serde_json::Value;

use crate::token::SessionToken;

/// Remote platform as seen by the walk: page fetches, permalink fetches and
/// session token acquisition. Bodies are returned as raw JSON; shape checks happen
/// at the ingestion boundary.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_page(
        &self,
        blog: &str,
        cursor: &Cursor,
        token: &SessionToken,
    ) -> Result<Value, FetchError>;

    async fn fetch_permalink(
        &self,
        root_author: &str,
        root_id: &str,
        token: &SessionToken,
    ) -> Result<Value, FetchError>;

    async fn acquire_session_token(&self) -> Result<SessionToken, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub api_base: String,
    /// Page whose `<meta name=token_meta_name>` carries the session token.
    pub token_url: String,
    pub token_meta_name: String,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub proxy_url: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.tumblr.com".to_string(),
            token_url: "https://www.tumblr.com/login".to_string(),
            token_meta_name: "tumblr-form-key".to_string(),
            api_key: None,
            user_agent: concat!("blogwalk/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy_url: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 32 * 1024 * 1024,
            allowed_content_types: vec![
                "application/json".to_string(),
                "text/json".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Html,
    Media,
}

#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    settings: FetchSettings,
}

impl HttpFeedSource {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Raw bytes of one media asset. No re-encoding happens here.
    pub async fn download_media(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed =
            Url::parse(url).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let bytes = self.get_body(parsed, None, BodyKind::Media).await?;
        Ok(Bytes::from(bytes))
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(self.settings.redirect_limit))
            .user_agent(self.settings.user_agent.clone());

        if let Some(proxy_url) = self.settings.proxy_url.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.settings.api_base)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::new(FailureKind::InvalidUrl, "api base cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("npf", "true");
            if let Some(api_key) = self.settings.api_key.as_deref() {
                query.append_pair("api_key", api_key);
            }
        }
        Ok(url)
    }

    fn is_content_type_allowed(&self, content_type: &str, kind: BodyKind) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        match kind {
            BodyKind::Media => true,
            BodyKind::Html => {
                ct.eq_ignore_ascii_case("text/html") || ct.eq_ignore_ascii_case("application/xhtml+xml")
            }
            BodyKind::Json => self
                .settings
                .allowed_content_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ct)),
        }
    }

    async fn get_body(
        &self,
        url: Url,
        token: Option<&SessionToken>,
        kind: BodyKind,
    ) -> Result<Vec<u8>, FetchError> {
        let client = self.build_client()?;
        let mut request = client.get(url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }

        engine_trace!("GET {}", url);
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::new(FailureKind::Unauthorized, status.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct, kind) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        engine_debug!("GET {} -> {} bytes", url.path(), bytes.len());

        Ok(bytes)
    }

    async fn get_json(&self, url: Url, token: &SessionToken) -> Result<Value, FetchError> {
        let bytes = self.get_body(url, Some(token), BodyKind::Json).await?;
        serde_json::from_slice(&bytes)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_page(
        &self,
        blog: &str,
        cursor: &Cursor,
        token: &SessionToken,
    ) -> Result<Value, FetchError> {
        let mut url = self.api_url(&["v2", "blog", blog, "posts"])?;
        url.query_pairs_mut().extend_pairs(cursor.query_pairs());
        self.get_json(url, token).await
    }

    async fn fetch_permalink(
        &self,
        root_author: &str,
        root_id: &str,
        token: &SessionToken,
    ) -> Result<Value, FetchError> {
        let url = self.api_url(&["v2", "blog", root_author, "posts", root_id])?;
        self.get_json(url, token).await
    }

    async fn acquire_session_token(&self) -> Result<SessionToken, FetchError> {
        let url = Url::parse(&self.settings.token_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let bytes = self.get_body(url, None, BodyKind::Html).await?;
        let html = String::from_utf8_lossy(&bytes);
        token_from_html(&html, &self.settings.token_meta_name)
            .map(SessionToken::new)
            .ok_or_else(|| {
                FetchError::new(
                    FailureKind::Decode,
                    format!("no <meta name=\"{}\"> on token page", self.settings.token_meta_name),
                )
            })
    }
}

fn token_from_html(html: &str, meta_name: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse(&format!("meta[name=\"{meta_name}\"]")).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

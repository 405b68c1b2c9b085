use std::fmt;

use thiserror::Error;

use crate::model::Cursor;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Unauthorized,
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Decode => write!(f, "undecodable response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Why the media of one particular post could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("no media variants to choose from")]
    NoVariants,
    #[error("reblog root fetch failed: {0}")]
    ResolverFetch(FetchError),
    #[error("reblog root response malformed: {0}")]
    ResolverMalformed(String),
    #[error("reblog root response carried no post")]
    ResolverEmpty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkError {
    #[error("no blog name given")]
    EmptyBlog,
    #[error("page fetch for {blog} failed: {source}")]
    Transport {
        blog: String,
        #[source]
        source: FetchError,
    },
    #[error("malformed response ({context}): {message}")]
    MalformedResponse { context: String, message: String },
    #[error("could not extract media from post {post_id}: {failure}")]
    Extraction {
        post_id: String,
        failure: ExtractionFailure,
    },
}

impl WalkError {
    /// Fatal errors always end the walk; the others only cost the affected post.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WalkError::Extraction { .. })
    }
}

/// Error surfaced to the caller's pull when a walk stops early.
///
/// `resume_from` is the cursor of the page being processed when the walk stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("walk stopped early: {error}")]
pub struct WalkFailure {
    #[source]
    pub error: WalkError,
    pub resume_from: Option<Cursor>,
}

/// Shape problems found while ingesting a response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid value for `{field}`: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("{0}")]
    Shape(String),
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Shape(err.to_string())
    }
}

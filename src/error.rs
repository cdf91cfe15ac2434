//! Error taxonomy for the fact-checking engine
//!
//! Failures are local to the component that owns them: a schema violation
//! fails one call site, a capability failure becomes a degraded observation,
//! and a task failure removes one worker from its round. Budget exhaustion is
//! not an error at all; it is a terminal supervisor state.

use thiserror::Error;

/// Structured-output boundaries that can reject a model response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Clarification,
    Brief,
    Planning,
    Reflection,
    Compression,
    Report,
}

impl std::fmt::Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Boundary::Clarification => "clarification",
            Boundary::Brief => "brief",
            Boundary::Planning => "planning",
            Boundary::Reflection => "reflection",
            Boundary::Compression => "compression",
            Boundary::Report => "report",
        };
        f.write_str(name)
    }
}

/// Top-level error for the fact-checking engine
#[derive(Error, Debug)]
pub enum FactCheckError {
    /// A structured result was outside its declared schema
    #[error("Schema violation at {boundary} boundary: {detail}")]
    SchemaViolation { boundary: Boundary, detail: String },

    /// An external capability (search, model) errored or timed out
    #[error("Capability '{capability}' failed: {detail}")]
    CapabilityFailure { capability: String, detail: String },

    /// A whole research worker failed
    #[error("Research task {task_id} failed: {detail}")]
    TaskFailure { task_id: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FactCheckError {
    pub fn schema(boundary: Boundary, detail: impl Into<String>) -> Self {
        Self::SchemaViolation {
            boundary,
            detail: detail.into(),
        }
    }

    pub fn capability(capability: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::CapabilityFailure {
            capability: capability.into(),
            detail: detail.into(),
        }
    }

    pub fn task(task_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::TaskFailure {
            task_id: task_id.into(),
            detail: detail.into(),
        }
    }

    /// Schema violations are fatal to the owning task; other failures may degrade
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, Self::SchemaViolation { .. })
    }
}

/// Typed errors from web search providers
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited by search provider")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl SearchError {
    /// Transient failures worth a provider-level retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::Timeout
                | SearchError::Connection(_)
                | SearchError::RateLimited
                | SearchError::ServerError(_, _)
        )
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Timeout
        } else if e.is_connect() {
            SearchError::Connection(e.to_string())
        } else {
            SearchError::Network(e.to_string())
        }
    }

    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => SearchError::Unauthorized,
            429 => SearchError::RateLimited,
            400 => SearchError::BadRequest(body),
            500..=599 => SearchError::ServerError(status, body),
            _ => SearchError::HttpError(status, body),
        }
    }
}

impl From<SearchError> for FactCheckError {
    fn from(e: SearchError) -> Self {
        FactCheckError::capability("search", e.to_string())
    }
}

pub type Result<T, E = FactCheckError> = std::result::Result<T, E>;

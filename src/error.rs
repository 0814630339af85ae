use crate::search::EngineError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced to callers of the search orchestrator.
///
/// Primary-engine failures and open circuits never appear here on their own:
/// they are absorbed by falling back. Only a failed fallback or a bad query
/// reaches the caller.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Search unavailable: primary failed ({primary}) and fallback failed: {source}")]
    FallbackExhausted {
        primary: PrimaryFailure,
        #[source]
        source: StoreError,
    },
}

impl SearchError {
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery(reason.into())
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidQuery(_))
    }
}

/// Why the primary engine did not answer a request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrimaryFailure {
    #[error("circuit '{component}' open")]
    CircuitOpen { component: String },

    #[error("{0}")]
    Engine(EngineError),

    #[error("unexpected: {0}")]
    Unexpected(EngineError),
}

impl PrimaryFailure {
    /// Metric label for `search.fallbacks.total`
    pub fn reason(&self) -> &'static str {
        match self {
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Engine(EngineError::Timeout { .. }) => "timeout",
            Self::Engine(_) => "engine_error",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

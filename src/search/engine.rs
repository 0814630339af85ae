//! The primary query engine seam.
//!
//! The production engine (full-text relevance, geo-distance sort, facets,
//! prefix suggestions) lives outside this crate; the orchestrator only needs
//! this trait and treats every implementation as unreliable.

use super::types::{SearchQuery, SearchResult};
use crate::resilience::FailurePolicy;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Engine connection failed: {0}")]
    Connection(String),

    #[error("Engine call timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Engine protocol error: {0}")]
    Protocol(String),

    /// The engine refused the query itself; not a sign of an unhealthy engine
    #[error("Engine rejected query: {0}")]
    MalformedQuery(String),
}

impl EngineError {
    /// Failures of the dependency rather than of the request
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout { .. } | Self::Protocol(_)
        )
    }
}

/// Breaker classification for primary engine calls: transient failures
/// count, rejected queries and foreign error types do not
pub fn engine_failure_policy() -> FailurePolicy {
    FailurePolicy::for_error::<EngineError>(EngineError::is_transient)
}

#[async_trait]
pub trait PrimaryQueryEngine: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Run the query; the result's `source` is overwritten by the caller
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, EngineError>;

    async fn ping(&self) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(EngineError::Connection("refused".into()).is_transient());
        assert!(EngineError::Timeout {
            after: Duration::from_secs(2)
        }
        .is_transient());
        assert!(EngineError::Protocol("bad frame".into()).is_transient());
        assert!(!EngineError::MalformedQuery("unbalanced quote".into()).is_transient());
    }

    #[test]
    fn test_policy_matches_transient_errors_only() {
        let policy = engine_failure_policy();
        assert!(policy.is_expected(&EngineError::Connection("reset".into())));
        assert!(!policy.is_expected(&EngineError::MalformedQuery("x".into())));
        assert!(!policy.is_expected(&std::fmt::Error));
    }
}

//! Failure classification for circuit breakers.
//!
//! A breaker only counts errors its policy classifies as *expected*
//! (dependency failures). Anything else passes through untouched so that
//! caller bugs never trip a healthy dependency's breaker.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

type Classifier = dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync;

/// Decides whether an operation error counts against a breaker
#[derive(Clone)]
pub struct FailurePolicy {
    label: &'static str,
    classify: Arc<Classifier>,
}

impl FailurePolicy {
    /// Every error is an expected failure
    pub fn all() -> Self {
        Self {
            label: "all",
            classify: Arc::new(|_| true),
        }
    }

    /// Classify with an arbitrary predicate over the type-erased error
    pub fn from_fn<F>(label: &'static str, classify: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        Self {
            label,
            classify: Arc::new(classify),
        }
    }

    /// Classify errors of type `E` with `predicate`; other error types are unexpected
    pub fn for_error<E>(predicate: fn(&E) -> bool) -> Self
    where
        E: Error + 'static,
    {
        Self::from_fn(std::any::type_name::<E>(), move |err| {
            err.downcast_ref::<E>().is_some_and(predicate)
        })
    }

    pub fn is_expected(&self, err: &(dyn Error + 'static)) -> bool {
        (self.classify)(err)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailurePolicy")
            .field("label", &self.label)
            .finish()
    }
}

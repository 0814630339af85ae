//! # Circuit Breaker Implementation
//!
//! Fault isolation for calls into an unreliable dependency. Three states:
//! Closed (normal operation), Open (failing fast) and HalfOpen (a single
//! recovery trial is in flight).
//!
//! All bookkeeping sits behind one mutex per breaker. The lock is held for
//! admission and for recording the outcome, never across the awaited call.
//!
//! [`force_open`](CircuitBreaker::force_open) and [`reset`](CircuitBreaker::reset)
//! start a new generation; outcomes of calls admitted in an earlier one are
//! dropped. A breaker built with [`CircuitBreaker::disabled`] runs every
//! operation directly and keeps no bookkeeping.

use crate::metrics;
use crate::resilience::{CircuitBreakerConfig, CircuitBreakerStats, FailurePolicy};
use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed,
    /// Failure mode - calls fail fast without executing
    Open,
    /// Testing recovery - exactly one trial call is admitted
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open (or a half-open trial is already running); the operation was not invoked
    #[error("Circuit breaker is open for {component} (retry after {retry_after:?})")]
    CircuitOpen {
        component: String,
        retry_after: Duration,
    },

    /// Operation failed with an expected error and the failure was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),

    /// Operation failed with an error outside the failure policy; nothing was recorded
    #[error("Unexpected operation error: {0}")]
    Unexpected(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::CircuitOpen { .. })
    }

    /// The operation's own error, if the operation ran
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::CircuitOpen { .. } => None,
            CircuitBreakerError::OperationFailed(e) | CircuitBreakerError::Unexpected(e) => Some(e),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u64,
    success_count: u64,
    total_calls: u64,
    last_failure_at: Option<Instant>,
    last_failure_time: Option<DateTime<Utc>>,
    trial_in_flight: bool,
    generation: u64,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            total_calls: 0,
            last_failure_at: None,
            last_failure_time: None,
            trial_in_flight: false,
            generation: 0,
        }
    }

    fn mark_failure_time(&mut self) {
        self.last_failure_at = Some(Instant::now());
        self.last_failure_time = Some(Utc::now());
    }
}

/// Circuit breaker guarding a single named dependency
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    policy: RwLock<FailurePolicy>,
    enabled: bool,
    inner: Mutex<BreakerState>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("policy", &*self.policy.read())
            .field("enabled", &self.enabled)
            .field("state", &self.state())
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a breaker that counts every error as a failure
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::with_policy(name, config, FailurePolicy::all())
    }

    pub fn with_policy(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        policy: FailurePolicy,
    ) -> Self {
        let name = name.into();
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            recovery_timeout_seconds = config.recovery_timeout.as_secs(),
            failure_policy = policy.label(),
            "Circuit breaker initialized"
        );

        Self {
            name,
            config,
            policy: RwLock::new(policy),
            enabled: true,
            inner: Mutex::new(BreakerState::new()),
        }
    }

    /// Pass-through breaker: operations always run and nothing is recorded
    pub fn disabled(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        policy: FailurePolicy,
    ) -> Self {
        let name = name.into();
        info!(component = %name, "Circuit breaker disabled (pass-through)");
        Self {
            name,
            config,
            policy: RwLock::new(policy),
            enabled: false,
            inner: Mutex::new(BreakerState::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn policy_label(&self) -> &'static str {
        self.policy.read().label()
    }

    /// Swap the failure policy when `policy` carries a different label
    pub(crate) fn adopt_policy(&self, policy: &FailurePolicy) {
        let mut current = self.policy.write();
        if current.label() != policy.label() {
            info!(
                component = %self.name,
                from = current.label(),
                to = policy.label(),
                "Circuit breaker failure policy replaced"
            );
            *current = policy.clone();
        }
    }

    fn is_expected(&self, err: &(dyn std::error::Error + 'static)) -> bool {
        self.policy.read().is_expected(err)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current circuit state. Open breakers stay Open here until a call attempt tries them.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        if !self.enabled {
            return match operation().await {
                Ok(value) => Ok(value),
                Err(err) if self.is_expected(&err) => Err(CircuitBreakerError::OperationFailed(err)),
                Err(err) => Err(CircuitBreakerError::Unexpected(err)),
            };
        }

        let permit = match self.admit() {
            Ok(permit) => permit,
            Err(retry_after) => {
                debug!(
                    component = %self.name,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Circuit open, call rejected"
                );
                metrics::resilience::circuit_rejections_total()
                    .add(1, &[KeyValue::new("component", self.name.clone())]);
                return Err(CircuitBreakerError::CircuitOpen {
                    component: self.name.clone(),
                    retry_after,
                });
            }
        };

        match operation().await {
            Ok(value) => {
                permit.succeed();
                Ok(value)
            }
            Err(err) if self.is_expected(&err) => {
                warn!(component = %self.name, error = %err, "Protected operation failed");
                permit.fail();
                Err(CircuitBreakerError::OperationFailed(err))
            }
            Err(err) => {
                error!(
                    component = %self.name,
                    error = %err,
                    "Unexpected error in protected operation (not counted)"
                );
                permit.release();
                Err(CircuitBreakerError::Unexpected(err))
            }
        }
    }

    /// Admission check. `Err` carries the time left until a trial call would be admitted.
    fn admit(&self) -> Result<CallPermit<'_>, Duration> {
        let mut inner = self.inner.lock();
        inner.total_calls += 1;
        let state = inner.state;

        let generation = inner.generation;

        match state {
            CircuitState::Closed => Ok(CallPermit::new(self, false, generation)),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|at| Instant::now().saturating_duration_since(at))
                    .unwrap_or(Duration::MAX);

                if elapsed < self.config.recovery_timeout {
                    return Err(self.config.recovery_timeout - elapsed);
                }

                inner.state = CircuitState::HalfOpen;
                inner.trial_in_flight = true;
                drop(inner);
                self.on_transition(CircuitState::Open, CircuitState::HalfOpen);
                Ok(CallPermit::new(self, true, generation))
            }
            CircuitState::HalfOpen if inner.trial_in_flight => Err(Duration::ZERO),
            CircuitState::HalfOpen => {
                inner.trial_in_flight = true;
                Ok(CallPermit::new(self, true, generation))
            }
        }
    }

    fn record_success(&self, trial: bool, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(component = %self.name, "Dropping success from before a forced state change");
            return;
        }
        inner.success_count += 1;
        if trial {
            inner.trial_in_flight = false;
        }

        let state = inner.state;
        let transition = match state {
            CircuitState::HalfOpen if trial => {
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                Some((CircuitState::HalfOpen, CircuitState::Closed))
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
                None
            }
            // Stragglers admitted before the breaker opened don't resolve it
            _ => None,
        };
        drop(inner);

        if let Some((from, to)) = transition {
            self.on_transition(from, to);
        }
    }

    fn record_failure(&self, trial: bool, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(component = %self.name, "Dropping failure from before a forced state change");
            return;
        }
        inner.failure_count += 1;
        inner.mark_failure_time();
        if trial {
            inner.trial_in_flight = false;
        }

        let state = inner.state;
        let transition = match state {
            CircuitState::HalfOpen if trial => {
                inner.state = CircuitState::Open;
                Some((CircuitState::HalfOpen, CircuitState::Open))
            }
            CircuitState::Closed
                if inner.failure_count >= u64::from(self.config.failure_threshold) =>
            {
                inner.state = CircuitState::Open;
                Some((CircuitState::Closed, CircuitState::Open))
            }
            _ => None,
        };
        let failure_count = inner.failure_count;
        drop(inner);

        if let Some((from, to)) = transition {
            error!(
                component = %self.name,
                consecutive_failures = failure_count,
                failure_threshold = self.config.failure_threshold,
                recovery_timeout_seconds = self.config.recovery_timeout.as_secs(),
                "Circuit breaker opened (failing fast)"
            );
            self.on_transition(from, to);
        }
    }

    fn release_trial(&self, trial: bool, generation: u64) {
        let mut inner = self.inner.lock();
        if trial && inner.generation == generation {
            inner.trial_in_flight = false;
        }
    }

    fn on_transition(&self, from: CircuitState, to: CircuitState) {
        match to {
            CircuitState::Closed => {
                info!(component = %self.name, from = %from, "Circuit breaker closed (recovered)")
            }
            CircuitState::HalfOpen => {
                info!(component = %self.name, "Circuit breaker half-open (testing recovery)")
            }
            CircuitState::Open => {
                debug!(component = %self.name, from = %from, "Circuit breaker state -> open")
            }
        }

        metrics::resilience::circuit_transitions_total().add(
            1,
            &[
                KeyValue::new("component", self.name.clone()),
                KeyValue::new("to", to.as_str()),
            ],
        );
    }

    /// Force circuit to open state, as if a failure had just happened
    pub fn force_open(&self) {
        let mut inner = self.inner.lock();
        let from = inner.state;
        inner.state = CircuitState::Open;
        inner.trial_in_flight = false;
        inner.generation += 1;
        inner.mark_failure_time();
        drop(inner);

        warn!(component = %self.name, "Circuit breaker forced open");
        if from != CircuitState::Open {
            self.on_transition(from, CircuitState::Open);
        }
    }

    /// Return to Closed and forget the failure streak; lifetime counters are kept
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let from = inner.state;
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure_at = None;
        inner.last_failure_time = None;
        inner.trial_in_flight = false;
        inner.generation += 1;
        drop(inner);

        info!(component = %self.name, "Circuit breaker reset");
        if from != CircuitState::Closed {
            self.on_transition(from, CircuitState::Closed);
        }
    }

    /// Point-in-time snapshot of the breaker's bookkeeping
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        let success_rate = if inner.total_calls > 0 {
            inner.success_count as f64 / inner.total_calls as f64 * 100.0
        } else {
            0.0
        };

        CircuitBreakerStats {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            total_calls: inner.total_calls,
            success_rate,
            last_failure_time: inner.last_failure_time,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout: self.config.recovery_timeout,
        }
    }
}

/// Admission ticket for one protected call.
///
/// Dropping an unsettled permit (the caller's future was cancelled mid-call)
/// records an expected failure.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    generation: u64,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool, generation: u64) -> Self {
        Self {
            breaker,
            trial,
            generation,
            settled: false,
        }
    }

    fn succeed(mut self) {
        self.settled = true;
        self.breaker.record_success(self.trial, self.generation);
    }

    fn fail(mut self) {
        self.settled = true;
        self.breaker.record_failure(self.trial, self.generation);
    }

    fn release(mut self) {
        self.settled = true;
        self.breaker.release_trial(self.trial, self.generation);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(component = %self.breaker.name, "Protected call cancelled, recording failure");
            self.breaker.record_failure(self.trial, self.generation);
        }
    }
}

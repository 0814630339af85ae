//! # Circuit Breaker Statistics
//!
//! Serializable snapshots of breaker bookkeeping, for health endpoints and
//! operator tooling.

use crate::resilience::CircuitState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Snapshot of a single circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerStats {
    pub name: String,
    pub state: CircuitState,
    /// Consecutive failures in the current streak
    pub failure_count: u64,
    pub success_count: u64,
    /// Every call attempt, rejected ones included
    pub total_calls: u64,
    /// Successful calls as a percentage of all attempts (0 when there were none)
    pub success_rate: f64,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
}

impl CircuitBreakerStats {
    /// Open breakers are unhealthy; half-open ones are recovering and count as healthy
    pub fn is_healthy(&self) -> bool {
        self.state != CircuitState::Open
    }

    pub fn state_description(&self) -> &'static str {
        match self.state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Testing dependency health",
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "State: {} | Calls: {} | Success: {:.1}% | Consecutive failures: {}/{}",
            self.state_description(),
            self.total_calls,
            self.success_rate,
            self.failure_count,
            self.failure_threshold
        )
    }
}

/// Registry-wide view over every breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub breakers: BTreeMap<String, CircuitBreakerStats>,
    pub collected_at: DateTime<Utc>,
}

impl RegistrySnapshot {
    pub fn new(breakers: BTreeMap<String, CircuitBreakerStats>) -> Self {
        Self {
            breakers,
            collected_at: Utc::now(),
        }
    }

    pub fn count_by_state(&self) -> HashMap<CircuitState, usize> {
        let mut counts = HashMap::new();
        for stats in self.breakers.values() {
            *counts.entry(stats.state).or_insert(0) += 1;
        }
        counts
    }

    /// Names of breakers currently rejecting calls
    pub fn open_circuits(&self) -> Vec<&str> {
        self.breakers
            .values()
            .filter(|stats| !stats.is_healthy())
            .map(|stats| stats.name.as_str())
            .collect()
    }

    /// Fraction of healthy breakers (1.0 when there are none)
    pub fn health_score(&self) -> f64 {
        if self.breakers.is_empty() {
            return 1.0;
        }

        let healthy = self.breakers.values().filter(|s| s.is_healthy()).count();
        healthy as f64 / self.breakers.len() as f64
    }

    pub fn total_calls(&self) -> u64 {
        self.breakers.values().map(|s| s.total_calls).sum()
    }

    pub fn format_summary(&self) -> String {
        let counts = self.count_by_state();
        format!(
            "Circuit breakers: {} total | {} closed | {} open | {} half-open | Health: {:.0}%",
            self.breakers.len(),
            counts.get(&CircuitState::Closed).unwrap_or(&0),
            counts.get(&CircuitState::Open).unwrap_or(&0),
            counts.get(&CircuitState::HalfOpen).unwrap_or(&0),
            self.health_score() * 100.0
        )
    }
}

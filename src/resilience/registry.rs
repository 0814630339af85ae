//! # Circuit Breaker Registry
//!
//! Name-keyed, process-lifetime collection of breakers. Every collaborator
//! that talks to the same dependency must receive the same registry so they
//! share one breaker per name; cloning the registry shares the map.
//!
//! Failure policies are registered per name. The first explicit policy for a
//! name wins, and a breaker created earlier through
//! [`get_or_create_default`](CircuitBreakerRegistry::get_or_create_default)
//! adopts it.

use crate::config::CircuitBreakerSettings;
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, FailurePolicy, RegistrySnapshot,
};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerRegistry {
    breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,
    policies: Arc<DashMap<String, FailurePolicy>>,
    settings: Arc<CircuitBreakerSettings>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose default-config lookups use the given per-component settings
    pub fn from_settings(settings: CircuitBreakerSettings) -> Self {
        info!(
            enabled = settings.enabled,
            components = settings.component_configs.len(),
            "Initializing circuit breaker registry"
        );
        Self {
            breakers: Arc::new(DashMap::new()),
            policies: Arc::new(DashMap::new()),
            settings: Arc::new(settings),
        }
    }

    /// Whether breakers from this registry trip at all
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Get the breaker for `name`, creating it on first access.
    ///
    /// `config` is ignored when the breaker already exists. `policy` becomes
    /// the name's policy unless one was registered before.
    pub fn get_or_create(
        &self,
        name: &str,
        config: CircuitBreakerConfig,
        policy: FailurePolicy,
    ) -> Arc<CircuitBreaker> {
        let policy = self.register_policy(name, policy);
        let breaker = self.create(name, config, &policy);
        breaker.adopt_policy(&policy);
        breaker
    }

    /// Get or create using the configured settings and the registered policy
    /// for this name (every error counts when none is registered)
    pub fn get_or_create_default(&self, name: &str) -> Arc<CircuitBreaker> {
        let policy = self
            .policies
            .get(name)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(FailurePolicy::all);
        self.create(name, self.settings.config_for_component(name), &policy)
    }

    /// Record `policy` for `name` unless one exists; returns the effective policy
    pub fn register_policy(&self, name: &str, policy: FailurePolicy) -> FailurePolicy {
        let entry = self.policies.entry(name.to_string()).or_insert(policy);
        entry.value().clone()
    }

    fn create(
        &self,
        name: &str,
        config: CircuitBreakerConfig,
        policy: &FailurePolicy,
    ) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return Arc::clone(existing.value());
        }

        if let Err(reason) = config.validate() {
            warn!(component = name, reason = %reason, "Circuit breaker created with questionable config");
        }

        let entry = self.breakers.entry(name.to_string()).or_insert_with(|| {
            debug!(component = name, "Created new circuit breaker");
            let breaker = if self.settings.enabled {
                CircuitBreaker::with_policy(name, config, policy.clone())
            } else {
                CircuitBreaker::disabled(name, config, policy.clone())
            };
            Arc::new(breaker)
        });
        Arc::clone(entry.value())
    }

    pub fn settings(&self) -> &CircuitBreakerSettings {
        &self.settings
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn list_components(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    pub fn all_stats(&self) -> BTreeMap<String, CircuitBreakerStats> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stats()))
            .collect()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot::new(self.all_stats())
    }

    /// Reset every breaker in place; none are removed
    pub fn reset_all(&self) {
        warn!(count = self.breakers.len(), "Resetting all circuit breakers");
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }
}

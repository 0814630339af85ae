//! # Health Report
//!
//! Combines breaker state from the registry with live pings of each
//! collaborator. A single open breaker or failed ping makes the service
//! `degraded`; search keeps answering (from the fallback) either way.

use crate::cache::CacheStore;
use crate::resilience::{CircuitBreakerRegistry, RegistrySnapshot};
use crate::search::PrimaryQueryEngine;
use crate::store::DurableStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorHealth {
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub breakers: RegistrySnapshot,
    pub collaborators: BTreeMap<String, CollaboratorHealth>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[derive(Debug, Clone)]
pub struct HealthChecker {
    registry: CircuitBreakerRegistry,
    primary: Option<Arc<dyn PrimaryQueryEngine>>,
    store: Option<Arc<dyn DurableStore>>,
    cache: Option<CacheStore>,
    ping_timeout: Duration,
}

impl HealthChecker {
    pub fn new(registry: CircuitBreakerRegistry) -> Self {
        Self {
            registry,
            primary: None,
            store: None,
            cache: None,
            ping_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_primary(mut self, primary: Arc<dyn PrimaryQueryEngine>) -> Self {
        self.primary = Some(primary);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_ping_timeout(mut self, ping_timeout: Duration) -> Self {
        self.ping_timeout = ping_timeout;
        self
    }

    pub async fn check(&self) -> HealthReport {
        let primary = async {
            match &self.primary {
                Some(primary) => Some(self.timed_ping(primary.ping()).await),
                None => None,
            }
        };
        let store = async {
            match &self.store {
                Some(store) => Some(self.timed_ping(store.ping()).await),
                None => None,
            }
        };
        let cache = async {
            let cache = self.cache.as_ref()?;
            let started = Instant::now();
            let healthy = cache.health_check().await;
            Some(CollaboratorHealth {
                healthy,
                latency_ms: started.elapsed().as_millis() as u64,
                error: (!healthy).then(|| format!("{} backend unreachable", cache.provider_name())),
            })
        };

        // pings run concurrently, each bounded by ping_timeout
        let (primary, store, cache) = futures::join!(primary, store, cache);

        let mut collaborators = BTreeMap::new();
        for (name, health) in [
            ("primary_engine", primary),
            ("durable_store", store),
            ("cache", cache),
        ] {
            if let Some(health) = health {
                collaborators.insert(name.to_string(), health);
            }
        }

        let breakers = self.registry.snapshot();
        let degraded =
            !breakers.open_circuits().is_empty() || collaborators.values().any(|c| !c.healthy);
        let status = if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        if degraded {
            warn!(
                open_circuits = ?breakers.open_circuits(),
                unhealthy = ?collaborators
                    .iter()
                    .filter(|(_, c)| !c.healthy)
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>(),
                "Health check degraded"
            );
        } else {
            debug!(collaborators = collaborators.len(), "Health check passed");
        }

        HealthReport {
            status,
            breakers,
            collaborators,
            checked_at: Utc::now(),
        }
    }

    async fn timed_ping<F, E>(&self, ping: F) -> CollaboratorHealth
    where
        F: std::future::Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        let started = Instant::now();
        let error = match tokio::time::timeout(self.ping_timeout, ping).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("ping timed out after {:?}", self.ping_timeout)),
        };
        CollaboratorHealth {
            healthy: error.is_none(),
            latency_ms: started.elapsed().as_millis() as u64,
            error,
        }
    }
}

//! Provider registry with TTL-cached health tracking
//!
//! Health entries are cached per provider. A read within the TTL is
//! served from the cache synchronously; a stale read reports `Unknown`
//! immediately and kicks off a background probe whose result lands in
//! the cache for subsequent reads. Callers never block on a probe, and
//! probe failures are recorded as `Unhealthy` rather than surfaced.

use crate::config::HealthCacheConfig;
use crate::provider::{HealthStatus, Provider, ProviderHealth, ProviderStatus};
use crate::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Aggregated health counts across all registered providers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderStats {
    pub total: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub unhealthy: usize,
    pub unknown: usize,
}

/// Registry and health tracker for language-model providers
pub struct ProviderManager {
    providers: Arc<RwLock<HashMap<String, Arc<dyn Provider>>>>,
    health_cache: Arc<RwLock<HashMap<String, ProviderHealth>>>,
    config: HealthCacheConfig,
}

impl ProviderManager {
    /// Create a manager with the given cache configuration
    pub fn new(config: HealthCacheConfig) -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
            health_cache: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Register a provider under a stable id
    pub async fn register<S: Into<String>>(&self, name: S, provider: Arc<dyn Provider>) {
        let name = name.into();
        debug!("Registering provider '{}'", name);
        self.providers.write().await.insert(name, provider);
    }

    /// Remove a provider, purging its health cache entry.
    /// Returns false if the provider was not registered.
    pub async fn unregister(&self, name: &str) -> bool {
        let removed = self.providers.write().await.remove(name).is_some();
        if removed {
            self.health_cache.write().await.remove(name);
            debug!("Unregistered provider '{}'", name);
        }
        removed
    }

    /// Look up a registered provider
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.read().await.get(name).cloned()
    }

    /// Ids of all registered providers
    pub async fn list_all(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Health of every registered provider.
    ///
    /// Entries fresh within the TTL come straight from the cache. Stale
    /// or missing entries are reported as `Unknown` and a background
    /// probe is spawned to refresh them.
    pub async fn health(&self) -> Vec<ProviderHealth> {
        let providers: Vec<(String, Arc<dyn Provider>)> = self
            .providers
            .read()
            .await
            .iter()
            .map(|(name, provider)| (name.clone(), provider.clone()))
            .collect();

        let ttl = self.config.ttl();
        let now = Utc::now();
        let mut result = Vec::with_capacity(providers.len());
        let mut cache = self.health_cache.write().await;

        for (name, provider) in providers {
            match cache.get(&name) {
                Some(entry) if now - entry.last_checked < ttl => {
                    result.push(entry.clone());
                }
                _ => {
                    // Stale read: answer Unknown now, refresh in the
                    // background. The Unknown entry also marks the probe
                    // as in flight so repeated reads do not stack probes.
                    let placeholder = ProviderHealth::unknown(name.clone());
                    cache.insert(name.clone(), placeholder.clone());
                    result.push(placeholder);
                    self.spawn_probe(name, provider);
                }
            }
        }
        result.sort_by(|a, b| a.provider.cmp(&b.provider));
        result
    }

    /// Force a fresh probe of one provider, bypassing the cache
    pub async fn check_health(&self, name: &str) -> Result<ProviderHealth> {
        let provider = self
            .get(name)
            .await
            .ok_or_else(|| Error::not_found("Provider", name))?;

        let health = Self::probe(name, provider, self.config.probe_timeout()).await;
        self.health_cache
            .write()
            .await
            .insert(name.to_string(), health.clone());
        Ok(health)
    }

    /// Aggregated counts by health status
    pub async fn stats(&self) -> ProviderStats {
        let entries = self.health().await;
        let mut stats = ProviderStats {
            total: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            match entry.status {
                HealthStatus::Healthy => stats.healthy += 1,
                HealthStatus::Degraded => stats.degraded += 1,
                HealthStatus::Unhealthy => stats.unhealthy += 1,
                HealthStatus::Unknown => stats.unknown += 1,
            }
        }
        stats
    }

    fn spawn_probe(&self, name: String, provider: Arc<dyn Provider>) {
        let cache = self.health_cache.clone();
        let timeout = self.config.probe_timeout();
        tokio::spawn(async move {
            let health = Self::probe(&name, provider, timeout).await;
            debug!("Health probe for '{}': {:?}", name, health.status);
            cache.write().await.insert(name, health);
        });
    }

    async fn probe(
        name: &str,
        provider: Arc<dyn Provider>,
        timeout: std::time::Duration,
    ) -> ProviderHealth {
        let started = std::time::Instant::now();
        let outcome = tokio::time::timeout(timeout, provider.health_check()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let (status, latency_ms, message) = match outcome {
            Ok(Ok(ProviderStatus {
                status,
                latency_ms,
                message,
            })) => (status, latency_ms.or(Some(elapsed_ms)), message),
            Ok(Err(e)) => {
                warn!("Health probe for '{}' failed: {}", name, e);
                (HealthStatus::Unhealthy, None, Some(e.to_string()))
            }
            Err(_) => {
                warn!("Health probe for '{}' timed out", name);
                (
                    HealthStatus::Unhealthy,
                    None,
                    Some(format!("health probe exceeded {}s", timeout.as_secs())),
                )
            }
        };

        ProviderHealth {
            provider: name.to_string(),
            status,
            last_checked: Utc::now(),
            latency_ms,
            message,
        }
    }
}

impl Default for ProviderManager {
    fn default() -> Self {
        Self::new(HealthCacheConfig::default())
    }
}

//! Best-effort cache in front of the geometry fetch.
//!
//! The cache is an opaque keyed store with TTL. Two rules sit on top of it:
//! - a write predicate picks the TTL from the payload quality, and never
//!   writes empty or unavailable results;
//! - a store failure is treated as a miss and bypasses the store for a
//!   cooldown period.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::fetch::config::FetchConfig;
use crate::fetch::coordinator::FetchRequest;
use crate::massing::building::{FetchStatus, Neighborhood3D};

/// Bump when the cached payload shape changes.
pub const CACHE_KEY_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Backend(String),
    #[error("Cache payload error: {0}")]
    Payload(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

/// TTLs per payload quality.
#[derive(Debug, Clone, PartialEq)]
pub struct CachePolicy {
    /// Target found, pagination ended normally.
    pub complete_ttl: Duration,
    /// Partial neighbors or missing target.
    pub degraded_ttl: Duration,
    /// Store bypass after a failure.
    pub cooldown: Duration,
}

impl CachePolicy {
    pub fn new() -> Self {
        Self {
            complete_ttl: Duration::from_secs(24 * 3600),
            degraded_ttl: Duration::from_secs(120),
            cooldown: Duration::from_secs(30),
        }
    }

    /// Write predicate. `None` means the result must not be cached.
    ///
    /// Decided from the payload, not from whether the fetch raised.
    pub fn ttl_for(&self, neighborhood: &Neighborhood3D) -> Option<Duration> {
        if neighborhood.is_empty() {
            return None;
        }
        match neighborhood.status {
            FetchStatus::Unavailable => None,
            FetchStatus::Complete => Some(self.complete_ttl),
            FetchStatus::PartialNeighbors | FetchStatus::TargetNotFound => Some(self.degraded_ttl),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache key of a neighborhood fetch.
///
/// Contains every input that changes the result (ids, center, radius and the
/// pagination limits) and nothing else (timeouts only change degraded
/// results, which are cached briefly).
pub fn cache_key(request: &FetchRequest, config: &FetchConfig) -> String {
    let c = &request.center;
    format!(
        "massing3d:{CACHE_KEY_VERSION}:n3d:{}:{}:{:.2}:{:.2}:{:.6}:{:.6}:r{:.1}:p{}x{}:cap{}",
        request.target_id,
        request.anchor.as_deref().unwrap_or("-"),
        c.local_x,
        c.local_y,
        c.lat,
        c.lng,
        config.radius,
        config.max_pages,
        config.page_size,
        config.neighbor_cap,
    )
}

struct TtlEntry {
    value: String,
    expires_at: Instant,
}

/// In-process store with per-entry TTL.
#[derive(Default)]
pub struct TtlCache {
    entries: RwLock<HashMap<String, TtlEntry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes expired entries and returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|_, entry| entry.expires_at > now);
        before - guard.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for TtlCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let guard = self.entries.read().await;
        Ok(guard
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = TtlEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}

/// Neighborhood cache with the write predicate and the failure cooldown.
pub struct NeighborhoodCache {
    store: Arc<dyn CacheStore>,
    policy: CachePolicy,
    open_until: Mutex<Option<Instant>>,
}

impl NeighborhoodCache {
    pub fn new(store: Arc<dyn CacheStore>, policy: CachePolicy) -> Self {
        Self {
            store,
            policy,
            open_until: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// The store is being bypassed after a recent failure.
    pub fn is_cooling_down(&self) -> bool {
        let guard = self.open_until.lock().unwrap_or_else(PoisonError::into_inner);
        guard.is_some_and(|until| Instant::now() < until)
    }

    fn trip(&self) {
        let mut guard = self.open_until.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Instant::now() + self.policy.cooldown);
    }

    /// Cached result, or `None` on a miss, a store failure or a bad payload.
    pub async fn get(&self, key: &str) -> Option<Neighborhood3D> {
        if self.is_cooling_down() {
            debug!(key, "Cache bypassed (cooldown)");
            return None;
        }
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                debug!(key, error = %e, "Cache get failed");
                self.trip();
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(neighborhood) => Some(neighborhood),
            Err(e) => {
                debug!(key, error = %e, "Cached payload ignored");
                None
            }
        }
    }

    /// Writes the result if the policy allows it. Returns the TTL used.
    pub async fn put(&self, key: &str, neighborhood: &Neighborhood3D) -> Option<Duration> {
        let Some(ttl) = self.policy.ttl_for(neighborhood) else {
            debug!(key, status = ?neighborhood.status, buildings = neighborhood.buildings.len(), "Cache write skipped");
            return None;
        };
        if self.is_cooling_down() {
            debug!(key, "Cache bypassed (cooldown)");
            return None;
        }
        let value = match serde_json::to_string(neighborhood) {
            Ok(value) => value,
            Err(e) => {
                debug!(key, error = %e, "Cache payload not serializable");
                return None;
            }
        };
        match self.store.set(key, value, ttl).await {
            Ok(()) => Some(ttl),
            Err(e) => {
                debug!(key, error = %e, "Cache set failed");
                self.trip();
                None
            }
        }
    }
}

//! Entry point exposed to the host view.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::fetch::cache::{NeighborhoodCache, cache_key};
use crate::fetch::config::{ConfigError, FetchConfig};
use crate::fetch::coordinator::{FetchCoordinator, FetchRequest};
use crate::fetch::registry::GeometryRegistry;
use crate::massing::building::{
    FetchDiagnostics, FetchStatus, Neighborhood3D, NeighborhoodCenter, StopReason,
};

/// Cache + coordinator. Never fails: degraded outcomes come back as
/// [`Neighborhood3D`] values with a [`FetchStatus`].
pub struct NeighborhoodService {
    coordinator: FetchCoordinator,
    cache: Option<NeighborhoodCache>,
}

impl NeighborhoodService {
    /// Validates the timeout chain before accepting the configuration.
    pub fn new(
        registry: Arc<dyn GeometryRegistry>,
        config: FetchConfig,
        cache: Option<NeighborhoodCache>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            coordinator: FetchCoordinator::new(registry, config),
            cache,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        self.coordinator.config()
    }

    /// `fetchNeighborhood3D(target_id, anchor, local_x, local_y, lat, lng)`
    pub async fn fetch_neighborhood_3d(
        &self,
        target_id: &str,
        anchor: Option<&str>,
        local_x: f64,
        local_y: f64,
        lat: f64,
        lng: f64,
    ) -> Neighborhood3D {
        let center = NeighborhoodCenter::new(lat, lng, local_x, local_y);
        self.fetch(&FetchRequest::new(target_id, anchor, center)).await
    }

    pub async fn fetch(&self, request: &FetchRequest) -> Neighborhood3D {
        let key = cache_key(request, self.config());
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                debug!(key, "Neighborhood cache hit");
                return hit;
            }
        }

        let abort = self.config().caller_abort_timeout;
        let result = match timeout(abort, self.coordinator.fetch(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(target_id = %request.target_id, "Neighborhood fetch aborted by caller timeout");
                unavailable(request, abort.as_millis() as u64)
            }
        };

        if let Some(cache) = &self.cache {
            cache.put(&key, &result).await;
        }
        result
    }
}

fn unavailable(request: &FetchRequest, elapsed_ms: u64) -> Neighborhood3D {
    let diagnostics = FetchDiagnostics {
        elapsed_ms,
        stop_reason: StopReason::BudgetExhausted,
        ..Default::default()
    };
    Neighborhood3D::new(
        request.address_id(),
        None,
        request.center,
        vec![],
        FetchStatus::Unavailable,
        diagnostics,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::cache::{CachePolicy, TtlCache};
    use crate::fetch::registry::{MockGeometryRegistry, RegistryError};

    #[test]
    fn test_rejects_broken_timeout_chain() {
        let registry = MockGeometryRegistry::new();
        let config = FetchConfig {
            caller_abort_timeout: std::time::Duration::from_secs(15),
            ..FetchConfig::new()
        };
        assert!(NeighborhoodService::new(Arc::new(registry), config, None).is_err());
    }

    #[tokio::test]
    async fn test_unavailable_result_is_not_cached() {
        let mut registry = MockGeometryRegistry::new();
        registry
            .expect_fetch_item()
            .times(2)
            .returning(|_| Err(RegistryError::Timeout));
        registry
            .expect_fetch_page()
            .times(2)
            .returning(|_| Err(RegistryError::Timeout));
        let cache = NeighborhoodCache::new(Arc::new(TtlCache::new()), CachePolicy::new());
        let service = NeighborhoodService::new(Arc::new(registry), FetchConfig::new(), Some(cache)).unwrap();

        // Second call reaches the registry again: the outage was not pinned
        for _ in 0..2 {
            let result = service
                .fetch_neighborhood_3d("T1", None, 1000., 2000., 52., 5.)
                .await;
            assert_eq!(result.status, FetchStatus::Unavailable);
            assert!(result.buildings.is_empty());
        }
    }
}

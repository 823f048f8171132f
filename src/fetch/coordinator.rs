//! Time-budgeted geometry fetch.
//!
//! Two independent paths run concurrently:
//! - the direct lookup of the target, bounded by its own timeout,
//! - the paginated area query for neighbors, sharing one overall budget.
//!
//! Pages are fetched strictly one after another because each page gets
//! `min(per_page_timeout, remaining)`. A failed page ends pagination but
//! keeps what earlier pages returned. Nothing here returns an error: every
//! outcome maps to a [`FetchStatus`].

use std::sync::Arc;

use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

use crate::fetch::config::FetchConfig;
use crate::fetch::registry::{GeometryRegistry, PageCursor};
use crate::massing::building::{
    BuildingMass, FetchDiagnostics, FetchStatus, Neighborhood3D, NeighborhoodCenter, StopReason,
};
use crate::massing::normalize::{Normalizer, Transform, merge, registry_id, strip_registry_prefix};

/// Input of one neighborhood fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Building id of the selected property.
    pub target_id: String,
    /// Address object id, reported back as `address_id` when present.
    pub anchor: Option<String>,
    pub center: NeighborhoodCenter,
}

impl FetchRequest {
    pub fn new(target_id: &str, anchor: Option<&str>, center: NeighborhoodCenter) -> Self {
        Self {
            target_id: strip_registry_prefix(target_id).to_string(),
            anchor: anchor.map(str::to_string),
            center,
        }
    }

    pub fn address_id(&self) -> &str {
        self.anchor.as_deref().unwrap_or(&self.target_id)
    }
}

/// Outcome of the direct path.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetLookup {
    Found(BuildingMass),
    NotFound,
    Failed,
}

/// Outcome of the paginated path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborFetch {
    pub buildings: Vec<BuildingMass>,
    pub pages_fetched: usize,
    pub stop_reason: StopReason,
}

impl NeighborFetch {
    /// No page succeeded and pagination did not end normally.
    pub fn failed(&self) -> bool {
        self.pages_fetched == 0 && self.stop_reason.is_truncation()
    }

    /// Gathered buildings other than the area copy of the target.
    pub fn neighbor_count(&self, target_id: &str) -> usize {
        self.buildings.iter().filter(|b| b.id != target_id).count()
    }
}

/// Combines both path outcomes.
///
/// Unavailable > TargetNotFound > PartialNeighbors > Complete.
pub fn classify(target: &TargetLookup, neighbors: &NeighborFetch) -> FetchStatus {
    match target {
        TargetLookup::Failed if neighbors.failed() => FetchStatus::Unavailable,
        TargetLookup::Failed | TargetLookup::NotFound => FetchStatus::TargetNotFound,
        TargetLookup::Found(_) if neighbors.stop_reason.is_truncation() => {
            FetchStatus::PartialNeighbors
        }
        TargetLookup::Found(_) => FetchStatus::Complete,
    }
}

pub struct FetchCoordinator {
    registry: Arc<dyn GeometryRegistry>,
    config: FetchConfig,
}

impl FetchCoordinator {
    pub fn new(registry: Arc<dyn GeometryRegistry>, config: FetchConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches target and neighbors and merges them (target first).
    pub async fn fetch(&self, request: &FetchRequest) -> Neighborhood3D {
        let start = Instant::now();
        let normalizer = Normalizer::new(request.center.local_x, request.center.local_y);

        let (target, neighbors) = tokio::join!(
            self.fetch_target(&request.target_id, &normalizer),
            self.fetch_neighbors(&normalizer, &request.target_id),
        );

        let status = classify(&target, &neighbors);
        let diagnostics = FetchDiagnostics {
            pages_fetched: neighbors.pages_fetched,
            neighbor_count: neighbors.neighbor_count(&request.target_id),
            elapsed_ms: start.elapsed().as_millis() as u64,
            stop_reason: neighbors.stop_reason,
        };
        let target = match target {
            TargetLookup::Found(b) => Some(b),
            _ => None,
        };
        let target_id = target.as_ref().map(|b| b.id.clone());
        let buildings = merge(target, neighbors.buildings);

        info!(
            target_id = %request.target_id,
            buildings = buildings.len(),
            pages = diagnostics.pages_fetched,
            elapsed_ms = diagnostics.elapsed_ms,
            status = ?status,
            "Neighborhood fetch complete"
        );

        Neighborhood3D::new(
            request.address_id(),
            target_id.as_deref(),
            request.center,
            buildings,
            status,
            diagnostics,
        )
    }

    /// Direct lookup of the target, bounded by `target_timeout`.
    pub async fn fetch_target(&self, target_id: &str, normalizer: &Normalizer) -> TargetLookup {
        let id = registry_id(target_id);
        let item = match timeout(self.config.target_timeout, self.registry.fetch_item(&id)).await {
            Ok(Ok(Some(item))) => item,
            Ok(Ok(None)) => {
                debug!(target_id, "Target not in registry");
                return TargetLookup::NotFound;
            }
            Ok(Err(e)) => {
                warn!(target_id, error = %e, "Target lookup failed");
                return TargetLookup::Failed;
            }
            Err(_) => {
                warn!(
                    target_id,
                    timeout_ms = self.config.target_timeout.as_millis() as u64,
                    "Target lookup timed out"
                );
                return TargetLookup::Failed;
            }
        };

        let (feature, block) = item.into_feature();
        let transform = Transform::from(block.as_ref());
        match normalizer.parse_feature(&feature, &transform).into_iter().next() {
            Some(b) => TargetLookup::Found(b),
            None => {
                debug!(target_id, "Target has no usable massing");
                TargetLookup::NotFound
            }
        }
    }

    /// Sequential pagination of the area query under the overall budget.
    pub async fn fetch_neighbors(&self, normalizer: &Normalizer, target_id: &str) -> NeighborFetch {
        let cfg = &self.config;
        let start = Instant::now();
        let mut out = NeighborFetch::default();
        let mut cursor = Some(PageCursor::area(
            normalizer.center_x,
            normalizer.center_y,
            cfg.radius,
            cfg.page_size,
        ));

        out.stop_reason = loop {
            let Some(current) = cursor.take() else {
                break StopReason::LastPage;
            };
            if out.pages_fetched >= cfg.max_pages {
                break StopReason::MaxPages;
            }
            if out.neighbor_count(target_id) >= cfg.neighbor_cap {
                break StopReason::NeighborCap;
            }
            let remaining = cfg.overall_budget.saturating_sub(start.elapsed());
            if remaining < cfg.min_remaining {
                info!(
                    used_ms = start.elapsed().as_millis() as u64,
                    pages = out.pages_fetched,
                    "Neighbor fetch stopping: time budget exhausted"
                );
                break StopReason::BudgetExhausted;
            }

            let page_no = out.pages_fetched + 1;
            let page_start = Instant::now();
            let page = match timeout(cfg.per_page_timeout.min(remaining), self.registry.fetch_page(&current)).await {
                Ok(Ok(page)) => page,
                Ok(Err(e)) => {
                    warn!(
                        page = page_no,
                        duration_ms = page_start.elapsed().as_millis() as u64,
                        error = %e,
                        "Neighbor page failed"
                    );
                    break StopReason::PageFailed;
                }
                Err(_) => {
                    warn!(
                        page = page_no,
                        duration_ms = page_start.elapsed().as_millis() as u64,
                        "Neighbor page timed out"
                    );
                    break StopReason::PageFailed;
                }
            };

            let transform = Transform::from(page.transform());
            let before = out.buildings.len();
            for feature in &page.features {
                out.buildings.extend(normalizer.parse_feature(feature, &transform));
            }
            out.pages_fetched = page_no;
            info!(
                page = page_no,
                buildings = out.buildings.len() - before,
                duration_ms = page_start.elapsed().as_millis() as u64,
                "Neighbor page fetched"
            );

            cursor = page.next_href().map(|href| PageCursor::Next(href.to_string()));
        };

        info!(
            buildings = out.buildings.len(),
            pages = out.pages_fetched,
            elapsed_ms = start.elapsed().as_millis() as u64,
            stop_reason = ?out.stop_reason,
            "Neighbor fetch finished"
        );
        out
    }
}

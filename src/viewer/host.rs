//! Ports toward the host view.

use async_trait::async_trait;

use crate::fetch::coordinator::FetchRequest;
use crate::fetch::service::NeighborhoodService;
use crate::massing::building::Neighborhood3D;
use crate::sim::sunlight::result::SunlightResult;
use crate::snapshot::capture::ShadowSnapshot;

/// Notifications for the dossier around the 3D view.
///
/// Only results of the current selection are delivered.
#[cfg_attr(test, mockall::automock)]
pub trait HostCallbacks: Send + Sync {
    fn on_neighborhood(&self, neighborhood: &Neighborhood3D);
    fn on_sunlight_analysis(&self, result: &SunlightResult);
    fn on_shadow_snapshots(&self, snapshots: &[ShadowSnapshot]);
}

/// Where selections get their massing from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NeighborhoodSource: Send + Sync {
    async fn neighborhood(&self, request: &FetchRequest) -> Neighborhood3D;
}

#[async_trait]
impl NeighborhoodSource for NeighborhoodService {
    async fn neighborhood(&self, request: &FetchRequest) -> Neighborhood3D {
        self.fetch(request).await
    }
}

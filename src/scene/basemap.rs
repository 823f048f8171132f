//! Cosmetic ground texture from an external basemap service.
//!
//! Failure is silent: the ground stays untextured and nothing else waits on
//! it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::massing::building::NeighborhoodCenter;
use crate::snapshot::raster::Raster;

/// Aerial imagery WMS of the Dutch national geodata service.
pub const DEFAULT_BASEMAP_URL: &str = "https://service.pdok.nl/hwh/luchtfotorgb/wms/v1_0";
pub const DEFAULT_BASEMAP_LAYER: &str = "Actueel_orthoHR";

/// Half side of the textured ground plane around the neighborhood center [m].
pub const GROUND_HALF_EXTENT: f64 = 400.0;

#[derive(Debug, thiserror::Error)]
pub enum BasemapError {
    #[error("Basemap request failed: {0}")]
    Request(String),
    #[error("Basemap image invalid: {0}")]
    Image(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BasemapProvider: Send + Sync {
    /// Square tile of `2 * half_extent` meters centered on `center`.
    async fn tile(&self, center: &NeighborhoodCenter, half_extent: f64) -> Result<Raster, BasemapError>;
}

/// Ground texture or nothing.
pub async fn load_ground_texture(
    provider: &dyn BasemapProvider,
    center: &NeighborhoodCenter,
    half_extent: f64,
) -> Option<Raster> {
    match provider.tile(center, half_extent).await {
        Ok(raster) => Some(raster),
        Err(e) => {
            debug!(error = %e, "Basemap unavailable, ground left plain");
            None
        }
    }
}

/// WMS `GetMap` client in the planar reference system of the registry.
pub struct WmsBasemap {
    client: Client,
    base_url: String,
    layer: String,
    size_px: u32,
}

impl WmsBasemap {
    pub fn new(base_url: &str, layer: &str, size_px: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            layer: layer.to_string(),
            size_px,
        }
    }

    pub fn url(&self, center: &NeighborhoodCenter, half_extent: f64) -> String {
        format!(
            "{}?SERVICE=WMS&VERSION=1.3.0&REQUEST=GetMap&LAYERS={}&STYLES=&CRS=EPSG:28992&BBOX={:.0},{:.0},{:.0},{:.0}&WIDTH={}&HEIGHT={}&FORMAT=image/png",
            self.base_url,
            self.layer,
            center.local_x - half_extent,
            center.local_y - half_extent,
            center.local_x + half_extent,
            center.local_y + half_extent,
            self.size_px,
            self.size_px,
        )
    }
}

impl Default for WmsBasemap {
    fn default() -> Self {
        Self::new(DEFAULT_BASEMAP_URL, DEFAULT_BASEMAP_LAYER, 512)
    }
}

#[async_trait]
impl BasemapProvider for WmsBasemap {
    async fn tile(&self, center: &NeighborhoodCenter, half_extent: f64) -> Result<Raster, BasemapError> {
        let response = self
            .client
            .get(self.url(center, half_extent))
            .send()
            .await
            .map_err(|e| BasemapError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BasemapError::Request(format!("status {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BasemapError::Request(e.to_string()))?;
        Raster::from_png(&bytes).map_err(|e| BasemapError::Image(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center() -> NeighborhoodCenter {
        NeighborhoodCenter::new(52.37, 4.9, 121000., 487000.)
    }

    #[tokio::test]
    async fn test_failure_is_silent() {
        let mut provider = MockBasemapProvider::new();
        provider
            .expect_tile()
            .returning(|_, _| Err(BasemapError::Request("dns".to_string())));
        assert!(load_ground_texture(&provider, &center(), 150.).await.is_none());
    }

    #[tokio::test]
    async fn test_texture_passthrough() {
        let mut provider = MockBasemapProvider::new();
        provider
            .expect_tile()
            .returning(|_, _| Ok(Raster::new(2, 2, [10, 20, 30, 255])));
        let raster = load_ground_texture(&provider, &center(), 150.).await.unwrap();
        assert_eq!(raster.pixel(1, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn test_url_is_keyed_by_center() {
        let wms = WmsBasemap::default();
        let url = wms.url(&center(), 150.);
        assert!(url.contains("BBOX=120850,486850,121150,487150"));
        assert!(url.contains("WIDTH=512&HEIGHT=512"));
    }
}

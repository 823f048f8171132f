#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use massing3d::fetch::{GeometryRegistry, PageCursor, RegistryError};
use massing3d::io::cityjson::{FeaturePage, ItemResponse};
use massing3d::sim::sunlight::SunlightResult;
use massing3d::snapshot::ShadowSnapshot;
use massing3d::viewer::HostCallbacks;
use massing3d::{Neighborhood3D, NeighborhoodCenter};

pub const CENTER_X: i64 = 121_000;
pub const CENTER_Y: i64 = 487_000;

pub fn center() -> NeighborhoodCenter {
    NeighborhoodCenter::new(52.37, 4.90, CENTER_X as f64, CENTER_Y as f64)
}

/// One building with a square footprint of `size` meters, south-west corner
/// at `(dx, dy)` from the center. Vertices are in whole meters (scale 1).
pub fn feature_json(id: &str, dx: i64, dy: i64, size: i64, height: f64) -> String {
    let (x0, y0) = (CENTER_X + dx, CENTER_Y + dy);
    let (x1, y1) = (x0 + size, y0 + size);
    format!(
        r#"{{
            "type": "CityJSONFeature",
            "CityObjects": {{
                "NL.IMBAG.Pand.{id}": {{
                    "type": "Building",
                    "attributes": {{
                        "identificatie": "NL.IMBAG.Pand.{id}",
                        "b3_h_maaiveld": 0.5,
                        "b3_h_dak_max": {roof},
                        "oorspronkelijkbouwjaar": 1931
                    }},
                    "geometry": [{{"type": "MultiSurface", "lod": "0", "boundaries": [[[0, 1, 2, 3]]]}}]
                }}
            }},
            "vertices": [[{x0}, {y0}, 0], [{x1}, {y0}, 0], [{x1}, {y1}, 0], [{x0}, {y1}, 0]]
        }}"#,
        roof = 0.5 + height
    )
}

const TRANSFORM: &str = r#"{"transform": {"scale": [1, 1, 1], "translate": [0, 0, 0]}}"#;

pub fn item(id: &str) -> ItemResponse {
    let json = format!(
        r#"{{"feature": {}, "metadata": {TRANSFORM}}}"#,
        feature_json(id, -5, -5, 10, 6.0)
    );
    serde_json::from_str(&json).expect("valid item fixture")
}

pub fn page(ids: &[String], next: Option<&str>) -> FeaturePage {
    let features: Vec<String> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| feature_json(id, 40 + 20 * i as i64, 60, 10, 9.0))
        .collect();
    let links = match next {
        Some(href) => format!(r#"[{{"rel": "next", "href": "{href}"}}]"#),
        None => "[]".to_string(),
    };
    let json = format!(
        r#"{{"type": "FeatureCollection", "features": [{}], "metadata": {TRANSFORM}, "links": {links}}}"#,
        features.join(",")
    );
    serde_json::from_str(&json).expect("valid page fixture")
}

/// Registry that answers from a script and sleeps on the tokio clock.
pub struct ScriptedRegistry {
    pub target: Option<String>,
    pub target_delay: Duration,
    /// Delay of every page.
    pub page_delay: Duration,
    /// Buildings per page.
    pub per_page: usize,
    /// Pages available before the last one.
    pub pages: usize,
    pub page_calls: AtomicUsize,
}

impl ScriptedRegistry {
    pub fn new(target: Option<&str>) -> Self {
        Self {
            target: target.map(str::to_string),
            target_delay: Duration::ZERO,
            page_delay: Duration::ZERO,
            per_page: 2,
            pages: 1,
            page_calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeometryRegistry for ScriptedRegistry {
    async fn fetch_item(&self, registry_id: &str) -> Result<Option<ItemResponse>, RegistryError> {
        tokio::time::sleep(self.target_delay).await;
        match &self.target {
            Some(id) if registry_id.ends_with(id.as_str()) => Ok(Some(item(id))),
            _ => Ok(None),
        }
    }

    async fn fetch_page(&self, _cursor: &PageCursor) -> Result<FeaturePage, RegistryError> {
        let index = self.page_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.page_delay).await;
        let ids: Vec<String> = (0..self.per_page)
            .map(|i| format!("P{index}B{i}"))
            .collect();
        let next = (index + 1 < self.pages).then(|| format!("page-{}", index + 1));
        Ok(page(&ids, next.as_deref()))
    }
}

/// Host that keeps every notification.
#[derive(Default)]
pub struct RecordingHost {
    pub neighborhoods: Mutex<Vec<Neighborhood3D>>,
    pub sunlight: Mutex<Vec<SunlightResult>>,
    pub snapshots: Mutex<Vec<usize>>,
    /// Signalled on every applied neighborhood.
    pub applied: Notify,
}

impl HostCallbacks for RecordingHost {
    fn on_neighborhood(&self, neighborhood: &Neighborhood3D) {
        self.neighborhoods.lock().unwrap().push(neighborhood.clone());
        self.applied.notify_one();
    }

    fn on_sunlight_analysis(&self, result: &SunlightResult) {
        self.sunlight.lock().unwrap().push(result.clone());
    }

    fn on_shadow_snapshots(&self, snapshots: &[ShadowSnapshot]) {
        self.snapshots.lock().unwrap().push(snapshots.len());
    }
}

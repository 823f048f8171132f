use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::geom::footprint::Footprint;
use crate::geom::volume::Volume;

pub const MSG_NO_DATA: &str = "No 3D building data available for this area";
pub const MSG_TARGET_NOT_FOUND: &str = "Target building not found in 3D data";

/// Footprint + height massing of a single building.
///
/// Footprint points are plan offsets [m] from the neighborhood center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingMass {
    pub id: String,
    /// Ground elevation [m]
    pub ground_height: f64,
    /// Height above ground [m]
    pub building_height: f64,
    pub footprint: Footprint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl BuildingMass {
    pub fn new(id: &str, ground_height: f64, building_height: f64, footprint: Footprint) -> Result<Self> {
        if !ground_height.is_finite() || !building_height.is_finite() || building_height < 0. {
            return Err(anyhow!(
                "Building {id}: invalid heights (ground {ground_height}, height {building_height})"
            ));
        }
        Ok(Self {
            id: id.to_string(),
            ground_height,
            building_height,
            footprint,
            year: None,
        })
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    /// Roof elevation [m]
    pub fn top(&self) -> f64 {
        self.ground_height + self.building_height
    }

    /// Flat extrusion from ground to roof.
    pub fn to_volume(&self, is_target: bool) -> Result<Volume> {
        Volume::new(&self.id, self.ground_height, self.top(), self.footprint.clone(), is_target)
    }
}

/// Anchor of the scene. Local coordinates are in the registry's planar
/// reference system (RD New for the Dutch registry).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodCenter {
    pub lat: f64,
    pub lng: f64,
    pub local_x: f64,
    pub local_y: f64,
}

impl NeighborhoodCenter {
    pub fn new(lat: f64, lng: f64, local_x: f64, local_y: f64) -> Self {
        Self {
            lat,
            lng,
            local_x,
            local_y,
        }
    }
}

/// Quality of a fetch result. Degraded results are values, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// Target found and neighbor pagination ended normally.
    Complete,
    /// Target found, neighbor pagination cut short by a failure or the budget.
    PartialNeighbors,
    /// Direct lookup found nothing (neighbors may still be present).
    TargetNotFound,
    /// Both fetch paths failed.
    Unavailable,
}

/// Why neighbor pagination stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    #[default]
    LastPage,
    MaxPages,
    NeighborCap,
    BudgetExhausted,
    PageFailed,
}

impl StopReason {
    /// Pagination ended before the registry ran out of pages for a reason
    /// other than having enough data.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::BudgetExhausted | Self::PageFailed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchDiagnostics {
    pub pages_fetched: usize,
    pub neighbor_count: usize,
    pub elapsed_ms: u64,
    pub stop_reason: StopReason,
}

/// Target + neighbors massing around an anchor point.
///
/// The target, when found, is always the first building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood3D {
    pub address_id: String,
    #[serde(default)]
    pub target_id: Option<String>,
    pub center: NeighborhoodCenter,
    #[serde(default)]
    pub buildings: Vec<BuildingMass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: FetchStatus,
    #[serde(default)]
    pub diagnostics: FetchDiagnostics,
}

impl Neighborhood3D {
    /// Assembles the response shape from already merged buildings.
    pub fn new(
        address_id: &str,
        target_id: Option<&str>,
        center: NeighborhoodCenter,
        buildings: Vec<BuildingMass>,
        status: FetchStatus,
        diagnostics: FetchDiagnostics,
    ) -> Self {
        let message = if buildings.is_empty() {
            Some(MSG_NO_DATA.to_string())
        } else if target_id.is_none() {
            Some(MSG_TARGET_NOT_FOUND.to_string())
        } else {
            None
        };
        Self {
            address_id: address_id.to_string(),
            target_id: target_id.map(str::to_string),
            center,
            buildings,
            message,
            status,
            diagnostics,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn target(&self) -> Option<&BuildingMass> {
        let id = self.target_id.as_deref()?;
        self.buildings.iter().find(|b| b.id == id)
    }

    pub fn neighbors(&self) -> impl Iterator<Item = &BuildingMass> {
        let target_id = self.target_id.clone();
        self.buildings
            .iter()
            .filter(move |b| target_id.as_deref() != Some(b.id.as_str()))
    }

    /// Identity of the building set, used to run one-shot work once per set.
    pub fn building_set_key(&self) -> BuildingSetKey {
        let mut ids: Vec<String> = self.buildings.iter().map(|b| b.id.clone()).collect();
        ids.sort();
        BuildingSetKey {
            target_id: self.target_id.clone(),
            ids,
        }
    }
}

/// (target, sorted building ids)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildingSetKey {
    pub target_id: Option<String>,
    pub ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mass(id: &str) -> BuildingMass {
        let fp = Footprint::new(vec![[0., 0.], [10., 0.], [10., 10.], [0., 10.]]).unwrap();
        BuildingMass::new(id, 1.0, 9.0, fp).unwrap()
    }

    fn center() -> NeighborhoodCenter {
        NeighborhoodCenter::new(52.37, 4.89, 121000., 487000.)
    }

    #[test]
    fn test_negative_height_rejected() {
        let fp = Footprint::new(vec![[0., 0.], [1., 0.], [1., 1.]]).unwrap();
        assert!(BuildingMass::new("x", 0., -1., fp).is_err());
    }

    #[test]
    fn test_volume_extrusion() -> Result<()> {
        let v = mass("a").to_volume(true)?;
        assert_eq!(v.base, 1.0);
        assert_eq!(v.top, 10.0);
        assert!(v.is_target);
        Ok(())
    }

    #[test]
    fn test_messages() {
        let d = FetchDiagnostics::default();
        let empty = Neighborhood3D::new("a", None, center(), vec![], FetchStatus::Unavailable, d.clone());
        assert_eq!(empty.message.as_deref(), Some(MSG_NO_DATA));

        let no_target = Neighborhood3D::new(
            "a",
            None,
            center(),
            vec![mass("n1")],
            FetchStatus::TargetNotFound,
            d.clone(),
        );
        assert_eq!(no_target.message.as_deref(), Some(MSG_TARGET_NOT_FOUND));
        assert!(no_target.target().is_none());

        let ok = Neighborhood3D::new("a", Some("t"), center(), vec![mass("t"), mass("n1")], FetchStatus::Complete, d);
        assert!(ok.message.is_none());
        assert_eq!(ok.target().map(|b| b.id.as_str()), Some("t"));
        assert_eq!(ok.neighbors().count(), 1);
    }

    #[test]
    fn test_building_set_key_ignores_order() {
        let d = FetchDiagnostics::default();
        let a = Neighborhood3D::new(
            "a",
            Some("t"),
            center(),
            vec![mass("t"), mass("n1"), mass("n2")],
            FetchStatus::Complete,
            d.clone(),
        );
        let b = Neighborhood3D::new(
            "a",
            Some("t"),
            center(),
            vec![mass("t"), mass("n2"), mass("n1")],
            FetchStatus::Complete,
            d,
        );
        assert_eq!(a.building_set_key(), b.building_set_key());
    }

    #[test]
    fn test_serde_shape() -> Result<()> {
        let n = Neighborhood3D::new(
            "addr",
            Some("t"),
            center(),
            vec![mass("t")],
            FetchStatus::PartialNeighbors,
            FetchDiagnostics::default(),
        );
        let json = serde_json::to_value(&n)?;
        assert_eq!(json["status"], "partial_neighbors");
        assert_eq!(json["buildings"][0]["footprint"][1][0], 10.0);
        assert!(json.get("message").is_none());
        let back: Neighborhood3D = serde_json::from_value(json)?;
        assert_eq!(back, n);
        Ok(())
    }
}

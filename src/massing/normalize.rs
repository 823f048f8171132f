//! Decoding of registry payloads into local massing.
//!
//! Vertices come quantized: `real = vertex * scale + translate` per axis, with
//! one transform block per response page. Footprints are then expressed as
//! offsets from the neighborhood center.

use std::collections::HashSet;

use tracing::debug;

use crate::geom::footprint::{Footprint, PlanPoint};
use crate::io::cityjson::{CityJsonFeature, CityObject, TransformBlock};
use crate::massing::building::BuildingMass;

/// Prefix of building ids in the registry.
pub const REGISTRY_ID_PREFIX: &str = "NL.IMBAG.Pand.";

pub const ATTR_GROUND: &str = "b3_h_maaiveld";
pub const ATTR_ROOF: &str = "b3_h_dak_max";
pub const ATTR_ID: &str = "identificatie";
pub const ATTR_YEAR: &str = "oorspronkelijkbouwjaar";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: [f64; 3],
    pub translate: [f64; 3],
}

impl Transform {
    pub fn new(scale: [f64; 3], translate: [f64; 3]) -> Self {
        Self { scale, translate }
    }

    /// Decodes one quantized vertex.
    pub fn decode(&self, vertex: [f64; 3]) -> [f64; 3] {
        [
            vertex[0] * self.scale[0] + self.translate[0],
            vertex[1] * self.scale[1] + self.translate[1],
            vertex[2] * self.scale[2] + self.translate[2],
        ]
    }

    /// Decodes the plan part of a vertex. Returns `None` for vertices with
    /// fewer than two components.
    pub fn decode_plan(&self, vertex: &[f64]) -> Option<PlanPoint> {
        match vertex {
            [x, y, ..] => Some([
                x * self.scale[0] + self.translate[0],
                y * self.scale[1] + self.translate[1],
            ]),
            _ => None,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new([0.001; 3], [0.; 3])
    }
}

impl From<Option<&TransformBlock>> for Transform {
    fn from(block: Option<&TransformBlock>) -> Self {
        let default = Self::default();
        match block {
            Some(b) => Self::new(
                b.scale.unwrap_or(default.scale),
                b.translate.unwrap_or(default.translate),
            ),
            None => default,
        }
    }
}

/// Strips the registry prefix from a building id.
pub fn strip_registry_prefix(raw: &str) -> &str {
    raw.strip_prefix(REGISTRY_ID_PREFIX).unwrap_or(raw)
}

/// Builds the registry id used by the direct lookup.
pub fn registry_id(id: &str) -> String {
    format!("{REGISTRY_ID_PREFIX}{}", strip_registry_prefix(id))
}

fn round2(x: f64) -> f64 {
    (x * 100.).round() / 100.
}

/// Converts registry city objects into massing relative to a center.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    pub center_x: f64,
    pub center_y: f64,
}

impl Normalizer {
    pub fn new(center_x: f64, center_y: f64) -> Self {
        Self { center_x, center_y }
    }

    /// Parses one `Building` city object.
    ///
    /// Returns `None` when the building lacks usable height attributes, has a
    /// non-positive height, has no LoD 0 footprint, or its footprint decodes
    /// to fewer than 3 points.
    pub fn parse_building(
        &self,
        object: &CityObject,
        vertices: &[Vec<f64>],
        transform: &Transform,
    ) -> Option<BuildingMass> {
        let raw_id = object.attr_str(ATTR_ID).unwrap_or("unknown");
        let id = strip_registry_prefix(raw_id);

        let (Some(ground), Some(roof)) = (object.attr_f64(ATTR_GROUND), object.attr_f64(ATTR_ROOF)) else {
            debug!(building = id, "dropped: missing height attributes");
            return None;
        };
        let height = roof - ground;
        if height <= 0. {
            debug!(building = id, height, "dropped: non-positive height");
            return None;
        }

        let ring = object.footprint_geometry()?.outer_ring()?;
        let pts: Vec<PlanPoint> = ring
            .iter()
            .filter_map(|&i| vertices.get(i))
            .filter_map(|v| transform.decode_plan(v))
            .map(|[x, y]| [round2(x - self.center_x), round2(y - self.center_y)])
            .collect();
        if pts.len() < 3 {
            debug!(building = id, points = pts.len(), "dropped: footprint too short");
            return None;
        }
        let footprint = match Footprint::new(pts) {
            Ok(fp) => fp,
            Err(e) => {
                debug!(building = id, error = %e, "dropped: degenerate footprint");
                return None;
            }
        };

        BuildingMass::new(id, round2(ground), round2(height), footprint)
            .ok()
            .map(|b| b.with_year(object.attr_i32(ATTR_YEAR)))
    }

    /// Parses every building of a feature.
    pub fn parse_feature(&self, feature: &CityJsonFeature, transform: &Transform) -> Vec<BuildingMass> {
        feature
            .buildings()
            .filter_map(|o| self.parse_building(o, &feature.vertices, transform))
            .collect()
    }
}

/// Merges the direct lookup result with the area query result.
///
/// The direct record comes first and wins over any area record with the same
/// id. Area duplicates are dropped too.
pub fn merge(target: Option<BuildingMass>, neighbors: Vec<BuildingMass>) -> Vec<BuildingMass> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(neighbors.len() + 1);
    for b in target.into_iter().chain(neighbors) {
        if seen.insert(b.id.clone()) {
            out.push(b);
        }
    }
    out
}

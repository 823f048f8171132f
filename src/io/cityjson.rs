//! Wire types of the geometry registry (CityJSON features over an OGC API).
//!
//! Only the fields the normalizer needs are modeled. Everything else in the
//! payload is ignored.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// `scale`/`translate` block carried once per response page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransformBlock {
    #[serde(default)]
    pub scale: Option<[f64; 3]>,
    #[serde(default)]
    pub translate: Option<[f64; 3]>,
}

impl TransformBlock {
    pub fn is_empty(&self) -> bool {
        self.scale.is_none() && self.translate.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub transform: Option<TransformBlock>,
}

impl Metadata {
    /// Returns the transform block unless it is missing or empty.
    pub fn transform(&self) -> Option<&TransformBlock> {
        self.transform.as_ref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub lod: Option<Value>,
    #[serde(default)]
    pub boundaries: Value,
}

impl Geometry {
    /// Level of detail as a string (`"0"`, `"1.2"`, ...). Numeric values are accepted too.
    pub fn lod(&self) -> Option<String> {
        match self.lod.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn is_footprint(&self) -> bool {
        self.kind == "MultiSurface" && self.lod().as_deref() == Some("0")
    }

    /// Vertex indices of the outer ring of the first surface.
    ///
    /// MultiSurface boundaries are `[[[i, j, ...], [hole]], ...]`. A flat
    /// `[[i, j, ...]]` layout is accepted as well.
    pub fn outer_ring(&self) -> Option<Vec<usize>> {
        let first = self.boundaries.as_array()?.first()?.as_array()?;
        let ring = match first.first()? {
            Value::Array(ring) => ring,
            _ => first,
        };
        Some(ring.iter().filter_map(|i| i.as_u64()).map(|i| i as usize).collect())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
    #[serde(default)]
    pub geometry: Vec<Geometry>,
}

impl CityObject {
    pub fn is_building(&self) -> bool {
        self.kind == "Building"
    }

    pub fn attr_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_f64)
    }

    pub fn attr_i32(&self, key: &str) -> Option<i32> {
        self.attributes
            .get(key)
            .and_then(Value::as_i64)
            .and_then(|v| i32::try_from(v).ok())
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// First LoD 0 MultiSurface geometry.
    pub fn footprint_geometry(&self) -> Option<&Geometry> {
        self.geometry.iter().find(|g| g.is_footprint())
    }
}

/// One CityJSONFeature: a set of city objects sharing a vertex list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CityJsonFeature {
    #[serde(rename = "CityObjects", default)]
    pub city_objects: BTreeMap<String, CityObject>,
    #[serde(default)]
    pub vertices: Vec<Vec<f64>>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl CityJsonFeature {
    pub fn buildings(&self) -> impl Iterator<Item = &CityObject> {
        self.city_objects.values().filter(|o| o.is_building())
    }
}

/// Response of the direct-by-identifier endpoint.
///
/// The feature is usually nested under `feature`, with the transform in the
/// root `metadata`. Some deployments return the feature at the root.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemResponse {
    #[serde(default)]
    pub feature: Option<CityJsonFeature>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(rename = "CityObjects", default)]
    pub city_objects: BTreeMap<String, CityObject>,
    #[serde(default)]
    pub vertices: Vec<Vec<f64>>,
}

impl ItemResponse {
    /// Unwraps the feature (falling back to the root) and picks its transform.
    ///
    /// The root metadata wins over the feature's own metadata.
    pub fn into_feature(self) -> (CityJsonFeature, Option<TransformBlock>) {
        let root_transform = self.metadata.as_ref().and_then(|m| m.transform()).cloned();
        let inner = match self.feature {
            Some(feature) => feature,
            None => CityJsonFeature {
                city_objects: self.city_objects,
                vertices: self.vertices,
                metadata: self.metadata,
            },
        };
        let transform = root_transform.or_else(|| {
            inner
                .metadata
                .as_ref()
                .and_then(|m| m.transform())
                .cloned()
        });
        (inner, transform)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
}

/// One page of the area (bbox) query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeaturePage {
    #[serde(default)]
    pub features: Vec<CityJsonFeature>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl FeaturePage {
    pub fn transform(&self) -> Option<&TransformBlock> {
        self.metadata.as_ref().and_then(|m| m.transform())
    }

    /// `href` of the `rel=next` link, if any.
    pub fn next_href(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel.as_deref() == Some("next"))
            .and_then(|l| l.href.as_deref())
    }
}

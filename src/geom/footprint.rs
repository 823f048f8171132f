//! Building footprints in the horizontal plane.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::geom::EPS;

/// Plan coordinate `[dx, dy]` in meters, relative to the neighborhood center.
pub type PlanPoint = [f64; 2];

/// Ordered outer ring of a building footprint.
///
/// The ring is stored open (the first point is not repeated at the end).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PlanPoint>", into = "Vec<PlanPoint>")]
pub struct Footprint {
    pts: Vec<PlanPoint>,
}

impl Footprint {
    /// Creates a footprint from an ordered ring.
    ///
    /// A closing point equal to the first one is dropped. Fails for rings with
    /// fewer than 3 distinct points, non-finite coordinates or zero area.
    pub fn new(mut pts: Vec<PlanPoint>) -> Result<Self> {
        if pts.len() > 1 && is_same(pts[0], pts[pts.len() - 1]) {
            pts.pop();
        }
        pts.dedup_by(|a, b| is_same(*a, *b));
        if pts.len() < 3 {
            return Err(anyhow!("Footprint needs at least 3 points, got {}", pts.len()));
        }
        if pts.iter().any(|p| !p[0].is_finite() || !p[1].is_finite()) {
            return Err(anyhow!("Footprint has non-finite coordinates"));
        }
        let fp = Self { pts };
        if fp.area() < EPS {
            return Err(anyhow!("Footprint is degenerate (zero area)"));
        }
        Ok(fp)
    }

    pub fn points(&self) -> &[PlanPoint] {
        &self.pts
    }

    pub fn len(&self) -> usize {
        self.pts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pts.is_empty()
    }

    /// Iterates over ring edges `(p_i, p_i+1)`, closing the ring.
    pub fn edges(&self) -> impl Iterator<Item = (PlanPoint, PlanPoint)> + '_ {
        let n = self.pts.len();
        (0..n).map(move |i| (self.pts[i], self.pts[(i + 1) % n]))
    }

    /// Shoelace area, positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        0.5 * self
            .edges()
            .map(|(a, b)| a[0] * b[1] - b[0] * a[1])
            .sum::<f64>()
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.
    }

    /// Area centroid of the ring.
    pub fn centroid(&self) -> PlanPoint {
        let a = self.signed_area();
        let (mut cx, mut cy) = (0., 0.);
        for (p, q) in self.edges() {
            let cross = p[0] * q[1] - q[0] * p[1];
            cx += (p[0] + q[0]) * cross;
            cy += (p[1] + q[1]) * cross;
        }
        [cx / (6. * a), cy / (6. * a)]
    }

    /// Returns `(min, max)` plan corners.
    pub fn bounds(&self) -> (PlanPoint, PlanPoint) {
        let mut min = self.pts[0];
        let mut max = self.pts[0];
        for p in self.pts.iter().skip(1) {
            min[0] = min[0].min(p[0]);
            min[1] = min[1].min(p[1]);
            max[0] = max[0].max(p[0]);
            max[1] = max[1].max(p[1]);
        }
        (min, max)
    }

    /// Crossing-number test. Points on the boundary count as inside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if is_on_segment([x, y], a, b) {
                return true;
            }
            if (a[1] > y) != (b[1] > y) {
                let x_cross = a[0] + (y - a[1]) * (b[0] - a[0]) / (b[1] - a[1]);
                if x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

impl TryFrom<Vec<PlanPoint>> for Footprint {
    type Error = anyhow::Error;

    fn try_from(pts: Vec<PlanPoint>) -> Result<Self> {
        Self::new(pts)
    }
}

impl From<Footprint> for Vec<PlanPoint> {
    fn from(fp: Footprint) -> Self {
        fp.pts
    }
}

fn is_same(a: PlanPoint, b: PlanPoint) -> bool {
    (a[0] - b[0]).abs() < EPS && (a[1] - b[1]).abs() < EPS
}

fn is_on_segment(p: PlanPoint, a: PlanPoint, b: PlanPoint) -> bool {
    let cross = (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0]);
    if cross.abs() > EPS {
        return false;
    }
    p[0] >= a[0].min(b[0]) - EPS
        && p[0] <= a[0].max(b[0]) + EPS
        && p[1] >= a[1].min(b[1]) - EPS
        && p[1] <= a[1].max(b[1]) + EPS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_shape() -> Footprint {
        Footprint::new(vec![
            [0., 0.],
            [6., 0.],
            [6., 4.],
            [4., 4.],
            [4., 8.],
            [0., 8.],
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_degenerate() {
        assert!(Footprint::new(vec![[0., 0.], [1., 0.]]).is_err());
        // Collinear
        assert!(Footprint::new(vec![[0., 0.], [1., 0.], [2., 0.]]).is_err());
        // Closing point does not count
        assert!(Footprint::new(vec![[0., 0.], [1., 0.], [0., 0.]]).is_err());
    }

    #[test]
    fn test_closed_ring_is_opened() {
        let fp = Footprint::new(vec![[0., 0.], [1., 0.], [1., 1.], [0., 0.]]).unwrap();
        assert_eq!(fp.len(), 3);
    }

    #[test]
    fn test_area_and_centroid() {
        let fp = l_shape();
        assert!((fp.area() - 40.).abs() < 1e-9);
        assert!(fp.is_ccw());

        let sq = Footprint::new(vec![[-5., -5.], [5., -5.], [5., 5.], [-5., 5.]]).unwrap();
        let c = sq.centroid();
        assert!(c[0].abs() < 1e-9 && c[1].abs() < 1e-9);
    }

    #[test]
    fn test_contains() {
        let fp = l_shape();
        assert!(fp.contains(1., 1.));
        assert!(fp.contains(2., 7.));
        // Notch of the L
        assert!(!fp.contains(5., 6.));
        // Boundary
        assert!(fp.contains(0., 4.));
        assert!(!fp.contains(-0.1, 4.));
    }

    #[test]
    fn test_serde_as_point_list() {
        let fp = Footprint::new(vec![[0., 0.], [1., 0.], [1., 1.]]).unwrap();
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, "[[0.0,0.0],[1.0,0.0],[1.0,1.0]]");
        let back: Footprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
        assert!(serde_json::from_str::<Footprint>("[[0.0,0.0],[1.0,0.0]]").is_err());
    }
}

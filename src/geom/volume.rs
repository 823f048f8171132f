//! Extruded building volumes.
//!
//! A volume is the vertical extrusion of a footprint from `base` to `top`.
//! It is the cheap obstruction proxy used instead of a real roofline.

use anyhow::{Result, anyhow};

use crate::geom::EPS;
use crate::geom::bboxes::BoundingBox;
use crate::geom::footprint::{Footprint, PlanPoint};
use crate::geom::ray::{Ray, T_MIN};
use crate::geom::triangles::{TriangleIndex, triangulate};
use crate::{Point, Vector};

#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub id: String,
    /// Ground elevation [m]
    pub base: f64,
    /// Roof elevation [m]
    pub top: f64,
    pub footprint: Footprint,
    /// Highlighted as the selected property.
    pub is_target: bool,
    bbox: BoundingBox,
}

/// Triangle soup ready for upload to a renderer.
#[derive(Debug, Clone, Default)]
pub struct VolumeMesh {
    pub positions: Vec<Point>,
    pub normals: Vec<Vector>,
    pub indices: Vec<TriangleIndex>,
}

impl Volume {
    pub fn new(id: &str, base: f64, top: f64, footprint: Footprint, is_target: bool) -> Result<Self> {
        if !(base.is_finite() && top.is_finite()) || top < base {
            return Err(anyhow!("Invalid extrusion range [{base}, {top}] for {id}"));
        }
        let (min, max) = footprint.bounds();
        let bbox = BoundingBox::new(Point::new(min[0], min[1], base), Point::new(max[0], max[1], top));
        Ok(Self {
            id: id.to_string(),
            base,
            top,
            footprint,
            is_target,
            bbox,
        })
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn height(&self) -> f64 {
        self.top - self.base
    }

    /// Footprint centroid lifted to the roof.
    pub fn roof_centroid(&self) -> Point {
        let c = self.footprint.centroid();
        Point::new(c[0], c[1], self.top)
    }

    /// Checks whether `p` is inside the volume (boundary included).
    pub fn contains(&self, p: Point) -> bool {
        p.z >= self.base - EPS && p.z <= self.top + EPS && self.footprint.contains(p.x, p.y)
    }

    /// Returns the smallest ray parameter in `(T_MIN, t_max]` where the ray
    /// hits the volume surface.
    pub fn intersect(&self, ray: &Ray, t_max: f64) -> Option<f64> {
        let (t_enter, t_exit) = self.bbox.ray_interval(ray, t_max)?;
        if t_exit < T_MIN {
            return None;
        }

        let mut best: Option<f64> = None;
        let mut keep = |t: f64| {
            if t > T_MIN && t <= t_max + EPS && t >= t_enter - EPS && best.is_none_or(|b| t < b) {
                best = Some(t);
            }
        };

        let o = ray.origin;
        let d = ray.direction;

        // Floor and roof caps
        if d.dz.abs() > EPS {
            for z in [self.base, self.top] {
                let t = (z - o.z) / d.dz;
                let p = ray.point_at(t);
                if self.footprint.contains(p.x, p.y) {
                    keep(t);
                }
            }
        }

        // Walls: ray vs. each footprint edge in plan, then check the height
        for (a, b) in self.footprint.edges() {
            if let Some(t) = plan_edge_hit(o, d, a, b) {
                let z = o.z + t * d.dz;
                if z >= self.base - EPS && z <= self.top + EPS {
                    keep(t);
                }
            }
        }

        best
    }

    /// Builds a closed mesh (floor, walls, roof) with outward normals.
    pub fn mesh(&self) -> Result<VolumeMesh> {
        let pts = self.footprint.points();
        let caps = triangulate(&self.footprint)?;
        let mut mesh = VolumeMesh::default();

        // Roof (counter-clockwise from above, normal up)
        let roof_start = mesh.positions.len();
        for p in pts {
            mesh.positions.push(Point::new(p[0], p[1], self.top));
            mesh.normals.push(Vector::new(0., 0., 1.));
        }
        for t in caps.iter() {
            mesh.indices.push(TriangleIndex(roof_start + t.0, roof_start + t.1, roof_start + t.2));
        }

        // Floor (reversed winding, normal down)
        let floor_start = mesh.positions.len();
        for p in pts {
            mesh.positions.push(Point::new(p[0], p[1], self.base));
            mesh.normals.push(Vector::new(0., 0., -1.));
        }
        for t in caps.iter() {
            mesh.indices.push(TriangleIndex(floor_start + t.0, floor_start + t.2, floor_start + t.1));
        }

        // Walls, one quad per edge with its own normal
        let ccw = self.footprint.is_ccw();
        for (a, b) in self.footprint.edges() {
            let (a, b) = if ccw { (a, b) } else { (b, a) };
            let edge = Vector::new(b[0] - a[0], b[1] - a[1], 0.);
            let Some(normal) = edge.cross(Vector::new(0., 0., 1.)).normalize() else {
                continue;
            };
            let start = mesh.positions.len();
            for (p, z) in [(a, self.base), (b, self.base), (b, self.top), (a, self.top)] {
                mesh.positions.push(Point::new(p[0], p[1], z));
                mesh.normals.push(normal);
            }
            mesh.indices.push(TriangleIndex(start, start + 1, start + 2));
            mesh.indices.push(TriangleIndex(start, start + 2, start + 3));
        }

        Ok(mesh)
    }
}

/// Intersects the plan projection of a ray with segment `a-b`.
///
/// Returns the ray parameter (measured along the 3D direction).
fn plan_edge_hit(o: Point, d: Vector, a: PlanPoint, b: PlanPoint) -> Option<f64> {
    let ex = b[0] - a[0];
    let ey = b[1] - a[1];
    let denom = d.dx * ey - d.dy * ex;
    if denom.abs() < EPS {
        return None; // Parallel in plan (includes vertical rays)
    }
    let wx = a[0] - o.x;
    let wy = a[1] - o.y;
    let t = (wx * ey - wy * ex) / denom;
    let s = (wx * d.dy - wy * d.dx) / denom;
    if (-EPS..=1. + EPS).contains(&s) {
        Some(t)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tower() -> Volume {
        let fp = Footprint::new(vec![[10., -5.], [20., -5.], [20., 5.], [10., 5.]]).unwrap();
        Volume::new("tower", 2., 32., fp, false).unwrap()
    }

    #[test]
    fn test_invalid_range() {
        let fp = Footprint::new(vec![[0., 0.], [1., 0.], [1., 1.]]).unwrap();
        assert!(Volume::new("x", 5., 1., fp, false).is_err());
    }

    #[test]
    fn test_wall_hit() {
        let v = tower();
        let ray = Ray::new(Point::new(0., 0., 10.), Vector::new(1., 0., 0.)).unwrap();
        let t = v.intersect(&ray, 100.).unwrap();
        assert!((t - 10.).abs() < 1e-9);
    }

    #[test]
    fn test_ray_over_the_roof_misses() {
        let v = tower();
        let ray = Ray::new(Point::new(0., 0., 40.), Vector::new(1., 0., 0.)).unwrap();
        assert!(v.intersect(&ray, 100.).is_none());
    }

    #[test]
    fn test_roof_hit_from_above() {
        let v = tower();
        let ray = Ray::new(Point::new(15., 0., 50.), Vector::new(0., 0., -1.)).unwrap();
        let t = v.intersect(&ray, 100.).unwrap();
        assert!((t - 18.).abs() < 1e-9);
    }

    #[test]
    fn test_slanted_ray_hits_wall_top_region() {
        let v = tower();
        // From the origin at 1 m, rising 1 m per meter: reaches x=10 at z=11
        let ray = Ray::new(Point::new(0., 0., 1.), Vector::new(1., 0., 1.)).unwrap();
        let t = v.intersect(&ray, 100.).unwrap();
        let p = ray.point_at(t);
        assert!((p.x - 10.).abs() < 1e-9);
        assert!((p.z - 11.).abs() < 1e-9);
    }

    #[test]
    fn test_far_bound() {
        let v = tower();
        let ray = Ray::new(Point::new(0., 0., 10.), Vector::new(1., 0., 0.)).unwrap();
        assert!(v.intersect(&ray, 9.).is_none());
    }

    #[test]
    fn test_mesh_counts() {
        let v = tower();
        let mesh = v.mesh().unwrap();
        // 4 roof + 4 floor + 4 walls * 4
        assert_eq!(mesh.positions.len(), 24);
        // 2 roof + 2 floor + 4 walls * 2
        assert_eq!(mesh.indices.len(), 12);
        assert_eq!(mesh.normals.len(), mesh.positions.len());
    }

    #[test]
    fn test_contains_and_centroid() {
        let v = tower();
        assert!(v.contains(Point::new(15., 0., 10.)));
        assert!(!v.contains(Point::new(15., 0., 33.)));
        assert!(v.roof_centroid().is_close(&Point::new(15., 0., 32.)));
    }
}

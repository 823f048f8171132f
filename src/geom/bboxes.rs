use crate::geom::EPS;
use crate::geom::point::Point;
use crate::geom::ray::Ray;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Returns the box holding all points `pts` (`None` for an empty slice).
    pub fn from_points(pts: &[Point]) -> Option<Self> {
        let first = pts.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in pts.iter().skip(1) {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some(Self { min, max })
    }

    pub fn center(&self) -> Point {
        Point::new(
            0.5 * (self.min.x + self.max.x),
            0.5 * (self.min.y + self.max.y),
            0.5 * (self.min.z + self.max.z),
        )
    }

    /// Checks whether a point is inside the box (boundary included).
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x - EPS
            && p.x <= self.max.x + EPS
            && p.y >= self.min.y - EPS
            && p.y <= self.max.y + EPS
            && p.z >= self.min.z - EPS
            && p.z <= self.max.z + EPS
    }

    /// Checks whether two bounding boxes overlap (including touching).
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.max.x < other.min.x - EPS || self.min.x > other.max.x + EPS {
            return false;
        }
        if self.max.y < other.min.y - EPS || self.min.y > other.max.y + EPS {
            return false;
        }
        if self.max.z < other.min.z - EPS || self.min.z > other.max.z + EPS {
            return false;
        }
        true
    }

    /// Slab test. Returns the parameter interval `(t_enter, t_exit)` where the
    /// ray is inside the box, clipped to `[0, t_max]`.
    pub fn ray_interval(&self, ray: &Ray, t_max: f64) -> Option<(f64, f64)> {
        let o = [ray.origin.x, ray.origin.y, ray.origin.z];
        let d = [ray.direction.dx, ray.direction.dy, ray.direction.dz];
        let lo = [self.min.x, self.min.y, self.min.z];
        let hi = [self.max.x, self.max.y, self.max.z];

        let mut t0 = 0.0_f64;
        let mut t1 = t_max;
        for axis in 0..3 {
            if d[axis].abs() < EPS {
                // Parallel to the slab: must already be between its planes
                if o[axis] < lo[axis] - EPS || o[axis] > hi[axis] + EPS {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d[axis];
            let mut ta = (lo[axis] - o[axis]) * inv;
            let mut tb = (hi[axis] - o[axis]) * inv;
            if ta > tb {
                std::mem::swap(&mut ta, &mut tb);
            }
            t0 = t0.max(ta);
            t1 = t1.min(tb);
            if t0 > t1 + EPS {
                return None;
            }
        }
        Some((t0, t1))
    }
}

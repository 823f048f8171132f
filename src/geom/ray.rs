//! Ray casting infrastructure.
//!
//! This module provides a Ray struct and ray/massing intersection queries
//! used by the sunlight obstruction analysis and the snapshot renderer.

use crate::geom::volume::Volume;
use crate::{Point, Vector};

/// Minimum ray parameter accepted as a hit (avoids self-intersection at origin).
pub const T_MIN: f64 = 1e-6;

/// A ray defined by an origin point and a direction vector.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray
    pub origin: Point,
    /// Direction vector (unit length)
    pub direction: Vector,
}

impl Ray {
    /// Creates a new ray from origin point and direction vector.
    ///
    /// The direction vector is automatically normalized.
    /// Returns `None` for a zero-length direction.
    pub fn new(origin: Point, direction: Vector) -> Option<Self> {
        let normalized = direction.normalize()?;
        Some(Self {
            origin,
            direction: normalized,
        })
    }

    /// Creates a ray from two points (origin to target).
    pub fn from_points(origin: Point, target: Point) -> Option<Self> {
        Self::new(origin, target - origin)
    }

    /// Returns the point along the ray at parameter t.
    ///
    /// point = origin + t * direction
    pub fn point_at(&self, t: f64) -> Point {
        self.origin + self.direction * t
    }

    /// Returns the closest volume hit within `(T_MIN, t_max]`, skipping the
    /// volume whose id equals `exclude_id`.
    pub fn first_hit<'a, I>(
        &self,
        volumes: I,
        exclude_id: Option<&str>,
        t_max: f64,
    ) -> Option<(f64, &'a Volume)>
    where
        I: IntoIterator<Item = &'a Volume>,
    {
        let mut closest: Option<(f64, &'a Volume)> = None;
        for volume in volumes {
            if exclude_id.is_some_and(|id| id == volume.id) {
                continue;
            }
            let limit = closest.map_or(t_max, |(t, _)| t);
            if let Some(t) = volume.intersect(self, limit) {
                closest = Some((t, volume));
            }
        }
        closest
    }

    /// Checks whether any volume (other than `exclude_id`) blocks the ray
    /// before its far bound `t_max`.
    pub fn is_obstructed<'a, I>(&self, volumes: I, exclude_id: Option<&str>, t_max: f64) -> bool
    where
        I: IntoIterator<Item = &'a Volume>,
    {
        volumes.into_iter().any(|volume| {
            !exclude_id.is_some_and(|id| id == volume.id) && volume.intersect(self, t_max).is_some()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::footprint::Footprint;

    fn block(id: &str, x0: f64, y0: f64, size: f64, height: f64) -> Volume {
        let fp = Footprint::new(vec![
            [x0, y0],
            [x0 + size, y0],
            [x0 + size, y0 + size],
            [x0, y0 + size],
        ])
        .unwrap();
        Volume::new(id, 0.0, height, fp, false).unwrap()
    }

    #[test]
    fn test_ray_creation() {
        let ray = Ray::new(Point::new(0.0, 0.0, 0.0), Vector::new(1.0, 0.0, 0.0));
        assert!(ray.is_some());

        // Zero direction should fail
        let ray = Ray::new(Point::new(0.0, 0.0, 0.0), Vector::new(0.0, 0.0, 0.0));
        assert!(ray.is_none());
    }

    #[test]
    fn test_ray_point_at() {
        let ray = Ray::from_points(Point::new(0.0, 0.0, 0.0), Point::new(10.0, 0.0, 0.0)).unwrap();
        let p = ray.point_at(5.0);
        assert!(p.is_close(&Point::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_first_hit_picks_closest() {
        let near = block("near", 5.0, -1.0, 2.0, 10.0);
        let far = block("far", 20.0, -1.0, 2.0, 10.0);
        let volumes = vec![far, near];

        let ray = Ray::new(Point::new(0.0, 0.0, 1.0), Vector::new(1.0, 0.0, 0.0)).unwrap();
        let (t, hit) = ray.first_hit(&volumes, None, 100.0).unwrap();
        assert_eq!(hit.id, "near");
        assert!((t - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_obstruction_respects_exclusion_and_far_bound() {
        let volumes = vec![block("self", -1.0, -1.0, 2.0, 10.0), block("other", 30.0, -1.0, 2.0, 10.0)];
        let ray = Ray::new(Point::new(0.0, 0.0, 1.0), Vector::new(1.0, 0.0, 0.0)).unwrap();

        assert!(ray.is_obstructed(&volumes, Some("self"), 100.0));
        // "other" starts at x=30 which is beyond the far bound
        assert!(!ray.is_obstructed(&volumes, Some("self"), 20.0));
    }
}

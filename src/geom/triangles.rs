use crate::geom::EPS;
use crate::geom::footprint::{Footprint, PlanPoint};
use anyhow::{Result, anyhow};

/// Type for holding vertex indices for a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangleIndex(pub usize, pub usize, pub usize);

/// Triangulates a footprint with ear clipping.
///
/// Returned indices refer to `fp.points()` and are ordered counter-clockwise
/// when seen from above, whatever the orientation of the input ring.
pub fn triangulate(fp: &Footprint) -> Result<Vec<TriangleIndex>> {
    let pts = fp.points();
    let mut vertices: Vec<usize> = (0..pts.len()).collect();
    if !fp.is_ccw() {
        vertices.reverse();
    }

    let mut triangles: Vec<TriangleIndex> = Vec::with_capacity(pts.len() - 2);
    let mut pos: usize = 0;
    let mut num_fail: usize = 0;

    while vertices.len() > 2 {
        if num_fail > vertices.len() {
            return Err(anyhow!("Ear-clipping algorithm failed."));
        }

        // If last vertex, start from the beginning
        if pos > vertices.len() - 1 {
            pos = 0;
        }

        let prev_pos = if pos > 0 { pos - 1 } else { vertices.len() - 1 };
        let next_pos = if pos < vertices.len() - 1 { pos + 1 } else { 0 };

        let (prev_id, curr_id, next_id) = (vertices[prev_pos], vertices[pos], vertices[next_pos]);

        // Collinear corner: drop the vertex, the outline does not change
        if cross(pts[prev_id], pts[curr_id], pts[next_id]).abs() <= EPS {
            vertices.remove(pos);
            num_fail = 0;
            continue;
        }

        if is_corner_convex(pts[prev_id], pts[curr_id], pts[next_id]) {
            // Check if no other point is within this triangle
            // Needed for non-convex polygons
            let any_point_inside = vertices.iter().any(|&test_id| {
                ![prev_id, curr_id, next_id].contains(&test_id)
                    && is_point_inside_triangle(
                        pts[test_id],
                        pts[prev_id],
                        pts[curr_id],
                        pts[next_id],
                    )
            });
            if !any_point_inside {
                triangles.push(TriangleIndex(prev_id, curr_id, next_id));
                vertices.remove(pos);
                num_fail = 0;
                continue;
            }
        }
        num_fail += 1;
        pos += 1;
    }

    Ok(triangles)
}

/// Checks if the corner p1 -> p2 -> p3 turns left (counter-clockwise).
pub fn is_corner_convex(p1: PlanPoint, p2: PlanPoint, p3: PlanPoint) -> bool {
    cross(p1, p2, p3) > EPS
}

/// Tests if point `ptest` is inside the triangle `(p1, p2, p3)`, boundary included.
pub fn is_point_inside_triangle(ptest: PlanPoint, p1: PlanPoint, p2: PlanPoint, p3: PlanPoint) -> bool {
    let d1 = cross(p1, p2, ptest);
    let d2 = cross(p2, p3, ptest);
    let d3 = cross(p3, p1, ptest);
    let has_neg = d1 < -EPS || d2 < -EPS || d3 < -EPS;
    let has_pos = d1 > EPS || d2 > EPS || d3 > EPS;
    !(has_neg && has_pos)
}

fn cross(a: PlanPoint, b: PlanPoint, c: PlanPoint) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_area(pts: &[PlanPoint], t: &TriangleIndex) -> f64 {
        0.5 * cross(pts[t.0], pts[t.1], pts[t.2])
    }

    #[test]
    fn test_triangulate_square() -> Result<()> {
        let fp = Footprint::new(vec![[0., 0.], [1., 0.], [1., 1.], [0., 1.]])?;
        let tri = triangulate(&fp)?;
        assert_eq!(tri.len(), 2);
        Ok(())
    }

    #[test]
    fn test_triangulate_l_shape_both_orientations() -> Result<()> {
        let ring = vec![[0., 0.], [1., 0.], [1., 1.], [2., 1.], [2., 2.], [0., 2.]];
        for pts in [ring.clone(), ring.into_iter().rev().collect()] {
            let fp = Footprint::new(pts)?;
            let tri = triangulate(&fp)?;
            assert_eq!(tri.len(), 4);
            let total: f64 = tri.iter().map(|t| triangle_area(fp.points(), t)).sum();
            // Every triangle is counter-clockwise and they cover the area exactly
            assert!(tri.iter().all(|t| triangle_area(fp.points(), t) > 0.));
            assert!((total - fp.area()).abs() < 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_triangulate_with_collinear_vertex() -> Result<()> {
        let fp = Footprint::new(vec![[0., 0.], [1., 0.], [2., 0.], [2., 2.], [0., 2.]])?;
        let tri = triangulate(&fp)?;
        let total: f64 = tri.iter().map(|t| triangle_area(fp.points(), t)).sum();
        assert!((total - 4.).abs() < 1e-9);
        Ok(())
    }
}

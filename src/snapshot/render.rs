//! Synchronous rendering of a [`SceneState`] into a raster.

use crate::geom::ray::Ray;
use crate::geom::EPS;
use crate::scene::resources::RenderError;
use crate::scene::state::SceneState;
use crate::snapshot::raster::{Raster, Rgba8};
use crate::{Point, Vector};

/// Renders the current scene state immediately.
pub trait RenderBackend {
    fn render(&mut self, scene: &SceneState) -> Result<Raster, RenderError>;
}

const SKY: Rgba8 = [200, 225, 245, 255];
const GROUND: [f64; 3] = [190., 190., 180.];
const NEIGHBOR: [f64; 3] = [225., 225., 225.];
const TARGET: [f64; 3] = [235., 120., 60.];
/// Share of the color kept in shadow.
const AMBIENT: f64 = 0.45;
/// Offset of shadow rays from the surface [m].
const SHADOW_BIAS: f64 = 1e-3;
const SHADOW_RAY_LENGTH: f64 = 1000.0;

/// Ray-cast renderer with an orthographic projection along the camera axis.
///
/// Flat shading with hard shadows. Output only depends on the scene state,
/// so repeated renders of the same state are identical.
#[derive(Debug, Clone)]
pub struct SoftwareRenderer {
    pub width: u32,
    pub height: u32,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn shade(&self, scene: &SceneState, base: [f64; 3], p: Point, normal: Vector, exclude: Option<&str>) -> Rgba8 {
        let light = scene.light();
        let to_sun = -light.direction;
        let facing = normal.dot(to_sun);
        let mut factor = AMBIENT;
        if light.is_on() && facing > 0.0 {
            let lit = Ray::new(p + normal * SHADOW_BIAS, to_sun)
                .map(|ray| !ray.is_obstructed(scene.volume_iter(), exclude, SHADOW_RAY_LENGTH))
                .unwrap_or(false);
            if lit {
                factor = AMBIENT + (1.0 - AMBIENT) * facing.min(1.0);
            }
        }
        [
            (base[0] * factor).round() as u8,
            (base[1] * factor).round() as u8,
            (base[2] * factor).round() as u8,
            255,
        ]
    }
}

impl RenderBackend for SoftwareRenderer {
    fn render(&mut self, scene: &SceneState) -> Result<Raster, RenderError> {
        let camera = scene.camera();
        let forward = (camera.target - camera.position)
            .normalize()
            .ok_or_else(|| RenderError::Backend("camera position equals target".to_string()))?;
        let right = forward
            .cross(camera.up)
            .normalize()
            .ok_or_else(|| RenderError::Backend("camera up is parallel to view".to_string()))?;
        let up = right.cross(forward);

        let half_h = camera.distance() * (camera.fov_degrees.to_radians() / 2.0).tan();
        let half_w = half_h * self.width as f64 / self.height.max(1) as f64;
        let far = camera.distance() * 4.0 + SHADOW_RAY_LENGTH;
        let ground = scene
            .volume_iter()
            .map(|v| v.base)
            .fold(f64::INFINITY, f64::min);
        let ground = if ground.is_finite() { ground } else { 0.0 };

        let mut raster = Raster::new(self.width, self.height, SKY);
        for j in 0..self.height {
            let v = half_h * (1.0 - 2.0 * (j as f64 + 0.5) / self.height as f64);
            for i in 0..self.width {
                let u = half_w * (2.0 * (i as f64 + 0.5) / self.width as f64 - 1.0);
                let origin = camera.position + right * u + up * v;
                let Some(ray) = Ray::new(origin, forward) else {
                    continue;
                };

                let color = match ray.first_hit(scene.volume_iter(), None, far) {
                    Some((t, volume)) => {
                        let p = ray.point_at(t);
                        let base = if volume.is_target { TARGET } else { NEIGHBOR };
                        let normal = surface_normal(volume, p);
                        self.shade(scene, base, p, normal, Some(volume.id.as_str()))
                    }
                    None if forward.dz < -EPS => {
                        let t = (ground - origin.z) / forward.dz;
                        let p = ray.point_at(t);
                        self.shade(scene, GROUND, p, Vector::new(0., 0., 1.), None)
                    }
                    None => SKY,
                };
                raster.set_pixel(i, j, color);
            }
        }
        Ok(raster)
    }
}

/// Outward normal of an extruded volume at a surface point.
fn surface_normal(volume: &crate::Volume, p: Point) -> Vector {
    if (p.z - volume.top).abs() < 1e-6 {
        return Vector::new(0., 0., 1.);
    }
    if (p.z - volume.base).abs() < 1e-6 {
        return Vector::new(0., 0., -1.);
    }
    // Closest wall
    let ccw = volume.footprint.is_ccw();
    let mut best = (f64::INFINITY, Vector::new(0., 0., 1.));
    for (a, b) in volume.footprint.edges() {
        let e = Vector::new(b[0] - a[0], b[1] - a[1], 0.);
        let len2 = e.dot(e);
        if len2 < EPS {
            continue;
        }
        let w = Vector::new(p.x - a[0], p.y - a[1], 0.);
        let s = (w.dot(e) / len2).clamp(0., 1.);
        let d = (w - e * s).length();
        if d < best.0 {
            let n = if ccw {
                Vector::new(e.dy, -e.dx, 0.)
            } else {
                Vector::new(-e.dy, e.dx, 0.)
            };
            best = (d, n * (1.0 / len2.sqrt()));
        }
    }
    best.1
}

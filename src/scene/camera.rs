use crate::geom::bboxes::BoundingBox;
use crate::{Point, Vector};

/// Minimum framing distance [m].
const MIN_DISTANCE: f64 = 40.0;

/// Eye height of the street preset [m].
const EYE_HEIGHT: f64 = 1.7;

/// Perspective camera pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Point,
    pub target: Point,
    pub up: Vector,
    /// Vertical field of view [deg]
    pub fov_degrees: f64,
}

impl CameraPose {
    pub fn look_at(position: Point, target: Point) -> Self {
        Self {
            position,
            target,
            up: Vector::new(0., 0., 1.),
            fov_degrees: 45.0,
        }
    }

    /// Straight down on `center` from `height` above it, north up, seeing a
    /// square of `2 * half_extent` meters.
    pub fn top_down(center: Point, height: f64, half_extent: f64) -> Self {
        Self {
            position: center + Vector::new(0., 0., height),
            target: center,
            up: Vector::new(0., 1., 0.),
            fov_degrees: 2.0 * (half_extent / height).atan().to_degrees(),
        }
    }

    pub fn distance(&self) -> f64 {
        self.position.distance(&self.target)
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::look_at(Point::new(60., -80., 70.), Point::origin())
    }
}

/// Camera anchor computed from the target building.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    /// Plan center of the target at its vertical middle.
    pub focus: Point,
    /// Largest of the plan sides and the height [m].
    pub extent: f64,
    /// Ground elevation of the target [m].
    pub ground: f64,
}

impl Framing {
    pub fn from_bounds(bbox: &BoundingBox) -> Self {
        let focus = bbox.center();
        let extent = (bbox.max.x - bbox.min.x)
            .max(bbox.max.y - bbox.min.y)
            .max(bbox.max.z - bbox.min.z);
        Self {
            focus,
            extent,
            ground: bbox.min.z,
        }
    }

    pub fn distance(&self) -> f64 {
        (2.5 * self.extent).max(MIN_DISTANCE)
    }

    /// Initial view: from the south-east, above the roofs.
    pub fn initial_pose(&self) -> CameraPose {
        CameraPreset::Overview.pose(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPreset {
    Overview,
    TopDown,
    Street,
}

impl CameraPreset {
    /// Pose relative to the target framing (never the world origin).
    pub fn pose(&self, framing: &Framing) -> CameraPose {
        let d = framing.distance();
        let f = framing.focus;
        match self {
            Self::Overview => {
                let dir = Vector::new(0.5, -0.7, 0.5);
                let dir = dir * (1.0 / dir.length());
                CameraPose::look_at(f + dir * d, f)
            }
            Self::TopDown => CameraPose::top_down(f, 1.5 * d, d),
            Self::Street => {
                let eye = Point::new(f.x, f.y - d, framing.ground + EYE_HEIGHT);
                CameraPose::look_at(eye, f)
            }
        }
    }
}

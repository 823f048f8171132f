//! Mutable render state shared by the frame loop and one-shot jobs.
//!
//! One-shot jobs that change the camera or the light take a
//! [`CaptureToken`] first and hand it back to [`SceneState::restore`] when
//! done. The token cannot be cloned, so each snapshot is restored at most
//! once.

use crate::geom::volume::Volume;
use crate::scene::camera::{CameraPose, Framing};
use crate::scene::resources::ResourceHandle;
use crate::sim::solar::light::LightState;
use crate::Point;

/// A volume in the scene with its render resource.
#[derive(Debug, Clone)]
pub struct SceneVolume {
    pub volume: Volume,
    pub handle: ResourceHandle,
}

#[derive(Debug, Default)]
pub struct SceneState {
    camera: CameraPose,
    light: LightState,
    volumes: Vec<SceneVolume>,
    framing: Option<Framing>,
    framed_target: Option<String>,
}

/// Camera and light as they were before a temporary mutation.
#[derive(Debug, PartialEq)]
#[must_use = "a capture token must be handed back to SceneState::restore"]
pub struct CaptureToken {
    camera: CameraPose,
    light: LightState,
}

impl CaptureToken {
    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn light(&self) -> &LightState {
        &self.light
    }
}

impl SceneState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: CameraPose) {
        self.camera = camera;
    }

    pub fn light(&self) -> &LightState {
        &self.light
    }

    pub fn set_light(&mut self, light: LightState) {
        self.light = light;
    }

    pub fn volumes(&self) -> &[SceneVolume] {
        &self.volumes
    }

    /// Volumes without their handles, for ray queries.
    pub fn volume_iter(&self) -> impl Iterator<Item = &Volume> {
        self.volumes.iter().map(|v| &v.volume)
    }

    pub fn target_volume(&self) -> Option<&Volume> {
        self.volume_iter().find(|v| v.is_target)
    }

    pub fn framing(&self) -> Option<&Framing> {
        self.framing.as_ref()
    }

    /// Point the sun light and the camera presets are aimed at.
    pub fn focus(&self) -> Point {
        self.framing.map_or(self.camera.target, |f| f.focus)
    }

    pub fn framed_target(&self) -> Option<&str> {
        self.framed_target.as_deref()
    }

    /// Snapshot of camera and light before a temporary mutation.
    pub fn begin_capture(&self) -> CaptureToken {
        CaptureToken {
            camera: self.camera,
            light: self.light,
        }
    }

    /// Puts back camera and light exactly as they were in `token`.
    pub fn restore(&mut self, token: CaptureToken) {
        self.camera = token.camera;
        self.light = token.light;
    }

    pub(crate) fn replace_volumes(&mut self, volumes: Vec<SceneVolume>) -> Vec<SceneVolume> {
        std::mem::replace(&mut self.volumes, volumes)
    }

    pub(crate) fn take_volumes(&mut self) -> Vec<SceneVolume> {
        std::mem::take(&mut self.volumes)
    }

    pub(crate) fn set_framing(&mut self, target_id: &str, framing: Framing) {
        self.framing = Some(framing);
        self.framed_target = Some(target_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::solar::position::SolarPosition;

    #[test]
    fn test_capture_restores_camera_and_light() {
        let mut state = SceneState::new();
        let sun = SolarPosition {
            altitude: 23.5,
            azimuth: 201.0,
        };
        state.set_light(LightState::from_sun(&sun, Point::new(1., 2., 3.)));
        state.set_camera(CameraPose::look_at(Point::new(9., 9., 9.), Point::new(1., 2., 3.)));
        let camera = *state.camera();
        let light = *state.light();

        let token = state.begin_capture();
        state.set_camera(CameraPose::top_down(Point::origin(), 300., 100.));
        let night = SolarPosition {
            altitude: -10.0,
            azimuth: 0.0,
        };
        state.set_light(LightState::from_sun(&night, Point::origin()));
        assert_ne!(*state.light(), light);

        state.restore(token);
        assert_eq!(*state.camera(), camera);
        assert_eq!(state.light().position, light.position);
        assert_eq!(state.light().intensity, light.intensity);
    }
}

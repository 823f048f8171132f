//! One-shot shadow captures at fixed reference times.
//!
//! The capture borrows the live scene: camera and light are saved in a
//! [`CaptureToken`], changed for every reference time, and restored before
//! returning, on success and on error alike.

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::massing::building::{BuildingSetKey, Neighborhood3D};
use crate::scene::camera::CameraPose;
use crate::scene::resources::RenderError;
use crate::scene::state::SceneState;
use crate::sim::solar::light::LightState;
use crate::sim::solar::position::SolarPosition;
use crate::snapshot::raster::Raster;
use crate::snapshot::render::RenderBackend;
use crate::Point;

/// Local clock time on a fixed calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTime {
    pub label: String,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl ReferenceTime {
    pub fn new(label: &str, month: u32, day: u32, hour: u32) -> Self {
        Self {
            label: label.to_string(),
            month,
            day,
            hour,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotConfig {
    pub reference_times: Vec<ReferenceTime>,
    /// Height of the top-down camera above the target focus [m].
    pub camera_height: f64,
    /// Half side of the captured square [m].
    pub half_extent: f64,
    /// Fixed offset of local clock time from UTC [h].
    pub utc_offset_hours: f64,
}

impl SnapshotConfig {
    pub fn new() -> Self {
        Self {
            reference_times: vec![
                ReferenceTime::new("winter-10", 12, 21, 10),
                ReferenceTime::new("winter-12", 12, 21, 12),
                ReferenceTime::new("winter-14", 12, 21, 14),
                ReferenceTime::new("summer-09", 6, 21, 9),
                ReferenceTime::new("summer-13", 6, 21, 13),
                ReferenceTime::new("summer-17", 6, 21, 17),
            ],
            camera_height: 300.0,
            half_extent: 80.0,
            utc_offset_hours: 1.0,
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowSnapshot {
    pub label: String,
    pub hour: u32,
    /// Sun above the horizon at capture time.
    pub sun_up: bool,
    pub raster: Raster,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    Captured(Vec<ShadowSnapshot>),
    /// Already captured for this building set.
    AlreadyCaptured,
    /// No target building in the scene.
    Skipped,
    /// The render backend failed. Camera and light were restored.
    Failed(String),
}

/// Runs the capture at most once per building set.
#[derive(Debug, Default)]
pub struct SnapshotCapturer {
    config: SnapshotConfig,
    last_key: Option<BuildingSetKey>,
}

impl SnapshotCapturer {
    pub fn new(config: SnapshotConfig) -> Self {
        Self {
            config,
            last_key: None,
        }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Captures every reference time if this building set was not captured yet.
    pub fn capture_once<B: RenderBackend>(
        &mut self,
        neighborhood: &Neighborhood3D,
        state: &mut SceneState,
        backend: &mut B,
        year: i32,
    ) -> Result<SnapshotOutcome, RenderError> {
        let key = neighborhood.building_set_key();
        if self.last_key.as_ref() == Some(&key) {
            debug!("Snapshots already captured for this building set");
            return Ok(SnapshotOutcome::AlreadyCaptured);
        }
        if neighborhood.target().is_none() || state.target_volume().is_none() {
            debug!("Snapshot capture skipped: no target");
            return Ok(SnapshotOutcome::Skipped);
        }
        self.last_key = Some(key);

        let center = neighborhood.center;
        let token = state.begin_capture();
        let result = self.capture_all(state, backend, center.lat, center.lng, year);
        state.restore(token);

        let snapshots = result?;
        info!(count = snapshots.len(), "Shadow snapshots captured");
        Ok(SnapshotOutcome::Captured(snapshots))
    }

    fn capture_all<B: RenderBackend>(
        &self,
        state: &mut SceneState,
        backend: &mut B,
        lat: f64,
        lng: f64,
        year: i32,
    ) -> Result<Vec<ShadowSnapshot>, RenderError> {
        let cfg = &self.config;
        let focus = state.focus();
        let ground_center = state
            .target_volume()
            .map(|v| {
                let c = v.footprint.centroid();
                Point::new(c[0], c[1], v.base)
            })
            .unwrap_or(focus);
        state.set_camera(CameraPose::top_down(ground_center, cfg.camera_height, cfg.half_extent));

        let mut snapshots = Vec::with_capacity(cfg.reference_times.len());
        for reference in &cfg.reference_times {
            let Some(date) = NaiveDate::from_ymd_opt(year, reference.month, reference.day) else {
                return Err(RenderError::Backend(format!(
                    "invalid reference date {year}-{}-{}",
                    reference.month, reference.day
                )));
            };
            let utc_hour = reference.hour as f64 - cfg.utc_offset_hours;
            let sun = SolarPosition::on_day(lat, lng, date.ordinal(), utc_hour);
            state.set_light(LightState::from_sun(&sun, focus));
            let raster = backend.render(state)?;
            snapshots.push(ShadowSnapshot {
                label: reference.label.clone(),
                hour: reference.hour,
                sun_up: sun.is_above_horizon(),
                raster,
            });
        }
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::footprint::Footprint;
    use crate::massing::building::{BuildingMass, FetchDiagnostics, FetchStatus, NeighborhoodCenter};
    use crate::scene::builder::SceneBuilder;
    use crate::scene::camera::CameraPreset;
    use crate::scene::resources::ResourceTracker;
    use crate::snapshot::render::SoftwareRenderer;

    /// Records the light of every render, fails on request.
    struct Recorder {
        lights: Vec<LightState>,
        cameras: Vec<CameraPose>,
        fail_at: Option<usize>,
    }

    impl RenderBackend for Recorder {
        fn render(&mut self, scene: &SceneState) -> Result<Raster, RenderError> {
            if self.fail_at == Some(self.lights.len()) {
                return Err(RenderError::Backend("device lost".to_string()));
            }
            self.lights.push(*scene.light());
            self.cameras.push(*scene.camera());
            Ok(Raster::new(1, 1, [0, 0, 0, 255]))
        }
    }

    fn neighborhood() -> Neighborhood3D {
        let fp = Footprint::new(vec![[-6., -6.], [6., -6.], [6., 6.], [-6., 6.]]).unwrap();
        let t = BuildingMass::new("t", 0., 15., fp).unwrap();
        let fp = Footprint::new(vec![[-6., -30.], [6., -30.], [6., -20.], [-6., -20.]]).unwrap();
        let n = BuildingMass::new("n", 0., 25., fp).unwrap();
        Neighborhood3D::new(
            "a",
            Some("t"),
            NeighborhoodCenter::new(52.37, 4.90, 121000., 487000.),
            vec![t, n],
            FetchStatus::Complete,
            FetchDiagnostics::default(),
        )
    }

    fn live_scene(n: &Neighborhood3D) -> SceneBuilder<ResourceTracker> {
        let mut builder = SceneBuilder::new(ResourceTracker::new());
        builder.set_massing(n).unwrap();
        builder.apply_preset(CameraPreset::Street);
        let sun = SolarPosition {
            altitude: 41.0,
            azimuth: 250.0,
        };
        let focus = builder.state().focus();
        builder.state_mut().set_light(LightState::from_sun(&sun, focus));
        builder
    }

    #[test]
    fn test_capture_restores_state_exactly() {
        let n = neighborhood();
        let mut builder = live_scene(&n);
        let camera = *builder.state().camera();
        let light = *builder.state().light();

        let mut recorder = Recorder {
            lights: vec![],
            cameras: vec![],
            fail_at: None,
        };
        let mut capturer = SnapshotCapturer::new(SnapshotConfig::new());
        let outcome = capturer
            .capture_once(&n, builder.state_mut(), &mut recorder, 2024)
            .unwrap();

        let SnapshotOutcome::Captured(snapshots) = outcome else {
            panic!("expected captures");
        };
        assert_eq!(snapshots.len(), 6);
        assert_eq!(builder.state().light().position, light.position);
        assert_eq!(builder.state().light().intensity, light.intensity);
        assert_eq!(*builder.state().camera(), camera);

        // One fixed top-down pose, independent of the user's pose
        assert!(recorder.cameras.iter().all(|c| *c == recorder.cameras[0]));
        assert_ne!(recorder.cameras[0], camera);
        assert_eq!(recorder.cameras[0].up, crate::Vector::new(0., 1., 0.));
        // The sun moved between captures
        assert_ne!(recorder.lights[0].position, recorder.lights[2].position);
    }

    #[test]
    fn test_night_reference_has_zero_intensity() {
        let n = neighborhood();
        let mut builder = live_scene(&n);
        let config = SnapshotConfig {
            reference_times: vec![ReferenceTime::new("night", 12, 21, 23)],
            ..SnapshotConfig::new()
        };
        let mut recorder = Recorder {
            lights: vec![],
            cameras: vec![],
            fail_at: None,
        };
        let mut capturer = SnapshotCapturer::new(config);
        let outcome = capturer
            .capture_once(&n, builder.state_mut(), &mut recorder, 2024)
            .unwrap();
        let SnapshotOutcome::Captured(snapshots) = outcome else {
            panic!("expected captures");
        };
        assert!(!snapshots[0].sun_up);
        assert_eq!(recorder.lights[0].intensity, 0.0);
    }

    #[test]
    fn test_state_restored_on_render_error() {
        let n = neighborhood();
        let mut builder = live_scene(&n);
        let camera = *builder.state().camera();
        let light = *builder.state().light();
        let mut recorder = Recorder {
            lights: vec![],
            cameras: vec![],
            fail_at: Some(2),
        };
        let mut capturer = SnapshotCapturer::new(SnapshotConfig::new());
        assert!(capturer
            .capture_once(&n, builder.state_mut(), &mut recorder, 2024)
            .is_err());
        assert_eq!(*builder.state().camera(), camera);
        assert_eq!(*builder.state().light(), light);
    }

    #[test]
    fn test_capture_runs_once_per_building_set() {
        let n = neighborhood();
        let mut builder = live_scene(&n);
        let mut renderer = SoftwareRenderer::new(16, 16);
        let mut capturer = SnapshotCapturer::new(SnapshotConfig::new());

        let first = capturer
            .capture_once(&n, builder.state_mut(), &mut renderer, 2024)
            .unwrap();
        assert!(matches!(first, SnapshotOutcome::Captured(_)));
        let again = capturer
            .capture_once(&n, builder.state_mut(), &mut renderer, 2024)
            .unwrap();
        assert_eq!(again, SnapshotOutcome::AlreadyCaptured);
    }

    #[test]
    fn test_skipped_without_target() {
        let mut n = neighborhood();
        n.target_id = None;
        let mut state = SceneState::new();
        let mut renderer = SoftwareRenderer::new(4, 4);
        let mut capturer = SnapshotCapturer::default();
        let outcome = capturer.capture_once(&n, &mut state, &mut renderer, 2024).unwrap();
        assert_eq!(outcome, SnapshotOutcome::Skipped);
        assert_eq!(*state.light(), LightState::default());
    }
}

//! Turns a massing set into scene volumes.

use tracing::{debug, info, warn};

use crate::massing::building::Neighborhood3D;
use crate::scene::camera::{CameraPreset, Framing};
use crate::scene::resources::{RenderError, RenderResources};
use crate::scene::state::{SceneState, SceneVolume};

/// What [`SceneBuilder::set_massing`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneUpdate {
    pub disposed: usize,
    pub created: usize,
    /// Buildings that could not be turned into a volume.
    pub skipped: usize,
    /// Camera moved to a newly selected target.
    pub reframed: bool,
}

/// Owner of the [`SceneState`] and of the render resources behind it.
pub struct SceneBuilder<R: RenderResources> {
    resources: R,
    state: SceneState,
}

impl<R: RenderResources> SceneBuilder<R> {
    pub fn new(resources: R) -> Self {
        Self {
            resources,
            state: SceneState::new(),
        }
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SceneState {
        &mut self.state
    }

    pub fn resources(&self) -> &R {
        &self.resources
    }

    /// Replaces the whole volume set.
    ///
    /// Every previous volume is disposed before the first new one is created.
    /// The camera is framed on the target only the first time that target
    /// shows up, later arrivals for the same target keep the user's view.
    pub fn set_massing(&mut self, neighborhood: &Neighborhood3D) -> Result<SceneUpdate, RenderError> {
        let old = self.state.take_volumes();
        let disposed = old.len();
        for v in old {
            self.resources.dispose(v.handle);
        }

        let target_id = neighborhood.target_id.as_deref();
        let mut volumes = Vec::with_capacity(neighborhood.buildings.len());
        let mut skipped = 0;
        for building in &neighborhood.buildings {
            let is_target = target_id == Some(building.id.as_str());
            let volume = match building.to_volume(is_target) {
                Ok(volume) => volume,
                Err(e) => {
                    warn!(building = %building.id, error = %e, "Skipping building");
                    skipped += 1;
                    continue;
                }
            };
            match self.resources.create_volume(&volume) {
                Ok(handle) => volumes.push(SceneVolume { volume, handle }),
                Err(e) => {
                    // Leave the scene consistent: no half-built set
                    for v in volumes {
                        self.resources.dispose(v.handle);
                    }
                    return Err(e);
                }
            }
        }
        let created = volumes.len();
        self.state.replace_volumes(volumes);

        let mut reframed = false;
        if let (Some(id), Some(target)) = (target_id, self.state.target_volume()) {
            if self.state.framed_target() != Some(id) {
                let framing = Framing::from_bounds(target.bbox());
                self.state.set_framing(id, framing);
                self.state.set_camera(framing.initial_pose());
                reframed = true;
                info!(target_id = id, "Camera framed on target");
            }
        }

        debug!(disposed, created, skipped, reframed, "Scene massing replaced");
        Ok(SceneUpdate {
            disposed,
            created,
            skipped,
            reframed,
        })
    }

    /// Moves the camera to a preset around the current target.
    ///
    /// Does nothing before a target has been framed.
    pub fn apply_preset(&mut self, preset: CameraPreset) -> bool {
        let Some(framing) = self.state.framing().copied() else {
            return false;
        };
        self.state.set_camera(preset.pose(&framing));
        true
    }

    /// Disposes every volume and hands the resources back.
    pub fn teardown(mut self) -> R {
        for v in self.state.take_volumes() {
            self.resources.dispose(v.handle);
        }
        self.resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::footprint::Footprint;
    use crate::massing::building::{
        BuildingMass, FetchDiagnostics, FetchStatus, NeighborhoodCenter,
    };
    use crate::scene::resources::ResourceTracker;

    fn building(id: &str, x: f64) -> BuildingMass {
        let fp = Footprint::new(vec![[x, 0.], [x + 8., 0.], [x + 8., 8.], [x, 8.]]).unwrap();
        BuildingMass::new(id, 0., 12., fp).unwrap()
    }

    fn neighborhood(target: &str, ids: &[&str]) -> Neighborhood3D {
        let buildings = ids
            .iter()
            .enumerate()
            .map(|(i, id)| building(id, 20. * i as f64))
            .collect();
        Neighborhood3D::new(
            "a",
            Some(target),
            NeighborhoodCenter::new(52., 5., 0., 0.),
            buildings,
            FetchStatus::Complete,
            FetchDiagnostics::default(),
        )
    }

    #[test]
    fn test_previous_set_is_disposed() -> anyhow::Result<()> {
        let mut builder = SceneBuilder::new(ResourceTracker::new());
        builder.set_massing(&neighborhood("t", &["t", "n1", "n2"]))?;
        assert_eq!(builder.resources().live_count(), 3);

        let update = builder.set_massing(&neighborhood("u", &["u", "m1"]))?;
        assert_eq!(update.disposed, 3);
        assert_eq!(update.created, 2);
        assert_eq!(builder.resources().live_count(), 2);
        assert_eq!(builder.resources().double_disposals, 0);
        assert_eq!(builder.state().target_volume().map(|v| v.id.as_str()), Some("u"));

        let resources = builder.teardown();
        assert_eq!(resources.live_count(), 0);
        assert_eq!(resources.created, resources.disposed);
        Ok(())
    }

    #[test]
    fn test_camera_framed_once_per_target() -> anyhow::Result<()> {
        let mut builder = SceneBuilder::new(ResourceTracker::new());
        let first = builder.set_massing(&neighborhood("t", &["t"]))?;
        assert!(first.reframed);

        // User moves the camera, then neighbors stream in for the same target
        builder.apply_preset(CameraPreset::Street);
        let user_pose = *builder.state().camera();
        let more = builder.set_massing(&neighborhood("t", &["t", "n1", "n2"]))?;
        assert!(!more.reframed);
        assert_eq!(*builder.state().camera(), user_pose);

        let other = builder.set_massing(&neighborhood("n1", &["n1", "t"]))?;
        assert!(other.reframed);
        assert_ne!(*builder.state().camera(), user_pose);
        Ok(())
    }

    #[test]
    fn test_preset_needs_target() {
        let mut builder = SceneBuilder::new(ResourceTracker::new());
        assert!(!builder.apply_preset(CameraPreset::TopDown));
    }
}

//! Scene ownership: renderable volumes, camera and sun light.

pub mod basemap;
pub mod builder;
pub mod camera;
pub mod resources;
pub mod state;

pub use builder::{SceneBuilder, SceneUpdate};
pub use camera::{CameraPose, CameraPreset, Framing};
pub use resources::{RenderError, RenderResources, ResourceHandle, ResourceTracker};
pub use state::{CaptureToken, SceneState, SceneVolume};

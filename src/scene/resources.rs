//! GPU-side resources of building volumes.
//!
//! Every created volume must be disposed exactly once. The tracker keeps the
//! accounting for headless rendering and makes leaks visible in tests.

use std::collections::HashMap;

use crate::geom::volume::Volume;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to build mesh for {id}: {message}")]
    Mesh { id: String, message: String },
    #[error("Image encoding failed: {0}")]
    Encode(String),
    #[error("Render backend error: {0}")]
    Backend(String),
}

/// Opaque id of a created volume resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub u64);

pub trait RenderResources {
    /// Uploads geometry and material of one volume.
    fn create_volume(&mut self, volume: &Volume) -> Result<ResourceHandle, RenderError>;

    /// Frees geometry and material.
    fn dispose(&mut self, handle: ResourceHandle);

    /// Number of resources created and not yet disposed.
    fn live_count(&self) -> usize;
}

/// Headless [`RenderResources`]: meshes are built and counted, not uploaded.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    next_id: u64,
    live: HashMap<ResourceHandle, usize>,
    pub created: usize,
    pub disposed: usize,
    /// Disposal of an unknown or already disposed handle.
    pub double_disposals: usize,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triangles currently held by live resources.
    pub fn live_triangles(&self) -> usize {
        self.live.values().sum()
    }
}

impl RenderResources for ResourceTracker {
    fn create_volume(&mut self, volume: &Volume) -> Result<ResourceHandle, RenderError> {
        let mesh = volume.mesh().map_err(|e| RenderError::Mesh {
            id: volume.id.clone(),
            message: e.to_string(),
        })?;
        self.next_id += 1;
        let handle = ResourceHandle(self.next_id);
        self.live.insert(handle, mesh.indices.len());
        self.created += 1;
        Ok(handle)
    }

    fn dispose(&mut self, handle: ResourceHandle) {
        if self.live.remove(&handle).is_some() {
            self.disposed += 1;
        } else {
            self.double_disposals += 1;
        }
    }

    fn live_count(&self) -> usize {
        self.live.len()
    }
}

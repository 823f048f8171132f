//! Deterministic shadow snapshots at fixed reference times.

pub mod capture;
pub mod raster;
pub mod render;

pub use capture::{ReferenceTime, ShadowSnapshot, SnapshotCapturer, SnapshotConfig, SnapshotOutcome};
pub use raster::Raster;
pub use render::{RenderBackend, SoftwareRenderer};

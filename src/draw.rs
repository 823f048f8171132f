//! Interactive window with the live sun controls (cargo feature `viewer`).

pub mod config;
pub mod window;

pub use config::DrawConfig;
pub use window::{GpuResources, run_viewer};

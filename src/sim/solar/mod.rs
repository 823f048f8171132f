//! Sun position and the directional light that follows it.

pub mod control;
pub mod light;
pub mod position;

pub use control::{DatePreset, SunControl};
pub use light::LightState;
pub use position::{Daylight, SolarPosition};

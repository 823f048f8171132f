pub mod solar;
pub mod sunlight;

pub mod bboxes;
pub mod footprint;
pub mod point;
pub mod ray;
pub mod triangles;
pub mod vector;
pub mod volume;

/// Geometric precision
pub const EPS: f64 = 1e-9;

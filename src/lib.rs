pub mod config;
#[cfg(feature = "viewer")]
pub mod draw;
pub mod fetch;
pub mod geom;
pub mod io;
pub mod massing;
pub mod scene;
pub mod sim;
pub mod snapshot;
pub mod viewer;

// Prelude
pub use geom::footprint::Footprint;
pub use geom::point::Point;
pub use geom::vector::Vector;
pub use geom::volume::Volume;
pub use massing::building::{BuildingMass, Neighborhood3D, NeighborhoodCenter};

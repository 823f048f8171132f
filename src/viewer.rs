//! Selection orchestration between the host view, the fetch and the scene.

pub mod host;
pub mod sequence;
pub mod session;

pub use host::{HostCallbacks, NeighborhoodSource};
pub use sequence::{RequestSequence, SequenceToken};
pub use session::{Selection, SelectionReport, ViewerConfig, ViewerSession};

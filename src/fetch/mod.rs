//! Geometry fetch: the time-budgeted coordinator, its registry port and the
//! cache in front of it.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod http;
pub mod registry;
pub mod service;

pub use config::{ConfigError, FetchConfig};
pub use coordinator::{FetchCoordinator, FetchRequest};
pub use registry::{GeometryRegistry, PageCursor, RegistryError};
pub use service::NeighborhoodService;

//! Port to the external geometry registry.

use async_trait::async_trait;

use crate::io::cityjson::{FeaturePage, ItemResponse};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry request failed: {0}")]
    Transport(String),
    #[error("Registry request timed out")]
    Timeout,
    #[error("Registry returned status {0}")]
    Status(u16),
    #[error("Invalid registry response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RegistryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Position in the paginated area query.
#[derive(Debug, Clone, PartialEq)]
pub enum PageCursor {
    /// First page of a bounding box query `[x0, y0, x1, y1]`.
    Area { bbox: [f64; 4], limit: usize },
    /// Page behind a `rel=next` link.
    Next(String),
}

impl PageCursor {
    /// Square query box centered on `(x, y)`.
    pub fn area(x: f64, y: f64, radius: f64, limit: usize) -> Self {
        Self::Area {
            bbox: [x - radius, y - radius, x + radius, y + radius],
            limit,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeometryRegistry: Send + Sync {
    /// Direct lookup by registry id. `Ok(None)` when the id is unknown.
    async fn fetch_item(&self, registry_id: &str) -> Result<Option<ItemResponse>, RegistryError>;

    /// One page of the area query.
    async fn fetch_page(&self, cursor: &PageCursor) -> Result<FeaturePage, RegistryError>;
}

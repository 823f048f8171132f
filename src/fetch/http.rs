//! HTTP client of the 3D building registry (OGC API Features, CityJSON).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::fetch::registry::{GeometryRegistry, PageCursor, RegistryError};
use crate::io::cityjson::{FeaturePage, ItemResponse};

/// Default registry base URL.
pub const DEFAULT_REGISTRY_BASE_URL: &str = "https://api.3dbag.nl";

const COLLECTION: &str = "collections/pand/items";

#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    /// Creates a client. Request time boxes are applied by the caller, only
    /// the connect timeout is set here.
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn item_url(&self, registry_id: &str) -> String {
        format!("{}/{COLLECTION}/{registry_id}", self.base_url)
    }

    pub fn page_url(&self, cursor: &PageCursor) -> String {
        match cursor {
            PageCursor::Area { bbox, limit } => format!(
                "{}/{COLLECTION}?bbox={:.0},{:.0},{:.0},{:.0}&limit={limit}",
                self.base_url, bbox[0], bbox[1], bbox[2], bbox[3]
            ),
            PageCursor::Next(href) => href.clone(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, RegistryError> {
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RegistryError::Status(response.status().as_u16()));
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| RegistryError::Decode(e.to_string()))
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_BASE_URL)
    }
}

#[async_trait]
impl GeometryRegistry for RegistryClient {
    async fn fetch_item(&self, registry_id: &str) -> Result<Option<ItemResponse>, RegistryError> {
        self.get_json(&self.item_url(registry_id)).await
    }

    async fn fetch_page(&self, cursor: &PageCursor) -> Result<FeaturePage, RegistryError> {
        self.get_json(&self.page_url(cursor))
            .await?
            .ok_or(RegistryError::Status(StatusCode::NOT_FOUND.as_u16()))
    }
}

pub mod client;
pub mod fetcher;
pub mod models;
pub mod paginator;

use crate::catalog::ProductVariant;
use crate::error::SyncError;
use async_trait::async_trait;
use bytes::Bytes;

pub use client::ShopifyClient;
pub use fetcher::{CatalogFetcher, FetchOutcome};
pub use models::{Metafield, Product, ProductsPage};
pub use paginator::Paginator;

/// One raw page response from the remote platform, before any parsing.
#[derive(Clone, Debug)]
pub struct RawPage {
    pub status: u16,
    /// Raw `Link` response header, when present.
    pub link: Option<String>,
    /// `Retry-After` header in seconds, when the remote supplied one.
    pub retry_after: Option<u64>,
    pub body: Bytes,
}

/// Remote-platform surface consumed by the pipeline. Implemented over HTTP
/// by [`ShopifyClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait ShopifyApi: Send + Sync {
    /// Fetch one listing page. Transport-level failures (timeouts, connect
    /// errors) surface as transient errors; HTTP status handling is left to
    /// the paginator.
    async fn fetch_page(&self, url: &str) -> Result<RawPage, SyncError>;

    /// Fetch the metafield collection for one product.
    async fn product_metafields(&self, product_id: i64) -> Result<Vec<Metafield>, SyncError>;

    /// Submit the catalog snapshot to the remote write endpoint. Invoked
    /// once per Push stage; the payload schema is owned by the remote.
    async fn push_catalog(&self, records: &[ProductVariant]) -> Result<(), SyncError>;
}

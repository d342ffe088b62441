use crate::error::SyncError;
use crate::{env_u32, env_u64, env_usize};

/// All remote-platform settings for one synchronization run.
///
/// Built once from the environment in the binary and passed into each
/// component's constructor; components never read process env themselves.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Shop hostname, e.g. `my-store.myshopify.com`.
    pub shop_domain: String,
    /// Pre-issued admin API access token.
    pub access_token: String,
    /// Admin API version segment, e.g. `2023-10`.
    pub api_version: String,
    /// Page size for the products listing endpoint.
    pub page_limit: u32,
    /// Max in-flight metafield lookups during catalog fetch.
    pub metafield_concurrency: usize,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
    /// Metafield namespace/key pair carrying the MSRP value.
    pub msrp_namespace: String,
    pub msrp_key: String,
}

impl SyncConfig {
    /// Read configuration from `SHOPIFY_*` / `SYNC_*` env vars.
    /// `SHOPIFY_DOMAIN` and `SHOPIFY_TOKEN` are required; everything else
    /// has a default.
    pub fn from_env() -> Result<Self, SyncError> {
        let shop_domain = std::env::var("SHOPIFY_DOMAIN")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| SyncError::MissingInput("SHOPIFY_DOMAIN is not set".into()))?;
        let access_token = std::env::var("SHOPIFY_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| SyncError::MissingInput("SHOPIFY_TOKEN is not set".into()))?;

        Ok(Self {
            shop_domain: shop_domain.trim().to_string(),
            access_token: access_token.trim().to_string(),
            api_version: std::env::var("SHOPIFY_API_VERSION")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "2023-10".into()),
            page_limit: env_u32("SYNC_PAGE_LIMIT", 250),
            metafield_concurrency: env_usize("SYNC_METAFIELD_CONCURRENCY", 5),
            request_timeout_secs: env_u64("SYNC_REQUEST_TIMEOUT_SECS", 30),
            msrp_namespace: std::env::var("SYNC_MSRP_NAMESPACE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "custom".into()),
            msrp_key: std::env::var("SYNC_MSRP_KEY")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "msrp".into()),
        })
    }

    fn api_base(&self) -> String {
        format!("https://{}/admin/api/{}", self.shop_domain, self.api_version)
    }

    /// First-page URL for the published/active products listing.
    pub fn products_url(&self) -> String {
        format!(
            "{}/products.json?limit={}&published_status=published&status=active",
            self.api_base(),
            self.page_limit
        )
    }

    /// Metafields listing URL for one product.
    pub fn metafields_url(&self, product_id: i64) -> String {
        format!("{}/products/{}/metafields.json", self.api_base(), product_id)
    }

    /// Bulk catalog write endpoint used once per Push stage. The payload
    /// schema is owned by the remote platform.
    pub fn push_url(&self) -> String {
        format!("{}/products/batch.json", self.api_base())
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            shop_domain: "demo.myshopify.com".into(),
            access_token: "shpat_test".into(),
            api_version: "2023-10".into(),
            page_limit: 250,
            metafield_concurrency: 5,
            request_timeout_secs: 30,
            msrp_namespace: "custom".into(),
            msrp_key: "msrp".into(),
        }
    }
}

use crate::catalog::ProductVariant;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::shopify::models::MetafieldsResponse;
use crate::shopify::{Metafield, RawPage, ShopifyApi};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// HTTP client for the admin API. Carries the access token and content type
/// on every request and a per-request timeout; expired timeouts and connect
/// failures surface as transient errors.
#[derive(Clone)]
pub struct ShopifyClient {
    http: Client,
    cfg: Arc<SyncConfig>,
}

impl ShopifyClient {
    pub fn new(cfg: SyncConfig) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&cfg.access_token).map_err(|_| {
            SyncError::MissingInput("SHOPIFY_TOKEN contains characters invalid in a header".into())
        })?;
        headers.insert(ACCESS_TOKEN_HEADER, token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            cfg: Arc::new(cfg),
        })
    }

    fn retry_after_secs(resp: &Response) -> Option<u64> {
        resp.headers()
            .get(RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
    }

    /// Map a non-success response into the transient taxonomy, preserving
    /// the Retry-After hint on rate limits.
    async fn status_error(resp: Response, what: &str) -> SyncError {
        let status = resp.status();
        let retry_after = (status == StatusCode::TOO_MANY_REQUESTS)
            .then(|| Self::retry_after_secs(&resp))
            .flatten();
        let body = resp.text().await.unwrap_or_default();
        SyncError::Transient {
            status: Some(status.as_u16()),
            retry_after,
            message: format!("{what} returned http {}: {}", status.as_u16(), truncate(&body, 200)),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl ShopifyApi for ShopifyClient {
    async fn fetch_page(&self, url: &str) -> Result<RawPage, SyncError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status().as_u16();
        let retry_after = Self::retry_after_secs(&resp);
        let link = resp
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?;
        debug!(url, status, bytes = body.len(), "fetched page");
        Ok(RawPage {
            status,
            link,
            retry_after,
            body,
        })
    }

    async fn product_metafields(&self, product_id: i64) -> Result<Vec<Metafield>, SyncError> {
        let url = self.cfg.metafields_url(product_id);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(Self::status_error(resp, "metafields fetch").await);
        }
        let parsed: MetafieldsResponse = resp.json().await?;
        Ok(parsed.metafields)
    }

    async fn push_catalog(&self, records: &[ProductVariant]) -> Result<(), SyncError> {
        let resp = self
            .http
            .put(self.cfg.push_url())
            .json(&json!({ "products": records }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::status_error(resp, "catalog push").await);
        }
        debug!(records = records.len(), "pushed catalog snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("hé", 10), "hé");
        assert_eq!(truncate("ééééé", 2), "éé");
    }

    #[test]
    fn client_rejects_token_with_control_characters() {
        let mut cfg = SyncConfig::for_tests();
        cfg.access_token = "bad\ntoken".into();
        assert!(matches!(
            ShopifyClient::new(cfg),
            Err(SyncError::MissingInput(_))
        ));
    }
}

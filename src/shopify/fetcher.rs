use crate::catalog::ProductVariant;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::shopify::models::{Product, ProductsPage};
use crate::shopify::{Paginator, ShopifyApi};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;
use tracing::{info, warn};

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

/// Strip HTML tags from a platform description, leaving plain text.
pub fn strip_html(html: &str) -> String {
    html_tag_re().replace_all(html, "").trim().to_string()
}

/// Totals from one full catalog fetch.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub variants: Vec<ProductVariant>,
    pub products_seen: usize,
    pub pages_seen: usize,
    /// Products whose metafield lookup failed; their variants shipped with
    /// an empty MSRP instead of aborting the fetch.
    pub enrichment_failures: usize,
}

/// Pulls the product listing page by page and flattens it to variant-level
/// records, enriching each product with its MSRP metafield.
///
/// Metafield lookups for one page run concurrently under a bounded permit
/// pool; completion order is irrelevant because values are joined back by
/// product id before variants are emitted in listing order. Restart by
/// calling [`CatalogFetcher::fetch_all`] again from the first page.
pub struct CatalogFetcher<'a, A: ShopifyApi + ?Sized> {
    api: &'a A,
    cfg: &'a SyncConfig,
}

impl<'a, A: ShopifyApi + ?Sized> CatalogFetcher<'a, A> {
    pub fn new(api: &'a A, cfg: &'a SyncConfig) -> Self {
        Self { api, cfg }
    }

    /// Traverse the whole listing. Page-level failures propagate; a single
    /// product's enrichment failure never aborts the fetch.
    pub async fn fetch_all(&self) -> Result<FetchOutcome, SyncError> {
        let mut out = FetchOutcome::default();
        let mut pager = Paginator::new(self.api, self.cfg.products_url());

        while let Some(body) = pager.next_page().await? {
            let page: ProductsPage = serde_json::from_slice(&body)?;
            out.pages_seen += 1;
            let (msrp_by_product, failures) = self.lookup_msrps(&page.products).await;
            out.enrichment_failures += failures;

            for product in &page.products {
                out.products_seen += 1;
                let msrp = msrp_by_product
                    .get(&product.id)
                    .cloned()
                    .unwrap_or_default();
                self.flatten(product, &msrp, &mut out.variants);
            }
            info!(
                page = out.pages_seen,
                products = out.products_seen,
                variants = out.variants.len(),
                "processed listing page"
            );
        }
        Ok(out)
    }

    /// Fetch MSRP metafields for a page of products under the configured
    /// concurrency cap. Failures are logged per product and counted, with
    /// the value left empty.
    async fn lookup_msrps(&self, products: &[Product]) -> (HashMap<i64, String>, usize) {
        let sem = Arc::new(Semaphore::new(self.cfg.metafield_concurrency.max(1)));
        let mut futs: FuturesUnordered<_> = FuturesUnordered::new();
        for product in products {
            let id = product.id;
            let sem = sem.clone();
            futs.push(async move {
                // Acquired inside the future so the pool caps in-flight
                // lookups without blocking enqueue.
                let _permit = sem.acquire_owned().await.expect("semaphore closed");
                (id, self.api.product_metafields(id).await)
            });
        }

        let mut by_product = HashMap::new();
        let mut failures = 0usize;
        while let Some((id, res)) = futs.next().await {
            match res {
                Ok(metafields) => {
                    let msrp = metafields
                        .iter()
                        .find(|m| {
                            m.namespace == self.cfg.msrp_namespace && m.key == self.cfg.msrp_key
                        })
                        .map(|m| m.value_string())
                        .unwrap_or_default();
                    by_product.insert(id, msrp);
                }
                Err(e) => {
                    warn!(product_id = id, error = %e, "metafield lookup failed; msrp left empty");
                    failures += 1;
                }
            }
        }
        (by_product, failures)
    }

    /// One record per variant, sharing the parent product's title, first
    /// image, stripped description, and looked-up MSRP.
    fn flatten(&self, product: &Product, msrp: &str, into: &mut Vec<ProductVariant>) {
        let image_url = product
            .images
            .first()
            .map(|i| i.src.clone())
            .unwrap_or_default();
        let description = strip_html(&product.body_html);
        for variant in &product.variants {
            into.push(ProductVariant {
                sku: variant.sku.clone().unwrap_or_default(),
                title: product.title.clone(),
                image_url: image_url.clone(),
                price: variant.price.clone(),
                compare_at_price: variant.compare_at_price.clone().unwrap_or_default(),
                msrp: msrp.to_string(),
                description: description.clone(),
                inventory_quantity: None,
                remote_id: Some(product.id.to_string()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopify::{Metafield, RawPage};
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeShop {
        page_body: String,
        /// product id -> metafields body; absent id means the lookup errors.
        metafields: HashMap<i64, Vec<Metafield>>,
        lookups: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl ShopifyApi for FakeShop {
        async fn fetch_page(&self, _url: &str) -> Result<RawPage, SyncError> {
            Ok(RawPage {
                status: 200,
                link: None,
                retry_after: None,
                body: Bytes::from(self.page_body.clone()),
            })
        }

        async fn product_metafields(&self, product_id: i64) -> Result<Vec<Metafield>, SyncError> {
            self.lookups.lock().unwrap().push(product_id);
            self.metafields
                .get(&product_id)
                .cloned()
                .ok_or_else(|| SyncError::transient("metafields endpoint unavailable"))
        }

        async fn push_catalog(&self, _records: &[ProductVariant]) -> Result<(), SyncError> {
            unreachable!("fetcher never pushes")
        }
    }

    fn msrp_field(value: &str) -> Metafield {
        serde_json::from_value(json!({
            "namespace": "custom",
            "key": "msrp",
            "value": value,
        }))
        .unwrap()
    }

    fn two_variant_page() -> String {
        json!({
            "products": [{
                "id": 101,
                "title": "Widget",
                "body_html": "<p>Great <b>widget</b></p>",
                "images": [{"src": "https://cdn.example/w.jpg"}, {"src": "https://cdn.example/w2.jpg"}],
                "variants": [
                    {"sku": "W-S", "price": "9.99", "compare_at_price": "12.99"},
                    {"sku": "W-L", "price": "14.99", "compare_at_price": null}
                ]
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn variants_share_product_fields_and_msrp() {
        let api = FakeShop {
            page_body: two_variant_page(),
            metafields: HashMap::from([(101, vec![msrp_field("19.99")])]),
            lookups: Mutex::new(Vec::new()),
        };
        let cfg = SyncConfig::for_tests();
        let out = CatalogFetcher::new(&api, &cfg).fetch_all().await.unwrap();

        assert_eq!(out.products_seen, 1);
        assert_eq!(out.enrichment_failures, 0);
        let [a, b] = &out.variants[..] else {
            panic!("expected two variants, got {}", out.variants.len())
        };
        assert_eq!(a.sku, "W-S");
        assert_eq!(b.sku, "W-L");
        assert_eq!(a.price, "9.99");
        assert_eq!(b.price, "14.99");
        assert_eq!(a.compare_at_price, "12.99");
        assert_eq!(b.compare_at_price, "");
        for v in [a, b] {
            assert_eq!(v.title, "Widget");
            assert_eq!(v.image_url, "https://cdn.example/w.jpg");
            assert_eq!(v.msrp, "19.99");
            assert_eq!(v.description, "Great widget");
            assert_eq!(v.remote_id.as_deref(), Some("101"));
            assert_eq!(v.inventory_quantity, None);
        }
    }

    #[tokio::test]
    async fn enrichment_failure_degrades_to_empty_msrp() {
        let api = FakeShop {
            page_body: two_variant_page(),
            metafields: HashMap::new(), // every lookup fails
            lookups: Mutex::new(Vec::new()),
        };
        let cfg = SyncConfig::for_tests();
        let out = CatalogFetcher::new(&api, &cfg).fetch_all().await.unwrap();

        assert_eq!(out.enrichment_failures, 1);
        assert_eq!(out.variants.len(), 2);
        assert!(out.variants.iter().all(|v| v.msrp.is_empty()));
    }

    #[tokio::test]
    async fn metafield_without_matching_key_leaves_msrp_empty() {
        let other = serde_json::from_value::<Metafield>(json!({
            "namespace": "custom",
            "key": "warranty",
            "value": "2y",
        }))
        .unwrap();
        let api = FakeShop {
            page_body: two_variant_page(),
            metafields: HashMap::from([(101, vec![other])]),
            lookups: Mutex::new(Vec::new()),
        };
        let cfg = SyncConfig::for_tests();
        let out = CatalogFetcher::new(&api, &cfg).fetch_all().await.unwrap();
        assert_eq!(out.enrichment_failures, 0);
        assert!(out.variants.iter().all(|v| v.msrp.is_empty()));
    }

    #[tokio::test]
    async fn one_lookup_per_product() {
        let api = FakeShop {
            page_body: json!({
                "products": [
                    {"id": 1, "title": "A", "body_html": "", "images": [], "variants": [{"sku": "A-1", "price": "1.00"}]},
                    {"id": 2, "title": "B", "body_html": "", "images": [], "variants": [{"sku": "B-1", "price": "2.00"}]}
                ]
            })
            .to_string(),
            metafields: HashMap::from([(1, vec![]), (2, vec![])]),
            lookups: Mutex::new(Vec::new()),
        };
        let cfg = SyncConfig::for_tests();
        let out = CatalogFetcher::new(&api, &cfg).fetch_all().await.unwrap();
        assert_eq!(out.variants.len(), 2);
        let mut lookups = api.lookups.lock().unwrap().clone();
        lookups.sort_unstable();
        assert_eq!(lookups, vec![1, 2]);
    }

    #[test]
    fn strip_html_removes_tags_and_trims() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_html("plain"), "plain");
        assert_eq!(strip_html("  <div>\npadded\n</div>  "), "padded");
        assert_eq!(strip_html(""), "");
    }
}

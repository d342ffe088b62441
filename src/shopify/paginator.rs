use crate::error::SyncError;
use crate::shopify::ShopifyApi;
use bytes::Bytes;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

fn next_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).unwrap())
}

/// Extract the `rel="next"` target from a `Link` response header.
///
/// Returns `Ok(None)` when the header carries no next relation (end of the
/// listing); errors when a next relation is present but its URL does not
/// parse, since continuing would silently truncate the catalog.
pub fn parse_next_link(header: &str) -> Result<Option<String>, SyncError> {
    let Some(caps) = next_link_re().captures(header) else {
        return Ok(None);
    };
    let raw = caps[1].trim();
    url::Url::parse(raw).map_err(|e| SyncError::Transient {
        status: None,
        retry_after: None,
        message: format!("malformed next link {raw:?}: {e}"),
    })?;
    Ok(Some(raw.to_string()))
}

/// Walks a cursor-paginated listing, yielding raw page bodies until the
/// remote stops sending a `rel="next"` link.
///
/// Strictly sequential: each page's URL comes from the previous response's
/// header, so there is nothing to parallelize here. Performs no retries or
/// backoff; rate limits (HTTP 429) surface as transient errors with the
/// server's Retry-After hint so the caller can decide policy.
pub struct Paginator<'a, A: ShopifyApi + ?Sized> {
    api: &'a A,
    next_url: Option<String>,
    pages_seen: usize,
}

impl<'a, A: ShopifyApi + ?Sized> Paginator<'a, A> {
    pub fn new(api: &'a A, start_url: impl Into<String>) -> Self {
        Self {
            api,
            next_url: Some(start_url.into()),
            pages_seen: 0,
        }
    }

    /// Fetch the next page body, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Bytes>, SyncError> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };
        let page = self.api.fetch_page(&url).await?;
        if !(200..300).contains(&page.status) {
            return Err(SyncError::Transient {
                status: Some(page.status),
                retry_after: page.retry_after,
                message: format!("page fetch returned http {} for {url}", page.status),
            });
        }
        self.next_url = match page.link.as_deref() {
            Some(link) => parse_next_link(link)?,
            None => None,
        };
        self.pages_seen += 1;
        debug!(page = self.pages_seen, has_next = self.next_url.is_some(), "fetched listing page");
        Ok(Some(page.body))
    }

    pub fn pages_seen(&self) -> usize {
        self.pages_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductVariant;
    use crate::shopify::{Metafield, RawPage};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Scripted page source: URL -> canned response.
    struct ScriptedPages {
        pages: HashMap<String, RawPage>,
    }

    #[async_trait]
    impl ShopifyApi for ScriptedPages {
        async fn fetch_page(&self, url: &str) -> Result<RawPage, SyncError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| SyncError::transient(format!("no script for {url}")))
        }

        async fn product_metafields(&self, _product_id: i64) -> Result<Vec<Metafield>, SyncError> {
            unreachable!("paginator never looks up metafields")
        }

        async fn push_catalog(&self, _records: &[ProductVariant]) -> Result<(), SyncError> {
            unreachable!("paginator never pushes")
        }
    }

    fn page(body: &str, next: Option<&str>) -> RawPage {
        RawPage {
            status: 200,
            link: next.map(|u| format!("<{u}>; rel=\"next\"")),
            retry_after: None,
            body: Bytes::from(body.to_string()),
        }
    }

    fn chain(n: usize) -> (ScriptedPages, String) {
        let mut pages = HashMap::new();
        for i in 1..=n {
            let url = format!("https://shop.example/products.json?page_info=p{i}");
            let next = (i < n).then(|| format!("https://shop.example/products.json?page_info=p{}", i + 1));
            pages.insert(url, page(&format!("body-{i}"), next.as_deref()));
        }
        (
            ScriptedPages { pages },
            "https://shop.example/products.json?page_info=p1".into(),
        )
    }

    #[tokio::test]
    async fn traverses_all_pages_in_order_and_terminates() {
        let (api, start) = chain(3);
        let mut pager = Paginator::new(&api, start);
        let mut bodies = Vec::new();
        while let Some(body) = pager.next_page().await.unwrap() {
            bodies.push(String::from_utf8(body.to_vec()).unwrap());
        }
        assert_eq!(bodies, vec!["body-1", "body-2", "body-3"]);
        assert_eq!(pager.pages_seen(), 3);
        // Exhausted paginator keeps returning None.
        assert!(pager.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn single_page_without_link_header_yields_one_page() {
        let mut pages = HashMap::new();
        pages.insert("https://shop.example/one".to_string(), page("only", None));
        let api = ScriptedPages { pages };
        let mut pager = Paginator::new(&api, "https://shop.example/one");
        assert!(pager.next_page().await.unwrap().is_some());
        assert!(pager.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rate_limit_surfaces_retry_after_hint() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://shop.example/limited".to_string(),
            RawPage {
                status: 429,
                link: None,
                retry_after: Some(7),
                body: Bytes::new(),
            },
        );
        let api = ScriptedPages { pages };
        let mut pager = Paginator::new(&api, "https://shop.example/limited");
        let err = pager.next_page().await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.retry_after(), Some(7));
    }

    #[tokio::test]
    async fn malformed_next_link_is_an_error_not_truncation() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://shop.example/bad".to_string(),
            RawPage {
                status: 200,
                link: Some("<not a url>; rel=\"next\"".into()),
                retry_after: None,
                body: Bytes::from_static(b"{}"),
            },
        );
        let api = ScriptedPages { pages };
        let mut pager = Paginator::new(&api, "https://shop.example/bad");
        assert!(pager.next_page().await.unwrap_err().is_transient());
    }

    #[test]
    fn link_header_with_only_previous_relation_terminates() {
        let header = r#"<https://shop.example/products.json?page_info=p0>; rel="previous""#;
        assert_eq!(parse_next_link(header).unwrap(), None);
    }

    #[test]
    fn link_header_with_both_relations_picks_next() {
        let header = concat!(
            r#"<https://shop.example/products.json?page_info=p0>; rel="previous", "#,
            r#"<https://shop.example/products.json?page_info=p2>; rel="next""#
        );
        assert_eq!(
            parse_next_link(header).unwrap().as_deref(),
            Some("https://shop.example/products.json?page_info=p2")
        );
    }
}

use serde::Deserialize;
use serde_json::Value;

/// Body of one `products.json` listing page.
#[derive(Debug, Deserialize)]
pub struct ProductsPage {
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub struct Product {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    /// HTML product description as the platform stores it.
    #[serde(default)]
    pub body_html: String,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub variants: Vec<ProductApiVariant>,
}

#[derive(Debug, Deserialize)]
pub struct ProductImage {
    #[serde(default)]
    pub src: String,
}

/// Variant as the listing endpoint returns it; flattened into
/// [`crate::catalog::ProductVariant`] by the fetcher.
#[derive(Debug, Deserialize)]
pub struct ProductApiVariant {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub compare_at_price: Option<String>,
}

/// Body of `products/{id}/metafields.json`.
#[derive(Debug, Deserialize)]
pub struct MetafieldsResponse {
    #[serde(default)]
    pub metafields: Vec<Metafield>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Metafield {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub key: String,
    /// The platform serializes values as strings or numbers depending on
    /// the metafield type definition.
    #[serde(default)]
    pub value: Value,
}

impl Metafield {
    /// Value as a plain string regardless of the wire type.
    pub fn value_string(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metafield_value_string_handles_wire_types() {
        let m: Metafield =
            serde_json::from_str(r#"{"namespace":"custom","key":"msrp","value":"49.99"}"#).unwrap();
        assert_eq!(m.value_string(), "49.99");

        let m: Metafield =
            serde_json::from_str(r#"{"namespace":"custom","key":"msrp","value":49.99}"#).unwrap();
        assert_eq!(m.value_string(), "49.99");

        let m: Metafield =
            serde_json::from_str(r#"{"namespace":"custom","key":"msrp","value":null}"#).unwrap();
        assert_eq!(m.value_string(), "");
    }

    #[test]
    fn listing_page_tolerates_missing_fields() {
        let page: ProductsPage = serde_json::from_str(
            r#"{"products":[{"id":1,"title":"Widget","variants":[{"sku":"W-1","price":"9.99"}]}]}"#,
        )
        .unwrap();
        assert_eq!(page.products.len(), 1);
        let p = &page.products[0];
        assert!(p.images.is_empty());
        assert_eq!(p.variants[0].compare_at_price, None);
    }
}

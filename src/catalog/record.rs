use serde::{Deserialize, Serialize};

/// Canonical unit of synchronization: one sellable variant, keyed by SKU
/// across every source.
///
/// String fields use the empty string for "not supplied" so that flat-file
/// rows and API records serialize the same way; the two table-only fields
/// (`inventory_quantity`, `remote_id`) are options because their absence is
/// meaningful to the merge policy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Sole cross-source join key. Records with an empty SKU are dropped
    /// during reconciliation, with a logged warning.
    pub sku: String,
    pub title: String,
    pub image_url: String,
    /// Decimal price kept as the platform's string form; never reformatted.
    pub price: String,
    /// Minimum advertised price (MAP).
    pub compare_at_price: String,
    /// Manufacturer's suggested retail price, sourced from a secondary
    /// metafield lookup; empty when the lookup failed or had no entry.
    pub msrp: String,
    /// Plain-text description, HTML already stripped.
    pub description: String,
    /// On-hand quantity. Only persisted-table records carry this.
    pub inventory_quantity: Option<i64>,
    /// Remote platform product id. Present iff the record is known to exist
    /// on (or be linked to) the remote platform.
    pub remote_id: Option<String>,
}

impl ProductVariant {
    /// True when the record has a usable join key.
    pub fn has_sku(&self) -> bool {
        !self.sku.trim().is_empty()
    }
}

use crate::catalog::ProductVariant;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::warn;

/// Result of a three-way merge: canonical records keyed by SKU, plus the
/// number of input records dropped for lacking a SKU.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub records: IndexMap<String, ProductVariant>,
    pub dropped: usize,
}

/// Merge variant records from the remote platform, an operator flat file,
/// and the persisted table into one canonical record per SKU.
///
/// Field precedence (per field, not per record):
/// - `inventory_quantity`: persisted-table value only; other sources never
///   supply it.
/// - `remote_id`: taken from the remote source when it has the SKU;
///   otherwise an id already stored against the SKU is kept, since a stored
///   id still marks a known remote link.
/// - everything else: remote wins when non-empty, then flat file, then
///   persisted.
///
/// Pure over its inputs: no I/O, deterministic output for a given triple.
/// Records without a SKU are dropped and counted, each with a warning.
pub fn reconcile(
    remote: &[ProductVariant],
    flat_file: &[ProductVariant],
    persisted: &[ProductVariant],
) -> ReconcileOutcome {
    let mut dropped = 0usize;
    let mut order: Vec<String> = Vec::new();

    let mut index = |source: &'static str, records: &[ProductVariant]| -> HashMap<String, ProductVariant> {
        let mut by_sku = HashMap::with_capacity(records.len());
        for rec in records {
            if !rec.has_sku() {
                warn!(source, title = %rec.title, "dropping record without a SKU");
                dropped += 1;
                continue;
            }
            if !by_sku.contains_key(&rec.sku) {
                order.push(rec.sku.clone());
            }
            // Last occurrence within a source wins, matching upsert order.
            by_sku.insert(rec.sku.clone(), rec.clone());
        }
        by_sku
    };

    let remote_by_sku = index("remote", remote);
    let flat_by_sku = index("flat-file", flat_file);
    let persisted_by_sku = index("persisted", persisted);

    let mut records = IndexMap::with_capacity(order.len());
    for sku in order {
        if records.contains_key(&sku) {
            continue;
        }
        let r = remote_by_sku.get(&sku);
        let f = flat_by_sku.get(&sku);
        let p = persisted_by_sku.get(&sku);

        let pick = |get: fn(&ProductVariant) -> &String| -> String {
            [r, f, p]
                .into_iter()
                .flatten()
                .map(get)
                .find(|v| !v.is_empty())
                .cloned()
                .unwrap_or_default()
        };

        let remote_id = match r {
            Some(rec) => rec.remote_id.clone(),
            None => p
                .and_then(|rec| rec.remote_id.clone())
                .or_else(|| f.and_then(|rec| rec.remote_id.clone())),
        };

        let merged = ProductVariant {
            sku: sku.clone(),
            title: pick(|v| &v.title),
            image_url: pick(|v| &v.image_url),
            price: pick(|v| &v.price),
            compare_at_price: pick(|v| &v.compare_at_price),
            msrp: pick(|v| &v.msrp),
            description: pick(|v| &v.description),
            inventory_quantity: p.and_then(|rec| rec.inventory_quantity),
            remote_id,
        };
        records.insert(sku, merged);
    }

    ReconcileOutcome { records, dropped }
}

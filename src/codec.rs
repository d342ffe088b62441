//! Flat-file interchange codec.
//!
//! One CSV row per variant with the header the operator tooling expects:
//! `SKU,Image,Title,Price,MAP,MSRP,Description`. The byte layout is an
//! external interface; the contract here is semantic fidelity — decoding an
//! encoded record set reproduces the same records, independent of column
//! order. Table-only fields (inventory quantity, remote id) do not travel
//! in the flat file.

use crate::catalog::ProductVariant;
use crate::error::SyncError;
use bytes::Bytes;

const HEADERS: [&str; 7] = ["SKU", "Image", "Title", "Price", "MAP", "MSRP", "Description"];

/// Serialize records to flat-file bytes.
pub fn encode(records: &[ProductVariant]) -> Result<Bytes, SyncError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for rec in records {
        writer.write_record([
            rec.sku.as_str(),
            rec.image_url.as_str(),
            rec.title.as_str(),
            rec.price.as_str(),
            rec.compare_at_price.as_str(),
            rec.msrp.as_str(),
            rec.description.as_str(),
        ])?;
    }
    let inner = writer
        .into_inner()
        .map_err(|e| SyncError::DataQuality(format!("flat-file writer flush failed: {e}")))?;
    Ok(Bytes::from(inner))
}

/// Parse flat-file bytes into variant records.
///
/// Columns are matched by header name, so operator files may order them
/// freely; unknown columns are ignored and missing optional columns decode
/// as empty. A file without a `SKU` column is rejected outright.
pub fn decode(bytes: &[u8]) -> Result<Vec<ProductVariant>, SyncError> {
    // No field trimming; per-field values must round-trip exactly.
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers = reader.headers()?.clone();
    let col = |name: &str| -> Option<usize> {
        headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    };
    let sku_col = col("SKU").ok_or_else(|| {
        SyncError::DataQuality("flat file has no SKU column; nothing to key records by".into())
    })?;
    let image_col = col("Image");
    let title_col = col("Title");
    let price_col = col("Price");
    let map_col = col("MAP");
    let msrp_col = col("MSRP");
    let description_col = col("Description");

    let field = |row: &csv::StringRecord, idx: Option<usize>| -> String {
        idx.and_then(|i| row.get(i)).unwrap_or_default().to_string()
    };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(ProductVariant {
            sku: field(&row, Some(sku_col)),
            image_url: field(&row, image_col),
            title: field(&row, title_col),
            price: field(&row, price_col),
            compare_at_price: field(&row, map_col),
            msrp: field(&row, msrp_col),
            description: field(&row, description_col),
            inventory_quantity: None,
            remote_id: None,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample(sku: &str) -> ProductVariant {
        ProductVariant {
            sku: sku.into(),
            title: "Widget".into(),
            image_url: "https://cdn.example/w.jpg".into(),
            price: "9.99".into(),
            compare_at_price: "12.99".into(),
            msrp: "19.99".into(),
            description: "A widget, with commas, and \"quotes\"".into(),
            inventory_quantity: None,
            remote_id: None,
        }
    }

    fn as_set(records: Vec<ProductVariant>) -> HashSet<String> {
        records
            .into_iter()
            .map(|r| serde_json::to_string(&r).unwrap())
            .collect()
    }

    #[test]
    fn round_trip_empty_single_and_duplicate_sku() {
        for records in [
            vec![],
            vec![sample("W-1")],
            vec![sample("W-1"), sample("W-1"), sample("W-2")],
        ] {
            let bytes = encode(&records).unwrap();
            let decoded = decode(&bytes).unwrap();
            assert_eq!(decoded.len(), records.len());
            assert_eq!(as_set(decoded), as_set(records));
        }
    }

    #[test]
    fn decode_is_column_order_independent() {
        let csv = "Title,SKU,Price\nWidget,W-1,9.99\n";
        let records = decode(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sku, "W-1");
        assert_eq!(records[0].title, "Widget");
        assert_eq!(records[0].price, "9.99");
        assert_eq!(records[0].msrp, "");
    }

    #[test]
    fn decode_rejects_file_without_sku_column() {
        let csv = "Title,Price\nWidget,9.99\n";
        assert!(matches!(
            decode(csv.as_bytes()),
            Err(SyncError::DataQuality(_))
        ));
    }

    #[test]
    fn decode_preserves_empty_sku_rows_for_the_reconciler_to_drop() {
        let csv = "SKU,Title\n,Widget\nW-1,Other\n";
        let records = decode(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].has_sku());
        assert!(records[1].has_sku());
    }

    #[test]
    fn table_only_fields_never_travel() {
        let mut rec = sample("W-1");
        rec.inventory_quantity = Some(5);
        rec.remote_id = Some("101".into());
        let decoded = decode(&encode(&[rec]).unwrap()).unwrap();
        assert_eq!(decoded[0].inventory_quantity, None);
        assert_eq!(decoded[0].remote_id, None);
    }
}

//! Product catalog synchronization between a Shopify-style admin API, an
//! operator-supplied flat file, and a Postgres product table.
//!
//! The pipeline is a four-stage run (pull, import, push, export) driven by
//! [`sync::Orchestrator`]; records are merged per SKU by the pure
//! [`catalog::reconcile`] function, and the catalog is ingested page by page
//! through [`shopify::Paginator`] and [`shopify::CatalogFetcher`].

pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod shopify;
pub mod store;
pub mod sync;

use std::sync::Once;

static DOTENV_INIT: Once = Once::new();

/// Load .env exactly once; if missing from the working directory, fall back
/// to the Cargo project root. Safe to call many times.
pub fn ensure_dotenv() {
    DOTENV_INIT.call_once(|| {
        if dotenv::dotenv().is_ok() {
            return;
        }
        let candidate = format!("{}/.env", env!("CARGO_MANIFEST_DIR"));
        let _ = dotenv::from_filename(candidate);
    });
}

pub fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        })
        .unwrap_or(default)
}

pub fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

pub fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

pub fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

pub mod reconcile;
pub mod record;

pub use reconcile::{reconcile, ReconcileOutcome};
pub use record::ProductVariant;

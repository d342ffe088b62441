use crate::catalog::ProductVariant;
use crate::error::SyncError;
use crate::store::ProductTable;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{PgPool, QueryBuilder, Row};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Rows per multi-value upsert statement. Keeps well under the Postgres
/// bind-parameter limit at 9 binds per row.
const UPSERT_CHUNK: usize = 500;

/// Postgres-backed product table.
#[derive(Clone)]
pub struct PgProductTable {
    pool: PgPool,
}

impl PgProductTable {
    // SECURITY: never include raw DSNs in tracing output (they may contain credentials).
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, SyncError> {
        let mut connect_options = PgConnectOptions::from_str(database_url)?;
        // Be explicit about TLS when the DSN asks for it.
        if database_url.contains("sslmode=require") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to product table");
        Ok(Self { pool })
    }

    /// Create the products table when absent. Called once at startup by the
    /// binary; safe to repeat.
    pub async fn ensure_schema(&self) -> Result<(), SyncError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                sku                TEXT PRIMARY KEY,
                title              TEXT NOT NULL DEFAULT '',
                image_url          TEXT NOT NULL DEFAULT '',
                price              TEXT NOT NULL DEFAULT '',
                compare_at_price   TEXT NOT NULL DEFAULT '',
                msrp               TEXT NOT NULL DEFAULT '',
                description        TEXT NOT NULL DEFAULT '',
                inventory_quantity BIGINT,
                remote_id          TEXT,
                updated_at         TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<ProductVariant, sqlx::Error> {
        Ok(ProductVariant {
            sku: row.try_get("sku")?,
            title: row.try_get("title")?,
            image_url: row.try_get("image_url")?,
            price: row.try_get("price")?,
            compare_at_price: row.try_get("compare_at_price")?,
            msrp: row.try_get("msrp")?,
            description: row.try_get("description")?,
            inventory_quantity: row.try_get("inventory_quantity")?,
            remote_id: row.try_get("remote_id")?,
        })
    }
}

#[async_trait]
impl ProductTable for PgProductTable {
    async fn upsert(&self, records: &[ProductVariant]) -> Result<u64, SyncError> {
        let mut written = 0u64;
        for chunk in records.chunks(UPSERT_CHUNK) {
            let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
                "INSERT INTO products (sku, title, image_url, price, compare_at_price, msrp, description, inventory_quantity, remote_id) ",
            );
            qb.push_values(chunk, |mut b, rec| {
                b.push_bind(&rec.sku)
                    .push_bind(&rec.title)
                    .push_bind(&rec.image_url)
                    .push_bind(&rec.price)
                    .push_bind(&rec.compare_at_price)
                    .push_bind(&rec.msrp)
                    .push_bind(&rec.description)
                    .push_bind(rec.inventory_quantity)
                    .push_bind(&rec.remote_id);
            });
            qb.push(
                r#" ON CONFLICT (sku) DO UPDATE SET
                    title = EXCLUDED.title,
                    image_url = EXCLUDED.image_url,
                    price = EXCLUDED.price,
                    compare_at_price = EXCLUDED.compare_at_price,
                    msrp = EXCLUDED.msrp,
                    description = EXCLUDED.description,
                    inventory_quantity = COALESCE(EXCLUDED.inventory_quantity, products.inventory_quantity),
                    remote_id = COALESCE(EXCLUDED.remote_id, products.remote_id),
                    updated_at = now()"#,
            );
            let result = qb.build().execute(&self.pool).await?;
            written += result.rows_affected();
        }
        Ok(written)
    }

    async fn read_all(&self) -> Result<Vec<ProductVariant>, SyncError> {
        let rows = sqlx::query(
            "SELECT sku, title, image_url, price, compare_at_price, msrp, description, inventory_quantity, remote_id \
             FROM products ORDER BY sku",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| Self::row_to_record(row).map_err(SyncError::from))
            .collect()
    }
}

//! Product catalog backed by `storefront.products`.

use async_trait::async_trait;
use partcart_core::{Price, ProductId};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use crate::error::StoreError;
use crate::store::{CatalogProduct, ProductCatalog};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    brand: String,
    part_number: String,
    price: Decimal,
    image_url: Option<String>,
    in_stock: bool,
}

impl TryFrom<ProductRow> for CatalogProduct {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            StoreError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;
        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            brand: row.brand,
            part_number: row.part_number,
            price,
            image: row.image_url,
            in_stock: row.in_stock,
        })
    }
}

/// Catalog lookups against `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    /// Create a new catalog over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn get_by_id(&self, product_id: &ProductId) -> Result<Option<CatalogProduct>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, brand, part_number, price, image_url, in_stock
            FROM storefront.products
            WHERE id = $1
            ",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CatalogProduct::try_from).transpose()
    }
}

//! Remote cart rows backed by `storefront.cart_items`.

use async_trait::async_trait;
use partcart_core::{Price, ProductId, UserId};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::store::{CartItemRecord, CatalogProduct, RemoteCartRow, RemoteCartStore};

/// A cart row left-joined with its product.
#[derive(sqlx::FromRow)]
struct JoinedRow {
    product_id: String,
    quantity: i32,
    name: Option<String>,
    brand: Option<String>,
    part_number: Option<String>,
    price: Option<Decimal>,
    image_url: Option<String>,
    in_stock: Option<bool>,
}

impl TryFrom<JoinedRow> for RemoteCartRow {
    type Error = StoreError;

    fn try_from(row: JoinedRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            StoreError::DataCorruption(format!(
                "negative quantity {} for product {}",
                row.quantity, row.product_id
            ))
        })?;

        let product = match (row.name, row.price) {
            (Some(name), Some(price)) => Some(CatalogProduct {
                id: ProductId::new(row.product_id.clone()),
                name,
                brand: row.brand.unwrap_or_default(),
                part_number: row.part_number.unwrap_or_default(),
                price: Price::new(price).map_err(|e| {
                    StoreError::DataCorruption(format!(
                        "invalid price for product {}: {e}",
                        row.product_id
                    ))
                })?,
                image: row.image_url,
                in_stock: row.in_stock.unwrap_or(false),
            }),
            _ => None,
        };

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            quantity,
            product,
        })
    }
}

/// Remote cart store over `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Create a new store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RemoteCartStore for PgCartStore {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<RemoteCartRow>, StoreError> {
        let rows = sqlx::query_as::<_, JoinedRow>(
            r"
            SELECT ci.product_id, ci.quantity,
                   p.name, p.brand, p.part_number, p.price, p.image_url, p.in_stock
            FROM storefront.cart_items ci
            LEFT JOIN storefront.products p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at, ci.product_id
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(rows = rows.len(), "Fetched remote cart rows");
        rows.into_iter().map(RemoteCartRow::try_from).collect()
    }

    #[instrument(skip(self), fields(user_id = %record.user_id, product_id = %record.product_id))]
    async fn upsert(&self, record: &CartItemRecord) -> Result<(), StoreError> {
        let quantity = i32::try_from(record.quantity).map_err(|_| {
            StoreError::DataCorruption(format!("quantity {} out of range", record.quantity))
        })?;

        sqlx::query(
            r"
            INSERT INTO storefront.cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = now()
            ",
        )
        .bind(&record.user_id)
        .bind(&record.product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn delete_by_user(&self, user_id: &UserId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM storefront.cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        debug!(deleted = result.rows_affected(), "Cleared remote cart");
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    async fn delete_one(&self, user_id: &UserId, product_id: &ProductId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM storefront.cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn joined(quantity: i32, name: Option<&str>, price: Option<Decimal>) -> JoinedRow {
        JoinedRow {
            product_id: "P1".to_string(),
            quantity,
            name: name.map(str::to_string),
            brand: None,
            part_number: Some("PN-1".to_string()),
            price,
            image_url: None,
            in_stock: Some(true),
        }
    }

    #[test]
    fn test_joined_row_with_product() {
        let row = RemoteCartRow::try_from(joined(2, Some("Strut"), Some(Decimal::new(1500, 2))))
            .unwrap();
        assert_eq!(row.quantity, 2);
        let product = row.product.unwrap();
        assert_eq!(product.name, "Strut");
        assert_eq!(product.brand, "");
        assert_eq!(product.part_number, "PN-1");
    }

    #[test]
    fn test_joined_row_without_product() {
        let row = RemoteCartRow::try_from(joined(1, None, None)).unwrap();
        assert!(row.product.is_none());
    }

    #[test]
    fn test_joined_row_negative_quantity_is_corruption() {
        let result = RemoteCartRow::try_from(joined(-1, None, None));
        assert!(matches!(result, Err(StoreError::DataCorruption(_))));
    }

    #[test]
    fn test_largest_cart_quantity_fits_column() {
        assert!(i32::try_from(partcart_core::MAX_QUANTITY).is_ok());
        let row = RemoteCartRow::try_from(joined(i32::MAX, None, None)).unwrap();
        assert_eq!(row.quantity, partcart_core::MAX_QUANTITY);
    }
}

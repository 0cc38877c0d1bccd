//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/partcart partcart migrate
//! ```
//!
//! Migrations live in `crates/sync/migrations/` and create the
//! `storefront.products` and `storefront.cart_items` tables.

use partcart_sync::db;
use tracing::info;

use crate::config::CliConfig;
use crate::error::CliError;

/// Run the cart schema migrations.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing, the connection fails, or a
/// migration fails.
pub async fn run(config: &CliConfig) -> Result<(), CliError> {
    let database_url = config.require_database_url()?;

    info!("Connecting to database...");
    let pool = db::create_pool(database_url).await?;

    info!("Running cart migrations...");
    db::migrate(&pool).await?;

    info!("Cart migrations complete!");
    Ok(())
}

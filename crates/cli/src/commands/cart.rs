//! Cart commands against the configured stores.
//!
//! Anonymous carts live in `PARTCART_DATA_DIR`. Passing `--user` switches to the
//! signed-in cart for that user in `PostgreSQL`, which requires `DATABASE_URL`.
//!
//! Every command runs a short-lived engine: it loads the cart, applies the
//! mutation and shuts down, which flushes the pending write.

use std::sync::Arc;

use partcart_core::{CartLineInput, CartState, Identity, Price, ProductId};
use partcart_sync::db::{self, PgCartStore, PgProductCatalog};
use partcart_sync::store::{
    FileLocalStore, LocalCartStore, MemoryCatalog, MemoryRemoteStore, ProductCatalog,
    RemoteCartStore,
};
use partcart_sync::{
    CartEngine, Collaborators, ConfigError, IdentitySource, TracingNotifier,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::CliConfig;
use crate::error::CliError;

/// Product detail supplied on the command line.
#[derive(Debug, Default, Clone)]
pub struct ManualProduct {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub brand: Option<String>,
    pub part_number: Option<String>,
    pub image: Option<String>,
}

/// A running engine for one command.
struct Session {
    // Held so the engine keeps a live identity subscription.
    _identity: IdentitySource,
    identity: Identity,
    catalog: Arc<dyn ProductCatalog>,
    engine: CartEngine,
}

impl Session {
    async fn open(config: &CliConfig, user: Option<&str>) -> Result<Self, CliError> {
        let identity = user.map_or(Identity::Anonymous, Identity::user);
        let local: Arc<dyn LocalCartStore> =
            Arc::new(FileLocalStore::open(config.data_dir.clone())?);

        let (remote, catalog): (Arc<dyn RemoteCartStore>, Arc<dyn ProductCatalog>) =
            match &config.database_url {
                Some(url) => {
                    let pool = db::create_pool(url).await?;
                    (
                        Arc::new(PgCartStore::new(pool.clone())),
                        Arc::new(PgProductCatalog::new(pool)),
                    )
                }
                None if !identity.is_anonymous() => {
                    return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()).into());
                }
                None => {
                    debug!("DATABASE_URL not set; using an empty in-memory catalog");
                    (
                        Arc::new(MemoryRemoteStore::new()),
                        Arc::new(MemoryCatalog::default()),
                    )
                }
            };

        let source = IdentitySource::new(identity.clone());
        let engine = CartEngine::start(
            config.sync.clone(),
            Collaborators {
                local,
                remote,
                catalog: Arc::clone(&catalog),
                notifier: Arc::new(TracingNotifier),
            },
            source.subscribe(),
        );
        engine.wait_until_ready(&identity).await?;

        Ok(Self {
            _identity: source,
            identity,
            catalog,
            engine,
        })
    }

    async fn finish(self) -> CartState {
        let state = self.engine.state();
        self.engine.shutdown().await;
        print_cart(&self.identity, &state);
        state
    }
}

/// Print the current cart.
///
/// # Errors
///
/// Returns an error if the stores cannot be opened or the cart cannot be loaded.
pub async fn show(config: &CliConfig, user: Option<&str>) -> Result<(), CliError> {
    Session::open(config, user).await?.finish().await;
    Ok(())
}

/// Add `quantity` units of a product.
///
/// Product detail comes from `manual` when both a name and a price are given,
/// otherwise from the catalog.
///
/// # Errors
///
/// Returns `CliError::UnknownProduct` if the product cannot be resolved, or a
/// cart error if the quantity would overflow.
pub async fn add(
    config: &CliConfig,
    user: Option<&str>,
    product_id: &str,
    quantity: u32,
    manual: ManualProduct,
) -> Result<(), CliError> {
    let session = Session::open(config, user).await?;
    let input = resolve_product(session.catalog.as_ref(), product_id, manual).await?;

    for _ in 0..quantity {
        session.engine.add(input.clone())?;
    }
    info!(product_id, quantity, "Added to cart");
    session.finish().await;
    Ok(())
}

/// Remove a product's line.
///
/// # Errors
///
/// Returns an error if the stores cannot be opened.
pub async fn remove(config: &CliConfig, user: Option<&str>, product_id: &str) -> Result<(), CliError> {
    let session = Session::open(config, user).await?;
    session.engine.remove(product_id)?;
    session.finish().await;
    Ok(())
}

/// Set a product's quantity; zero removes it.
///
/// # Errors
///
/// Returns a cart error for negative or out-of-range quantities.
pub async fn set(
    config: &CliConfig,
    user: Option<&str>,
    product_id: &str,
    quantity: i64,
) -> Result<(), CliError> {
    let session = Session::open(config, user).await?;
    session.engine.set_quantity(product_id, quantity)?;
    session.finish().await;
    Ok(())
}

/// Empty the cart. With `checkout`, the stored cart is cleared immediately.
///
/// # Errors
///
/// Returns an error if the stored cart cannot be cleared.
pub async fn clear(config: &CliConfig, user: Option<&str>, checkout: bool) -> Result<(), CliError> {
    let session = Session::open(config, user).await?;
    if checkout {
        session.engine.checkout_clear().await?;
        info!(identity = %session.identity, "Cleared cart for checkout");
    } else {
        session.engine.clear()?;
    }
    session.finish().await;
    Ok(())
}

async fn resolve_product(
    catalog: &dyn ProductCatalog,
    product_id: &str,
    manual: ManualProduct,
) -> Result<CartLineInput, CliError> {
    if let (Some(name), Some(price)) = (manual.name, manual.price) {
        let mut input = CartLineInput::new(product_id, name, Price::new(price)?);
        input.brand = manual.brand.unwrap_or_default();
        input.part_number = manual.part_number.unwrap_or_default();
        if let Some(image) = manual.image {
            input.image = image;
        }
        return Ok(input);
    }

    catalog
        .get_by_id(&ProductId::new(product_id))
        .await?
        .map(|product| product.to_line_input())
        .ok_or_else(|| CliError::UnknownProduct(product_id.to_string()))
}

/// Render a cart as a table.
#[allow(clippy::print_stdout)]
pub fn print_cart(identity: &Identity, state: &CartState) {
    println!("Cart ({identity})");
    if state.is_empty() {
        println!("  (empty)");
        return;
    }
    for line in state.lines() {
        let total = format!("${:.2}", line.line_total());
        let stock = if line.in_stock() { "" } else { "  (out of stock)" };
        println!(
            "  {:<12} {:<30} {:>4} x {:>10} = {:>10}{stock}",
            line.product_id(),
            line.name(),
            line.quantity,
            line.unit_price().display(),
            total,
        );
    }
    println!(
        "  {} item(s), subtotal {}",
        state.item_count(),
        state.subtotal_price().display()
    );
}

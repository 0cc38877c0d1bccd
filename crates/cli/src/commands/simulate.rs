//! In-memory walkthrough of an anonymous cart followed by a sign-in.
//!
//! Uses in-process stores, so it needs no database and touches no files. The
//! engine settings from the environment still apply, which makes this a quick
//! way to see the effect of the debounce windows and write strategy.

use std::sync::Arc;
use std::time::Duration;

use partcart_core::{Identity, Price, PriceError, ProductId, UserId};
use partcart_sync::store::{CatalogProduct, MemoryCatalog, MemoryLocalStore, MemoryRemoteStore};
use partcart_sync::{CartEngine, Collaborators, IdentitySource, SyncConfig, TracingNotifier};
use tracing::info;

use super::cart::print_cart;
use crate::error::CliError;

const SETTLE_MARGIN: Duration = Duration::from_millis(100);
const DEMO_USER: &str = "demo-user";

fn demo_catalog() -> Result<[CatalogProduct; 2], PriceError> {
    Ok([
        CatalogProduct {
            id: ProductId::new("BP-100"),
            name: "Ceramic brake pads".to_string(),
            brand: "Stopwell".to_string(),
            part_number: "SW-BP-100".to_string(),
            price: Price::from_cents(1000)?,
            image: None,
            in_stock: true,
        },
        CatalogProduct {
            id: ProductId::new("OF-220"),
            name: "Oil filter".to_string(),
            brand: "Flowmax".to_string(),
            part_number: "FM-OF-220".to_string(),
            price: Price::from_cents(1500)?,
            image: None,
            in_stock: true,
        },
    ])
}

/// Run the walkthrough.
///
/// # Errors
///
/// Returns an error if an action is rejected or the engine stops unexpectedly.
#[allow(clippy::print_stdout)]
pub async fn run(config: SyncConfig) -> Result<(), CliError> {
    let [brake_pads, oil_filter] = demo_catalog()?;
    let local = Arc::new(MemoryLocalStore::new());
    let remote = Arc::new(MemoryRemoteStore::new());
    let catalog = Arc::new(MemoryCatalog::new([brake_pads.clone(), oil_filter.clone()]));
    let identity = IdentitySource::anonymous();
    let settle = config.anonymous_debounce.max(config.authenticated_debounce) + SETTLE_MARGIN;
    let storage_key = config.local_storage_key.clone();

    let engine = CartEngine::start(
        config,
        Collaborators {
            local: local.clone(),
            remote: remote.clone(),
            catalog,
            notifier: Arc::new(TracingNotifier),
        },
        identity.subscribe(),
    );
    engine.wait_until_ready(&Identity::Anonymous).await?;

    println!("== Anonymous session: adding two brake pads");
    engine.add(brake_pads.to_line_input())?;
    engine.add(brake_pads.to_line_input())?;
    print_cart(&Identity::Anonymous, &engine.state());

    tokio::time::sleep(settle).await;
    println!(
        "   local store `{storage_key}`: {}",
        local.value(&storage_key).unwrap_or_default()
    );

    let user = UserId::new(DEMO_USER);
    println!("\n== Signing in as {user}");
    identity.sign_in(user.clone());
    engine
        .wait_until_ready(&Identity::Authenticated(user.clone()))
        .await?;
    print_cart(&Identity::Authenticated(user.clone()), &engine.state());

    println!("\n== Adding an oil filter");
    engine.add(oil_filter.to_line_input())?;
    tokio::time::sleep(settle).await;
    println!("   remote rows: {:?}", remote.rows(&user));

    println!("\n== Checking out");
    engine.checkout_clear().await?;
    println!("   remote rows: {:?}", remote.rows(&user));

    info!(remote_writes = remote.journal().len(), local_writes = local.journal().len(), "Simulation finished");
    engine.shutdown().await;
    Ok(())
}

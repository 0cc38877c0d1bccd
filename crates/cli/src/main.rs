//! Partcart CLI - Cart inspection, sync simulation and database migrations.
//!
//! # Usage
//!
//! ```bash
//! # Show the anonymous cart stored in PARTCART_DATA_DIR
//! partcart show
//!
//! # Add a product by hand to the anonymous cart
//! partcart add BP-100 --name "Ceramic brake pads" --price 10.00
//!
//! # Work on a signed-in cart (requires DATABASE_URL)
//! partcart --user user-1 add BP-100 --quantity 2
//! partcart --user user-1 set BP-100 5
//! partcart --user user-1 clear --checkout
//!
//! # Walk through an anonymous cart and a sign-in using in-memory stores
//! partcart simulate
//!
//! # Run the cart schema migrations
//! partcart migrate
//! ```
//!
//! # Commands
//!
//! - `show` - Print the cart
//! - `add` / `remove` / `set` / `clear` - Mutate the cart and persist it
//! - `simulate` - In-memory sign-in walkthrough
//! - `migrate` - Run database migrations

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;

use commands::cart::ManualProduct;
use config::CliConfig;
use error::CliError;

#[derive(Parser)]
#[command(name = "partcart")]
#[command(author, version, about = "Partcart cart tools")]
struct Cli {
    /// Operate on this user's signed-in cart instead of the anonymous one
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Product name (with --price, skips the catalog lookup)
        #[arg(long)]
        name: Option<String>,

        /// Unit price, e.g. 19.99
        #[arg(long)]
        price: Option<Decimal>,

        /// Brand
        #[arg(long)]
        brand: Option<String>,

        /// Manufacturer part number
        #[arg(long)]
        part_number: Option<String>,

        /// Image URL
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a product from the cart
    Remove {
        /// Product ID
        product_id: String,
    },
    /// Set a product's quantity (0 removes it)
    Set {
        /// Product ID
        product_id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear {
        /// Clear the stored cart immediately, as after a completed checkout
        #[arg(long)]
        checkout: bool,
    },
    /// Walk through an anonymous cart and a sign-in with in-memory stores
    Simulate,
    /// Run database migrations
    Migrate,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CliConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Map tracing levels to Sentry events or breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "partcart=info,partcart_sync=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: CliConfig) -> Result<(), CliError> {
    let user = cli.user.as_deref();
    match cli.command {
        Commands::Show => commands::cart::show(&config, user).await?,
        Commands::Add {
            product_id,
            quantity,
            name,
            price,
            brand,
            part_number,
            image,
        } => {
            let manual = ManualProduct {
                name,
                price,
                brand,
                part_number,
                image,
            };
            commands::cart::add(&config, user, &product_id, quantity, manual).await?;
        }
        Commands::Remove { product_id } => {
            commands::cart::remove(&config, user, &product_id).await?;
        }
        Commands::Set {
            product_id,
            quantity,
        } => commands::cart::set(&config, user, &product_id, quantity).await?,
        Commands::Clear { checkout } => commands::cart::clear(&config, user, checkout).await?,
        Commands::Simulate => commands::simulate::run(config.sync).await?,
        Commands::Migrate => commands::migrate::run(&config).await?,
    }
    Ok(())
}

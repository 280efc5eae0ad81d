use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use storefront::{
    EnglishMessages, InMemoryBackend, MemoryPreferenceStore, RemoteError, RetryPolicy, StoreConfig,
    Storefront,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront client core: resilient backend calls and optimistic state")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk through optimistic cart updates against an in-memory backend
    Demo,
    /// Load one enriched catalog page from the configured backend
    Products {
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Print the configuration read from STOREFRONT_* variables
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Demo => demo().await,
        Command::Products { page } => products(page).await,
        Command::Config => {
            let config = StoreConfig::from_env().context("Failed to read configuration")?;
            println!("{}", config.describe());
            Ok(())
        }
    }
}

async fn products(page: usize) -> Result<()> {
    let config = StoreConfig::from_env().context("Failed to read configuration")?;
    let app = Storefront::connect(config).await?;
    app.bootstrap().await?;

    let catalog = app.catalog_view_model();
    catalog.load_page(page).await?;
    for item in catalog.state().products {
        println!(
            "{:<12} {:<32} {:>10} rating={} reviews={}",
            item.product.id,
            item.product.name,
            item.final_price().to_string(),
            item.rating.map_or_else(|| "-".to_string(), |r| format!("{r:.1}")),
            item.review_count
        );
    }
    Ok(())
}

async fn demo() -> Result<()> {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .seed(
            "products",
            [json!({"id": "p-1", "name": "Canvas Tote", "price": 2400})],
        )
        .await;

    let config = StoreConfig::new("http://localhost", "demo")
        .retry(RetryPolicy::new(2, Duration::from_millis(50)));
    let app = Storefront::new(
        config,
        backend.clone(),
        Arc::new(EnglishMessages),
        Arc::new(MemoryPreferenceStore::new()),
    );
    app.bootstrap().await?;
    app.auth().sign_up("demo@example.com", "demo-pass").await?;

    let product = app.products().by_id("p-1").await?;
    let cart = app.cart_view_model();
    let mut errors = cart.errors().subscribe();
    cart.add(&product, 1).await?;
    let item_id = cart.state().items[0].id.clone();
    println!("cart loaded: quantity={}", cart.state().items[0].quantity);

    cart.increment(&item_id).await?;
    println!("increment confirmed: quantity={}", cart.state().items[0].quantity);

    backend.fail_next("cart_items", RemoteError::Network("connection reset".into()), 3);
    if cart.increment(&item_id).await.is_err() {
        println!(
            "increment rolled back: quantity={} message=\"{}\"",
            cart.state().items[0].quantity,
            errors.recv().await.unwrap_or_default()
        );
    }
    println!("backend calls against cart_items: {}", backend.calls("cart_items"));
    Ok(())
}

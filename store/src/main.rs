//! Botica - dispensary inventory store.
//!
//! Opens (or creates) the SQLite database, applies migrations, and prints
//! the dashboard counters. The store crate is a library first; this binary
//! is the maintenance entry point.

use botica_store::{config::Config, db, reports};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botica=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Opening database at {}", config.database_url);
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    let stats = reports::dashboard_stats(&pool).await?;
    tracing::info!(
        medications = stats.total_medications,
        expiring_soon = stats.expiring_soon,
        expired = stats.expired,
        out_of_stock = stats.out_of_stock,
        below_minimum = stats.below_minimum,
        inventory_value = stats.inventory_value,
        "Inventory ready"
    );

    Ok(())
}

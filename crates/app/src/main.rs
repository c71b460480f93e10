//! Stock report entry point.

use app::config::Config;
use app::error::AppError;
use app::report::stock_report;
use chrono::Utc;
use stock_store::PostgresStockStore;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env()?;
    app::init_tracing(&config)?;

    // 2. Open the store
    let store = PostgresStockStore::connect(&config.database_url, config.max_connections).await?;
    store.run_migrations().await?;

    // 3. Value every ingredient
    let at = config.report_as_of.unwrap_or_else(Utc::now);
    tracing::info!(%at, strategy = %config.valuation, "Building stock report");
    let result = stock_report(&store, config.valuation, at).await;

    store.close().await;

    let entries = result?;
    for entry in &entries {
        entry.log(config.valuation);
    }
    tracing::info!(
        ingredients = entries.len(),
        disagreements = entries.iter().filter(|e| !e.agrees()).count(),
        "Stock report done"
    );

    Ok(())
}

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pool_harvester::AppState;
use pool_harvester::config::HarvesterConfig;
use pool_harvester::error::Result;
use pool_harvester::jobs::pool_stats_ingest;
use pool_harvester::services::{
    coingecko::CoinGeckoService, http, notifier::LogNotifier, pool_status::PoolStatusService,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pool_harvester=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Ingestion failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = HarvesterConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let client = http::build_client(config.http_timeout)?;
    let coingecko = CoinGeckoService::new(
        client.clone(),
        config.coingecko_api_key.clone(),
        config.coingecko_base_url.clone(),
    );
    let pool_status = PoolStatusService::new(client, config.ingest.provider.status_url.clone());

    let state = AppState {
        db,
        coingecko,
        pool_status,
        notifier: Arc::new(LogNotifier),
        config: Arc::new(config),
    };

    match state.config.ingest_interval {
        Some(every) => {
            tracing::info!(interval_secs = every.as_secs(), "Running on a schedule");
            pool_stats_ingest::run_periodically(state, every).await;
            Ok(())
        }
        None => {
            let summary = pool_stats_ingest::run_and_record(&state).await?;
            tracing::info!(%summary, "Operations complete");
            Ok(())
        }
    }
}

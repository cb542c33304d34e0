//! Pool statistics ingestion job
//!
//! A run fetches the coin catalog, the reference price and the pool readings,
//! then writes everything in one transaction:
//! 1. Sync the coin catalog and store the reference coin's price
//! 2. Resolve provider, algorithm and pool for every reading and append its stats
//! 3. Check for offline miners
//!
//! Any fatal error drops the transaction, which rolls the whole run back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::fmt;
use std::time::Duration;
use tokio::time::interval;

use crate::config::IngestSettings;
use crate::error::{IngestError, Result};
use crate::services::coingecko::CoinListEntry;
use crate::services::fact_writer::{self, FactOutcome};
use crate::services::normalizer::CoercionPolicy;
use crate::services::notifier::Notifier;
use crate::services::pool_status::{invalid_port, PoolReading};
use crate::services::resolver::{PoolDefaults, Resolver};
use crate::services::staleness::{self, MonitorReport};
use crate::services::sync_status::{self, jobs};
use crate::AppState;

/// Everything fetched from the external sources for one run
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub catalog: Vec<CoinListEntry>,
    pub reference_price: Decimal,
    pub readings: Vec<PoolReading>,
    /// Readings the pool reported that were dropped while decoding
    pub dropped_readings: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub coins_added: usize,
    pub coin_price_id: i32,
    pub readings: usize,
    pub stats_stored: usize,
    pub stats_skipped: usize,
    pub miners: MonitorReport,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} readings: {} stored, {} skipped; {} new coins; {} offline notices",
            self.readings,
            self.stats_stored,
            self.stats_skipped,
            self.coins_added,
            self.miners.notified
        )
    }
}

/// Run the job every `every`. Failed runs are logged and retried on the next tick.
pub async fn run_periodically(state: AppState, every: Duration) {
    let mut ticker = interval(every);

    loop {
        ticker.tick().await;
        tracing::info!("Starting scheduled pool statistics ingestion");

        match run_and_record(&state).await {
            Ok(summary) => tracing::info!(%summary, "Pool statistics ingestion complete"),
            Err(e) => tracing::error!(error = %e, "Pool statistics ingestion failed"),
        }
    }
}

/// One run, with its outcome written to `sync_status`
pub async fn run_and_record(state: &AppState) -> Result<RunSummary> {
    let result = run_once(state).await;

    let recorded = match &result {
        Ok(summary) => {
            sync_status::record_success(&state.db, jobs::POOL_STATS_INGEST, &summary.to_string())
                .await
        }
        Err(e) => {
            sync_status::record_failure(&state.db, jobs::POOL_STATS_INGEST, &e.to_string()).await
        }
    };
    if let Err(e) = recorded {
        tracing::warn!(error = %e, "Failed to record sync status");
    }

    result
}

pub async fn run_once(state: &AppState) -> Result<RunSummary> {
    let snapshot = fetch_snapshot(state).await?;

    store_snapshot(
        &state.db,
        &snapshot,
        &state.config.ingest,
        state.notifier.as_ref(),
        Utc::now(),
    )
    .await
}

/// Price data first: statistics are meaningless without it
pub async fn fetch_snapshot(state: &AppState) -> Result<MarketSnapshot> {
    let settings = &state.config.ingest;

    tracing::info!("Retrieving coins and reference price...");
    let catalog = state.coingecko.fetch_coin_list().await?;
    let reference_price = state
        .coingecko
        .fetch_reference_price(&settings.reference_coin_id, &settings.reference_currency)
        .await?;

    let status = state
        .pool_status
        .fetch_readings(settings.coercion_policy)
        .await?;

    Ok(MarketSnapshot {
        catalog,
        reference_price,
        readings: status.readings,
        dropped_readings: status.dropped,
    })
}

/// Write a snapshot in a single transaction
pub async fn store_snapshot(
    db: &DatabaseConnection,
    snapshot: &MarketSnapshot,
    settings: &IngestSettings,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> Result<RunSummary> {
    let txn = db.begin().await?;
    let mut resolver = Resolver::new(&txn);

    let coins_added = resolver.sync_coin_catalog(&snapshot.catalog, now).await?;
    let reference_coin = resolve_reference_coin(&mut resolver, snapshot, settings, now).await?;
    let coin_price_id =
        fact_writer::write_coin_price(&txn, reference_coin, snapshot.reference_price, now).await?;

    tracing::info!(
        coin = %settings.reference_coin_id,
        price = %snapshot.reference_price,
        "Coins/reference price stored..."
    );

    tracing::info!("Storing statistics...");
    let provider = resolver.resolve_provider(&settings.provider).await?;

    let mut summary = RunSummary {
        coins_added,
        coin_price_id,
        readings: snapshot.readings.len() + snapshot.dropped_readings,
        stats_skipped: snapshot.dropped_readings,
        ..Default::default()
    };

    for reading in &snapshot.readings {
        let port = match reading.port_number() {
            Some(port) => port,
            None if settings.coercion_policy == CoercionPolicy::SkipReading => {
                tracing::warn!(
                    pool = %reading.name,
                    port = reading.port,
                    "Skipping pool statistics, invalid port"
                );
                summary.stats_skipped += 1;
                continue;
            }
            None => return Err(invalid_port(reading)),
        };

        let algorithm_id = resolver.resolve_algorithm(&reading.name).await?;
        let defaults = PoolDefaults {
            name: reading.name.clone(),
            url: settings.provider.pool_url(&reading.name),
            port,
            mh_factor: reading.mbtc_mh_factor,
        };
        let pool = resolver.resolve_pool(provider.id, algorithm_id, defaults).await?;

        match fact_writer::write_pool_stats(&txn, &pool, reading, coin_price_id, now).await? {
            FactOutcome::Stored(_) => summary.stats_stored += 1,
            FactOutcome::Skipped(_) => summary.stats_skipped += 1,
        }
    }

    summary.miners =
        staleness::check_offline_miners(&txn, notifier, settings.staleness_window, now).await;

    drop(resolver);
    txn.commit().await?;

    tracing::info!(%summary, "Statistics stored");

    Ok(summary)
}

async fn resolve_reference_coin(
    resolver: &mut Resolver<'_>,
    snapshot: &MarketSnapshot,
    settings: &IngestSettings,
    now: DateTime<Utc>,
) -> Result<i32> {
    let coin_id = &settings.reference_coin_id;

    match snapshot.catalog.iter().find(|entry| &entry.id == coin_id) {
        Some(entry) => resolver.resolve_coin(entry, now).await,
        None => resolver.find_coin_id(coin_id).await?.ok_or_else(|| {
            IngestError::malformed(
                "CoinGecko",
                format!("reference coin {} is not in the coin catalog", coin_id),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_summary_display() {
        let summary = RunSummary {
            coins_added: 2,
            coin_price_id: 7,
            readings: 5,
            stats_stored: 4,
            stats_skipped: 1,
            miners: MonitorReport {
                stale: 1,
                notified: 1,
                failed: 0,
            },
        };

        assert_eq!(
            summary.to_string(),
            "5 readings: 4 stored, 1 skipped; 2 new coins; 1 offline notices"
        );
    }
}

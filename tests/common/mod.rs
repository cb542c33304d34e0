#![allow(dead_code)]

use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use pool_harvester::error::{IngestError, Result};
use pool_harvester::services::coingecko::CoinListEntry;
use pool_harvester::services::notifier::Notifier;
use pool_harvester::services::pool_status::PoolReading;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::sync::Mutex;

/// Set up an in-memory test database with the full schema.
/// A single connection keeps every query on the same in-memory database.
pub async fn setup_test_db() -> std::result::Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn coin(id: &str, symbol: &str, name: &str) -> CoinListEntry {
    CoinListEntry {
        id: id.to_string(),
        symbol: symbol.to_string(),
        name: name.to_string(),
    }
}

pub fn catalog() -> Vec<CoinListEntry> {
    vec![
        coin("bitcoin", "btc", "Bitcoin"),
        coin("litecoin", "ltc", "Litecoin"),
        coin("dogecoin", "doge", "Dogecoin"),
    ]
}

pub fn reading(name: &str, port: f64, hashrate_shared: f64) -> PoolReading {
    PoolReading {
        name: name.to_string(),
        port,
        hashrate_shared,
        workers_shared: 10.0,
        estimate_current: 0.05,
        actual_last24h_shared: 0.048,
        mbtc_mh_factor: 0.001,
        ..Default::default()
    }
}

/// Keeps every notice it is asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(subject, _)| subject.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// A channel that is always down
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _subject: &str, _body: &str) -> Result<()> {
        Err(IngestError::Notification("SMTP server unreachable".to_string()))
    }
}

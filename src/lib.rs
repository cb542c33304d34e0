// src/lib.rs

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use config::HarvesterConfig;
use services::{
    coingecko::CoinGeckoService, notifier::Notifier, pool_status::PoolStatusService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub coingecko: CoinGeckoService,
    pub pool_status: PoolStatusService,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<HarvesterConfig>,
}

pub mod entities {
    pub mod prelude;
    pub mod algorithm;
    pub mod coin;
    pub mod coin_price;
    pub mod miner;
    pub mod pool;
    pub mod pool_stats;
    pub mod provider;
    pub mod sync_status;
}

pub mod services {
    pub mod coingecko;
    pub mod fact_writer;
    pub mod http;
    pub mod normalizer;
    pub mod notifier;
    pub mod pool_status;
    pub mod resolver;
    pub mod staleness;
    pub mod sync_status;
}

pub mod config;
pub mod error;
pub mod jobs;

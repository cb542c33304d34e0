pub use super::algorithm::Entity as Algorithm;
pub use super::coin::Entity as Coin;
pub use super::coin_price::Entity as CoinPrice;
pub use super::miner::Entity as Miner;
pub use super::pool::Entity as Pool;
pub use super::pool_stats::Entity as PoolStats;
pub use super::provider::Entity as Provider;
pub use super::sync_status::Entity as SyncStatus;

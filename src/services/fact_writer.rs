//! Appends immutable fact rows: the run's coin price and one statistics row
//! per pool reading.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set, TransactionTrait};
use std::fmt;

use crate::entities::{coin_price, pool, pool_stats};
use crate::error::{is_range_overflow, Result};
use crate::services::pool_status::PoolReading;

/// Why a statistics row was not stored
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The reported value does not fit the column it is stored in
    OutOfRange { field: &'static str, value: f64 },
    /// The database rejected the row with a numeric overflow
    StorageOverflow(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::OutOfRange { field, value } => {
                write!(f, "{} value {} is out of range", field, value)
            }
            SkipReason::StorageOverflow(msg) => write!(f, "numeric overflow: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FactOutcome {
    Stored(i32),
    Skipped(SkipReason),
}

pub async fn write_coin_price(
    txn: &DatabaseTransaction,
    coin_id: i32,
    price: Decimal,
    now: DateTime<Utc>,
) -> Result<i32> {
    let row = coin_price::ActiveModel {
        coin_id: Set(coin_id),
        instant: Set(now.into()),
        price: Set(price),
        ..Default::default()
    };

    let stored = row.insert(txn).await?;
    Ok(stored.id)
}

/// Store the shared-mining statistics of `reading` for `pool`.
///
/// Upstream occasionally reports absurd hashrates. Values that do not fit the
/// column, or that the database rejects as a numeric overflow, skip the row
/// with a warning; every other failure is returned.
pub async fn write_pool_stats(
    txn: &DatabaseTransaction,
    pool: &pool::Model,
    reading: &PoolReading,
    coin_price_id: i32,
    now: DateTime<Utc>,
) -> Result<FactOutcome> {
    let current_hashrate = match to_hashrate(reading.hashrate_shared) {
        Some(value) => value,
        None => {
            return Ok(skip(
                pool,
                SkipReason::OutOfRange {
                    field: "hashrate_shared",
                    value: reading.hashrate_shared,
                },
            ));
        }
    };
    let workers = match to_workers(reading.workers_shared) {
        Some(value) => value,
        None => {
            return Ok(skip(
                pool,
                SkipReason::OutOfRange {
                    field: "workers_shared",
                    value: reading.workers_shared,
                },
            ));
        }
    };

    let row = pool_stats::ActiveModel {
        pool_id: Set(pool.id),
        instant: Set(now.into()),
        current_hashrate: Set(current_hashrate),
        workers: Set(workers),
        profit_estimate: Set(reading.estimate_current),
        profit_actual: Set(reading.actual_last24h_shared),
        coin_price_id: Set(coin_price_id),
        ..Default::default()
    };

    // A rejected insert aborts a Postgres transaction, so isolate it
    let savepoint = txn.begin().await?;
    match row.insert(&savepoint).await {
        Ok(stored) => {
            savepoint.commit().await?;
            Ok(FactOutcome::Stored(stored.id))
        }
        Err(err) if is_range_overflow(&err) => {
            savepoint.rollback().await?;
            Ok(skip(pool, SkipReason::StorageOverflow(err.to_string())))
        }
        Err(err) => Err(err.into()),
    }
}

fn skip(pool: &pool::Model, reason: SkipReason) -> FactOutcome {
    tracing::warn!(
        pool = %pool.name,
        reason = %reason,
        "Skipping pool statistics due to bad data"
    );
    FactOutcome::Skipped(reason)
}

/// Hashrates are stored as BIGINT
fn to_hashrate(value: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the bound is exclusive
    if value.is_finite() && value >= 0.0 && value < i64::MAX as f64 {
        Some(value.round() as i64)
    } else {
        None
    }
}

/// Worker counts are stored as INTEGER
fn to_workers(value: f64) -> Option<i32> {
    if value.is_finite() && value >= 0.0 && value <= i32::MAX as f64 {
        Some(value.round() as i32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashrate_range() {
        assert_eq!(to_hashrate(1_000_000.0), Some(1_000_000));
        assert_eq!(to_hashrate(0.0), Some(0));
        assert_eq!(to_hashrate(9.0e18), Some(9_000_000_000_000_000_000));
        assert_eq!(to_hashrate(1.0e20), None);
        assert_eq!(to_hashrate(i64::MAX as f64), None);
        assert_eq!(to_hashrate(-5.0), None);
        assert_eq!(to_hashrate(f64::NAN), None);
    }

    #[test]
    fn test_workers_range() {
        assert_eq!(to_workers(10.0), Some(10));
        assert_eq!(to_workers(3.0e9), None);
        assert_eq!(to_workers(-1.0), None);
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::OutOfRange {
            field: "hashrate_shared",
            value: 1.0e20,
        };
        assert_eq!(reason.to_string(), "hashrate_shared value 100000000000000000000 is out of range");
    }
}

//! Offline miner detection
//!
//! Miners update `last_check_in` themselves. A miner that has been silent for
//! longer than the staleness window gets exactly one notice; the flag is
//! cleared by the miner when it starts again.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::entities::{miner, prelude::Miner};
use crate::error::Result;
use crate::services::notifier::Notifier;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorReport {
    /// Miners past the window that had not been notified yet
    pub stale: usize,
    pub notified: usize,
    pub failed: usize,
}

/// Notify about every miner that went quiet and flag it.
///
/// Never fails: the scan runs in its own savepoint and any error is logged
/// and rolled back so the ingestion can still commit. A miner whose notice
/// could not be delivered stays unflagged and is retried on the next run.
pub async fn check_offline_miners(
    txn: &DatabaseTransaction,
    notifier: &dyn Notifier,
    window: Duration,
    now: DateTime<Utc>,
) -> MonitorReport {
    let savepoint = match txn.begin().await {
        Ok(savepoint) => savepoint,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open savepoint for miner check");
            return MonitorReport::default();
        }
    };

    match scan(&savepoint, notifier, window, now).await {
        Ok(report) => match savepoint.commit().await {
            Ok(()) => report,
            Err(e) => {
                tracing::error!(error = %e, "Failed to store offline notices");
                MonitorReport::default()
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Miner check failed, continuing without it");
            if let Err(rollback_err) = savepoint.rollback().await {
                tracing::error!(error = %rollback_err, "Failed to roll back miner check");
            }
            MonitorReport::default()
        }
    }
}

async fn scan(
    txn: &DatabaseTransaction,
    notifier: &dyn Notifier,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<MonitorReport> {
    let cutoff = now - window;

    let candidates = Miner::find()
        .filter(miner::Column::OfflineNoticeSent.eq(false))
        .all(txn)
        .await?;

    let mut report = MonitorReport::default();

    for candidate in candidates {
        if candidate.last_check_in.with_timezone(&Utc) >= cutoff {
            continue;
        }
        report.stale += 1;

        let subject = format!("Miner Offline: {}", candidate.name);
        let body = format!(
            "Miner has been offline since {}",
            candidate.last_check_in.format("%Y-%m-%d %H:%M:%S %:z")
        );

        if let Err(e) = notifier.notify(&subject, &body).await {
            tracing::warn!(miner = %candidate.name, error = %e, "Failed to send offline notice");
            report.failed += 1;
            continue;
        }

        let name = candidate.name.clone();
        let mut active: miner::ActiveModel = candidate.into();
        active.offline_notice_sent = Set(true);
        active.update(txn).await?;

        tracing::info!(miner = %name, "Offline notice sent");
        report.notified += 1;
    }

    Ok(report)
}

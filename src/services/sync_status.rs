//! Sync status service for tracking job runs
//!
//! Written on the plain connection, after the run's transaction has been
//! committed or rolled back, so failed runs leave a trace too.

use chrono::Utc;
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::sync_status::{self, Entity as SyncStatus};
use crate::error::Result;

/// Job names for tracking sync status
pub mod jobs {
    pub const POOL_STATS_INGEST: &str = "pool_stats_ingest";
}

/// Record a successful run with a short human readable summary
pub async fn record_success(db: &DatabaseConnection, job_name: &str, summary: &str) -> Result<()> {
    let now: DateTimeWithTimeZone = Utc::now().into();

    match find(db, job_name).await? {
        Some(record) => {
            let success_count = record.success_count + 1;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_success_at = Set(Some(now));
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(None);
            active_model.last_summary = Set(Some(summary.to_string()));
            active_model.success_count = Set(success_count);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(Some(now)),
                last_attempt_at: Set(Some(now)),
                last_error: Set(None),
                last_summary: Set(Some(summary.to_string())),
                success_count: Set(1),
                error_count: Set(0),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!("[{}] Recorded successful run", job_name);
    Ok(())
}

/// Record a failed run
pub async fn record_failure(db: &DatabaseConnection, job_name: &str, error: &str) -> Result<()> {
    let now: DateTimeWithTimeZone = Utc::now().into();

    match find(db, job_name).await? {
        Some(record) => {
            let error_count = record.error_count + 1;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(Some(error.to_string()));
            active_model.error_count = Set(error_count);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(None),
                last_attempt_at: Set(Some(now)),
                last_error: Set(Some(error.to_string())),
                last_summary: Set(None),
                success_count: Set(0),
                error_count: Set(1),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!("[{}] Recorded failed run: {}", job_name, error);
    Ok(())
}

async fn find(db: &DatabaseConnection, job_name: &str) -> Result<Option<sync_status::Model>> {
    Ok(SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await?)
}

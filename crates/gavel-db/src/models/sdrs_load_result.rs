//! Reference-source load bookkeeping.
//!
//! One current-state row per SDRS shard (upserted in place) plus an
//! append-only history of every load attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

/// Outcome of the most recent load for a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadStatus {
    Success,
    Fail,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Whether the load fetched everything or only changed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadType {
    Full,
    Delta,
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "FULL"),
            Self::Delta => write!(f, "DELTA"),
        }
    }
}

/// Current state of one shard. The shard key is "A".."Z" for the alphabetic
/// partitions plus "APPLICATIONS" and "MOJ_OFFENCES" for the auxiliary feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SdrsLoadResult {
    pub shard: String,
    pub status: Option<LoadStatus>,
    pub load_type: Option<LoadType>,
    pub load_date: Option<DateTime<Utc>>,
    pub last_successful_load_date: Option<DateTime<Utc>>,
    /// Set when a successful load changed offences that NOMIS has not yet
    /// been told about; cleared by delta sync after a successful push.
    pub nomis_sync_required: bool,
}

/// Append-only copy of each load attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SdrsLoadResultHistory {
    pub id: i64,
    pub shard: String,
    pub status: LoadStatus,
    pub load_type: LoadType,
    pub load_date: DateTime<Utc>,
    pub nomis_sync_required: bool,
}

impl SdrsLoadResult {
    /// Ensure a current-state row exists for every shard key given. Existing
    /// rows are left untouched.
    pub async fn seed(pool: &PgPool, shards: &[String]) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            INSERT INTO sdrs_load_results (shard, nomis_sync_required)
            SELECT unnest($1::text[]), FALSE
            ON CONFLICT (shard) DO NOTHING
            ",
        )
        .bind(shards)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find(pool: &PgPool, shard: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sdrs_load_results WHERE shard = $1")
            .bind(shard)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sdrs_load_results ORDER BY shard")
            .fetch_all(pool)
            .await
    }

    /// Shards whose last successful load changed offences still pending a
    /// NOMIS push.
    pub async fn list_nomis_sync_required(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM sdrs_load_results
            WHERE nomis_sync_required = TRUE
            ORDER BY shard
            ",
        )
        .fetch_all(pool)
        .await
    }

    /// Record a successful load: the current-state row is upserted and a
    /// history row appended.
    pub async fn record_success(
        pool: &PgPool,
        shard: &str,
        load_type: LoadType,
        at: DateTime<Utc>,
        nomis_sync_required: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            UPDATE sdrs_load_results
            SET status = $2, load_type = $3, load_date = $4,
                last_successful_load_date = $4,
                nomis_sync_required = (nomis_sync_required OR $5)
            WHERE shard = $1
            ",
        )
        .bind(shard)
        .bind(LoadStatus::Success)
        .bind(load_type)
        .bind(at)
        .bind(nomis_sync_required)
        .execute(pool)
        .await?;
        Self::append_history(pool, shard, LoadStatus::Success, load_type, at, nomis_sync_required)
            .await
    }

    /// Record a failed load. The last successful load date is left in place
    /// so the next run retries the shard.
    pub async fn record_failure(
        pool: &PgPool,
        shard: &str,
        load_type: LoadType,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            UPDATE sdrs_load_results
            SET status = $2, load_type = $3, load_date = $4
            WHERE shard = $1
            ",
        )
        .bind(shard)
        .bind(LoadStatus::Fail)
        .bind(load_type)
        .bind(at)
        .execute(pool)
        .await?;
        Self::append_history(pool, shard, LoadStatus::Fail, load_type, at, false).await
    }

    /// Clear the pending-push marker after delta sync succeeds for a shard.
    pub async fn clear_nomis_sync_required(pool: &PgPool, shard: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            UPDATE sdrs_load_results
            SET nomis_sync_required = FALSE
            WHERE shard = $1
            ",
        )
        .bind(shard)
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn append_history(
        pool: &PgPool,
        shard: &str,
        status: LoadStatus,
        load_type: LoadType,
        at: DateTime<Utc>,
        nomis_sync_required: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            INSERT INTO sdrs_load_results_history
                (shard, status, load_type, load_date, nomis_sync_required)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(shard)
        .bind(status)
        .bind(load_type)
        .bind(at)
        .bind(nomis_sync_required)
        .execute(pool)
        .await?;
        Ok(())
    }
}

//! Dirty queue of offence codes pending a NOMIS push.
//!
//! Entries are written by the SDRS synchroniser and consumed by delta sync,
//! which deletes them only after a successful push.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

/// Why the offence needs pushing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NomisSyncReason {
    /// Visible fields changed during an SDRS load.
    SdrsUpdate,
    /// The Home Office classification changed.
    HoCodeUpdate,
    /// The offence carries an end date that has not yet passed; delta sync
    /// keeps revisiting it until the date arrives and a deactivation is due.
    FutureEndDated,
}

impl fmt::Display for NomisSyncReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SdrsUpdate => write!(f, "SDRS_UPDATE"),
            Self::HoCodeUpdate => write!(f, "HO_CODE_UPDATE"),
            Self::FutureEndDated => write!(f, "FUTURE_END_DATED"),
        }
    }
}

/// One dirty-queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OffenceToSyncWithNomis {
    pub id: i64,
    pub offence_code: String,
    pub nomis_sync_reason: NomisSyncReason,
}

impl OffenceToSyncWithNomis {
    /// Enqueue a code. Duplicate (code, reason) pairs collapse to one entry.
    pub async fn enqueue(
        pool: &PgPool,
        offence_code: &str,
        reason: NomisSyncReason,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            INSERT INTO offences_to_sync_with_nomis (offence_code, nomis_sync_reason)
            VALUES ($1, $2)
            ON CONFLICT (offence_code, nomis_sync_reason) DO NOTHING
            ",
        )
        .bind(offence_code)
        .bind(reason)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM offences_to_sync_with_nomis ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// Remove consumed entries after a successful push.
    pub async fn delete_by_codes(pool: &PgPool, codes: &[String]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r"
            DELETE FROM offences_to_sync_with_nomis
            WHERE offence_code = ANY($1)
            ",
        )
        .bind(codes)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

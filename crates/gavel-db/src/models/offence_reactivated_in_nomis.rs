//! Operator-reactivated offence codes.
//!
//! When an operator reactivates an end-dated offence directly, the code is
//! recorded here. The reconciler excludes these codes from the normal diff
//! and handles them through the dedicated reactivation flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OffenceReactivatedInNomis {
    pub offence_code: String,
    pub reactivated_by_username: String,
    pub reactivated_date: DateTime<Utc>,
}

impl OffenceReactivatedInNomis {
    pub async fn record(
        pool: &PgPool,
        offence_code: &str,
        username: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO offences_reactivated_in_nomis
                (offence_code, reactivated_by_username, reactivated_date)
            VALUES ($1, $2, NOW())
            ON CONFLICT (offence_code) DO UPDATE SET
                reactivated_by_username = EXCLUDED.reactivated_by_username,
                reactivated_date = EXCLUDED.reactivated_date
            RETURNING *
            ",
        )
        .bind(offence_code)
        .bind(username)
        .fetch_one(pool)
        .await
    }

    pub async fn list_codes(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT offence_code FROM offences_reactivated_in_nomis ORDER BY offence_code")
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(code,)| code).collect())
    }

    pub async fn delete(pool: &PgPool, offence_code: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM offences_reactivated_in_nomis WHERE offence_code = $1")
            .bind(offence_code)
            .execute(pool)
            .await?;
        Ok(())
    }
}

//! Schedule hierarchy models.
//!
//! A statutory schedule (act + code) contains ordered parts, which contain
//! optional paragraphs. Offences attach to parts or paragraphs through
//! `offence_schedule_mappings`.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A statutory schedule, e.g. Schedule 15 to the Criminal Justice Act 2003.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Schedule {
    pub id: i64,
    /// The Act the schedule belongs to.
    pub act: String,
    /// Schedule code within the Act, e.g. "15".
    pub code: String,
    pub url: Option<String>,
}

/// A numbered part of a schedule. Always belongs to exactly one schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SchedulePart {
    pub id: i64,
    pub schedule_id: i64,
    pub part_number: i32,
}

/// A numbered, titled paragraph. Always belongs to exactly one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduleParagraph {
    pub id: i64,
    pub schedule_part_id: i64,
    pub paragraph_number: i32,
    pub paragraph_title: String,
}

impl Schedule {
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM schedules WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_act_and_code(
        pool: &PgPool,
        act: &str,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM schedules WHERE act = $1 AND code = $2")
            .bind(act)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM schedules ORDER BY act, code")
            .fetch_all(pool)
            .await
    }
}

impl SchedulePart {
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM schedule_parts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_schedule(
        pool: &PgPool,
        schedule_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM schedule_parts
            WHERE schedule_id = $1
            ORDER BY part_number
            ",
        )
        .bind(schedule_id)
        .fetch_all(pool)
        .await
    }
}

impl ScheduleParagraph {
    pub async fn list_by_part(pool: &PgPool, part_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM schedule_paragraphs
            WHERE schedule_part_id = $1
            ORDER BY paragraph_number
            ",
        )
        .bind(part_id)
        .fetch_all(pool)
        .await
    }
}

//! Offence-to-schedule mappings.
//!
//! An offence may appear under multiple schedule parts; each mapping
//! optionally pins the offence to a paragraph within the part.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A single offence ↔ part/paragraph attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OffenceScheduleMapping {
    pub id: i64,
    pub offence_id: i64,
    pub schedule_part_id: i64,
    pub schedule_paragraph_id: Option<i64>,
    /// Free-text line reference within the schedule.
    pub line_reference: Option<String>,
    pub legislation_text: Option<String>,
}

/// Denormalised read model for the classification snapshot build: one row
/// per mapping, joined to the offence and the schedule hierarchy so the
/// whole graph is read in a single consistent pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MappedOffence {
    pub offence_id: i64,
    pub offence_code: String,
    pub start_date: NaiveDate,
    pub max_period_is_life: Option<bool>,
    pub act: String,
    pub schedule_code: String,
    pub part_number: i32,
    pub paragraph_number: Option<i32>,
}

impl OffenceScheduleMapping {
    pub async fn create(
        pool: &PgPool,
        offence_id: i64,
        schedule_part_id: i64,
        schedule_paragraph_id: Option<i64>,
        line_reference: Option<&str>,
        legislation_text: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO offence_schedule_mappings
                (offence_id, schedule_part_id, schedule_paragraph_id, line_reference, legislation_text)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(offence_id)
        .bind(schedule_part_id)
        .bind(schedule_paragraph_id)
        .bind(line_reference)
        .bind(legislation_text)
        .fetch_one(pool)
        .await
    }

    pub async fn list_by_part(pool: &PgPool, part_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM offence_schedule_mappings
            WHERE schedule_part_id = $1
            ORDER BY id
            ",
        )
        .bind(part_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_for_offence(
        pool: &PgPool,
        offence_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM offence_schedule_mappings
            WHERE offence_id = $1
            ORDER BY id
            ",
        )
        .bind(offence_id)
        .fetch_all(pool)
        .await
    }

    /// Remove the mappings for a set of offences under one part. Used by
    /// unlink, which always carries a parent together with its children.
    pub async fn delete_by_part_and_offences(
        pool: &PgPool,
        schedule_part_id: i64,
        offence_ids: &[i64],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r"
            DELETE FROM offence_schedule_mappings
            WHERE schedule_part_id = $1 AND offence_id = ANY($2)
            ",
        )
        .bind(schedule_part_id)
        .bind(offence_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// The whole mapping graph joined to offences and schedules, for the
    /// classification snapshot build.
    pub async fn list_mapped_offences(pool: &PgPool) -> Result<Vec<MappedOffence>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT
                o.id AS offence_id,
                o.code AS offence_code,
                o.start_date,
                o.max_period_is_life,
                s.act,
                s.code AS schedule_code,
                p.part_number,
                g.paragraph_number
            FROM offence_schedule_mappings m
            JOIN offences o ON o.id = m.offence_id
            JOIN schedule_parts p ON p.id = m.schedule_part_id
            JOIN schedules s ON s.id = p.schedule_id
            LEFT JOIN schedule_paragraphs g ON g.id = m.schedule_paragraph_id
            ORDER BY o.id
            ",
        )
        .fetch_all(pool)
        .await
    }
}

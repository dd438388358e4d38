//! Append-only audit log of changes pushed to NOMIS.
//!
//! Rows are written once per applied create/update and never touched again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

/// Kind of change pushed to NOMIS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Insert,
    Update,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
        }
    }
}

/// What kind of record the change applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NomisChangeSubject {
    Offence,
    Statute,
    HomeOfficeCode,
}

impl fmt::Display for NomisChangeSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offence => write!(f, "OFFENCE"),
            Self::Statute => write!(f, "STATUTE"),
            Self::HomeOfficeCode => write!(f, "HOME_OFFICE_CODE"),
        }
    }
}

/// One pushed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NomisChangeHistory {
    pub id: i64,
    /// Offence, statute or HO code depending on the subject.
    pub code: String,
    pub description: Option<String>,
    pub change_type: ChangeType,
    pub nomis_change_subject: NomisChangeSubject,
    pub sent_to_nomis_date: DateTime<Utc>,
}

impl NomisChangeHistory {
    /// Append one audit row.
    pub async fn record(
        pool: &PgPool,
        code: &str,
        description: Option<&str>,
        change_type: ChangeType,
        subject: NomisChangeSubject,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO nomis_change_history
                (code, description, change_type, nomis_change_subject, sent_to_nomis_date)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
            ",
        )
        .bind(code)
        .bind(description)
        .bind(change_type)
        .bind(subject)
        .fetch_one(pool)
        .await
    }

    /// Changes pushed on or after the given instant, newest first.
    pub async fn list_since(
        pool: &PgPool,
        since: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM nomis_change_history
            WHERE sent_to_nomis_date >= $1
            ORDER BY sent_to_nomis_date DESC, id DESC
            ",
        )
        .bind(since)
        .fetch_all(pool)
        .await
    }
}

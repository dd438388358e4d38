//! Outbox of domain events awaiting publication.
//!
//! Rows are written in the same transaction scope as the change they
//! describe and deleted once the event has been handed to the queue,
//! giving at-least-once delivery.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

/// Kind of event consumers are told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// An offence was created or its visible fields changed.
    OffenceChanged,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OffenceChanged => write!(f, "OFFENCE_CHANGED"),
        }
    }
}

/// One pending event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventToRaise {
    pub id: i64,
    pub offence_code: String,
    pub event_type: EventType,
}

impl EventToRaise {
    pub async fn create(
        pool: &PgPool,
        offence_code: &str,
        event_type: EventType,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO events_to_raise (offence_code, event_type)
            VALUES ($1, $2)
            RETURNING *
            ",
        )
        .bind(offence_code)
        .bind(event_type)
        .fetch_one(pool)
        .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM events_to_raise ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// Remove a published entry.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM events_to_raise WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

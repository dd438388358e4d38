//! Read side for the schedule lookup endpoints.
//!
//! Thin assembly over the model functions: a schedule with its parts,
//! paragraphs and mapped offences, fetched by explicit id lookups.

use sqlx::PgPool;

use gavel_db::{
    Offence, OffenceScheduleMapping, Schedule, ScheduleParagraph, SchedulePart,
};

use crate::error::{ScheduleError, ScheduleResult};

/// A schedule part with its paragraphs and offence mappings.
#[derive(Debug, Clone)]
pub struct SchedulePartDetails {
    pub part: SchedulePart,
    pub paragraphs: Vec<ScheduleParagraph>,
    pub mappings: Vec<OffenceScheduleMapping>,
}

/// A fully assembled schedule.
#[derive(Debug, Clone)]
pub struct ScheduleDetails {
    pub schedule: Schedule,
    pub parts: Vec<SchedulePartDetails>,
}

/// Fetch a schedule with everything under it.
pub async fn fetch_schedule_details(pool: &PgPool, id: i64) -> ScheduleResult<ScheduleDetails> {
    let schedule = Schedule::find_by_id(pool, id)
        .await?
        .ok_or(ScheduleError::NotFound {
            entity: "schedule",
            id,
        })?;

    let mut parts = Vec::new();
    for part in SchedulePart::list_by_schedule(pool, schedule.id).await? {
        let paragraphs = ScheduleParagraph::list_by_part(pool, part.id).await?;
        let mappings = OffenceScheduleMapping::list_by_part(pool, part.id).await?;
        parts.push(SchedulePartDetails {
            part,
            paragraphs,
            mappings,
        });
    }

    Ok(ScheduleDetails { schedule, parts })
}

/// Offence search for the lookup endpoints: code prefix match,
/// case-insensitive.
pub async fn search_offences(pool: &PgPool, code_prefix: &str) -> ScheduleResult<Vec<Offence>> {
    Ok(Offence::list_by_code_prefix(pool, code_prefix).await?)
}

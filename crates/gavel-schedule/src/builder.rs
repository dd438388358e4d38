//! Snapshot assembly.
//!
//! One pass over the mapping graph plus one legislation scan; everything
//! else is in-memory set construction so the build is O(graph size).

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use gavel_db::{Offence, OffenceScheduleMapping};

use crate::error::ScheduleResult;
use crate::sets;
use crate::snapshot::CachedScheduleInformation;

/// Read the mapping graph and assemble a fresh snapshot.
///
/// The two reads happen back to back in a single pass each; a failure here
/// leaves any previously cached snapshot serving reads.
pub async fn build_snapshot(pool: &PgPool) -> ScheduleResult<CachedScheduleInformation> {
    let mapped = OffenceScheduleMapping::list_mapped_offences(pool).await?;
    let sexual_by_legislation =
        Offence::list_codes_by_legislation(pool, sets::SEXUAL_OFFENCES_LEGISLATION).await?;

    let snapshot = assemble(mapped, sexual_by_legislation);
    info!(
        mappings = snapshot.total_codes(),
        "Rebuilt schedule classification snapshot"
    );
    Ok(snapshot)
}

/// Pure assembly from pre-read rows. Split out from [`build_snapshot`] so
/// the rules can be exercised without a store.
#[must_use]
pub fn assemble(
    mapped: Vec<gavel_db::MappedOffence>,
    sexual_by_legislation: Vec<String>,
) -> CachedScheduleInformation {
    let mut snapshot = CachedScheduleInformation {
        built_at: Utc::now(),
        ..CachedScheduleInformation::default()
    };
    snapshot.sexual_by_legislation = sexual_by_legislation.into_iter().collect();

    for row in mapped {
        let code = row.offence_code;

        if sets::SCHEDULE_15.matches(&row.act, &row.schedule_code) {
            if row.max_period_is_life != Some(true) {
                continue;
            }
            match row.part_number {
                sets::SCHEDULE_15_VIOLENT_PART => {
                    snapshot.part1_life.insert(code, row.start_date);
                }
                sets::SCHEDULE_15_SEXUAL_PART => {
                    snapshot.part2_life.insert(code, row.start_date);
                }
                _ => {}
            }
            continue;
        }

        let target = if sets::SERIOUS_VIOLENT.matches(&row.act, &row.schedule_code) {
            &mut snapshot.serious_violent
        } else if sets::SCHEDULE_3.matches(&row.act, &row.schedule_code) {
            &mut snapshot.schedule3_sexual
        } else if sets::SEXUAL_SDS_EXCLUSION.matches(&row.act, &row.schedule_code) {
            &mut snapshot.sexual_sds_exclusion
        } else if sets::DOMESTIC_ABUSE_SDS_EXCLUSION.matches(&row.act, &row.schedule_code) {
            &mut snapshot.domestic_abuse
        } else if sets::NATIONAL_SECURITY_SDS_EXCLUSION.matches(&row.act, &row.schedule_code) {
            &mut snapshot.national_security
        } else if sets::TERRORISM_SDS_EXCLUSION.matches(&row.act, &row.schedule_code) {
            &mut snapshot.terrorism
        } else if sets::TRANCHE_THREE_SEXUAL.matches(&row.act, &row.schedule_code) {
            &mut snapshot.tranche3_sexual
        } else if sets::TRANCHE_THREE_DOMESTIC_ABUSE.matches(&row.act, &row.schedule_code) {
            &mut snapshot.tranche3_domestic_abuse
        } else if sets::TRANCHE_THREE_MURDER.matches(&row.act, &row.schedule_code) {
            &mut snapshot.tranche3_murder
        } else {
            continue;
        };
        target.insert(code);
    }

    snapshot
}

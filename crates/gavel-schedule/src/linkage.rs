//! Linking offences to schedule parts.
//!
//! An offence and its inchoate children always move together: linking or
//! unlinking a parent carries every code whose first 7 characters equal the
//! parent's code, whether or not the caller listed them. When the part
//! belongs to a schedule NOMIS tracks itself, the same link/unlink is
//! mirrored there; otherwise the mapping is purely local.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use gavel_db::{Offence, OffenceScheduleMapping, Schedule, SchedulePart};

use crate::error::{ScheduleError, ScheduleResult};
use crate::sets::nomis_schedule_name;

/// Mirror of the NOMIS link/unlink calls. Implemented over the NOMIS HTTP
/// client by the sync crate; tests substitute a recording mock.
#[async_trait]
pub trait ScheduleLinkNotifier: Send + Sync {
    async fn link(&self, offence_code: &str, nomis_schedule: &str) -> ScheduleResult<()>;
    async fn unlink(&self, offence_code: &str, nomis_schedule: &str) -> ScheduleResult<()>;
}

/// Links and unlinks offences against schedule parts.
pub struct LinkageService<N> {
    pool: PgPool,
    notifier: Arc<N>,
}

impl<N: ScheduleLinkNotifier> LinkageService<N> {
    #[must_use]
    pub fn new(pool: PgPool, notifier: Arc<N>) -> Self {
        Self { pool, notifier }
    }

    /// Link an offence (and its children) to a schedule part.
    ///
    /// All lookups run before the first write, so a missing part or offence
    /// aborts with nothing persisted.
    pub async fn link_offence(
        &self,
        schedule_part_id: i64,
        offence_id: i64,
        line_reference: Option<&str>,
        legislation_text: Option<&str>,
    ) -> ScheduleResult<()> {
        let (part, schedule, family) = self.resolve(schedule_part_id, offence_id).await?;

        for offence in &family {
            OffenceScheduleMapping::create(
                &self.pool,
                offence.id,
                part.id,
                None,
                line_reference,
                legislation_text,
            )
            .await?;
        }

        if let Some(nomis_schedule) =
            nomis_schedule_name(&schedule.act, &schedule.code, part.part_number)
        {
            for offence in &family {
                self.notifier.link(&offence.code, nomis_schedule).await?;
            }
        }

        info!(
            schedule_part_id,
            offence_id,
            linked = family.len(),
            "Linked offence family to schedule part"
        );
        Ok(())
    }

    /// Unlink an offence (and its children) from a schedule part. Children
    /// are removed even when the caller only named the parent.
    pub async fn unlink_offence(
        &self,
        schedule_part_id: i64,
        offence_id: i64,
    ) -> ScheduleResult<()> {
        let (part, schedule, family) = self.resolve(schedule_part_id, offence_id).await?;

        let family_ids: Vec<i64> = family.iter().map(|o| o.id).collect();
        let removed =
            OffenceScheduleMapping::delete_by_part_and_offences(&self.pool, part.id, &family_ids)
                .await?;

        if let Some(nomis_schedule) =
            nomis_schedule_name(&schedule.act, &schedule.code, part.part_number)
        {
            for offence in &family {
                self.notifier.unlink(&offence.code, nomis_schedule).await?;
            }
        }

        info!(
            schedule_part_id,
            offence_id, removed, "Unlinked offence family from schedule part"
        );
        Ok(())
    }

    /// Resolve the part, its schedule, and the offence together with its
    /// inchoate children.
    async fn resolve(
        &self,
        schedule_part_id: i64,
        offence_id: i64,
    ) -> ScheduleResult<(SchedulePart, Schedule, Vec<Offence>)> {
        let part = SchedulePart::find_by_id(&self.pool, schedule_part_id)
            .await?
            .ok_or(ScheduleError::NotFound {
                entity: "schedule part",
                id: schedule_part_id,
            })?;
        let schedule = Schedule::find_by_id(&self.pool, part.schedule_id)
            .await?
            .ok_or(ScheduleError::NotFound {
                entity: "schedule",
                id: part.schedule_id,
            })?;
        let offence = Offence::find_by_id(&self.pool, offence_id)
            .await?
            .ok_or(ScheduleError::NotFound {
                entity: "offence",
                id: offence_id,
            })?;

        let mut family = vec![offence];
        // Children exist only for parent-length codes.
        if !family[0].is_inchoate() {
            let code = family[0].code.clone();
            family.extend(Offence::list_children_of(&self.pool, &code).await?);
        }
        Ok((part, schedule, family))
    }
}

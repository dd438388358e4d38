//! Reference-source synchronisation runs.
//!
//! Each run reads the SDRS control table, refreshes the shards whose source
//! timestamp has moved past the last successful local load (or whose last
//! load failed), upserts the registry, repairs parent links, and feeds the
//! dirty queue and the event outbox. Shard failures mark that shard FAIL
//! and never stop the other shards.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info, instrument, warn};

use gavel_core::{Feature, FeatureFlags};
use gavel_db::{
    EventToRaise, EventType, LoadType, NewOffence, NomisSyncReason, Offence,
    OffenceToSyncWithNomis, SdrsLoadResult,
};

use crate::error::{SyncError, SyncResult};

use super::client::SdrsApi;
use super::types::{SdrsOffence, SdrsShard};

/// Counters for one synchronisation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SdrsSyncSummary {
    pub shards_loaded: usize,
    pub offences_upserted: usize,
    pub offences_changed: usize,
    pub records_skipped: usize,
    pub failed_shards: usize,
}

/// Pulls changed records from the reference source into the registry.
pub struct SdrsSynchronizer<A> {
    pool: PgPool,
    api: Arc<A>,
}

impl<A: SdrsApi> SdrsSynchronizer<A> {
    #[must_use]
    pub fn new(pool: PgPool, api: Arc<A>) -> Self {
        Self { pool, api }
    }

    /// One scheduled run over every shard the control table says has moved.
    #[instrument(skip_all)]
    pub async fn synchronize(&self, flags: &FeatureFlags) -> SyncResult<SdrsSyncSummary> {
        if !flags.is_enabled(Feature::DeltaSyncSdrs) {
            info!("SDRS sync is disabled, skipping");
            return Ok(SdrsSyncSummary::default());
        }

        let shard_keys: Vec<String> = SdrsShard::all().iter().map(SdrsShard::key).collect();
        SdrsLoadResult::seed(&self.pool, &shard_keys).await?;

        let control = self.api.control_table().await?;
        let state: HashMap<String, SdrsLoadResult> = SdrsLoadResult::list_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| (row.shard.clone(), row))
            .collect();

        let mut summary = SdrsSyncSummary::default();
        for record in control {
            let Some(shard) = SdrsShard::from_data_set(&record.data_set) else {
                continue;
            };
            let shard_state = state.get(&shard.key());
            if !needs_refresh(shard_state, record.last_update) {
                continue;
            }

            let changed_since =
                shard_state.and_then(|s| s.last_successful_load_date);
            let load_type = if changed_since.is_some() {
                LoadType::Delta
            } else {
                LoadType::Full
            };

            let started_at = Utc::now();
            match self.load_shard(shard, changed_since).await {
                Ok(outcome) => {
                    SdrsLoadResult::record_success(
                        &self.pool,
                        &shard.key(),
                        load_type,
                        started_at,
                        outcome.offences_changed > 0,
                    )
                    .await?;
                    summary.shards_loaded += 1;
                    summary.offences_upserted += outcome.offences_upserted;
                    summary.offences_changed += outcome.offences_changed;
                    summary.records_skipped += outcome.records_skipped;
                }
                Err(err) => {
                    error!(shard = %shard, error = %err, "Shard load failed, will retry next run");
                    SdrsLoadResult::record_failure(&self.pool, &shard.key(), load_type, started_at)
                        .await?;
                    summary.failed_shards += 1;
                }
            }
        }

        info!(
            shards = summary.shards_loaded,
            upserted = summary.offences_upserted,
            changed = summary.offences_changed,
            skipped = summary.records_skipped,
            failed = summary.failed_shards,
            "Completed SDRS sync"
        );
        Ok(summary)
    }

    /// Load one shard: upsert records, queue materially changed codes, and
    /// repair parent links for the affected code letters.
    async fn load_shard(
        &self,
        shard: SdrsShard,
        changed_since: Option<chrono::DateTime<Utc>>,
    ) -> SyncResult<ShardOutcome> {
        let records = self.api.offences_for_shard(shard, changed_since).await?;
        let today = Utc::now().date_naive();

        let mut outcome = ShardOutcome::default();
        let mut touched_letters: HashSet<char> = HashSet::new();

        for record in records {
            let incoming = match convert_record(record) {
                Ok(incoming) => incoming,
                Err(err) => {
                    warn!(shard = %shard, error = %err, "Skipping malformed record");
                    outcome.records_skipped += 1;
                    continue;
                }
            };

            let existing = Offence::find_by_code(&self.pool, &incoming.code).await?;
            let ho_code_changed = existing.as_ref().is_some_and(|e| {
                e.category != incoming.category || e.sub_category != incoming.sub_category
            });
            let changed = existing
                .as_ref()
                .map_or(true, |e| material_change(e, &incoming));

            let saved = Offence::upsert(&self.pool, &incoming).await?;
            outcome.offences_upserted += 1;
            if let Some(letter) = saved.code.chars().next() {
                touched_letters.insert(letter.to_ascii_uppercase());
            }

            if changed {
                let reason = if ho_code_changed {
                    NomisSyncReason::HoCodeUpdate
                } else {
                    NomisSyncReason::SdrsUpdate
                };
                OffenceToSyncWithNomis::enqueue(&self.pool, &saved.code, reason).await?;
                if saved.has_future_end_date(today) {
                    OffenceToSyncWithNomis::enqueue(
                        &self.pool,
                        &saved.code,
                        NomisSyncReason::FutureEndDated,
                    )
                    .await?;
                }
                EventToRaise::create(&self.pool, &saved.code, EventType::OffenceChanged).await?;
                outcome.offences_changed += 1;
            }
        }

        for letter in touched_letters {
            self.repair_parent_links(letter).await?;
        }

        Ok(outcome)
    }

    /// Re-resolve `parent_offence_id` for every offence under one code
    /// letter: codes whose computed parent now exists get linked, codes
    /// whose parent vanished get cleared.
    async fn repair_parent_links(&self, letter: char) -> SyncResult<()> {
        let offences = Offence::list_by_code_prefix(&self.pool, &letter.to_string()).await?;
        for (id, parent_id) in desired_parent_links(&offences) {
            Offence::set_parent_offence_id(&self.pool, id, parent_id).await?;
        }
        Ok(())
    }
}

/// Per-shard counters.
#[derive(Debug, Clone, Copy, Default)]
struct ShardOutcome {
    offences_upserted: usize,
    offences_changed: usize,
    records_skipped: usize,
}

/// Whether a shard needs refreshing: never successfully loaded, source
/// timestamp newer than the last successful load, or last attempt failed.
fn needs_refresh(
    state: Option<&SdrsLoadResult>,
    source_last_update: chrono::DateTime<Utc>,
) -> bool {
    let Some(state) = state else {
        return true;
    };
    if state.status == Some(gavel_db::LoadStatus::Fail) {
        return true;
    }
    match state.last_successful_load_date {
        None => true,
        Some(loaded) => source_last_update > loaded,
    }
}

/// Interpret one source record. Records without a code or start date are
/// data-shape errors and get skipped by the caller.
fn convert_record(record: SdrsOffence) -> SyncResult<NewOffence> {
    if record.code.trim().is_empty() {
        return Err(SyncError::DataShape {
            code: record.code,
            message: "blank offence code".to_string(),
        });
    }
    let start_date = record.offence_start_date.ok_or_else(|| SyncError::DataShape {
        code: record.code.clone(),
        message: "missing offence start date".to_string(),
    })?;
    let custodial_indicator = match record.custodial_indicator.as_deref() {
        None => None,
        Some(raw) => Some(raw.parse().map_err(|message: String| SyncError::DataShape {
            code: record.code.clone(),
            message,
        })?),
    };

    Ok(NewOffence {
        code: record.code,
        description: record.description,
        cjs_title: record.cjs_title,
        revision_id: record.offence_revision_id.unwrap_or(0),
        start_date,
        end_date: record.offence_end_date,
        category: record.category,
        sub_category: record.sub_category,
        acts_and_sections: record.offence_acts_and_sections,
        custodial_indicator,
        max_period_is_life: record.max_period_is_life,
        max_period_of_indictment_years: record.max_period_of_indictment_years,
        max_period_of_indictment_months: record.max_period_of_indictment_months,
        max_period_of_indictment_weeks: record.max_period_of_indictment_weeks,
        max_period_of_indictment_days: record.max_period_of_indictment_days,
        changed_date: record.changed_date.unwrap_or_else(Utc::now),
    })
}

/// Whether the incoming record changes anything a downstream consumer can
/// see.
fn material_change(existing: &Offence, incoming: &NewOffence) -> bool {
    existing.description != incoming.description
        || existing.cjs_title != incoming.cjs_title
        || existing.revision_id != incoming.revision_id
        || existing.start_date != incoming.start_date
        || existing.end_date != incoming.end_date
        || existing.category != incoming.category
        || existing.sub_category != incoming.sub_category
        || existing.acts_and_sections != incoming.acts_and_sections
        || existing.custodial_indicator != incoming.custodial_indicator
        || existing.max_period_is_life != incoming.max_period_is_life
        || existing.max_period_of_indictment_years != incoming.max_period_of_indictment_years
        || existing.max_period_of_indictment_months != incoming.max_period_of_indictment_months
        || existing.max_period_of_indictment_weeks != incoming.max_period_of_indictment_weeks
        || existing.max_period_of_indictment_days != incoming.max_period_of_indictment_days
}

/// The parent-link corrections needed so every inchoate code points at its
/// sibling parent's id (or at nothing when no parent exists locally).
fn desired_parent_links(offences: &[Offence]) -> Vec<(i64, Option<i64>)> {
    let by_code: HashMap<&str, i64> = offences
        .iter()
        .map(|offence| (offence.code.as_str(), offence.id))
        .collect();

    offences
        .iter()
        .filter_map(|offence| {
            let desired = offence
                .parent_code()
                .and_then(|parent| by_code.get(parent).copied());
            (desired != offence.parent_offence_id).then_some((offence.id, desired))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use gavel_db::{CustodialIndicator, LoadStatus};

    fn record(code: &str) -> SdrsOffence {
        SdrsOffence {
            code: code.to_string(),
            description: Some("An offence".to_string()),
            cjs_title: None,
            offence_revision_id: Some(3),
            offence_start_date: NaiveDate::from_ymd_opt(2015, 1, 1),
            offence_end_date: None,
            category: Some(12),
            sub_category: Some(5),
            offence_acts_and_sections: None,
            custodial_indicator: Some("Y".to_string()),
            max_period_is_life: Some(false),
            max_period_of_indictment_years: Some(5),
            max_period_of_indictment_months: None,
            max_period_of_indictment_weeks: None,
            max_period_of_indictment_days: None,
            changed_date: Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()),
        }
    }

    fn offence(id: i64, code: &str, parent: Option<i64>) -> Offence {
        Offence {
            id,
            code: code.to_string(),
            description: Some("An offence".to_string()),
            cjs_title: None,
            revision_id: 3,
            start_date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            end_date: None,
            category: Some(12),
            sub_category: Some(5),
            acts_and_sections: None,
            custodial_indicator: Some(CustodialIndicator::Yes),
            max_period_is_life: Some(false),
            max_period_of_indictment_years: Some(5),
            max_period_of_indictment_months: None,
            max_period_of_indictment_weeks: None,
            max_period_of_indictment_days: None,
            parent_offence_id: parent,
            changed_date: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            created_date: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            last_updated_date: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn load_state(
        status: Option<LoadStatus>,
        last_success: Option<chrono::DateTime<Utc>>,
    ) -> SdrsLoadResult {
        SdrsLoadResult {
            shard: "A".to_string(),
            status,
            load_type: None,
            load_date: None,
            last_successful_load_date: last_success,
            nomis_sync_required: false,
        }
    }

    #[test]
    fn test_needs_refresh_decisions() {
        let source_update = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        // Never loaded.
        assert!(needs_refresh(None, source_update));
        assert!(needs_refresh(Some(&load_state(None, None)), source_update));

        // Last attempt failed.
        let failed = load_state(Some(LoadStatus::Fail), Some(source_update));
        assert!(needs_refresh(Some(&failed), source_update));

        // Source moved past the last successful load.
        let stale = load_state(
            Some(LoadStatus::Success),
            Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()),
        );
        assert!(needs_refresh(Some(&stale), source_update));

        // Up to date.
        let fresh = load_state(
            Some(LoadStatus::Success),
            Some(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()),
        );
        assert!(!needs_refresh(Some(&fresh), source_update));
    }

    #[test]
    fn test_convert_record_maps_all_fields() {
        let converted = convert_record(record("AF06999")).unwrap();
        assert_eq!(converted.code, "AF06999");
        assert_eq!(converted.revision_id, 3);
        assert_eq!(converted.custodial_indicator, Some(CustodialIndicator::Yes));
        assert_eq!(converted.max_period_of_indictment_years, Some(5));
    }

    #[test]
    fn test_convert_record_rejects_malformed_records() {
        let mut blank = record("  ");
        blank.code = "  ".to_string();
        assert!(matches!(
            convert_record(blank),
            Err(SyncError::DataShape { .. })
        ));

        let mut no_start = record("AF06999");
        no_start.offence_start_date = None;
        assert!(matches!(
            convert_record(no_start),
            Err(SyncError::DataShape { .. })
        ));

        let mut bad_indicator = record("AF06999");
        bad_indicator.custodial_indicator = Some("MAYBE".to_string());
        assert!(matches!(
            convert_record(bad_indicator),
            Err(SyncError::DataShape { .. })
        ));
    }

    #[test]
    fn test_material_change_detection() {
        let existing = offence(1, "AF06999", None);
        let same = convert_record(record("AF06999")).unwrap();
        assert!(!material_change(&existing, &same));

        let mut changed = same.clone();
        changed.description = Some("An offence ".to_string());
        assert!(material_change(&existing, &changed));

        let mut end_dated = same;
        end_dated.end_date = NaiveDate::from_ymd_opt(2027, 1, 1);
        assert!(material_change(&existing, &end_dated));
    }

    #[test]
    fn test_desired_parent_links_adds_and_clears() {
        let parent = offence(1, "AF06999", None);
        // Child not yet linked to the parent.
        let unlinked_child = offence(2, "AF06999A", None);
        // Child linked to an id whose code no longer exists.
        let orphan = offence(3, "AF07001B", Some(99));
        // Correctly linked child needs no correction.
        let linked_child = offence(4, "AF06999C", Some(1));

        let corrections =
            desired_parent_links(&[parent, unlinked_child, orphan, linked_child]);
        assert_eq!(corrections, vec![(2, Some(1)), (3, None)]);
    }
}

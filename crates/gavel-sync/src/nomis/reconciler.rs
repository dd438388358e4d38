//! NOMIS reconciliation runs.
//!
//! Full sync walks all 26 alphabetic code partitions; delta sync walks only
//! the statute prefixes of dirty codes plus any shards flagged as needing a
//! push. Each partition batch is its own unit: a failure aborts that
//! partition (its earlier writes stay committed, NOMIS is re-diffed next
//! run) and the remaining partitions still run.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info, instrument, warn};

use gavel_core::{statute_code, Feature, FeatureFlags};
use gavel_db::{
    ChangeType, NomisChangeHistory, NomisChangeSubject, Offence, OffenceReactivatedInNomis,
    OffenceToSyncWithNomis, SdrsLoadResult,
};

use crate::error::SyncResult;

use super::client::NomisApi;
use super::diff::{diff, NomisChangeSet};
use super::types::{NomisActiveFlagUpdate, NomisOffence};

/// The 26 alphabetic offence-code partitions walked by full sync.
pub const OFFENCE_CODE_PARTITIONS: [char; 26] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

const DEFAULT_PAGE_SIZE: i64 = 1000;

/// Counters for one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub ho_codes_created: usize,
    pub statutes_created: usize,
    pub offences_created: usize,
    pub offences_updated: usize,
    pub offences_reactivated: usize,
    pub failed_partitions: usize,
}

impl SyncSummary {
    fn merge(&mut self, other: SyncSummary) {
        self.ho_codes_created += other.ho_codes_created;
        self.statutes_created += other.statutes_created;
        self.offences_created += other.offences_created;
        self.offences_updated += other.offences_updated;
        self.offences_reactivated += other.offences_reactivated;
        self.failed_partitions += other.failed_partitions;
    }

    /// Whether every partition completed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_partitions == 0
    }
}

/// Reconciles local offence state into NOMIS.
pub struct NomisReconciler<A> {
    pool: PgPool,
    api: Arc<A>,
    page_size: i64,
}

impl<A: NomisApi> NomisReconciler<A> {
    #[must_use]
    pub fn new(pool: PgPool, api: Arc<A>) -> Self {
        Self {
            pool,
            api,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Full sync: diff every alphabetic partition and push the differences.
    #[instrument(skip_all)]
    pub async fn full_sync(&self, flags: &FeatureFlags) -> SyncResult<SyncSummary> {
        if !flags.is_enabled(Feature::FullSyncNomis) {
            info!("Full NOMIS sync is disabled, skipping");
            return Ok(SyncSummary::default());
        }

        let reactivated = self.reactivated_codes().await?;
        let mut summary = SyncSummary::default();

        for partition in OFFENCE_CODE_PARTITIONS {
            let prefix = partition.to_string();
            match self.sync_partition(&prefix, None, &reactivated).await {
                Ok(partition_summary) => summary.merge(partition_summary),
                Err(err) => {
                    error!(prefix = %prefix, error = %err, "Partition failed, continuing with the rest");
                    summary.failed_partitions += 1;
                }
            }
        }

        summary.offences_reactivated = self.reactivation_flow(&reactivated).await;

        info!(
            statutes = summary.statutes_created,
            created = summary.offences_created,
            updated = summary.offences_updated,
            failed_partitions = summary.failed_partitions,
            "Completed full NOMIS sync"
        );
        Ok(summary)
    }

    /// Delta sync: push only dirty codes and flagged shards. Queue entries
    /// and shard flags are cleared only after their push succeeds, so a
    /// failure leaves them for the next scheduled run.
    #[instrument(skip_all)]
    pub async fn delta_sync(&self, flags: &FeatureFlags) -> SyncResult<SyncSummary> {
        if !flags.is_enabled(Feature::DeltaSyncNomis) {
            info!("Delta NOMIS sync is disabled, skipping");
            return Ok(SyncSummary::default());
        }

        let reactivated = self.reactivated_codes().await?;
        let dirty = OffenceToSyncWithNomis::list_all(&self.pool).await?;
        let mut summary = SyncSummary::default();

        // Group dirty codes by their statute prefix: delta re-fetches NOMIS
        // for the narrower 4-character prefix rather than the whole letter.
        let mut by_prefix: BTreeMap<String, HashSet<String>> = BTreeMap::new();
        for entry in &dirty {
            by_prefix
                .entry(statute_code(&entry.offence_code).to_string())
                .or_default()
                .insert(entry.offence_code.clone());
        }

        let mut pushed_codes: Vec<String> = Vec::new();
        for (prefix, codes) in &by_prefix {
            match self.sync_partition(prefix, Some(codes), &reactivated).await {
                Ok(partition_summary) => {
                    summary.merge(partition_summary);
                    pushed_codes.extend(codes.iter().cloned());
                }
                Err(err) => {
                    warn!(prefix = %prefix, error = %err, "Delta batch failed, leaving queue entries for retry");
                    summary.failed_partitions += 1;
                }
            }
        }

        self.clear_dirty_queue(pushed_codes).await?;

        // Shards whose last SDRS load flagged a pending push get a whole
        // partition re-diff. The auxiliary feeds have no partition of their
        // own; their offences travel through the dirty queue, so their flag
        // clears once the queue drained cleanly.
        for shard in SdrsLoadResult::list_nomis_sync_required(&self.pool).await? {
            if shard.shard.len() != 1 {
                if summary.failed_partitions == 0 {
                    SdrsLoadResult::clear_nomis_sync_required(&self.pool, &shard.shard).await?;
                }
                continue;
            }
            match self.sync_partition(&shard.shard, None, &reactivated).await {
                Ok(partition_summary) => {
                    summary.merge(partition_summary);
                    SdrsLoadResult::clear_nomis_sync_required(&self.pool, &shard.shard).await?;
                }
                Err(err) => {
                    warn!(shard = %shard.shard, error = %err, "Flagged shard failed, leaving flag for retry");
                    summary.failed_partitions += 1;
                }
            }
        }

        info!(
            created = summary.offences_created,
            updated = summary.offences_updated,
            failed_partitions = summary.failed_partitions,
            "Completed delta NOMIS sync"
        );
        Ok(summary)
    }

    /// Diff one code prefix and push the differences. `scope` restricts the
    /// local side to the given codes (delta mode).
    async fn sync_partition(
        &self,
        prefix: &str,
        scope: Option<&HashSet<String>>,
        reactivated: &HashSet<String>,
    ) -> SyncResult<SyncSummary> {
        let remote = self.fetch_remote(prefix).await?;
        let mut local = Offence::list_by_code_prefix(&self.pool, prefix).await?;
        if let Some(scope) = scope {
            local.retain(|offence| scope.contains(&offence.code));
        }

        let today = Utc::now().date_naive();
        let changes = diff(&local, &remote, reactivated, today);
        self.apply(prefix, changes).await
    }

    /// All NOMIS records for a prefix. Pages are fetched strictly in order;
    /// the diff needs the full snapshot, not incremental results.
    async fn fetch_remote(&self, prefix: &str) -> SyncResult<Vec<NomisOffence>> {
        let mut all = Vec::new();
        let mut page = 0;
        loop {
            let result = self
                .api
                .get_offences_by_prefix(prefix, page, self.page_size)
                .await?;
            all.extend(result.content);
            if result.last {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    /// Push one partition's change set. Each call is its own unit of work;
    /// every applied change lands one audit row.
    async fn apply(&self, prefix: &str, changes: NomisChangeSet) -> SyncResult<SyncSummary> {
        let mut summary = SyncSummary::default();
        if changes.is_empty() {
            return Ok(summary);
        }

        if !changes.ho_codes_to_create.is_empty() {
            self.api.create_ho_codes(&changes.ho_codes_to_create).await?;
            for ho_code in &changes.ho_codes_to_create {
                NomisChangeHistory::record(
                    &self.pool,
                    &ho_code.code,
                    ho_code.description.as_deref(),
                    ChangeType::Insert,
                    NomisChangeSubject::HomeOfficeCode,
                )
                .await?;
            }
            summary.ho_codes_created = changes.ho_codes_to_create.len();
        }

        if !changes.statutes_to_create.is_empty() {
            self.api.create_statutes(&changes.statutes_to_create).await?;
            for statute in &changes.statutes_to_create {
                NomisChangeHistory::record(
                    &self.pool,
                    &statute.code,
                    Some(&statute.description),
                    ChangeType::Insert,
                    NomisChangeSubject::Statute,
                )
                .await?;
            }
            summary.statutes_created = changes.statutes_to_create.len();
        }

        if !changes.offences_to_create.is_empty() {
            self.api.create_offences(&changes.offences_to_create).await?;
            for offence in &changes.offences_to_create {
                NomisChangeHistory::record(
                    &self.pool,
                    &offence.code,
                    Some(&offence.description),
                    ChangeType::Insert,
                    NomisChangeSubject::Offence,
                )
                .await?;
            }
            summary.offences_created = changes.offences_to_create.len();
        }

        if !changes.offences_to_update.is_empty() {
            self.api.update_offences(&changes.offences_to_update).await?;
            for offence in &changes.offences_to_update {
                NomisChangeHistory::record(
                    &self.pool,
                    &offence.code,
                    Some(&offence.description),
                    ChangeType::Update,
                    NomisChangeSubject::Offence,
                )
                .await?;
            }
            summary.offences_updated = changes.offences_to_update.len();
        }

        info!(
            prefix,
            ho_codes = summary.ho_codes_created,
            statutes = summary.statutes_created,
            created = summary.offences_created,
            updated = summary.offences_updated,
            "Pushed partition changes to NOMIS"
        );
        Ok(summary)
    }

    /// Operator-reactivated codes that are live locally get their NOMIS
    /// active flag restored outside the normal diff. Failures here are
    /// per-code: the remaining codes still run.
    async fn reactivation_flow(&self, reactivated: &HashSet<String>) -> usize {
        let today = Utc::now().date_naive();
        let mut count = 0;
        for code in reactivated {
            let offence = match Offence::find_by_code(&self.pool, code).await {
                Ok(Some(offence)) => offence,
                Ok(None) => continue,
                Err(err) => {
                    warn!(code = %code, error = %err, "Skipping reactivation, lookup failed");
                    continue;
                }
            };
            if offence.active_flag(today) != "Y" {
                continue;
            }
            let update = NomisActiveFlagUpdate {
                offence_code: offence.code.clone(),
                statute_code: offence.statute_code().to_string(),
                active_flag: "Y".to_string(),
            };
            match self.api.update_active_flag(&update).await {
                Ok(()) => {
                    if let Err(err) = NomisChangeHistory::record(
                        &self.pool,
                        &offence.code,
                        offence.description.as_deref(),
                        ChangeType::Update,
                        NomisChangeSubject::Offence,
                    )
                    .await
                    {
                        warn!(code = %code, error = %err, "Reactivation pushed but audit row failed");
                    }
                    count += 1;
                }
                Err(err) => warn!(code = %code, error = %err, "Reactivation push failed"),
            }
        }
        count
    }

    /// Clear pushed codes from the dirty queue, re-enqueueing any that still
    /// carry an unexpired end date so delta sync revisits them until the
    /// deactivation becomes due.
    async fn clear_dirty_queue(&self, pushed_codes: Vec<String>) -> SyncResult<()> {
        if pushed_codes.is_empty() {
            return Ok(());
        }
        let offences = Offence::list_by_codes(&self.pool, &pushed_codes).await?;
        OffenceToSyncWithNomis::delete_by_codes(&self.pool, &pushed_codes).await?;

        let today = Utc::now().date_naive();
        for offence in offences {
            if offence.has_future_end_date(today) {
                OffenceToSyncWithNomis::enqueue(
                    &self.pool,
                    &offence.code,
                    gavel_db::NomisSyncReason::FutureEndDated,
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn reactivated_codes(&self) -> SyncResult<HashSet<String>> {
        Ok(OffenceReactivatedInNomis::list_codes(&self.pool)
            .await?
            .into_iter()
            .collect())
    }
}

//! # gavel-sync
//!
//! Keeps the offence registry aligned with its two neighbours.
//!
//! The SDRS synchroniser pulls changed records from the reference source,
//! shard by shard, and updates the local registry, marking affected codes
//! dirty. The NOMIS reconciler then diffs local state against the target
//! system (all 26 code partitions in full mode, only dirty codes in delta
//! mode) and pushes the minimal set of creates and updates, writing one
//! audit row per applied change. Every scheduled entry point runs under a
//! named advisory-lock lease so exactly one instance performs a given job
//! across a scaled deployment.
//!
//! ```text
//!  SDRS ──► SdrsSynchronizer ──► offences ──► NomisReconciler ──► NOMIS
//!                │                  │
//!                ▼                  ▼
//!          load results        dirty queue + outbox
//! ```

pub mod error;
pub mod events;
pub mod jobs;
pub mod nomis;
pub mod sdrs;

pub use error::{SyncError, SyncResult};
pub use events::{EventPublisher, OutboxDrainer};
pub use jobs::{
    JobLease, JobName, JobRunner, JOB_CACHE_EVICTION, JOB_DELTA_SYNC_NOMIS,
    JOB_FULL_SYNC_NOMIS, JOB_SDRS_SYNC,
};
pub use nomis::client::{NomisApi, NomisClient};
pub use nomis::linkage::NomisLinkNotifier;
pub use nomis::reconciler::{NomisReconciler, SyncSummary};
pub use sdrs::client::{SdrsApi, SdrsClient};
pub use sdrs::synchronizer::{SdrsSyncSummary, SdrsSynchronizer};

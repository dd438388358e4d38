//! # gavel-schedule
//!
//! Schedule-derived classification of offences.
//!
//! The mapping graph (schedules → parts → paragraphs → offences) is read in
//! one consistent pass and condensed into a [`CachedScheduleInformation`]
//! snapshot of named offence-code sets. Pure rule functions over that
//! snapshot answer the sentencing questions: List A–D membership, the SDS
//! exclusion category, and the sexual-or-violent indicator. The snapshot is
//! expensive to build relative to how often the answers change, so it is
//! held behind a single-key timed cache and rebuilt at most once per expiry
//! window.

pub mod builder;
pub mod cache;
pub mod classifier;
pub mod error;
pub mod linkage;
pub mod lookup;
pub mod sets;
pub mod snapshot;

pub use builder::{assemble, build_snapshot};
pub use cache::{DbSnapshotSource, ScheduleCache, SnapshotSource, CACHE_NAME, DEFAULT_TTL};
pub use classifier::{
    sds_exclusion, sentencing_lists, sexual_or_violent, SdsExclusion, SentencingListFlags,
    SexualOrViolentIndicator,
};
pub use error::{ScheduleError, ScheduleResult};
pub use linkage::{LinkageService, ScheduleLinkNotifier};
pub use lookup::{fetch_schedule_details, search_offences, ScheduleDetails, SchedulePartDetails};
pub use snapshot::CachedScheduleInformation;

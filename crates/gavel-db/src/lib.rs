//! # gavel-db
//!
//! Relational models and data access for the offence registry.
//!
//! Each table has one model file exposing a plain `sqlx::FromRow` struct and
//! `async fn` data-access functions taking a `&PgPool`. There is no ORM
//! layer: parent/child offence relationships are resolved by explicit id
//! lookups, and reads that feed a reconciliation or classification pass are
//! taken in a single consistent pass.

pub mod models;

pub use models::event_to_raise::{EventToRaise, EventType};
pub use models::feature_toggle::FeatureToggle;
pub use models::nomis_change_history::{ChangeType, NomisChangeHistory, NomisChangeSubject};
pub use models::offence::{CustodialIndicator, NewOffence, Offence};
pub use models::offence_reactivated_in_nomis::OffenceReactivatedInNomis;
pub use models::offence_schedule_mapping::{MappedOffence, OffenceScheduleMapping};
pub use models::offence_to_sync_with_nomis::{NomisSyncReason, OffenceToSyncWithNomis};
pub use models::schedule::{Schedule, ScheduleParagraph, SchedulePart};
pub use models::sdrs_load_result::{
    LoadStatus, LoadType, SdrsLoadResult, SdrsLoadResultHistory,
};

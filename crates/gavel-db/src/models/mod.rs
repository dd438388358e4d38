//! One model per table.

pub mod event_to_raise;
pub mod feature_toggle;
pub mod nomis_change_history;
pub mod offence;
pub mod offence_reactivated_in_nomis;
pub mod offence_schedule_mapping;
pub mod offence_to_sync_with_nomis;
pub mod schedule;
pub mod sdrs_load_result;

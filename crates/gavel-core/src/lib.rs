//! # gavel-core
//!
//! Shared domain primitives for the offence registry: offence-code parsing
//! and derivation rules, and the feature-flag map consumed by the scheduled
//! jobs.

pub mod code;
pub mod features;

pub use code::{
    active_flag, home_office_stats_code, is_inchoate, parent_code, statute_code,
    STATUTE_CODE_LEN,
};
pub use features::{Feature, FeatureFlags};

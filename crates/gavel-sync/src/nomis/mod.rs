//! NOMIS-facing reconciliation.

pub mod client;
pub mod diff;
pub mod linkage;
pub mod reconciler;
pub mod types;

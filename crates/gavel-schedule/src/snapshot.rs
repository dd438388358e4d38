//! The classification snapshot.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Named offence-code sets derived from the mapping graph at a point in
/// time. Rebuilt wholesale by [`crate::builder::build_snapshot`]; never
/// mutated incrementally. Date-sensitive sets carry the offence's start
/// date so the rules can apply their cutoffs without going back to the
/// store. All membership checks are O(1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedScheduleInformation {
    /// Schedule 15 Part 1 offences attracting a life sentence, with start
    /// dates.
    pub part1_life: HashMap<String, NaiveDate>,
    /// Schedule 15 Part 2 offences attracting a life sentence, with start
    /// dates.
    pub part2_life: HashMap<String, NaiveDate>,
    /// PCSC serious violent offences.
    pub serious_violent: HashSet<String>,
    /// Schedule 3 sexual offences.
    pub schedule3_sexual: HashSet<String>,
    /// Offences sexual by their legislation, independent of schedule
    /// membership.
    pub sexual_by_legislation: HashSet<String>,
    /// Sexual offences named directly by the SDS exclusion lists.
    pub sexual_sds_exclusion: HashSet<String>,
    /// Domestic abuse offences.
    pub domestic_abuse: HashSet<String>,
    /// National security offences.
    pub national_security: HashSet<String>,
    /// Terrorism offences.
    pub terrorism: HashSet<String>,
    /// Tranche-three sexual offences (feature-gated).
    pub tranche3_sexual: HashSet<String>,
    /// Tranche-three domestic abuse offences (feature-gated).
    pub tranche3_domestic_abuse: HashSet<String>,
    /// Tranche-three murder offences (feature-gated).
    pub tranche3_murder: HashSet<String>,
    /// When the snapshot was assembled.
    pub built_at: DateTime<Utc>,
}

impl CachedScheduleInformation {
    /// Number of distinct codes across every set. Logged after a rebuild.
    #[must_use]
    pub fn total_codes(&self) -> usize {
        let mut codes: HashSet<&str> = HashSet::new();
        codes.extend(self.part1_life.keys().map(String::as_str));
        codes.extend(self.part2_life.keys().map(String::as_str));
        for set in [
            &self.serious_violent,
            &self.schedule3_sexual,
            &self.sexual_by_legislation,
            &self.sexual_sds_exclusion,
            &self.domestic_abuse,
            &self.national_security,
            &self.terrorism,
            &self.tranche3_sexual,
            &self.tranche3_domestic_abuse,
            &self.tranche3_murder,
        ] {
            codes.extend(set.iter().map(String::as_str));
        }
        codes.len()
    }
}

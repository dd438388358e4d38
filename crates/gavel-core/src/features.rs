//! Feature toggles gating the scheduled jobs and classification rules.
//!
//! Toggles live in the database and are loaded once per run into a
//! [`FeatureFlags`] map that is passed explicitly to the job that needs it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named feature toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    /// Allow the full NOMIS synchronisation job to push changes.
    FullSyncNomis,
    /// Allow the delta NOMIS synchronisation job to push changes.
    DeltaSyncNomis,
    /// Allow the full SDRS load to run.
    FullSyncSdrs,
    /// Allow the scheduled SDRS delta load to run.
    DeltaSyncSdrs,
    /// Enable the tranche-three exclusion categories.
    T3OffenceExclusions,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullSyncNomis => write!(f, "FULL_SYNC_NOMIS"),
            Self::DeltaSyncNomis => write!(f, "DELTA_SYNC_NOMIS"),
            Self::FullSyncSdrs => write!(f, "FULL_SYNC_SDRS"),
            Self::DeltaSyncSdrs => write!(f, "DELTA_SYNC_SDRS"),
            Self::T3OffenceExclusions => write!(f, "T3_OFFENCE_EXCLUSIONS"),
        }
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL_SYNC_NOMIS" => Ok(Self::FullSyncNomis),
            "DELTA_SYNC_NOMIS" => Ok(Self::DeltaSyncNomis),
            "FULL_SYNC_SDRS" => Ok(Self::FullSyncSdrs),
            "DELTA_SYNC_SDRS" => Ok(Self::DeltaSyncSdrs),
            "T3_OFFENCE_EXCLUSIONS" => Ok(Self::T3OffenceExclusions),
            _ => Err(format!("Unknown feature toggle: {s}")),
        }
    }
}

/// Snapshot of all feature toggles for a single run.
///
/// A toggle that is not present in the map is treated as disabled.
#[derive(Debug, Clone, Default)]
pub struct FeatureFlags {
    flags: HashMap<Feature, bool>,
}

impl FeatureFlags {
    /// Build from explicit pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Feature, bool)>) -> Self {
        Self {
            flags: pairs.into_iter().collect(),
        }
    }

    /// Build a map with every feature enabled. Test and tooling convenience.
    #[must_use]
    pub fn all_enabled() -> Self {
        Self::from_pairs([
            (Feature::FullSyncNomis, true),
            (Feature::DeltaSyncNomis, true),
            (Feature::FullSyncSdrs, true),
            (Feature::DeltaSyncSdrs, true),
            (Feature::T3OffenceExclusions, true),
        ])
    }

    /// Whether a feature is enabled. Unknown features are disabled.
    #[must_use]
    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.flags.get(&feature).copied().unwrap_or(false)
    }

    /// Set a single flag.
    pub fn set(&mut self, feature: Feature, enabled: bool) {
        self.flags.insert(feature, enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_display_round_trip() {
        for feature in [
            Feature::FullSyncNomis,
            Feature::DeltaSyncNomis,
            Feature::FullSyncSdrs,
            Feature::DeltaSyncSdrs,
            Feature::T3OffenceExclusions,
        ] {
            assert_eq!(feature.to_string().parse::<Feature>().unwrap(), feature);
        }
    }

    #[test]
    fn test_missing_feature_is_disabled() {
        let flags = FeatureFlags::default();
        assert!(!flags.is_enabled(Feature::FullSyncNomis));

        let flags = FeatureFlags::from_pairs([(Feature::FullSyncNomis, true)]);
        assert!(flags.is_enabled(Feature::FullSyncNomis));
        assert!(!flags.is_enabled(Feature::DeltaSyncNomis));
    }
}

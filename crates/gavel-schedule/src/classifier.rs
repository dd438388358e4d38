//! Pure classification rules over a snapshot.
//!
//! Evaluation order is load-bearing throughout this module: downstream
//! sentencing decisions read the first category that matches, so the checks
//! must run in the statutory priority order and must not be reordered or
//! merged.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use gavel_core::{Feature, FeatureFlags};

use crate::sets::SEXUAL_CODE_PREFIXES;
use crate::snapshot::CachedScheduleInformation;

/// Offences committed before this date fall within List A.
#[must_use]
pub fn list_a_cutoff() -> NaiveDate {
    // 28 June 2022, the PCSC commencement date.
    NaiveDate::from_ymd_opt(2022, 6, 28).expect("static date")
}

/// Sentencing-list membership for one offence code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencingListFlags {
    pub in_list_a: bool,
    pub in_list_b: bool,
    pub in_list_c: bool,
    pub in_list_d: bool,
}

/// SDS exclusion category. Exactly one label applies per code; `Murder` is
/// only ever produced when the tranche-three toggle is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SdsExclusion {
    Sexual,
    DomesticAbuse,
    NationalSecurity,
    Terrorism,
    Murder,
    Violent,
    #[default]
    None,
}

impl fmt::Display for SdsExclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sexual => write!(f, "SEXUAL"),
            Self::DomesticAbuse => write!(f, "DOMESTIC_ABUSE"),
            Self::NationalSecurity => write!(f, "NATIONAL_SECURITY"),
            Self::Terrorism => write!(f, "TERRORISM"),
            Self::Murder => write!(f, "MURDER"),
            Self::Violent => write!(f, "VIOLENT"),
            Self::None => write!(f, "NONE"),
        }
    }
}

/// Schedule-based (non-exclusion) indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SexualOrViolentIndicator {
    Sexual,
    Violent,
    #[default]
    None,
}

impl fmt::Display for SexualOrViolentIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sexual => write!(f, "SEXUAL"),
            Self::Violent => write!(f, "VIOLENT"),
            Self::None => write!(f, "NONE"),
        }
    }
}

/// List A–D membership.
///
/// Lists B and C are intentionally identical by statute; both are computed
/// and returned so callers always see the two lists the legislation names.
#[must_use]
pub fn sentencing_lists(
    snapshot: &CachedScheduleInformation,
    code: &str,
) -> SentencingListFlags {
    let cutoff = list_a_cutoff();
    let part1_start = snapshot.part1_life.get(code);
    let part2_start = snapshot.part2_life.get(code);

    let in_list_a = part1_start
        .into_iter()
        .chain(part2_start)
        .any(|start| *start < cutoff);
    let in_list_b = snapshot.serious_violent.contains(code) || part2_start.is_some();
    let in_list_c = snapshot.serious_violent.contains(code) || part2_start.is_some();
    let in_list_d = part1_start.is_some() || part2_start.is_some();

    SentencingListFlags {
        in_list_a,
        in_list_b,
        in_list_c,
        in_list_d,
    }
}

/// The single SDS exclusion label for a code.
///
/// Categories are evaluated in statutory priority order: SEXUAL, then
/// DOMESTIC_ABUSE, NATIONAL_SECURITY, TERRORISM, MURDER (tranche three
/// only), VIOLENT, NONE. The tranche-three variants of SEXUAL and
/// DOMESTIC_ABUSE are folded into their category's check, so enabling the
/// toggle widens a category without moving it in the order.
#[must_use]
pub fn sds_exclusion(
    snapshot: &CachedScheduleInformation,
    code: &str,
    flags: &FeatureFlags,
) -> SdsExclusion {
    let tranche_three = flags.is_enabled(Feature::T3OffenceExclusions);

    let sexual = (tranche_three && snapshot.tranche3_sexual.contains(code))
        || snapshot.part2_life.contains_key(code)
        || has_sexual_prefix(code)
        || snapshot.sexual_by_legislation.contains(code)
        || snapshot.sexual_sds_exclusion.contains(code);
    if sexual {
        return SdsExclusion::Sexual;
    }

    let domestic_abuse = (tranche_three && snapshot.tranche3_domestic_abuse.contains(code))
        || snapshot.domestic_abuse.contains(code);
    if domestic_abuse {
        return SdsExclusion::DomesticAbuse;
    }

    if snapshot.national_security.contains(code) {
        return SdsExclusion::NationalSecurity;
    }

    if snapshot.terrorism.contains(code) {
        return SdsExclusion::Terrorism;
    }

    if tranche_three && snapshot.tranche3_murder.contains(code) {
        return SdsExclusion::Murder;
    }

    if snapshot.part1_life.contains_key(code) {
        return SdsExclusion::Violent;
    }

    SdsExclusion::None
}

/// The schedule-based indicator: SEXUAL beats VIOLENT when both apply.
#[must_use]
pub fn sexual_or_violent(
    snapshot: &CachedScheduleInformation,
    code: &str,
) -> SexualOrViolentIndicator {
    if snapshot.schedule3_sexual.contains(code) || snapshot.part2_life.contains_key(code) {
        return SexualOrViolentIndicator::Sexual;
    }
    if snapshot.part1_life.contains_key(code) {
        return SexualOrViolentIndicator::Violent;
    }
    SexualOrViolentIndicator::None
}

fn has_sexual_prefix(code: &str) -> bool {
    SEXUAL_CODE_PREFIXES
        .iter()
        .any(|prefix| code.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot() -> CachedScheduleInformation {
        let mut snap = CachedScheduleInformation::default();
        snap.part1_life.insert("VI01001".to_string(), date(2010, 1, 1));
        snap.part2_life.insert("SE01001".to_string(), date(2010, 1, 1));
        snap.part2_life.insert("SE01002".to_string(), date(2022, 6, 28));
        snap.serious_violent.insert("SV01001".to_string());
        snap.schedule3_sexual.insert("SC03001".to_string());
        snap.sexual_by_legislation.insert("LE01001".to_string());
        snap.sexual_sds_exclusion.insert("EX01001".to_string());
        snap.domestic_abuse.insert("DA01001".to_string());
        snap.national_security.insert("NS01001".to_string());
        snap.terrorism.insert("TE01001".to_string());
        snap.tranche3_sexual.insert("T3S0001".to_string());
        snap.tranche3_domestic_abuse.insert("T3D0001".to_string());
        snap.tranche3_murder.insert("T3M0001".to_string());
        snap
    }

    #[test]
    fn test_list_a_requires_start_before_cutoff() {
        let snap = snapshot();

        let before = sentencing_lists(&snap, "SE01001");
        assert!(before.in_list_a);
        assert!(before.in_list_d);

        // Start date exactly on the cutoff: excluded from A, still in D.
        let on_cutoff = sentencing_lists(&snap, "SE01002");
        assert!(!on_cutoff.in_list_a);
        assert!(on_cutoff.in_list_d);
    }

    #[test]
    fn test_list_b_equals_list_c() {
        let snap = snapshot();
        for code in ["VI01001", "SE01001", "SE01002", "SV01001", "ZZ99999"] {
            let lists = sentencing_lists(&snap, code);
            assert_eq!(lists.in_list_b, lists.in_list_c, "code {code}");
        }
    }

    #[test]
    fn test_serious_violent_feeds_b_and_c_but_not_d() {
        let snap = snapshot();
        let lists = sentencing_lists(&snap, "SV01001");
        assert!(lists.in_list_b);
        assert!(lists.in_list_c);
        assert!(!lists.in_list_a);
        assert!(!lists.in_list_d);
    }

    #[test]
    fn test_part1_feeds_a_and_d_but_not_b() {
        let snap = snapshot();
        let lists = sentencing_lists(&snap, "VI01001");
        assert!(lists.in_list_a);
        assert!(lists.in_list_d);
        assert!(!lists.in_list_b);
        assert!(!lists.in_list_c);
    }

    #[test]
    fn test_exclusion_priority_sexual_dominates() {
        let mut snap = snapshot();
        // A code matching every category at once must come out SEXUAL.
        let code = "ALL0001";
        snap.part2_life.insert(code.to_string(), date(2010, 1, 1));
        snap.part1_life.insert(code.to_string(), date(2010, 1, 1));
        snap.domestic_abuse.insert(code.to_string());
        snap.national_security.insert(code.to_string());
        snap.terrorism.insert(code.to_string());

        let flags = FeatureFlags::default();
        assert_eq!(sds_exclusion(&snap, code, &flags), SdsExclusion::Sexual);
    }

    #[test]
    fn test_exclusion_order_below_sexual() {
        let snap = snapshot();
        let flags = FeatureFlags::default();

        assert_eq!(sds_exclusion(&snap, "DA01001", &flags), SdsExclusion::DomesticAbuse);
        assert_eq!(sds_exclusion(&snap, "NS01001", &flags), SdsExclusion::NationalSecurity);
        assert_eq!(sds_exclusion(&snap, "TE01001", &flags), SdsExclusion::Terrorism);
        assert_eq!(sds_exclusion(&snap, "VI01001", &flags), SdsExclusion::Violent);
        assert_eq!(sds_exclusion(&snap, "ZZ99999", &flags), SdsExclusion::None);
    }

    #[test]
    fn test_sexual_prefix_and_legislation_checks() {
        let snap = snapshot();
        let flags = FeatureFlags::default();

        assert_eq!(sds_exclusion(&snap, "SX03001", &flags), SdsExclusion::Sexual);
        assert_eq!(sds_exclusion(&snap, "SX56123A", &flags), SdsExclusion::Sexual);
        assert_eq!(sds_exclusion(&snap, "LE01001", &flags), SdsExclusion::Sexual);
        assert_eq!(sds_exclusion(&snap, "EX01001", &flags), SdsExclusion::Sexual);
    }

    #[test]
    fn test_tranche_three_sets_only_apply_when_enabled() {
        let snap = snapshot();
        let off = FeatureFlags::default();
        let on = FeatureFlags::from_pairs([(Feature::T3OffenceExclusions, true)]);

        assert_eq!(sds_exclusion(&snap, "T3S0001", &off), SdsExclusion::None);
        assert_eq!(sds_exclusion(&snap, "T3S0001", &on), SdsExclusion::Sexual);

        assert_eq!(sds_exclusion(&snap, "T3D0001", &off), SdsExclusion::None);
        assert_eq!(sds_exclusion(&snap, "T3D0001", &on), SdsExclusion::DomesticAbuse);

        assert_eq!(sds_exclusion(&snap, "T3M0001", &off), SdsExclusion::None);
        assert_eq!(sds_exclusion(&snap, "T3M0001", &on), SdsExclusion::Murder);
    }

    #[test]
    fn test_tranche_three_murder_stays_below_terrorism() {
        let mut snap = snapshot();
        let code = "TM00001";
        snap.terrorism.insert(code.to_string());
        snap.tranche3_murder.insert(code.to_string());

        let on = FeatureFlags::from_pairs([(Feature::T3OffenceExclusions, true)]);
        assert_eq!(sds_exclusion(&snap, code, &on), SdsExclusion::Terrorism);
    }

    #[test]
    fn test_sexual_or_violent_priority() {
        let mut snap = snapshot();
        assert_eq!(
            sexual_or_violent(&snap, "SC03001"),
            SexualOrViolentIndicator::Sexual
        );
        assert_eq!(
            sexual_or_violent(&snap, "SE01001"),
            SexualOrViolentIndicator::Sexual
        );
        assert_eq!(
            sexual_or_violent(&snap, "VI01001"),
            SexualOrViolentIndicator::Violent
        );
        assert_eq!(
            sexual_or_violent(&snap, "ZZ99999"),
            SexualOrViolentIndicator::None
        );

        // Both schedule 3 and part 1: sexual wins.
        let code = "BO01001";
        snap.schedule3_sexual.insert(code.to_string());
        snap.part1_life.insert(code.to_string(), date(2010, 1, 1));
        assert_eq!(sexual_or_violent(&snap, code), SexualOrViolentIndicator::Sexual);
    }
}

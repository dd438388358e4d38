//! Pure diffing of local registry state against a NOMIS snapshot.
//!
//! Comparisons are exact-string: a trailing space in a description is a
//! difference and triggers an update. Local records are evaluated in
//! ascending id order so statute descriptions (first non-blank legislation
//! text wins) come out the same on every run.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use gavel_db::Offence;

use super::types::{NomisHoCode, NomisOffence, NomisStatute};

/// The minimal set of NOMIS writes needed to align one code partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NomisChangeSet {
    pub ho_codes_to_create: Vec<NomisHoCode>,
    pub statutes_to_create: Vec<NomisStatute>,
    pub offences_to_create: Vec<NomisOffence>,
    pub offences_to_update: Vec<NomisOffence>,
}

impl NomisChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ho_codes_to_create.is_empty()
            && self.statutes_to_create.is_empty()
            && self.offences_to_create.is_empty()
            && self.offences_to_update.is_empty()
    }
}

/// NOMIS severity ranking: the Home Office category, defaulting to 99 when
/// the category is absent or zero.
#[must_use]
pub fn severity_ranking(category: Option<i32>) -> String {
    match category {
        None | Some(0) => "99".to_string(),
        Some(category) => category.to_string(),
    }
}

/// NOMIS Home Office code: `category/subCategory` blank-padded to 3 and 2
/// characters. Absent when either side is missing.
#[must_use]
pub fn nomis_ho_code(category: Option<i32>, sub_category: Option<i32>) -> Option<String> {
    match (category, sub_category) {
        (Some(category), Some(sub_category)) => Some(format!("{category:>3}/{sub_category:>2}")),
        _ => None,
    }
}

/// Project a registry offence into the shape NOMIS should hold today.
///
/// A future end date is a scheduled change, not a current one: the offence
/// stays active with no expiry until the date passes. Once it has, the
/// NOMIS-facing view carries `activeFlag = "N"` and an expiry of the date
/// the deactivation is applied.
#[must_use]
pub fn to_nomis_offence(offence: &Offence, today: NaiveDate) -> NomisOffence {
    let ended = offence.end_date.is_some_and(|end| end < today);
    NomisOffence {
        code: offence.code.clone(),
        description: offence.description.clone().unwrap_or_default(),
        cjs_title: offence.cjs_title.clone(),
        statute: NomisStatute {
            code: offence.statute_code().to_string(),
            description: offence.statute_code().to_string(),
        },
        ho_code: nomis_ho_code(offence.category, offence.sub_category)
            .map(|code| NomisHoCode { code, description: None }),
        severity_ranking: severity_ranking(offence.category),
        active_flag: offence.active_flag(today).to_string(),
        expiry_date: ended.then_some(today),
    }
}

/// Diff one partition of local offences against the NOMIS records for the
/// same prefix.
///
/// `reactivated_codes` are operator-reactivated offences excluded from the
/// normal diff; the reconciler handles them through the reactivation flow.
#[must_use]
pub fn diff(
    local: &[Offence],
    remote: &[NomisOffence],
    reactivated_codes: &HashSet<String>,
    today: NaiveDate,
) -> NomisChangeSet {
    let mut local: Vec<&Offence> = local.iter().collect();
    local.sort_by_key(|o| o.id);

    let remote_by_code: HashMap<&str, &NomisOffence> =
        remote.iter().map(|o| (o.code.as_str(), o)).collect();

    let mut changes = NomisChangeSet {
        statutes_to_create: missing_statutes(&local, remote),
        ho_codes_to_create: missing_ho_codes(&local, remote),
        ..NomisChangeSet::default()
    };

    for offence in &local {
        if reactivated_codes.contains(&offence.code) {
            continue;
        }
        let desired = to_nomis_offence(offence, today);
        match remote_by_code.get(offence.code.as_str()) {
            None => changes.offences_to_create.push(desired),
            Some(current) => {
                if let Some(update) = offence_update(current, desired) {
                    changes.offences_to_update.push(update);
                }
            }
        }
    }

    changes
}

/// Statutes known locally but absent from NOMIS, with descriptions taken
/// from the first offence (ascending id) carrying non-blank legislation
/// text, falling back to the statute code itself.
fn missing_statutes(local: &[&Offence], remote: &[NomisOffence]) -> Vec<NomisStatute> {
    let known: HashSet<&str> = remote.iter().map(|o| o.statute.code.as_str()).collect();

    let mut descriptions: BTreeMap<&str, Option<&str>> = BTreeMap::new();
    for offence in local {
        let statute = offence.statute_code();
        if known.contains(statute) {
            continue;
        }
        let entry = descriptions.entry(statute).or_insert(None);
        if entry.is_none() {
            if let Some(text) = offence.acts_and_sections.as_deref() {
                if !text.trim().is_empty() {
                    *entry = Some(text);
                }
            }
        }
    }

    descriptions
        .into_iter()
        .map(|(code, description)| NomisStatute {
            code: code.to_string(),
            description: description.unwrap_or(code).to_string(),
        })
        .collect()
}

/// Home Office codes referenced locally but never seen on a NOMIS offence.
fn missing_ho_codes(local: &[&Offence], remote: &[NomisOffence]) -> Vec<NomisHoCode> {
    let known: HashSet<&str> = remote
        .iter()
        .filter_map(|o| o.ho_code.as_ref())
        .map(|ho| ho.code.as_str())
        .collect();

    let mut missing: Vec<NomisHoCode> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for offence in local {
        let Some(code) = nomis_ho_code(offence.category, offence.sub_category) else {
            continue;
        };
        if !known.contains(code.as_str()) && seen.insert(code.clone()) {
            missing.push(NomisHoCode { code, description: None });
        }
    }
    missing
}

/// The update to push for one offence, if any field differs.
///
/// An offence that is already inactive on both sides is compared on its
/// descriptive fields only: the expiry NOMIS holds reflects the day the
/// deactivation was applied and must not churn on later runs.
fn offence_update(current: &NomisOffence, mut desired: NomisOffence) -> Option<NomisOffence> {
    let both_inactive = current.active_flag == "N" && desired.active_flag == "N";
    if both_inactive {
        desired.active_flag = current.active_flag.clone();
        desired.expiry_date = current.expiry_date;
    }

    let differs = current.description != desired.description
        || current.cjs_title != desired.cjs_title
        || current.severity_ranking != desired.severity_ranking
        || current.ho_code.as_ref().map(|h| h.code.as_str())
            != desired.ho_code.as_ref().map(|h| h.code.as_str())
        || current.active_flag != desired.active_flag
        || current.expiry_date != desired.expiry_date;

    differs.then_some(desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gavel_db::CustodialIndicator;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    fn offence(id: i64, code: &str) -> Offence {
        Offence {
            id,
            code: code.to_string(),
            description: Some("Causing harm".to_string()),
            cjs_title: Some("Causing harm (CJS)".to_string()),
            revision_id: 1,
            start_date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            end_date: None,
            category: Some(195),
            sub_category: Some(99),
            acts_and_sections: Some("Offences Act 1861 s.18".to_string()),
            custodial_indicator: Some(CustodialIndicator::Either),
            max_period_is_life: Some(false),
            max_period_of_indictment_years: None,
            max_period_of_indictment_months: None,
            max_period_of_indictment_weeks: None,
            max_period_of_indictment_days: None,
            parent_offence_id: None,
            changed_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            created_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            last_updated_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn no_reactivations() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_severity_ranking_defaults_to_99() {
        assert_eq!(severity_ranking(None), "99");
        assert_eq!(severity_ranking(Some(0)), "99");
        assert_eq!(severity_ranking(Some(7)), "7");
        assert_eq!(severity_ranking(Some(195)), "195");
    }

    #[test]
    fn test_nomis_ho_code_is_blank_padded() {
        assert_eq!(nomis_ho_code(Some(195), Some(99)), Some("195/99".to_string()));
        assert_eq!(nomis_ho_code(Some(5), Some(1)), Some("  5/ 1".to_string()));
        assert_eq!(nomis_ho_code(Some(195), None), None);
        assert_eq!(nomis_ho_code(None, None), None);
    }

    #[test]
    fn test_missing_offence_is_created() {
        let local = vec![offence(1, "AF06999")];
        let changes = diff(&local, &[], &no_reactivations(), today());

        assert_eq!(changes.offences_to_create.len(), 1);
        assert_eq!(changes.offences_to_create[0].code, "AF06999");
        assert_eq!(changes.offences_to_create[0].active_flag, "Y");
        assert!(changes.offences_to_update.is_empty());
        // The statute is unknown to NOMIS too.
        assert_eq!(changes.statutes_to_create.len(), 1);
        assert_eq!(changes.statutes_to_create[0].code, "AF06");
    }

    #[test]
    fn test_statute_description_is_first_non_blank_by_id() {
        let mut first = offence(2, "AF06001");
        first.acts_and_sections = Some("   ".to_string());
        let mut second = offence(5, "AF06002");
        second.acts_and_sections = Some("Armed Forces Act 2006".to_string());
        let mut third = offence(9, "AF06003");
        third.acts_and_sections = Some("A later, less specific text".to_string());

        // Deliberately out of order: the diff sorts by id.
        let local = vec![third, first, second];
        let changes = diff(&local, &[], &no_reactivations(), today());

        assert_eq!(changes.statutes_to_create.len(), 1);
        assert_eq!(changes.statutes_to_create[0].description, "Armed Forces Act 2006");
    }

    #[test]
    fn test_statute_description_falls_back_to_code() {
        let mut only = offence(1, "AF06001");
        only.acts_and_sections = None;
        let changes = diff(&[only], &[], &no_reactivations(), today());

        assert_eq!(changes.statutes_to_create[0].description, "AF06");
    }

    #[test]
    fn test_identical_records_produce_no_changes() {
        let local = vec![offence(1, "AF06999")];
        let remote = vec![to_nomis_offence(&local[0], today())];

        let changes = diff(&local, &remote, &no_reactivations(), today());
        assert!(changes.is_empty());
    }

    #[test]
    fn test_rerun_after_apply_is_empty() {
        // Simulate a full sync: push the computed changes, then diff again.
        let local = vec![offence(1, "AF06999"), offence(2, "AF07001")];
        let first = diff(&local, &[], &no_reactivations(), today());
        let remote = first.offences_to_create.clone();

        let second = diff(&local, &remote, &no_reactivations(), today());
        assert!(second.offences_to_create.is_empty());
        assert!(second.offences_to_update.is_empty());
        // The pushed offences carry the HO code and statutes now.
        assert!(second.ho_codes_to_create.is_empty());
        assert!(second.statutes_to_create.is_empty());
    }

    #[test]
    fn test_whitespace_difference_triggers_update() {
        let local = vec![offence(1, "AF06999")];
        let mut remote = to_nomis_offence(&local[0], today());
        remote.description = "Causing harm ".to_string();

        let changes = diff(&local, &[remote], &no_reactivations(), today());
        assert_eq!(changes.offences_to_update.len(), 1);
        assert_eq!(changes.offences_to_update[0].description, "Causing harm");
    }

    #[test]
    fn test_future_end_date_is_held_back() {
        let mut local = offence(1, "AF06999");
        local.end_date = Some(today().succ_opt().unwrap());
        let remote = vec![to_nomis_offence(&offence(1, "AF06999"), today())];

        let changes = diff(&[local], &remote, &no_reactivations(), today());
        assert!(changes.offences_to_update.is_empty());
    }

    #[test]
    fn test_passed_end_date_emits_deactivation() {
        let mut local = offence(1, "AF06999");
        local.end_date = Some(today().pred_opt().unwrap());
        // NOMIS still believes the offence is active.
        let remote = vec![to_nomis_offence(&offence(1, "AF06999"), today())];

        let changes = diff(&[local], &remote, &no_reactivations(), today());
        assert_eq!(changes.offences_to_update.len(), 1);
        let update = &changes.offences_to_update[0];
        assert_eq!(update.active_flag, "N");
        assert_eq!(update.expiry_date, Some(today()));
    }

    #[test]
    fn test_already_inactive_offence_does_not_churn() {
        let mut local = offence(1, "AF06999");
        local.end_date = Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        // NOMIS deactivated it back when the end date passed.
        let mut remote = to_nomis_offence(&local, today());
        remote.expiry_date = Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());

        let changes = diff(&[local], &[remote], &no_reactivations(), today());
        assert!(changes.offences_to_update.is_empty());
    }

    #[test]
    fn test_reactivated_codes_are_excluded_from_the_diff() {
        let local = vec![offence(1, "AF06999")];
        let reactivated: HashSet<String> = ["AF06999".to_string()].into();

        let changes = diff(&local, &[], &reactivated, today());
        assert!(changes.offences_to_create.is_empty());
    }

    #[test]
    fn test_severity_change_triggers_update() {
        let local = vec![offence(1, "AF06999")];
        let mut remote = to_nomis_offence(&local[0], today());
        remote.severity_ranking = "99".to_string();

        let changes = diff(&local, &[remote], &no_reactivations(), today());
        assert_eq!(changes.offences_to_update.len(), 1);
        assert_eq!(changes.offences_to_update[0].severity_ranking, "195");
    }

    #[test]
    fn test_missing_ho_code_is_created_once() {
        let local = vec![offence(1, "AF06998"), offence(2, "AF06999")];
        let changes = diff(&local, &[], &no_reactivations(), today());

        assert_eq!(changes.ho_codes_to_create.len(), 1);
        assert_eq!(changes.ho_codes_to_create[0].code, "195/99");
    }
}

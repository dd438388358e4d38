//! Offence-code derivation rules.
//!
//! An offence code is a 4-character statute prefix followed by up to 4
//! alphanumeric characters; a trailing character beyond position 7 marks an
//! inchoate (attempt/conspiracy) variant of the 7-character parent offence.

use chrono::NaiveDate;

/// Length of the statute prefix at the start of every offence code.
pub const STATUTE_CODE_LEN: usize = 4;

/// Length of a parent offence code. Codes longer than this are inchoate
/// variants of the offence identified by their first 7 characters.
pub const PARENT_CODE_LEN: usize = 7;

/// The statute code embedded in an offence code (first 4 characters).
#[must_use]
pub fn statute_code(code: &str) -> &str {
    &code[..code.len().min(STATUTE_CODE_LEN)]
}

/// The parent offence code for an inchoate offence, `None` for codes that
/// are not long enough to be a child.
#[must_use]
pub fn parent_code(code: &str) -> Option<&str> {
    if code.len() > PARENT_CODE_LEN {
        Some(&code[..PARENT_CODE_LEN])
    } else {
        None
    }
}

/// Whether the code denotes an inchoate (child) offence.
#[must_use]
pub fn is_inchoate(code: &str) -> bool {
    code.len() > PARENT_CODE_LEN
}

/// Home Office statistics code: category zero-padded to 3 digits and
/// sub-category to 2, joined by `/`. `None` only when both components are
/// absent; an absent side is left empty.
#[must_use]
pub fn home_office_stats_code(category: Option<i32>, sub_category: Option<i32>) -> Option<String> {
    if category.is_none() && sub_category.is_none() {
        return None;
    }
    let category = category.map(|c| format!("{c:03}")).unwrap_or_default();
    let sub_category = sub_category.map(|s| format!("{s:02}")).unwrap_or_default();
    Some(format!("{category}/{sub_category}"))
}

/// Active flag as held by the registry: `"Y"` unless the end date has
/// already passed. A future end date is a scheduled change, not a current
/// one, so the offence stays active until the date arrives.
#[must_use]
pub fn active_flag(end_date: Option<NaiveDate>, today: NaiveDate) -> &'static str {
    match end_date {
        Some(end) if end < today => "N",
        _ => "Y",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_statute_code_is_first_four_characters() {
        assert_eq!(statute_code("AF06999"), "AF06");
        assert_eq!(statute_code("SX03001A"), "SX03");
        assert_eq!(statute_code("AB1"), "AB1");
    }

    #[test]
    fn test_parent_code_requires_more_than_seven_characters() {
        assert_eq!(parent_code("AF06999A"), Some("AF06999"));
        assert_eq!(parent_code("AF06999"), None);
        assert_eq!(parent_code("AF06"), None);
        assert!(is_inchoate("AF06999A"));
        assert!(!is_inchoate("AF06999"));
    }

    #[test]
    fn test_home_office_stats_code_null_iff_both_null() {
        assert_eq!(home_office_stats_code(None, None), None);
        assert_eq!(home_office_stats_code(Some(1), Some(3)), Some("001/03".to_string()));
        assert_eq!(home_office_stats_code(Some(195), Some(99)), Some("195/99".to_string()));
        assert_eq!(home_office_stats_code(Some(12), None), Some("012/".to_string()));
        assert_eq!(home_office_stats_code(None, Some(7)), Some("/07".to_string()));
    }

    #[test]
    fn test_active_flag_only_deactivates_past_end_dates() {
        let today = date(2026, 8, 6);
        assert_eq!(active_flag(None, today), "Y");
        assert_eq!(active_flag(Some(date(2026, 8, 7)), today), "Y");
        assert_eq!(active_flag(Some(date(2026, 8, 6)), today), "Y");
        assert_eq!(active_flag(Some(date(2026, 8, 5)), today), "N");
    }
}

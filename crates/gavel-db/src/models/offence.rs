//! Offence model.
//!
//! The canonical registry row for a criminal offence. Offences are created
//! and updated by the SDRS synchroniser and read by the classification
//! engine and the NOMIS reconciler. They are never deleted; retirement is
//! expressed through `end_date`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

use gavel_core::code;

/// Whether a conviction can attract a custodial sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustodialIndicator {
    Yes,
    No,
    Either,
}

impl fmt::Display for CustodialIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
            Self::Either => write!(f, "EITHER"),
        }
    }
}

impl std::str::FromStr for CustodialIndicator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YES" | "Y" => Ok(Self::Yes),
            "NO" | "N" => Ok(Self::No),
            "EITHER" | "E" => Ok(Self::Either),
            _ => Err(format!("Unknown custodial indicator: {s}")),
        }
    }
}

/// An offence as held in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offence {
    pub id: i64,
    /// Natural key: 4-character statute prefix plus up to 4 alphanumeric
    /// characters, optionally with a trailing inchoate marker.
    pub code: String,
    pub description: Option<String>,
    /// Alternate (CJS) title.
    pub cjs_title: Option<String>,
    pub revision_id: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Home Office statistics category.
    pub category: Option<i32>,
    /// Home Office statistics sub-category.
    pub sub_category: Option<i32>,
    /// Legislation text ("acts and sections").
    pub acts_and_sections: Option<String>,
    pub custodial_indicator: Option<CustodialIndicator>,
    pub max_period_is_life: Option<bool>,
    pub max_period_of_indictment_years: Option<i32>,
    pub max_period_of_indictment_months: Option<i32>,
    pub max_period_of_indictment_weeks: Option<i32>,
    pub max_period_of_indictment_days: Option<i32>,
    /// Resolved id of the 7-character parent, present only for inchoate
    /// codes whose parent exists locally.
    pub parent_offence_id: Option<i64>,
    /// Last change at the reference source.
    pub changed_date: DateTime<Utc>,
    pub created_date: DateTime<Utc>,
    pub last_updated_date: DateTime<Utc>,
}

impl Offence {
    /// The statute code embedded in the offence code.
    #[must_use]
    pub fn statute_code(&self) -> &str {
        code::statute_code(&self.code)
    }

    /// The parent offence code, for inchoate codes.
    #[must_use]
    pub fn parent_code(&self) -> Option<&str> {
        code::parent_code(&self.code)
    }

    /// Whether this is an inchoate (child) offence code.
    #[must_use]
    pub fn is_inchoate(&self) -> bool {
        code::is_inchoate(&self.code)
    }

    /// Zero-padded `category/subCategory`, `None` when both are absent.
    #[must_use]
    pub fn home_office_stats_code(&self) -> Option<String> {
        code::home_office_stats_code(self.category, self.sub_category)
    }

    /// `"Y"` unless the end date has passed.
    #[must_use]
    pub fn active_flag(&self, today: NaiveDate) -> &'static str {
        code::active_flag(self.end_date, today)
    }

    /// Whether an end date is set but has not yet passed.
    #[must_use]
    pub fn has_future_end_date(&self, today: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| end >= today)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM offences WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM offences WHERE code = $1")
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// All offences whose code starts with the given prefix,
    /// case-insensitively, in stable id order.
    pub async fn list_by_code_prefix(
        pool: &PgPool,
        prefix: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM offences
            WHERE UPPER(code) LIKE UPPER($1 || '%')
            ORDER BY id
            ",
        )
        .bind(prefix)
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_codes(pool: &PgPool, codes: &[String]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM offences
            WHERE code = ANY($1)
            ORDER BY id
            ",
        )
        .bind(codes)
        .fetch_all(pool)
        .await
    }

    /// Direct inchoate children of the given parent code.
    pub async fn list_children_of(
        pool: &PgPool,
        parent_code: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM offences
            WHERE length(code) > 7 AND substr(code, 1, 7) = $1
            ORDER BY id
            ",
        )
        .bind(parent_code)
        .fetch_all(pool)
        .await
    }

    /// Offence codes whose legislation text references the given act.
    pub async fn list_codes_by_legislation(
        pool: &PgPool,
        act: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT code FROM offences
            WHERE acts_and_sections ILIKE '%' || $1 || '%'
            ORDER BY code
            ",
        )
        .bind(act)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(code,)| code).collect())
    }

    /// Insert or overwrite the registry row for a reference-source record,
    /// matching on code. `changed_date` is the source's change timestamp.
    pub async fn upsert(pool: &PgPool, offence: &NewOffence) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO offences (
                code, description, cjs_title, revision_id, start_date, end_date,
                category, sub_category, acts_and_sections, custodial_indicator,
                max_period_is_life, max_period_of_indictment_years,
                max_period_of_indictment_months, max_period_of_indictment_weeks,
                max_period_of_indictment_days, changed_date, created_date,
                last_updated_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, NOW(), NOW())
            ON CONFLICT (code) DO UPDATE SET
                description = EXCLUDED.description,
                cjs_title = EXCLUDED.cjs_title,
                revision_id = EXCLUDED.revision_id,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                category = EXCLUDED.category,
                sub_category = EXCLUDED.sub_category,
                acts_and_sections = EXCLUDED.acts_and_sections,
                custodial_indicator = EXCLUDED.custodial_indicator,
                max_period_is_life = EXCLUDED.max_period_is_life,
                max_period_of_indictment_years = EXCLUDED.max_period_of_indictment_years,
                max_period_of_indictment_months = EXCLUDED.max_period_of_indictment_months,
                max_period_of_indictment_weeks = EXCLUDED.max_period_of_indictment_weeks,
                max_period_of_indictment_days = EXCLUDED.max_period_of_indictment_days,
                changed_date = EXCLUDED.changed_date,
                last_updated_date = NOW()
            RETURNING *
            ",
        )
        .bind(&offence.code)
        .bind(&offence.description)
        .bind(&offence.cjs_title)
        .bind(offence.revision_id)
        .bind(offence.start_date)
        .bind(offence.end_date)
        .bind(offence.category)
        .bind(offence.sub_category)
        .bind(&offence.acts_and_sections)
        .bind(offence.custodial_indicator)
        .bind(offence.max_period_is_life)
        .bind(offence.max_period_of_indictment_years)
        .bind(offence.max_period_of_indictment_months)
        .bind(offence.max_period_of_indictment_weeks)
        .bind(offence.max_period_of_indictment_days)
        .bind(offence.changed_date)
        .fetch_one(pool)
        .await
    }

    /// Point the parent link at the given offence id (or clear it).
    pub async fn set_parent_offence_id(
        pool: &PgPool,
        id: i64,
        parent_offence_id: Option<i64>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            UPDATE offences
            SET parent_offence_id = $2, last_updated_date = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(parent_offence_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Field set for an upsert from the reference source. The surrogate id and
/// local bookkeeping columns are owned by the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOffence {
    pub code: String,
    pub description: Option<String>,
    pub cjs_title: Option<String>,
    pub revision_id: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub category: Option<i32>,
    pub sub_category: Option<i32>,
    pub acts_and_sections: Option<String>,
    pub custodial_indicator: Option<CustodialIndicator>,
    pub max_period_is_life: Option<bool>,
    pub max_period_of_indictment_years: Option<i32>,
    pub max_period_of_indictment_months: Option<i32>,
    pub max_period_of_indictment_weeks: Option<i32>,
    pub max_period_of_indictment_days: Option<i32>,
    pub changed_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn offence(code: &str, end_date: Option<NaiveDate>) -> Offence {
        Offence {
            id: 1,
            code: code.to_string(),
            description: Some("An offence".to_string()),
            cjs_title: None,
            revision_id: 1,
            start_date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            end_date,
            category: Some(195),
            sub_category: Some(99),
            acts_and_sections: None,
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

    #[test]
    fn test_derived_codes() {
        let parent = offence("AF06999", None);
        assert_eq!(parent.statute_code(), "AF06");
        assert_eq!(parent.parent_code(), None);
        assert!(!parent.is_inchoate());
        assert_eq!(parent.home_office_stats_code(), Some("195/99".to_string()));

        let child = offence("AF06999A", None);
        assert_eq!(child.parent_code(), Some("AF06999"));
        assert!(child.is_inchoate());
    }

    #[test]
    fn test_future_end_date_keeps_offence_active() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let tomorrow = today.succ_opt().unwrap();
        let yesterday = today.pred_opt().unwrap();

        let scheduled = offence("AF06999", Some(tomorrow));
        assert_eq!(scheduled.active_flag(today), "Y");
        assert!(scheduled.has_future_end_date(today));

        let ended = offence("AF06999", Some(yesterday));
        assert_eq!(ended.active_flag(today), "N");
        assert!(!ended.has_future_end_date(today));
    }

    #[test]
    fn test_custodial_indicator_parse() {
        assert_eq!("Y".parse::<CustodialIndicator>().unwrap(), CustodialIndicator::Yes);
        assert_eq!("EITHER".parse::<CustodialIndicator>().unwrap(), CustodialIndicator::Either);
        assert!("MAYBE".parse::<CustodialIndicator>().is_err());
    }
}

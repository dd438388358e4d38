//! NOMIS wire types.
//!
//! Field names follow the NOMIS JSON casing exactly; comparisons against
//! these values in the diff are exact-string, so no normalisation happens
//! at the serde boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One page of a paged NOMIS listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomisPage<T> {
    pub content: Vec<T>,
    pub total_pages: i64,
    pub total_elements: i64,
    /// Zero-based page index.
    pub number: i64,
    pub last: bool,
}

impl<T> NomisPage<T> {
    /// A single-page result. Test convenience.
    #[must_use]
    pub fn single(content: Vec<T>) -> Self {
        Self {
            total_elements: content.len() as i64,
            content,
            total_pages: 1,
            number: 0,
            last: true,
        }
    }
}

/// A statute as NOMIS holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomisStatute {
    pub code: String,
    pub description: String,
}

/// A Home Office classification code as NOMIS holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomisHoCode {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An offence as NOMIS holds it; also the payload for creates and updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomisOffence {
    pub code: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cjs_title: Option<String>,
    #[serde(rename = "statuteCode")]
    pub statute: NomisStatute,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ho_code: Option<NomisHoCode>,
    pub severity_ranking: String,
    pub active_flag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
}

/// Payload for `PUT /offences/update-active-flag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomisActiveFlagUpdate {
    pub offence_code: String,
    pub statute_code: String,
    pub active_flag: String,
}

/// Payload element for the schedule link/unlink endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomisScheduleLink {
    pub offence_code: String,
    pub schedule: String,
}

//! SDRS wire envelope and shard model.
//!
//! The reference source exposes a single endpoint; the operation is
//! selected by whichever request field in the message body is populated.
//! The response mirrors the envelope and may carry a status block with an
//! error code.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Error code returned when a message UUID has been seen before.
pub const SDRS_ERROR_DUPLICATE_REQUEST: &str = "SDRS-99918";

/// Error code returned when the source has no cache file for the shard.
pub const SDRS_ERROR_CACHE_NOT_FOUND: &str = "SDRS-99924";

/// Message header carried on every request and response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    pub message_type: String,
    #[serde(rename = "messageID")]
    pub message_id: Uuid,
    pub time_stamp: DateTime<Utc>,
    pub from: String,
    pub to: String,
}

impl MessageHeader {
    #[must_use]
    pub fn new(message_type: &str) -> Self {
        Self {
            message_type: message_type.to_string(),
            message_id: Uuid::new_v4(),
            time_stamp: Utc::now(),
            from: "CONSUMER_APPLICATION".to_string(),
            to: "SDRS_AZURE".to_string(),
        }
    }

    /// The same header under a fresh UUID, for duplicate-request retries.
    #[must_use]
    pub fn with_new_id(mut self) -> Self {
        self.message_id = Uuid::new_v4();
        self
    }
}

/// Request body: exactly one field is populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_control_table_request: Option<GetControlTableRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_offence_request: Option<GetOffenceRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_application_request: Option<GetApplicationRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_moj_offence_request: Option<GetMojOffenceRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetControlTableRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOffenceRequest {
    pub alpha_char: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetApplicationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMojOffenceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_date: Option<DateTime<Utc>>,
}

/// A full request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdrsRequest {
    pub message_header: MessageHeader,
    pub message_body: RequestBody,
}

/// Response status block, present when the source reports an outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl MessageStatus {
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("ERRORED")
    }
}

/// Response body: the field mirroring the request is populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_control_table_response: Option<ControlTableResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_offence_response: Option<OffenceResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_application_response: Option<OffenceResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_moj_offence_response: Option<OffenceResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlTableResponse {
    #[serde(default)]
    pub reference_data_set: Vec<ControlTableRecord>,
}

/// One shard's last-modified timestamp at the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlTableRecord {
    pub data_set: String,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffenceResponse {
    #[serde(default)]
    pub offences: Vec<SdrsOffence>,
}

/// An offence record as the reference source sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdrsOffence {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cjs_title: Option<String>,
    #[serde(default)]
    pub offence_revision_id: Option<i32>,
    #[serde(default)]
    pub offence_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub offence_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<i32>,
    #[serde(default)]
    pub sub_category: Option<i32>,
    #[serde(default)]
    pub offence_acts_and_sections: Option<String>,
    #[serde(default)]
    pub custodial_indicator: Option<String>,
    #[serde(default)]
    pub max_period_is_life: Option<bool>,
    #[serde(default)]
    pub max_period_of_indictment_years: Option<i32>,
    #[serde(default)]
    pub max_period_of_indictment_months: Option<i32>,
    #[serde(default)]
    pub max_period_of_indictment_weeks: Option<i32>,
    #[serde(default)]
    pub max_period_of_indictment_days: Option<i32>,
    #[serde(default)]
    pub changed_date: Option<DateTime<Utc>>,
}

/// A full response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdrsResponse {
    pub message_header: MessageHeader,
    #[serde(default)]
    pub message_body: ResponseBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_status: Option<MessageStatus>,
}

/// The independently tracked reference-source partitions: 26 alphabetic
/// shards plus the applications and MOJ offence feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdrsShard {
    Alpha(char),
    Applications,
    MojOffences,
}

impl SdrsShard {
    /// Every shard, in load order.
    #[must_use]
    pub fn all() -> Vec<SdrsShard> {
        let mut shards: Vec<SdrsShard> = ('A'..='Z').map(SdrsShard::Alpha).collect();
        shards.push(SdrsShard::Applications);
        shards.push(SdrsShard::MojOffences);
        shards
    }

    /// The key used for `sdrs_load_results.shard`.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Alpha(letter) => letter.to_string(),
            Self::Applications => "APPLICATIONS".to_string(),
            Self::MojOffences => "MOJ_OFFENCES".to_string(),
        }
    }

    /// The control-table data-set name for this shard.
    #[must_use]
    pub fn data_set(&self) -> String {
        match self {
            Self::Alpha(letter) => format!("offence_{letter}"),
            Self::Applications => "application".to_string(),
            Self::MojOffences => "moj_offence".to_string(),
        }
    }

    /// Parse a control-table data-set name. Unknown data sets come back
    /// `None` and are ignored by the synchroniser.
    #[must_use]
    pub fn from_data_set(data_set: &str) -> Option<SdrsShard> {
        match data_set {
            "application" => Some(Self::Applications),
            "moj_offence" => Some(Self::MojOffences),
            _ => {
                let letter = data_set.strip_prefix("offence_")?;
                let mut chars = letter.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_uppercase() => Some(Self::Alpha(c)),
                    _ => None,
                }
            }
        }
    }
}

impl fmt::Display for SdrsShard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_universe_is_twenty_eight() {
        let shards = SdrsShard::all();
        assert_eq!(shards.len(), 28);
        assert_eq!(shards[0], SdrsShard::Alpha('A'));
        assert_eq!(shards[25], SdrsShard::Alpha('Z'));
        assert_eq!(shards[26], SdrsShard::Applications);
        assert_eq!(shards[27], SdrsShard::MojOffences);
    }

    #[test]
    fn test_data_set_round_trip() {
        for shard in SdrsShard::all() {
            assert_eq!(SdrsShard::from_data_set(&shard.data_set()), Some(shard));
        }
        assert_eq!(SdrsShard::from_data_set("offence_a"), None);
        assert_eq!(SdrsShard::from_data_set("offence_AB"), None);
        assert_eq!(SdrsShard::from_data_set("something_else"), None);
    }

    #[test]
    fn test_request_body_serialises_only_the_populated_field() {
        let body = RequestBody {
            get_offence_request: Some(GetOffenceRequest {
                alpha_char: "A".to_string(),
                changed_date: None,
            }),
            ..RequestBody::default()
        };
        let json = serde_json::to_value(&body).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 1);
        assert_eq!(object["getOffenceRequest"]["alphaChar"], "A");
    }

    #[test]
    fn test_message_status_error_detection() {
        let errored = MessageStatus {
            status: "ERRORED".to_string(),
            code: Some(SDRS_ERROR_CACHE_NOT_FOUND.to_string()),
            reason: None,
            detail: None,
        };
        assert!(errored.is_error());

        let success = MessageStatus {
            status: "SUCCESS".to_string(),
            code: None,
            reason: None,
            detail: None,
        };
        assert!(!success.is_error());
    }
}

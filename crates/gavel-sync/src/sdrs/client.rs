//! SDRS HTTP client.
//!
//! All operations go to a single endpoint; the populated request field
//! selects the operation. Two source error codes get special handling: a
//! duplicate message UUID is retried once under a fresh UUID, and an absent
//! cache file is treated as an empty shard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

use super::types::{
    ControlTableRecord, GetApplicationRequest, GetControlTableRequest, GetMojOffenceRequest,
    GetOffenceRequest, MessageHeader, RequestBody, SdrsOffence, SdrsRequest, SdrsResponse,
    SdrsShard, SDRS_ERROR_CACHE_NOT_FOUND, SDRS_ERROR_DUPLICATE_REQUEST,
};

const SYSTEM: &str = "SDRS";

/// The reference-source operations the synchroniser needs.
#[async_trait]
pub trait SdrsApi: Send + Sync {
    /// The control table: one last-modified timestamp per shard.
    async fn control_table(&self) -> SyncResult<Vec<ControlTableRecord>>;

    /// The record set for one shard, restricted to changes after
    /// `changed_since` when given.
    async fn offences_for_shard(
        &self,
        shard: SdrsShard,
        changed_since: Option<DateTime<Utc>>,
    ) -> SyncResult<Vec<SdrsOffence>>;
}

/// Configuration for the SDRS client.
#[derive(Debug, Clone)]
pub struct SdrsClientConfig {
    pub endpoint_url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl SdrsClientConfig {
    #[must_use]
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(120),
        }
    }
}

/// HTTP client for the reference source.
pub struct SdrsClient {
    config: SdrsClientConfig,
    client: Client,
}

impl std::fmt::Debug for SdrsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdrsClient")
            .field("endpoint_url", &self.config.endpoint_url)
            .finish()
    }
}

impl SdrsClient {
    pub fn new(config: SdrsClientConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()
            .map_err(|e| SyncError::ExternalApi {
                system: SYSTEM,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }

    /// Post an envelope, retrying once under a fresh UUID if the source
    /// reports the message id as already seen.
    async fn exchange(&self, request: SdrsRequest) -> SyncResult<SdrsResponse> {
        let response = self.post(&request).await?;

        if let Some(status) = &response.message_status {
            if status.is_error() && status.code.as_deref() == Some(SDRS_ERROR_DUPLICATE_REQUEST) {
                warn!(
                    message_id = %request.message_header.message_id,
                    "SDRS reported a duplicate request UUID, retrying once"
                );
                let retry = SdrsRequest {
                    message_header: request.message_header.clone().with_new_id(),
                    message_body: request.message_body.clone(),
                };
                return self.post(&retry).await;
            }
        }

        Ok(response)
    }

    async fn post(&self, request: &SdrsRequest) -> SyncResult<SdrsResponse> {
        debug!(
            message_type = %request.message_header.message_type,
            message_id = %request.message_header.message_id,
            "Calling SDRS"
        );
        let response = self
            .client
            .post(&self.config.endpoint_url)
            .json(request)
            .send()
            .await
            .map_err(|e| SyncError::external(SYSTEM, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::external_status(SYSTEM, "sdrs", status));
        }
        response
            .json()
            .await
            .map_err(|e| SyncError::external(SYSTEM, &e))
    }

    /// Fail on an errored status, except for the absent-cache code which
    /// maps to "this shard has nothing".
    fn check_status(shard: SdrsShard, response: &SdrsResponse) -> SyncResult<bool> {
        let Some(status) = &response.message_status else {
            return Ok(true);
        };
        if !status.is_error() {
            return Ok(true);
        }
        if status.code.as_deref() == Some(SDRS_ERROR_CACHE_NOT_FOUND) {
            warn!(shard = %shard, "SDRS has no cache file for shard, treating as empty");
            return Ok(false);
        }
        Err(SyncError::ExternalApi {
            system: SYSTEM,
            message: format!(
                "shard {shard} errored with code {}: {}",
                status.code.as_deref().unwrap_or("unknown"),
                status.reason.as_deref().unwrap_or("no reason given"),
            ),
        })
    }
}

#[async_trait]
impl SdrsApi for SdrsClient {
    async fn control_table(&self) -> SyncResult<Vec<ControlTableRecord>> {
        let request = SdrsRequest {
            message_header: MessageHeader::new("GetControlTableRequest"),
            message_body: RequestBody {
                get_control_table_request: Some(GetControlTableRequest::default()),
                ..RequestBody::default()
            },
        };
        let response = self.exchange(request).await?;
        if let Some(status) = &response.message_status {
            if status.is_error() {
                return Err(SyncError::ExternalApi {
                    system: SYSTEM,
                    message: format!(
                        "control table errored with code {}",
                        status.code.as_deref().unwrap_or("unknown")
                    ),
                });
            }
        }
        Ok(response
            .message_body
            .get_control_table_response
            .map(|body| body.reference_data_set)
            .unwrap_or_default())
    }

    async fn offences_for_shard(
        &self,
        shard: SdrsShard,
        changed_since: Option<DateTime<Utc>>,
    ) -> SyncResult<Vec<SdrsOffence>> {
        let (message_type, body) = match shard {
            SdrsShard::Alpha(letter) => (
                "GetOffenceRequest",
                RequestBody {
                    get_offence_request: Some(GetOffenceRequest {
                        alpha_char: letter.to_string(),
                        changed_date: changed_since,
                    }),
                    ..RequestBody::default()
                },
            ),
            SdrsShard::Applications => (
                "GetApplicationRequest",
                RequestBody {
                    get_application_request: Some(GetApplicationRequest {
                        changed_date: changed_since,
                    }),
                    ..RequestBody::default()
                },
            ),
            SdrsShard::MojOffences => (
                "GetMojOffenceRequest",
                RequestBody {
                    get_moj_offence_request: Some(GetMojOffenceRequest {
                        changed_date: changed_since,
                    }),
                    ..RequestBody::default()
                },
            ),
        };

        let request = SdrsRequest {
            message_header: MessageHeader::new(message_type),
            message_body: body,
        };
        let response = self.exchange(request).await?;
        if !Self::check_status(shard, &response)? {
            return Ok(Vec::new());
        }

        let offences = match shard {
            SdrsShard::Alpha(_) => response.message_body.get_offence_response,
            SdrsShard::Applications => response.message_body.get_application_response,
            SdrsShard::MojOffences => response.message_body.get_moj_offence_response,
        };
        Ok(offences.map(|body| body.offences).unwrap_or_default())
    }
}

//! NOMIS HTTP client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

use super::types::{
    NomisActiveFlagUpdate, NomisHoCode, NomisOffence, NomisPage, NomisScheduleLink, NomisStatute,
};

const SYSTEM: &str = "NOMIS";

/// The NOMIS operations the reconciler needs. The reconciler and linkage
/// tests substitute recording mocks for this trait.
#[async_trait]
pub trait NomisApi: Send + Sync {
    /// One page of offences whose code starts with `prefix`, sorted by code.
    async fn get_offences_by_prefix(
        &self,
        prefix: &str,
        page: i64,
        size: i64,
    ) -> SyncResult<NomisPage<NomisOffence>>;

    async fn create_ho_codes(&self, ho_codes: &[NomisHoCode]) -> SyncResult<()>;

    async fn create_statutes(&self, statutes: &[NomisStatute]) -> SyncResult<()>;

    async fn create_offences(&self, offences: &[NomisOffence]) -> SyncResult<()>;

    async fn update_offences(&self, offences: &[NomisOffence]) -> SyncResult<()>;

    async fn update_active_flag(&self, update: &NomisActiveFlagUpdate) -> SyncResult<()>;

    async fn link_to_schedule(&self, links: &[NomisScheduleLink]) -> SyncResult<()>;

    async fn unlink_from_schedule(&self, links: &[NomisScheduleLink]) -> SyncResult<()>;
}

/// Configuration for the NOMIS client.
#[derive(Debug, Clone)]
pub struct NomisClientConfig {
    pub base_url: String,
    /// Bearer token minted by the caller's auth layer, when present.
    pub bearer_token: Option<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl NomisClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
        }
    }
}

/// Blocking-per-call HTTP client for NOMIS. Page N+1 is only requested
/// after page N so the reconciler sees a stable, ordered snapshot.
pub struct NomisClient {
    config: NomisClientConfig,
    client: Client,
}

impl std::fmt::Debug for NomisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NomisClient")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl NomisClient {
    pub fn new(config: NomisClientConfig) -> SyncResult<Self> {
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

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.config.base_url);
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.config.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send_json<B: serde::Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> SyncResult<()> {
        let response = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::external(SYSTEM, &e))?;
        Self::check_status(path, response.status())
    }

    fn check_status(path: &str, status: StatusCode) -> SyncResult<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(SyncError::external_status(SYSTEM, path, status))
        }
    }
}

#[async_trait]
impl NomisApi for NomisClient {
    async fn get_offences_by_prefix(
        &self,
        prefix: &str,
        page: i64,
        size: i64,
    ) -> SyncResult<NomisPage<NomisOffence>> {
        let path = format!("/offences/code/{prefix}");
        debug!(prefix, page, "Fetching NOMIS offence page");
        let response = self
            .request(reqwest::Method::GET, &path)
            .query(&[
                ("page", page.to_string()),
                ("size", size.to_string()),
                ("sort", "code,ASC".to_string()),
            ])
            .send()
            .await
            .map_err(|e| SyncError::external(SYSTEM, &e))?;
        Self::check_status(&path, response.status())?;
        response
            .json()
            .await
            .map_err(|e| SyncError::external(SYSTEM, &e))
    }

    async fn create_ho_codes(&self, ho_codes: &[NomisHoCode]) -> SyncResult<()> {
        self.send_json(reqwest::Method::POST, "/offences/ho-code", ho_codes)
            .await
    }

    async fn create_statutes(&self, statutes: &[NomisStatute]) -> SyncResult<()> {
        self.send_json(reqwest::Method::POST, "/offences/statute", statutes)
            .await
    }

    async fn create_offences(&self, offences: &[NomisOffence]) -> SyncResult<()> {
        self.send_json(reqwest::Method::POST, "/offences/offence", offences)
            .await
    }

    async fn update_offences(&self, offences: &[NomisOffence]) -> SyncResult<()> {
        self.send_json(reqwest::Method::PUT, "/offences/offence", offences)
            .await
    }

    async fn update_active_flag(&self, update: &NomisActiveFlagUpdate) -> SyncResult<()> {
        self.send_json(reqwest::Method::PUT, "/offences/update-active-flag", update)
            .await
    }

    async fn link_to_schedule(&self, links: &[NomisScheduleLink]) -> SyncResult<()> {
        self.send_json(reqwest::Method::POST, "/offences/link-to-schedule", links)
            .await
    }

    async fn unlink_from_schedule(&self, links: &[NomisScheduleLink]) -> SyncResult<()> {
        self.send_json(reqwest::Method::POST, "/offences/unlink-from-schedule", links)
            .await
    }
}

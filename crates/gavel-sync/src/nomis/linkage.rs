//! NOMIS adapter for the schedule linkage seam.

use async_trait::async_trait;
use std::sync::Arc;

use gavel_schedule::{ScheduleError, ScheduleLinkNotifier, ScheduleResult};

use super::client::NomisApi;
use super::types::NomisScheduleLink;

/// Mirrors schedule link/unlink calls into NOMIS.
pub struct NomisLinkNotifier<A> {
    api: Arc<A>,
}

impl<A> NomisLinkNotifier<A> {
    #[must_use]
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: NomisApi> ScheduleLinkNotifier for NomisLinkNotifier<A> {
    async fn link(&self, offence_code: &str, nomis_schedule: &str) -> ScheduleResult<()> {
        let links = [NomisScheduleLink {
            offence_code: offence_code.to_string(),
            schedule: nomis_schedule.to_string(),
        }];
        self.api
            .link_to_schedule(&links)
            .await
            .map_err(|err| ScheduleError::Linkage(err.to_string()))
    }

    async fn unlink(&self, offence_code: &str, nomis_schedule: &str) -> ScheduleResult<()> {
        let links = [NomisScheduleLink {
            offence_code: offence_code.to_string(),
            schedule: nomis_schedule.to_string(),
        }];
        self.api
            .unlink_from_schedule(&links)
            .await
            .map_err(|err| ScheduleError::Linkage(err.to_string()))
    }
}

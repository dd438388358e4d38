//! Outbox draining.
//!
//! Offence-changed notifications are written to the `events_to_raise`
//! outbox alongside the change itself and published from here. An entry is
//! deleted only after the publisher accepts it, so delivery is
//! at-least-once and a failed publish stops the drain with the remainder
//! intact for the next run.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use gavel_db::EventToRaise;

use crate::error::SyncResult;

/// Hands events to the external queue. The queue itself is an external
/// collaborator; production wires a real producer in here.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &EventToRaise) -> SyncResult<()>;
}

/// Drains the outbox in insertion order.
pub struct OutboxDrainer<P> {
    pool: PgPool,
    publisher: Arc<P>,
}

impl<P: EventPublisher> OutboxDrainer<P> {
    #[must_use]
    pub fn new(pool: PgPool, publisher: Arc<P>) -> Self {
        Self { pool, publisher }
    }

    /// Publish pending events, oldest first. Returns how many went out.
    pub async fn drain(&self) -> SyncResult<usize> {
        let events = EventToRaise::list_all(&self.pool).await?;
        let mut published = 0;

        for event in events {
            if let Err(err) = self.publisher.publish(&event).await {
                warn!(
                    offence_code = %event.offence_code,
                    error = %err,
                    "Publish failed, leaving this and later events for the next run"
                );
                break;
            }
            EventToRaise::delete(&self.pool, event.id).await?;
            published += 1;
        }

        if published > 0 {
            info!(published, "Drained offence event outbox");
        }
        Ok(published)
    }
}

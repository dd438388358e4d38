//! Exclusive scheduled-job execution.
//!
//! Every scheduled run (reference sync, delta sync, full sync, cache
//! eviction) takes a named lease backed by a Postgres advisory lock before
//! doing anything. Failing to acquire the lease is not an error: another
//! instance already holds the job, and this one skips silently.

use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use std::future::Future;
use tracing::{debug, info};

use crate::error::SyncResult;

/// A named job and its advisory-lock key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobName {
    pub name: &'static str,
    pub lock_key: i64,
}

pub const JOB_SDRS_SYNC: JobName = JobName {
    name: "sdrs-sync",
    lock_key: 0x6761_7601,
};

pub const JOB_DELTA_SYNC_NOMIS: JobName = JobName {
    name: "delta-sync-nomis",
    lock_key: 0x6761_7602,
};

pub const JOB_FULL_SYNC_NOMIS: JobName = JobName {
    name: "full-sync-nomis",
    lock_key: 0x6761_7603,
};

pub const JOB_CACHE_EVICTION: JobName = JobName {
    name: "schedule-cache-eviction",
    lock_key: 0x6761_7604,
};

/// Advisory-lock lease provider.
///
/// The lock is session-scoped, so the guard pins the connection it was
/// taken on until release. If the process dies mid-run, Postgres frees the
/// lock with the session and the next scheduled run takes over.
pub struct JobLease {
    pool: PgPool,
}

impl JobLease {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Try to take the lease. `None` means another instance holds it.
    pub async fn try_acquire(&self, job: &JobName) -> SyncResult<Option<LeaseGuard>> {
        let mut conn = self.pool.acquire().await?;
        let (acquired,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
            .bind(job.lock_key)
            .fetch_one(&mut *conn)
            .await?;

        if acquired {
            debug!(job = job.name, "Acquired job lease");
            Ok(Some(LeaseGuard {
                conn: Some(conn),
                lock_key: job.lock_key,
            }))
        } else {
            Ok(None)
        }
    }
}

/// Held lease. Call [`LeaseGuard::release`] when the job finishes; if the
/// guard is dropped instead, the pinned connection is closed so the lock
/// cannot leak back into the pool still held.
pub struct LeaseGuard {
    conn: Option<PoolConnection<Postgres>>,
    lock_key: i64,
}

impl LeaseGuard {
    /// Unlock and hand the connection back to the pool.
    pub async fn release(mut self) -> SyncResult<()> {
        if let Some(mut conn) = self.conn.take() {
            sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(self.lock_key)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            // Closing the session releases the advisory lock server-side.
            drop(conn.detach());
        }
    }
}

/// Runs job functions under their lease.
pub struct JobRunner {
    lease: JobLease,
}

impl JobRunner {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            lease: JobLease::new(pool),
        }
    }

    /// Run `f` if the lease is free; skip silently otherwise. Returns
    /// `None` on a skip, `Some(output)` when the job ran.
    pub async fn run_exclusive<T, F, Fut>(&self, job: &JobName, f: F) -> SyncResult<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let Some(guard) = self.lease.try_acquire(job).await? else {
            info!(job = job.name, "Another instance holds the lease, skipping");
            return Ok(None);
        };

        let outcome = f().await;
        let released = guard.release().await;
        let value = outcome?;
        released?;
        Ok(Some(value))
    }
}

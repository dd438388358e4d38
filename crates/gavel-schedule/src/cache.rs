//! Single-key timed cache over the classification snapshot.
//!
//! One snapshot is held under a fixed name and rebuilt at most once per
//! expiry window. Rebuilds are serialized behind a mutex so a burst of
//! concurrent misses performs exactly one rebuild, with the other callers
//! blocking on the lock until it lands. The timer is the only invalidation:
//! a mapping-graph write becomes visible at the next expiry (or explicit
//! eviction), never before.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::builder::build_snapshot;
use crate::error::ScheduleResult;
use crate::snapshot::CachedScheduleInformation;

/// The fixed cache key.
pub const CACHE_NAME: &str = "schedule-information";

/// Default expiry window.
pub const DEFAULT_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Where a fresh snapshot comes from. Split from the cache so the rules and
/// the timer can be tested without a store.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn load(&self) -> ScheduleResult<CachedScheduleInformation>;
}

/// Production source: one consistent read of the mapping graph.
pub struct DbSnapshotSource {
    pool: PgPool,
}

impl DbSnapshotSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotSource for DbSnapshotSource {
    async fn load(&self) -> ScheduleResult<CachedScheduleInformation> {
        build_snapshot(&self.pool).await
    }
}

struct Entry {
    snapshot: Arc<CachedScheduleInformation>,
    refreshed_at: Instant,
}

/// The cache itself.
pub struct ScheduleCache<S> {
    source: S,
    ttl: Duration,
    state: Mutex<Option<Entry>>,
}

impl<S: SnapshotSource> ScheduleCache<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_ttl(source, DEFAULT_TTL)
    }

    #[must_use]
    pub fn with_ttl(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            state: Mutex::new(None),
        }
    }

    /// The most recent snapshot, rebuilding synchronously on first access or
    /// after expiry.
    ///
    /// Callers must not assume freshness stronger than "as of the last
    /// successful rebuild": if a rebuild fails and a previous snapshot
    /// exists, the stale snapshot keeps serving and the rebuild is retried
    /// on the next call.
    pub async fn get(&self) -> ScheduleResult<Arc<CachedScheduleInformation>> {
        let mut state = self.state.lock().await;

        if let Some(entry) = state.as_ref() {
            if entry.refreshed_at.elapsed() < self.ttl {
                return Ok(entry.snapshot.clone());
            }
        }

        match self.source.load().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *state = Some(Entry {
                    snapshot: snapshot.clone(),
                    refreshed_at: Instant::now(),
                });
                Ok(snapshot)
            }
            Err(err) => match state.as_ref() {
                Some(entry) => {
                    warn!(
                        cache = CACHE_NAME,
                        error = %err,
                        "Snapshot rebuild failed, serving stale data"
                    );
                    Ok(entry.snapshot.clone())
                }
                None => Err(err),
            },
        }
    }

    /// Drop the cached snapshot so the next read rebuilds. Invoked by the
    /// scheduled eviction job.
    pub async fn evict(&self) {
        let mut state = self.state.lock().await;
        if state.take().is_some() {
            info!(cache = CACHE_NAME, "Evicted schedule classification snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScheduleError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingSource {
        loads: AtomicUsize,
        fail: AtomicBool,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                loads: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl SnapshotSource for CountingSource {
        async fn load(&self) -> ScheduleResult<CachedScheduleInformation> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ScheduleError::Linkage("store unreachable".to_string()));
            }
            let mut snapshot = CachedScheduleInformation::default();
            snapshot.serious_violent.insert("SV01001".to_string());
            Ok(snapshot)
        }
    }

    #[tokio::test]
    async fn test_get_memoizes_within_ttl() {
        let cache = ScheduleCache::with_ttl(CountingSource::new(), Duration::from_secs(3600));

        let first = cache.get().await.unwrap();
        let second = cache.get().await.unwrap();

        assert!(first.serious_violent.contains("SV01001"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_rebuilds() {
        let cache = ScheduleCache::with_ttl(CountingSource::new(), Duration::from_millis(0));

        cache.get().await.unwrap();
        cache.get().await.unwrap();

        assert_eq!(cache.source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_eviction_forces_rebuild() {
        let cache = ScheduleCache::with_ttl(CountingSource::new(), Duration::from_secs(3600));

        cache.get().await.unwrap();
        cache.evict().await;
        cache.get().await.unwrap();

        assert_eq!(cache.source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_rebuild_serves_stale_snapshot() {
        let cache = ScheduleCache::with_ttl(CountingSource::new(), Duration::from_millis(0));

        let first = cache.get().await.unwrap();
        cache.source.fail.store(true, Ordering::SeqCst);

        // TTL has lapsed and the rebuild fails; the stale snapshot serves.
        let second = cache.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_failed_first_build_is_an_error() {
        let source = CountingSource::new();
        source.fail.store(true, Ordering::SeqCst);
        let cache = ScheduleCache::with_ttl(source, Duration::from_secs(3600));

        assert!(cache.get().await.is_err());
    }
}

//! In-process result cache with a per-call time-to-live.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::model::SourceId;

/// Stored result of one source together with the moment it was computed.
#[derive(Clone)]
pub struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    computed_at: Instant,
}

impl CacheEntry {
    /// Moment the value was computed.
    #[must_use]
    pub fn computed_at(&self) -> Instant {
        self.computed_at
    }

    /// An entry is fresh while strictly less than `ttl` has elapsed.
    #[must_use]
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.computed_at) < ttl
    }
}

/// Memoizes source results keyed by [`SourceId`].
///
/// Only successful results are stored. Concurrent misses for the same key are
/// not deduplicated: each caller computes and the last write wins.
#[derive(Default)]
pub struct TimedCache {
    entries: Mutex<HashMap<SourceId, CacheEntry>>,
}

impl TimedCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `id` if it is younger than `ttl`, otherwise
    /// run `compute`, store its value and return it.
    ///
    /// # Errors
    ///
    /// Returns whatever `compute` fails with. Failures are not cached, so the
    /// next call computes again.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        id: &SourceId,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let now = Instant::now();
        if let Some(value) = self.lookup::<T>(id, ttl, now) {
            tracing::debug!(source = %id, "cache hit");
            return Ok(value);
        }

        tracing::debug!(source = %id, "cache miss");
        let value = compute().await?;

        self.lock().insert(
            id.clone(),
            CacheEntry {
                value: Arc::new(value.clone()),
                computed_at: now,
            },
        );

        Ok(value)
    }

    /// Drop the entry for `id`, forcing the next lookup to compute.
    pub fn invalidate(&self, id: &SourceId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Number of stored entries, fresh or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lookup<T: Clone + 'static>(&self, id: &SourceId, ttl: Duration, now: Instant) -> Option<T> {
        let entries = self.lock();
        let entry = entries.get(id).filter(|entry| entry.is_fresh(ttl, now))?;
        // A value of another type under the same id counts as a miss.
        entry.value.downcast_ref::<T>().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SourceId, CacheEntry>> {
        // The map is always left consistent, so a poisoned lock is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

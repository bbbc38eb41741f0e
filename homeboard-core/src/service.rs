//! High-level service facade combining the three dashboard sources.

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::cache::TimedCache;
use crate::fetch::FetchPort;
use crate::model::{BinCollection, Fixture, TramDeparture};
use crate::ports::PortError;
use crate::source::{FailurePolicy, Source, SourceMeta};

/// Record sets for one page render. Each source succeeds or fails on its own.
#[derive(Debug)]
pub struct Board {
    /// Upcoming tram departures.
    pub trams: Result<Vec<TramDeparture>, PortError>,
    /// Upcoming fixtures.
    pub fixtures: Result<Vec<Fixture>, PortError>,
    /// Upcoming bin collections.
    pub bins: Result<Vec<BinCollection>, PortError>,
}

/// Public entry point owning the fetcher, the cache, and the configured sources.
pub struct DashboardService {
    fetcher: Arc<dyn FetchPort>,
    cache: TimedCache,
    trams: Source<TramDeparture>,
    fixtures: Source<Fixture>,
    bins: Source<BinCollection>,
}

impl DashboardService {
    /// Create a new service with an empty cache.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn FetchPort>,
        trams: Source<TramDeparture>,
        fixtures: Source<Fixture>,
        bins: Source<BinCollection>,
    ) -> Self {
        Self {
            fetcher,
            cache: TimedCache::new(),
            trams,
            fixtures,
            bins,
        }
    }

    /// Metadata of the tram, fixture and bin sources, in that order.
    #[must_use]
    pub fn sources(&self) -> [&SourceMeta; 3] {
        [&self.trams.meta, &self.fixtures.meta, &self.bins.meta]
    }

    /// Load tram departures.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] if the fetch or extraction fails and the source
    /// propagates failures.
    pub async fn tram_departures(&self) -> Result<Vec<TramDeparture>, PortError> {
        self.records(&self.trams).await
    }

    /// Load upcoming fixtures.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] if the fetch or extraction fails and the source
    /// propagates failures.
    pub async fn fixtures(&self) -> Result<Vec<Fixture>, PortError> {
        self.records(&self.fixtures).await
    }

    /// Load upcoming bin collections.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] if the fetch or extraction fails and the source
    /// propagates failures.
    pub async fn bin_collections(&self) -> Result<Vec<BinCollection>, PortError> {
        self.records(&self.bins).await
    }

    /// Load all three sources one after another.
    pub async fn board(&self) -> Board {
        Board {
            trams: self.tram_departures().await,
            fixtures: self.fixtures().await,
            bins: self.bin_collections().await,
        }
    }

    async fn records<R>(&self, source: &Source<R>) -> Result<Vec<R>, PortError>
    where
        R: Clone + Send + Sync + 'static,
    {
        let today = Local::now().date_naive();
        let result = self
            .cache
            .get_or_compute(&source.meta.id, source.meta.ttl, || {
                self.fetch_and_extract(source, today)
            })
            .await;

        match result {
            Ok(records) => Ok(records),
            Err(err) if source.meta.failure == FailurePolicy::Empty => {
                tracing::warn!(source = %source.meta.id, error = %err, "source failed, showing no records");
                Ok(Vec::new())
            }
            Err(err) => {
                tracing::warn!(source = %source.meta.id, error = %err, "source failed");
                Err(err)
            }
        }
    }

    async fn fetch_and_extract<R>(
        &self,
        source: &Source<R>,
        today: NaiveDate,
    ) -> Result<Vec<R>, PortError> {
        let html = self.fetcher.fetch(&source.request).await?;
        let records = source.extractor.extract(&html, today)?;
        tracing::debug!(source = %source.meta.id, count = records.len(), "extracted records");
        Ok(records)
    }
}

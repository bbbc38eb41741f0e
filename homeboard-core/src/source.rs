//! Description of one fetch, extract and cache pipeline.

use std::sync::Arc;
use std::time::Duration;

use crate::fetch::FetchRequest;
use crate::model::SourceId;
use crate::ports::Extractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What the service does when fetching or extracting a source fails.
pub enum FailurePolicy {
    /// Hand the error to the caller.
    Propagate,
    /// Log the error and substitute an empty record list.
    Empty,
}

#[derive(Debug, Clone)]
/// Static metadata describing a source.
pub struct SourceMeta {
    /// Cache key; unique per configured source.
    pub id: SourceId,
    /// Human-friendly name shown on the page.
    pub name: String,
    /// How long a successful result stays fresh.
    pub ttl: Duration,
    /// Behaviour on failure.
    pub failure: FailurePolicy,
}

/// A configured source: where to fetch, how to extract, and how long to cache.
pub struct Source<R> {
    /// Static metadata.
    pub meta: SourceMeta,
    /// Outbound request issued on a cache miss.
    pub request: FetchRequest,
    /// Extractor turning the fetched page into records.
    pub extractor: Arc<dyn Extractor<Record = R>>,
}

impl<R> Source<R> {
    /// Bundle a request and an extractor under the given metadata.
    pub fn new<E>(meta: SourceMeta, request: FetchRequest, extractor: E) -> Self
    where
        E: Extractor<Record = R> + 'static,
    {
        Self {
            meta,
            request,
            extractor: Arc::new(extractor),
        }
    }
}

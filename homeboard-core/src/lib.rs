//! Core types and pipeline wiring for the homeboard dashboard.

/// Time-windowed memoization of source results.
pub mod cache;
/// HTTP fetching of raw source pages.
pub mod fetch;
/// Domain records produced by the extractors.
pub mod model;
/// Traits describing the extractor seam and the shared error type.
pub mod ports;
/// High-level service facade used by the render layer.
pub mod service;
/// Generic fetch, extract and cache pipeline description.
pub mod source;

pub use cache::*;
pub use fetch::*;
pub use model::*;
pub use ports::*;
pub use service::*;
pub use source::*;

//! Traits describing source capabilities and the shared error type.

use std::string::FromUtf8Error;

use chrono::{NaiveDate, ParseError as ChronoParseError};
use reqwest::Error as ReqwestError;

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while fetching or extracting a source.
pub enum PortError {
    /// Network layer failed, timed out, or the upstream answered with a non-2xx status.
    #[error("Fetch error: {0}")]
    Fetch(#[from] ReqwestError),
    /// The response body was not valid UTF-8.
    #[error("Decode error: {0}")]
    Decode(#[from] FromUtf8Error),
    /// The page did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
    /// Failed to parse a date or time taken from the page.
    #[error("Date error: {0}")]
    Date(#[from] ChronoParseError),
}

/// Trait for source-specific HTML extractors.
///
/// Extractors are pure: they never touch the network and only depend on the
/// page text and the calendar date the page is interpreted against.
pub trait Extractor: Send + Sync {
    /// Record type produced for each matching item on the page.
    type Record;

    /// Turn the raw page into records.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the page as a whole cannot be interpreted.
    /// Malformed individual items are skipped instead.
    fn extract(&self, html: &str, today: NaiveDate) -> Result<Vec<Self::Record>, PortError>;
}

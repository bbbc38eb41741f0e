//! Domain data structures for tram departures, fixtures, and bin collections.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Built-in data sources shown on the dashboard.
pub enum Sources {
    /// Tram departure board.
    Trams,
    /// Football fixture list.
    Fixtures,
    /// Municipal bin-collection schedule.
    Bins,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier used to key cached results of a configured source.
pub struct SourceId(pub String);

impl fmt::Display for Sources {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            Sources::Trams => "trams",
            Sources::Fixtures => "fixtures",
            Sources::Bins => "bins",
        };
        write!(formatter, "{slug}")
    }
}

impl From<Sources> for SourceId {
    fn from(source: Sources) -> Self {
        SourceId(source.to_string())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A scheduled tram departure and its estimated arrival at downstream stops.
pub struct TramDeparture {
    /// Departure time from the configured stop.
    pub scheduled: NaiveTime,
    /// Arrival times at the downstream stops, in configured stop order.
    pub derived: Vec<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Upcoming football match.
pub struct Fixture {
    /// Competition name, empty when the source does not label it.
    pub competition: String,
    /// Match date, if the source carried one.
    pub date: Option<NaiveDate>,
    /// Local kickoff time, if the source carried one.
    pub kickoff: Option<NaiveTime>,
    /// Team playing at home.
    pub home_team: String,
    /// Visiting team.
    pub away_team: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Waste streams collected by the council.
pub enum BinKind {
    /// Black/residual bin.
    General,
    /// Blue bin for paper and card.
    Paper,
    /// Brown bin for glass and cans.
    Glass,
}

impl fmt::Display for BinKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BinKind::General => "general",
            BinKind::Paper => "paper",
            BinKind::Glass => "glass",
        };
        formatter.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
/// Scheduled collection of one waste stream on a given day.
pub struct BinCollection {
    /// Collection day.
    pub date: NaiveDate,
    /// Stream collected that day.
    #[serde(rename = "type")]
    pub kind: BinKind,
}

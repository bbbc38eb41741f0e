//! Provider for tram departures scraped from bustimes.org stop pages.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use scraper::{ElementRef, Html, Selector};

use homeboard_core::{
    fetch::FetchRequest,
    model::{Sources, TramDeparture},
    ports::{Extractor, PortError},
    source::{FailurePolicy, Source, SourceMeta},
};

const BASE_URL: &str = "https://bustimes.org/stops";
const TIME_FORMAT: &str = "%H:%M";
const MINUTES_PER_DAY: i64 = 24 * 60;

static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));

/// Departure boards change by the minute.
pub const TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
/// Stop further down the line and the usual travel time to reach it.
pub struct DownstreamStop {
    /// Display name.
    pub name: String,
    /// Minutes after departure from the configured stop.
    pub offset_minutes: i64,
}

impl DownstreamStop {
    /// Create a downstream stop.
    #[must_use]
    pub fn new<N: Into<String>>(name: N, offset_minutes: i64) -> Self {
        Self {
            name: name.into(),
            offset_minutes,
        }
    }
}

/// City-centre stops on the Middlewood line.
#[must_use]
pub fn default_stops() -> Vec<DownstreamStop> {
    vec![
        DownstreamStop::new("Kelham Island", 12),
        DownstreamStop::new("University", 16),
        DownstreamStop::new("Cathedral", 20),
    ]
}

/// Extracts scheduled times from every departure table on the page.
pub struct TramExtractor {
    offsets: Vec<TimeDelta>,
}

impl TramExtractor {
    /// Create an extractor deriving one arrival time per downstream stop.
    #[must_use]
    pub fn new(stops: &[DownstreamStop]) -> Self {
        Self {
            offsets: stops
                .iter()
                .map(|stop| clock_offset(stop.offset_minutes))
                .collect(),
        }
    }

    fn departure(&self, scheduled: NaiveTime) -> TramDeparture {
        // Arrivals past midnight wrap around the clock.
        let derived = self
            .offsets
            .iter()
            .map(|offset| scheduled.overflowing_add_signed(*offset).0)
            .collect();
        TramDeparture { scheduled, derived }
    }
}

impl Extractor for TramExtractor {
    type Record = TramDeparture;

    fn extract(&self, html: &str, _today: NaiveDate) -> Result<Vec<TramDeparture>, PortError> {
        let document = Html::parse_document(html);

        let mut departures = Vec::new();

        // Today and tomorrow may be split across several tables.
        for table in document.select(&TABLE) {
            for row in table.select(&ROW).skip(1) {
                let Some(cell) = row.select(&CELL).nth(2) else {
                    continue;
                };

                let text = element_text(cell);
                if text.is_empty() {
                    continue;
                }

                let scheduled = NaiveTime::parse_from_str(&text, TIME_FORMAT)?;
                departures.push(self.departure(scheduled));
            }
        }

        Ok(departures)
    }
}

/// Build the tram source for a bustimes.org stop reference.
#[must_use]
pub fn source(stop_ref: &str, stop_name: &str, stops: &[DownstreamStop]) -> Source<TramDeparture> {
    let meta = SourceMeta {
        id: Sources::Trams.into(),
        name: stop_name.to_owned(),
        ttl: TTL,
        failure: FailurePolicy::Propagate,
    };

    Source::new(
        meta,
        FetchRequest::get(format!("{BASE_URL}/{stop_ref}")),
        TramExtractor::new(stops),
    )
}

/// Offset as seen on a 24-hour clock; whole days make no difference to the time shown.
fn clock_offset(minutes: i64) -> TimeDelta {
    TimeDelta::try_minutes(minutes.rem_euclid(MINUTES_PER_DAY)).unwrap_or_default()
}

/// Format a time the way departure boards show it.
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <h2>Today</h2>
        <table>
          <tr><th>Service</th><th>To</th><th>Time</th></tr>
          <tr><td>Yellow</td><td>Meadowhall</td><td>08:00</td></tr>
          <tr><td>Yellow</td><td>Meadowhall</td><td> </td></tr>
          <tr><td>Notice</td><td>Engineering works</td></tr>
          <tr><td>Yellow</td><td>Meadowhall</td><td>23:55</td></tr>
        </table>
        <h2>Tomorrow</h2>
        <table>
          <tr><th>Service</th><th>To</th><th>Time</th></tr>
          <tr><td>Yellow</td><td>Meadowhall</td><td>05:40</td></tr>
        </table>
        </body></html>
    "#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap_or_default()
    }

    fn times(departure: &TramDeparture) -> Vec<String> {
        std::iter::once(departure.scheduled)
            .chain(departure.derived.iter().copied())
            .map(format_time)
            .collect()
    }

    #[test]
    fn derives_arrival_times_for_each_stop() {
        let extractor = TramExtractor::new(&default_stops());
        let departures = extractor.extract(PAGE, today()).unwrap_or_default();

        assert_eq!(
            departures.first().map(times),
            Some(vec![
                "08:00".to_owned(),
                "08:12".to_owned(),
                "08:16".to_owned(),
                "08:20".to_owned(),
            ])
        );
    }

    #[test]
    fn keeps_table_then_row_order_and_skips_blank_or_short_rows() {
        let extractor = TramExtractor::new(&default_stops());
        let departures = extractor.extract(PAGE, today()).unwrap_or_default();

        let scheduled: Vec<String> = departures
            .iter()
            .map(|departure| format_time(departure.scheduled))
            .collect();
        assert_eq!(scheduled, ["08:00", "23:55", "05:40"]);
    }

    #[test]
    fn wraps_arrivals_past_midnight() {
        let extractor = TramExtractor::new(&default_stops());
        let departures = extractor.extract(PAGE, today()).unwrap_or_default();

        assert_eq!(
            departures.get(1).map(times),
            Some(vec![
                "23:55".to_owned(),
                "00:07".to_owned(),
                "00:11".to_owned(),
                "00:15".to_owned(),
            ])
        );
    }

    #[test]
    fn offsets_of_any_size_stay_on_the_clock() {
        let extractor = TramExtractor::new(&[
            DownstreamStop::new("Far away", i64::MAX),
            DownstreamStop::new("Behind", -5),
            DownstreamStop::new("Next day", 24 * 60 + 1),
        ]);
        let departures = extractor.extract(PAGE, today()).unwrap_or_default();

        let expected_far = NaiveTime::from_hms_opt(8, 0, 0)
            .map(|time| time.overflowing_add_signed(clock_offset(i64::MAX)).0);
        assert_eq!(
            departures.first().map(times),
            Some(vec![
                "08:00".to_owned(),
                expected_far.map(format_time).unwrap_or_default(),
                "07:55".to_owned(),
                "08:01".to_owned(),
            ])
        );
    }

    #[test]
    fn malformed_time_fails_the_page() {
        let page = "<table><tr><th>h</th></tr><tr><td>a</td><td>b</td><td>due</td></tr></table>";
        let result = TramExtractor::new(&default_stops()).extract(page, today());
        assert!(matches!(result, Err(PortError::Date(_))));
    }

    #[test]
    fn page_without_tables_yields_nothing() {
        let result = TramExtractor::new(&default_stops()).extract("<p>No departures</p>", today());
        assert_eq!(result.ok(), Some(Vec::new()));
    }

    #[test]
    fn source_targets_stop_page() {
        let source = source("9400ZZSYMID1", "Middlewood To City", &default_stops());
        assert_eq!(source.request.url, "https://bustimes.org/stops/9400ZZSYMID1");
        assert_eq!(source.meta.ttl, Duration::from_secs(30));
        assert_eq!(source.meta.failure, FailurePolicy::Propagate);
        assert_eq!(source.meta.id.0, "trams");
    }
}

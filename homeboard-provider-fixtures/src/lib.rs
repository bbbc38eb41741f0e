//! Provider for upcoming home fixtures scraped from fixtur.es.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use scraper::{ElementRef, Html, Selector};

use homeboard_core::{
    fetch::FetchRequest,
    model::{Fixture, Sources},
    ports::{Extractor, PortError},
    source::{FailurePolicy, Source, SourceMeta},
};

const BASE_URL: &str = "https://fixtur.es/en/team";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TEAM_SEPARATOR: char = '-';

static CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector("div.wedstrijden"));
static ITEM: LazyLock<Selector> = LazyLock::new(|| selector(r#"div[id^="fi_event_"]"#));
static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static TIME: LazyLock<Selector> = LazyLock::new(|| selector("time"));
static DIV: LazyLock<Selector> = LazyLock::new(|| selector("div"));

/// Fixture lists rarely change within the hour.
pub const TTL: Duration = Duration::from_secs(3600);

/// Fixtures kept per fetch unless configured otherwise.
pub const DEFAULT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Rule picking the line that names the two teams.
pub enum TeamMatch {
    /// First nested line containing the separator.
    #[default]
    AnySeparator,
    /// First nested line containing the separator and the given team name.
    Containing(String),
}

impl TeamMatch {
    fn accepts(&self, line: &str) -> bool {
        line.contains(TEAM_SEPARATOR)
            && match self {
                TeamMatch::AnySeparator => true,
                TeamMatch::Containing(team) => line.contains(team.as_str()),
            }
    }
}

/// Extracts upcoming fixtures from the `wedstrijden` list of a team page.
pub struct FixtureExtractor {
    limit: usize,
    team_match: TeamMatch,
}

impl FixtureExtractor {
    /// Create an extractor keeping at most `limit` fixtures.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            team_match: TeamMatch::default(),
        }
    }

    /// Use a different rule for finding the teams line.
    #[must_use]
    pub fn with_team_match(mut self, team_match: TeamMatch) -> Self {
        self.team_match = team_match;
        self
    }

    fn fixture(&self, item: ElementRef<'_>, today: NaiveDate) -> Option<Fixture> {
        let competition = item
            .select(&IMG)
            .next()
            .and_then(|img| img.value().attr("title"))
            .unwrap_or_default()
            .to_owned();

        let (date_part, time_part) = item
            .select(&TIME)
            .next()
            .and_then(|time| time.value().attr("datetime"))
            .map(split_datetime)
            .unwrap_or_default();

        let date = if date_part.is_empty() {
            None
        } else {
            match NaiveDate::parse_from_str(date_part, DATE_FORMAT) {
                Ok(date) => Some(date),
                Err(err) => {
                    tracing::debug!(date = date_part, error = %err, "skipping fixture with unreadable date");
                    return None;
                }
            }
        };

        if date.is_some_and(|date| date < today) {
            return None;
        }

        let teams_line = item
            .select(&DIV)
            .map(element_text)
            .find(|line| self.team_match.accepts(line))?;
        let (home, away) = teams_line.split_once(TEAM_SEPARATOR)?;

        Some(Fixture {
            competition,
            date,
            kickoff: parse_kickoff(time_part),
            home_team: collapse_whitespace(home),
            away_team: collapse_whitespace(away),
        })
    }
}

impl Extractor for FixtureExtractor {
    type Record = Fixture;

    fn extract(&self, html: &str, today: NaiveDate) -> Result<Vec<Fixture>, PortError> {
        let document = Html::parse_document(html);
        let Some(container) = document.select(&CONTAINER).next() else {
            return Ok(Vec::new());
        };

        let mut fixtures = Vec::new();

        for item in container.select(&ITEM) {
            if fixtures.len() >= self.limit {
                break;
            }
            if let Some(fixture) = self.fixture(item, today) {
                fixtures.push(fixture);
            }
        }

        Ok(fixtures)
    }
}

/// Build the fixture source for a fixtur.es team identifier.
#[must_use]
pub fn source(team_id: &str, team_name: &str, extractor: FixtureExtractor) -> Source<Fixture> {
    let meta = SourceMeta {
        id: Sources::Fixtures.into(),
        name: team_name.to_owned(),
        ttl: TTL,
        failure: FailurePolicy::Propagate,
    };

    Source::new(
        meta,
        FetchRequest::get(format!("{BASE_URL}/{team_id}/home")).browser_user_agent(),
        extractor,
    )
}

/// Split `2025-11-01T15:00:00+00:00` into its date and offset-free time.
fn split_datetime(raw: &str) -> (&str, &str) {
    match raw.split_once('T') {
        // The time itself never contains an offset sign or `Z`.
        Some((date, rest)) => (date, rest.split(['+', '-', 'Z']).next().unwrap_or_default()),
        None => (raw, ""),
    }
}

fn parse_kickoff(raw: &str) -> Option<NaiveTime> {
    ["%H:%M:%S", "%H:%M"]
        .into_iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use homeboard_core::model::{BinCollection, Fixture, TramDeparture};
use homeboard_core::service::Board;
use homeboard_provider_trams::format_time;
use html_escape::encode_text;

/// Labels that do not change between renders.
#[derive(Debug, Clone)]
pub(crate) struct PageContext {
    pub stop_name: String,
    pub team_name: String,
    pub stop_labels: Vec<String>,
}

const STYLE: &str = "body{font-family:sans-serif;margin:1rem;background:#111;color:#eee}\
section{margin-bottom:1.5rem}table{border-collapse:collapse}td,th{padding:.2rem .6rem;text-align:left}\
.unavailable{color:#e66}.countdown{color:#aaa}.bin-general{color:#bbb}.bin-paper{color:#59f}.bin-glass{color:#c84}\
.next{font-weight:bold}.imminent{color:#fc3}.alert{color:#f44}";

/// Departures this close are highlighted.
const IMMINENT_TRAM_MINUTES: i64 = 15;
/// Fixtures are highlighted from an hour before kick-off.
const MATCH_LEAD_MINUTES: i64 = 60;
/// Full time, near enough.
const MATCH_PLAYING_MINUTES: i64 = 120;
/// Fixtures drop off the board this long after kick-off.
const MATCH_WINDOW_MINUTES: i64 = 150;

pub(crate) fn render(board: &Board, page: &PageContext, now: NaiveDateTime) -> String {
    let trams = match &board.trams {
        Ok(departures) => tram_table(departures, &page.stop_labels, now),
        Err(_) => unavailable("Tram times"),
    };
    let fixtures = match &board.fixtures {
        Ok(fixtures) => fixture_list(fixtures, now),
        Err(_) => unavailable("Fixtures"),
    };
    let bins = match &board.bins {
        Ok(collections) => bin_list(collections, now.date()),
        Err(_) => unavailable("Bin collections"),
    };

    format!(
        r#"<!doctype html>
<html lang="en"><head><meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta http-equiv="refresh" content="30">
<title>Homeboard</title><style>{STYLE}</style></head>
<body>
<header><span id="clock">{clock}</span></header>
<section id="trams"><h2>{stop_name}</h2>{trams}</section>
<section id="fixtures"><h2>{team_name} home fixtures</h2>{fixtures}</section>
<section id="bins"><h2>Bin collections</h2>{bins}</section>
</body></html>"#,
        clock = now.format("%H:%M:%S"),
        stop_name = encode_text(&page.stop_name),
        team_name = encode_text(&page.team_name),
    )
}

fn tram_table(departures: &[TramDeparture], stop_labels: &[String], now: NaiveDateTime) -> String {
    let upcoming: Vec<(&TramDeparture, TimeDelta)> = departures
        .iter()
        .filter_map(|departure| Some((departure, until_departure(departure.scheduled, now)?)))
        .collect();

    let Some(soonest) = upcoming.iter().map(|(_, wait)| *wait).min() else {
        return "<p>No departures listed.</p>".to_owned();
    };

    let header: String = std::iter::once("Departs".to_owned())
        .chain(stop_labels.iter().map(|label| encode_text(label).into_owned()))
        .map(|label| format!("<th>{label}</th>"))
        .collect();

    let rows: String = upcoming
        .iter()
        .map(|(departure, wait)| {
            let cells: String = std::iter::once(departure.scheduled)
                .chain(departure.derived.iter().copied())
                .map(|time| format!("<td>{}</td>", format_time(time)))
                .collect();
            let imminent = wait.num_minutes() <= IMMINENT_TRAM_MINUTES;
            format!("<tr{}>{cells}</tr>", class_attr(&[("imminent", imminent)]))
        })
        .collect();

    format!(
        r#"<p class="countdown">Next tram in {} min</p><table><tr>{header}</tr>{rows}</table>"#,
        soonest.num_minutes()
    )
}

/// Time until a departure shown on a 24-hour board; times already gone today mean tomorrow.
fn until_departure(scheduled: NaiveTime, now: NaiveDateTime) -> Option<TimeDelta> {
    let today = now.date().and_time(scheduled);
    let at = if today < now {
        today.checked_add_signed(TimeDelta::days(1))?
    } else {
        today
    };
    let wait = at - now;
    (wait > TimeDelta::zero()).then_some(wait)
}

fn fixture_list(fixtures: &[Fixture], now: NaiveDateTime) -> String {
    let today = now.date();
    let shown: Vec<&Fixture> = fixtures
        .iter()
        .filter(|fixture| !fixture_over(fixture, now))
        .collect();

    if shown.is_empty() {
        return "<p>No upcoming home fixtures.</p>".to_owned();
    }

    let items: String = shown
        .iter()
        .map(|fixture| {
            let when = match (fixture.date, fixture.kickoff) {
                (Some(date), Some(kickoff)) => {
                    format!("{} at {}", date.format("%d/%m/%Y"), format_time(kickoff))
                }
                (Some(date), None) => date.format("%d/%m/%Y").to_string(),
                (None, _) => "Date to be confirmed".to_owned(),
            };
            let competition = if fixture.competition.is_empty() {
                String::new()
            } else {
                format!(" <small>{}</small>", encode_text(&fixture.competition))
            };
            let imminent = fixture.date == Some(today);
            let alert = kickoff_at(fixture).is_some_and(|start| {
                now >= shift(start, -MATCH_LEAD_MINUTES) && now <= shift(start, MATCH_WINDOW_MINUTES)
            });
            format!(
                "<li{}>{} vs {}{competition}<br>{when}</li>",
                class_attr(&[("imminent", imminent), ("alert", alert)]),
                encode_text(&fixture.home_team),
                encode_text(&fixture.away_team),
            )
        })
        .collect();

    let countdown = match_countdown(&shown, now)
        .map(|label| format!(r#"<p class="countdown">{label}</p>"#))
        .unwrap_or_default();

    format!("{countdown}<ul>{items}</ul>")
}

fn kickoff_at(fixture: &Fixture) -> Option<NaiveDateTime> {
    Some(fixture.date?.and_time(fixture.kickoff?))
}

fn fixture_over(fixture: &Fixture, now: NaiveDateTime) -> bool {
    match (kickoff_at(fixture), fixture.date) {
        (Some(start), _) => now > shift(start, MATCH_WINDOW_MINUTES),
        (None, Some(date)) => date < now.date(),
        (None, None) => false,
    }
}

/// Describe the match being played, or failing that the next one to kick off.
fn match_countdown(fixtures: &[&Fixture], now: NaiveDateTime) -> Option<String> {
    let mut starts: Vec<NaiveDateTime> =
        fixtures.iter().copied().filter_map(kickoff_at).collect();
    starts.sort_unstable();

    if let Some(start) = starts
        .iter()
        .copied()
        .find(|start| now >= *start && now < shift(*start, MATCH_WINDOW_MINUTES))
    {
        let playing_until = shift(start, MATCH_PLAYING_MINUTES);
        return Some(if now < playing_until {
            let left = playing_until - now;
            format!(
                "Match ongoing, {}h {}m left",
                left.num_hours(),
                left.num_minutes() % 60
            )
        } else {
            let left = shift(start, MATCH_WINDOW_MINUTES) - now;
            format!("Match finishing, {}m left", (left.num_seconds() + 59) / 60)
        });
    }

    let start = starts.into_iter().find(|start| *start > now)?;
    let wait = start - now;
    Some(format!(
        "Next match in {}d {}h {}m",
        wait.num_days(),
        wait.num_hours() % 24,
        wait.num_minutes() % 60
    ))
}

fn shift(at: NaiveDateTime, minutes: i64) -> NaiveDateTime {
    at.checked_add_signed(TimeDelta::minutes(minutes)).unwrap_or(at)
}

fn bin_list(collections: &[BinCollection], today: NaiveDate) -> String {
    let upcoming: Vec<&BinCollection> = collections
        .iter()
        .filter(|collection| collection.date >= today)
        .collect();

    let Some(next) = upcoming.iter().map(|collection| collection.date).min() else {
        return "<p>No collections found.</p>".to_owned();
    };

    let days = (next - today).num_days();
    let due = match days {
        0 => "Today".to_owned(),
        1 => "Tomorrow".to_owned(),
        n => format!("{n} days"),
    };

    let items: String = upcoming
        .iter()
        .map(|collection| {
            let is_next = collection.date == next;
            format!(
                r#"<li class="bin-{kind}{next}{imminent}" data-date="{iso}">{day} <strong>{kind}</strong></li>"#,
                kind = collection.kind,
                next = if is_next { " next" } else { "" },
                imminent = if is_next && days <= 1 { " imminent" } else { "" },
                iso = collection.date.format("%Y-%m-%d"),
                day = collection.date.format("%a %d/%m/%Y"),
            )
        })
        .collect();

    format!(r#"<p class="countdown">Next bin: {due}</p><ul>{items}</ul>"#)
}

fn class_attr(flags: &[(&str, bool)]) -> String {
    let classes: Vec<&str> = flags
        .iter()
        .filter(|(_, on)| *on)
        .map(|(class, _)| *class)
        .collect();
    if classes.is_empty() {
        String::new()
    } else {
        format!(r#" class="{}""#, classes.join(" "))
    }
}

fn unavailable(what: &str) -> String {
    format!(r#"<p class="unavailable">{what} unavailable right now.</p>"#)
}

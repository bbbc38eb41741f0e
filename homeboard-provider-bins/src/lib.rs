//! Provider for bin collection dates scraped from council waste services pages.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use homeboard_core::{
    fetch::FetchRequest,
    model::{BinCollection, BinKind, Sources},
    ports::{Extractor, PortError},
    source::{FailurePolicy, Source, SourceMeta},
};

/// Council whose waste services site is used unless configured otherwise.
pub const DEFAULT_AUTHORITY: &str = "sheffield";

/// Collection rounds change a few times a year at most.
pub const TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// The council site is slow; give up rather than stall the page.
pub const TIMEOUT: Duration = Duration::from_secs(20);

// "2 Oct 2025", "02 October 2025"
const DATE_PATTERN: &str = r"\d{1,2}\s+[A-Za-z]{3,9}\s+\d{4}";
const DATE_FORMATS: [&str; 2] = ["%d %b %Y", "%d %B %Y"];
const SERVICE_CLASS: &str = "service-id-";

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DATE_PATTERN).expect("date pattern is valid"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static NAME: LazyLock<Selector> = LazyLock::new(|| selector("h4"));
static NEXT_SERVICE: LazyLock<Selector> = LazyLock::new(|| selector("td.next-service"));

/// Extracts upcoming collections from the property's service table.
#[derive(Debug, Default)]
pub struct BinExtractor;

impl Extractor for BinExtractor {
    type Record = BinCollection;

    fn extract(&self, html: &str, _today: NaiveDate) -> Result<Vec<BinCollection>, PortError> {
        let document = Html::parse_document(html);

        // The service table is the first one carrying a class; layout tables have none.
        let Some(table) = document
            .select(&TABLE)
            .find(|table| table.value().classes().next().is_some())
        else {
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let mut collections = Vec::new();

        for row in table.select(&ROW) {
            if !row
                .value()
                .classes()
                .any(|class| class.contains(SERVICE_CLASS))
            {
                continue;
            }

            let name = row
                .select(&NAME)
                .next()
                .map(element_text)
                .unwrap_or_default();
            let Some(kind) = classify(&name) else {
                continue;
            };
            let Some(cell) = row.select(&NEXT_SERVICE).next() else {
                continue;
            };

            let text = cell.text().collect::<Vec<_>>().join(" ");
            for candidate in DATE_RE.find_iter(&text) {
                let Some(date) = parse_date(candidate.as_str()) else {
                    continue;
                };
                if seen.insert((date, kind)) {
                    collections.push(BinCollection { date, kind });
                }
            }
        }

        collections.sort_by_key(|collection| collection.date);

        Ok(collections)
    }
}

/// Build the bin collection source for a property on the given council's site.
#[must_use]
pub fn source(authority: &str, property_id: &str) -> Source<BinCollection> {
    let meta = SourceMeta {
        id: Sources::Bins.into(),
        name: String::from("Bin collections"),
        ttl: TTL,
        failure: FailurePolicy::Empty,
    };

    Source::new(
        meta,
        FetchRequest::get(format!(
            "https://wasteservices.{authority}.gov.uk/property/{property_id}"
        ))
        .browser_user_agent()
        .timeout(TIMEOUT),
        BinExtractor,
    )
}

/// Map a service heading such as "Black Bin" to the stream it collects.
#[must_use]
pub fn classify(name: &str) -> Option<BinKind> {
    let normalized = name.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|word| normalized.contains(word));

    if mentions(&["black", "residual"]) {
        Some(BinKind::General)
    } else if mentions(&["blue", "paper", "card"]) {
        Some(BinKind::Paper)
    } else if mentions(&["brown", "glass", "cans"]) {
        Some(BinKind::Glass)
    } else {
        None
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap_or_default()
    }

    fn row(service: u32, name: &str, next: &str) -> String {
        format!(
            r#"<tr class="service-id-{service} task-id-{service}">
                 <td class="service-name"><h4>{name}</h4></td>
                 <td class="next-service"><span class="table-label">Next Collections</span>{next}</td>
               </tr>"#
        )
    }

    fn page(rows: &[String]) -> String {
        format!(
            r#"<html><body><table class="table">
                 <thead><tr><th>Service</th><th>Next</th></tr></thead>
                 <tbody>{}</tbody>
               </table></body></html>"#,
            rows.concat()
        )
    }

    fn extract(html: &str) -> Vec<BinCollection> {
        BinExtractor.extract(html, today()).unwrap_or_default()
    }

    fn collection(year: i32, month: u32, day: u32, kind: BinKind) -> BinCollection {
        BinCollection {
            date: NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default(),
            kind,
        }
    }

    #[test]
    fn merges_services_sorted_by_date() {
        let html = page(&[
            row(1, "Black Bin", "2 Oct 2025, 16 Oct 2025"),
            row(2, "Blue Bin", "2 Oct 2025"),
        ]);

        assert_eq!(
            extract(&html),
            vec![
                collection(2025, 10, 2, BinKind::General),
                collection(2025, 10, 2, BinKind::Paper),
                collection(2025, 10, 16, BinKind::General),
            ]
        );
    }

    #[test]
    fn accepts_full_month_names_and_padded_days() {
        let html = page(&[row(3, "Brown Bin (glass and cans)", "02 October 2025")]);
        assert_eq!(extract(&html), vec![collection(2025, 10, 2, BinKind::Glass)]);
    }

    #[test]
    fn drops_unrecognised_services_and_unmarked_rows() {
        let html = page(&[
            row(4, "Green Bin", "3 Oct 2025"),
            r#"<tr class="other"><td><h4>Black Bin</h4></td><td class="next-service">4 Oct 2025</td></tr>"#
                .to_owned(),
        ]);
        assert!(extract(&html).is_empty());
    }

    #[test]
    fn collapses_duplicate_dates_per_stream() {
        let html = page(&[
            row(1, "Black Bin", "9 Oct 2025, 9 October 2025"),
            row(7, "Residual waste", "9 Oct 2025"),
        ]);
        assert_eq!(extract(&html), vec![collection(2025, 10, 9, BinKind::General)]);
    }

    #[test]
    fn discards_impossible_dates() {
        let html = page(&[row(2, "Blue Bin", "31 Feb 2025, 12 Sept 2025, 13 Nov 2025")]);
        assert_eq!(extract(&html), vec![collection(2025, 11, 13, BinKind::Paper)]);
    }

    #[test]
    fn joins_text_across_nested_elements() {
        let html = page(&[row(
            1,
            "Black Bin",
            "<span>20</span><span>Nov</span><span>2025</span>",
        )]);
        assert_eq!(extract(&html), vec![collection(2025, 11, 20, BinKind::General)]);
    }

    #[test]
    fn skips_tables_with_blank_class_attribute() {
        let html = format!(
            r#"<table class=""><tr class="service-id-9"><td><h4>Black Bin</h4></td>
                 <td class="next-service">1 Jan 2030</td></tr></table>{}"#,
            page(&[row(2, "Blue Bin", "2 Oct 2025")])
        );
        assert_eq!(extract(&html), vec![collection(2025, 10, 2, BinKind::Paper)]);
    }

    #[test]
    fn page_without_table_yields_nothing() {
        assert!(extract("<p>Property not found</p>").is_empty());
    }

    #[test]
    fn classifies_by_keyword() {
        assert_eq!(classify("BLACK BIN"), Some(BinKind::General));
        assert_eq!(classify("Paper & Card"), Some(BinKind::Paper));
        assert_eq!(classify("Glass, cans and plastic"), Some(BinKind::Glass));
        assert_eq!(classify("Garden waste"), None);
    }

    #[test]
    fn source_uses_timeout_and_empty_failure_policy() {
        let source = source(DEFAULT_AUTHORITY, "100012345");
        assert_eq!(
            source.request.url,
            "https://wasteservices.sheffield.gov.uk/property/100012345"
        );
        assert_eq!(source.request.timeout, Some(Duration::from_secs(20)));
        assert_eq!(source.meta.ttl, Duration::from_secs(43_200));
        assert_eq!(source.meta.failure, FailurePolicy::Empty);
    }

    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    const NAMES: [&str; 3] = ["Black Bin", "Blue Bin", "Brown Bin"];

    proptest! {
        #[test]
        fn output_is_unique_and_sorted(
            rows in prop::collection::vec(
                (0..NAMES.len(), prop::collection::vec((1..=28_u32, 0..12_usize, 2024..=2026_i32), 0..6)),
                0..5,
            )
        ) {
            let rendered: Vec<String> = rows
                .iter()
                .enumerate()
                .map(|(idx, (name, dates))| {
                    let next = dates
                        .iter()
                        .map(|(day, month, year)| format!("{day} {} {year}", MONTHS[*month]))
                        .collect::<Vec<_>>()
                        .join(", ");
                    row(u32::try_from(idx).unwrap_or_default(), NAMES[*name], &next)
                })
                .collect();

            let collections = extract(&page(&rendered));

            let unique: HashSet<_> = collections.iter().map(|entry| (entry.date, entry.kind)).collect();
            prop_assert_eq!(unique.len(), collections.len());
            prop_assert!(collections.windows(2).all(|pair| pair[0].date <= pair[1].date));
        }
    }
}

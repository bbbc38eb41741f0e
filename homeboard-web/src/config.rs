//! Environment-driven configuration for the dashboard.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use homeboard_core::{fetch::FetchPort, service::DashboardService};
use homeboard_provider_bins as bins;
use homeboard_provider_fixtures::{self as fixtures, FixtureExtractor, TeamMatch};
use homeboard_provider_trams::{self as trams, DownstreamStop};

use crate::ui::PageContext;

const DEFAULT_TRAM_STOP_REF: &str = "9400ZZSYMID1";
const DEFAULT_TRAM_STOP_NAME: &str = "Middlewood To City";
const DEFAULT_TEAM_ID: &str = "sheffield-wednesday";
const DEFAULT_TEAM_NAME: &str = "Sheffield Wednesday";
const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 3000;
const MAX_STOP_OFFSET_MINUTES: i64 = 24 * 60;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub(crate) enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),
    #[error("environment variable {key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub tram_stop_ref: String,
    pub tram_stop_name: String,
    pub tram_stops: Vec<DownstreamStop>,
    pub team_id: String,
    pub team_name: String,
    pub fixture_limit: usize,
    pub require_team_name: bool,
    pub bin_authority: String,
    pub bin_property_id: String,
    pub bind: IpAddr,
    pub port: u16,
}

impl Config {
    /// Read the process environment, after loading `.env` if present.
    pub(crate) fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        let bin_property_id = lookup("BIN_PROPERTY_ID")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::Missing("BIN_PROPERTY_ID"))?;

        let tram_stops = match lookup("TRAM_DOWNSTREAM_STOPS") {
            Some(raw) if !raw.trim().is_empty() => parse_stops(&raw)?,
            _ => trams::default_stops(),
        };

        Ok(Self {
            tram_stop_ref: var("TRAM_STOP_REF", DEFAULT_TRAM_STOP_REF),
            tram_stop_name: var("TRAM_STOP_NAME", DEFAULT_TRAM_STOP_NAME),
            tram_stops,
            team_id: var("FOOTBALL_TEAM_ID", DEFAULT_TEAM_ID),
            team_name: var("FOOTBALL_TEAM_NAME", DEFAULT_TEAM_NAME),
            fixture_limit: parsed(&lookup, "FIXTURE_LIMIT", fixtures::DEFAULT_LIMIT)?,
            require_team_name: parsed(&lookup, "FIXTURE_REQUIRE_TEAM_NAME", false)?,
            bin_authority: var("BIN_AUTHORITY", bins::DEFAULT_AUTHORITY),
            bin_property_id,
            bind: parsed(&lookup, "HOMEBOARD_BIND", DEFAULT_BIND)?,
            port: parsed(&lookup, "PORT", DEFAULT_PORT)?,
        })
    }

    pub(crate) fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Wire the three sources into a service backed by `fetcher`.
    pub(crate) fn service(&self, fetcher: Arc<dyn FetchPort>) -> DashboardService {
        let team_match = if self.require_team_name {
            TeamMatch::Containing(self.team_name.clone())
        } else {
            TeamMatch::AnySeparator
        };

        DashboardService::new(
            fetcher,
            trams::source(&self.tram_stop_ref, &self.tram_stop_name, &self.tram_stops),
            fixtures::source(
                &self.team_id,
                &self.team_name,
                FixtureExtractor::new(self.fixture_limit).with_team_match(team_match),
            ),
            bins::source(&self.bin_authority, &self.bin_property_id),
        )
    }

    pub(crate) fn page(&self) -> PageContext {
        PageContext {
            stop_name: self.tram_stop_name.clone(),
            team_name: self.team_name.clone(),
            stop_labels: self.tram_stops.iter().map(|stop| stop.name.clone()).collect(),
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_err| ConfigError::Invalid { key, value: raw })
        }
        _ => Ok(default),
    }
}

/// Parse `Kelham Island:12,University:16` into downstream stops.
fn parse_stops(raw: &str) -> Result<Vec<DownstreamStop>, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key: "TRAM_DOWNSTREAM_STOPS",
        value: raw.to_owned(),
    };

    raw.split(',')
        .map(|entry| {
            let (name, minutes) = entry.rsplit_once(':').ok_or_else(invalid)?;
            let minutes = minutes.trim().parse::<i64>().map_err(|_err| invalid())?;
            let name = name.trim();
            if name.is_empty() || !(0..=MAX_STOP_OFFSET_MINUTES).contains(&minutes) {
                return Err(invalid());
            }
            Ok(DownstreamStop::new(name, minutes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn property_id_is_required() {
        assert_eq!(
            config(&[]).err(),
            Some(ConfigError::Missing("BIN_PROPERTY_ID"))
        );
        assert_eq!(
            config(&[("BIN_PROPERTY_ID", "  ")]).err(),
            Some(ConfigError::Missing("BIN_PROPERTY_ID"))
        );
    }

    #[test]
    fn applies_defaults() {
        let config = config(&[("BIN_PROPERTY_ID", "100012345")]).ok();

        let Some(config) = config else {
            panic!("config should load");
        };
        assert_eq!(config.tram_stop_ref, "9400ZZSYMID1");
        assert_eq!(config.tram_stop_name, "Middlewood To City");
        assert_eq!(config.team_id, "sheffield-wednesday");
        assert_eq!(config.team_name, "Sheffield Wednesday");
        assert_eq!(config.fixture_limit, 5);
        assert!(!config.require_team_name);
        assert_eq!(config.bin_authority, "sheffield");
        assert_eq!(config.tram_stops, trams::default_stops());
        assert_eq!(config.addr().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("BIN_PROPERTY_ID", "42"),
            ("TRAM_STOP_REF", "9400ZZSYHIL1"),
            ("FOOTBALL_TEAM_NAME", "Sheffield United"),
            ("FIXTURE_LIMIT", "3"),
            ("FIXTURE_REQUIRE_TEAM_NAME", "true"),
            ("TRAM_DOWNSTREAM_STOPS", "Castle Square:9, Fitzalan Square:11"),
            ("PORT", "8080"),
        ]);

        let Ok(config) = config else {
            panic!("config should load");
        };
        assert_eq!(config.tram_stop_ref, "9400ZZSYHIL1");
        assert_eq!(config.team_name, "Sheffield United");
        assert_eq!(config.fixture_limit, 3);
        assert!(config.require_team_name);
        assert_eq!(
            config.tram_stops,
            vec![
                DownstreamStop::new("Castle Square", 9),
                DownstreamStop::new("Fitzalan Square", 11),
            ]
        );
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.page().stop_labels,
            vec!["Castle Square".to_owned(), "Fitzalan Square".to_owned()]
        );
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert_eq!(
            config(&[("BIN_PROPERTY_ID", "42"), ("PORT", "eighty")]).err(),
            Some(ConfigError::Invalid {
                key: "PORT",
                value: "eighty".to_owned(),
            })
        );
        assert!(matches!(
            config(&[("BIN_PROPERTY_ID", "42"), ("TRAM_DOWNSTREAM_STOPS", "Cathedral")]),
            Err(ConfigError::Invalid { key: "TRAM_DOWNSTREAM_STOPS", .. })
        ));
    }

    #[test]
    fn rejects_stop_offsets_outside_a_day() {
        for raw in ["Cathedral:-5", "Cathedral:1441", "Cathedral:9223372036854775807"] {
            assert!(
                matches!(
                    config(&[("BIN_PROPERTY_ID", "42"), ("TRAM_DOWNSTREAM_STOPS", raw)]),
                    Err(ConfigError::Invalid { key: "TRAM_DOWNSTREAM_STOPS", .. })
                ),
                "{raw} should be rejected"
            );
        }
        assert!(config(&[("BIN_PROPERTY_ID", "42"), ("TRAM_DOWNSTREAM_STOPS", "Cathedral:0")]).is_ok());
    }
}

//! Weather and route input.
//!
//! The route arrives as an ordered table of `Date,Lat,Lon,T[,onsea]` rows,
//! temperatures in °C and dates in UTC. Access goes through a
//! [`WeatherSource`] session that the campaign opens at start and closes
//! at the end.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use ttm_core::{LatLon, deg_c};

use crate::{ProjectError, ProjectResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSample {
    pub timestamp: DateTime<Utc>,
    pub location: LatLon,
    pub ambient_c: f64,
    /// Whether the waypoint lies on open water; unknown when not supplied.
    pub on_sea: Option<bool>,
}

impl WeatherSample {
    pub fn ambient_k(&self) -> f64 {
        deg_c(self.ambient_c).value
    }
}

#[derive(Debug, Deserialize)]
struct WeatherRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Lat")]
    lat: f64,
    #[serde(rename = "Lon")]
    lon: f64,
    #[serde(rename = "T")]
    t: f64,
    #[serde(default)]
    onsea: Option<String>,
}

fn parse_date(s: &str) -> ProjectResult<DateTime<Utc>> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|e| ProjectError::Weather {
            what: format!("invalid date '{s}': {e}"),
        })
}

fn parse_flag(s: &str) -> ProjectResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ProjectError::Weather {
            what: format!("invalid onsea flag '{other}'"),
        }),
    }
}

/// Parse and check a weather table: at least two rows, strictly increasing dates.
pub fn parse_weather<R: Read>(reader: R) -> ProjectResult<Vec<WeatherSample>> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut samples = Vec::new();
    for row in csv.deserialize() {
        let row: WeatherRow = row?;
        let on_sea = match row.onsea.as_deref() {
            None | Some("") => None,
            Some(flag) => Some(parse_flag(flag)?),
        };
        samples.push(WeatherSample {
            timestamp: parse_date(&row.date)?,
            location: LatLon::new(row.lat, row.lon),
            ambient_c: row.t,
            on_sea,
        });
    }

    if samples.len() < 2 {
        return Err(ProjectError::Weather {
            what: format!("need at least 2 waypoints, got {}", samples.len()),
        });
    }
    if let Some(w) = samples.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
        return Err(ProjectError::Weather {
            what: format!(
                "dates must be strictly increasing ({} followed by {})",
                w[0].timestamp, w[1].timestamp
            ),
        });
    }
    Ok(samples)
}

/// Session over a time-indexed location/temperature provider.
pub trait WeatherSource {
    fn open(&mut self) -> ProjectResult<()>;

    /// Ordered samples for the campaign route. Requires an open session.
    fn samples(&mut self) -> ProjectResult<Vec<WeatherSample>>;

    /// Drop and re-establish the session.
    fn reconnect(&mut self) -> ProjectResult<()>;

    fn close(&mut self);
}

/// Weather read from the campaign's `weatherdata.csv`.
#[derive(Debug, Clone)]
pub struct CsvWeatherSource {
    path: PathBuf,
    cache: Option<Vec<WeatherSample>>,
}

impl CsvWeatherSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.cache.is_some()
    }
}

impl WeatherSource for CsvWeatherSource {
    fn open(&mut self) -> ProjectResult<()> {
        let file = std::fs::File::open(&self.path)?;
        let samples = parse_weather(file)?;
        debug!(path = %self.path.display(), rows = samples.len(), "weather data loaded");
        self.cache = Some(samples);
        Ok(())
    }

    fn samples(&mut self) -> ProjectResult<Vec<WeatherSample>> {
        self.cache.clone().ok_or_else(|| ProjectError::Weather {
            what: "weather session is not open".to_string(),
        })
    }

    fn reconnect(&mut self) -> ProjectResult<()> {
        self.close();
        self.open()
    }

    fn close(&mut self) {
        self.cache = None;
    }
}

/// Run `op` against `source`, reconnecting between failed attempts.
pub fn with_retry<S, T, F>(source: &mut S, attempts: usize, mut op: F) -> ProjectResult<T>
where
    S: WeatherSource + ?Sized,
    F: FnMut(&mut S) -> ProjectResult<T>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(source) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(attempt, error = %e, "weather request failed, reconnecting");
                if let Err(re) = source.reconnect() {
                    warn!(error = %re, "weather reconnect failed");
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

//! Mapping of export rows to races.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::{FixtureRow, GeographicalScale, Race, SourceConfig};

/// Status of every race taken from the export.
pub const PUBLISHED: &str = "published";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Parse a calendar date. Unparseable and blank input yields `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Turns export rows into races of one source.
pub struct RaceNormalizer<'a> {
    source: &'a SourceConfig,
}

impl<'a> RaceNormalizer<'a> {
    pub fn new(source: &'a SourceConfig) -> Self {
        Self { source }
    }

    pub fn normalize(&self, row: &FixtureRow) -> Race {
        let date = parse_date(&row.date);
        if date.is_none() && !row.date.trim().is_empty() {
            log::debug!("Unparseable date '{}' for fixture {}", row.date, row.unique_id);
        }

        Race {
            original_data_source: self.source.name.clone(),
            original_data_id: row.unique_id.trim().to_string(),
            original_data_full: serde_json::to_value(row).ok(),
            status: Some(PUBLISHED.to_string()),
            name: non_empty(&row.event_name),
            date,
            deadline: parse_date(&row.deadline),
            country: Some(self.source.country.clone()),
            region: non_empty(&row.region),
            city: non_empty(&row.location),
            map_name: non_empty(&row.map),
            geographical_scale: (row.national == "1").then_some(GeographicalScale::National),
            event_link: non_empty(&row.event_link),
            ..Race::default()
        }
    }

    pub fn normalize_all(&self, rows: &[FixtureRow]) -> Vec<Race> {
        rows.iter().map(|row| self.normalize(row)).collect()
    }
}

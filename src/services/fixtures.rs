// src/services/fixtures.rs

//! Year-by-year download of the fixtures CSV export.

use crate::error::Result;
use crate::models::{FixtureRow, SourceConfig};
use crate::utils::decode_latin1;
use crate::utils::http::Transport;

/// Parses one decoded page into rows.
pub type RowParser<T> = fn(&str) -> Result<Vec<T>>;

/// Parse a semicolon-delimited, header-described fixtures export.
pub fn parse_fixture_csv(text: &str) -> Result<Vec<FixtureRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.deserialize::<FixtureRow>() {
        rows.push(record?);
    }
    Ok(rows)
}

/// Walks the yearly export from a start year until a page comes back empty.
///
/// Each call to [`YearPager::next_page`] issues exactly one request. A
/// transport or parse failure is returned to the caller and the pager does
/// not advance past that year.
pub struct YearPager<'a, T> {
    transport: &'a dyn Transport,
    source: &'a SourceConfig,
    parse: RowParser<T>,
    year: i32,
    exhausted: bool,
}

impl<'a, T> YearPager<'a, T> {
    pub fn new(
        transport: &'a dyn Transport,
        source: &'a SourceConfig,
        parse: RowParser<T>,
        start_year: i32,
    ) -> Self {
        Self {
            transport,
            source,
            parse,
            year: start_year,
            exhausted: false,
        }
    }

    /// Year the next request will ask for.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Fetch the next non-empty year, or `None` once the export is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<(i32, Vec<T>)>> {
        if self.exhausted {
            return Ok(None);
        }

        let url = self.source.fixtures_csv_url(self.year);
        log::info!("{}: downloading CSV for {}", self.source.name, self.year);

        let rows = match self.transport.get(&url).await? {
            Some(bytes) => (self.parse)(&decode_latin1(&bytes))?,
            None => Vec::new(),
        };

        if rows.is_empty() {
            log::info!("{}: no fixtures for {}, all data crawled", self.source.name, self.year);
            self.exhausted = true;
            return Ok(None);
        }

        let year = self.year;
        self.year += 1;
        Ok(Some((year, rows)))
    }
}

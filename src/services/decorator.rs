// src/services/decorator.rs

//! Race decoration from the fixture detail page.
//!
//! The export lacks the links to publication, results, start list and
//! registration, as well as terrain and distance. All of them are scraped
//! from the detail page by anchor text and table row label.

use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::{DistanceCategory, LinkLabels, Race, SourceConfig, Terrain};
use crate::services::parse_selector;
use crate::utils::complete_link;
use crate::utils::http::Transport;

const TERRAIN_LABEL: &str = "Terrain:";
const DISTANCE_LABEL: &str = "Distanz:";

/// Links found on one detail page, first match per label.
#[derive(Debug, Default, PartialEq)]
struct DetailLinks {
    publication: Option<String>,
    ranking: Option<String>,
    live_result: Option<String>,
    inscription: Option<String>,
    departure: Option<String>,
}

impl DetailLinks {
    fn apply_to(self, race: &mut Race) {
        if self.publication.is_some() {
            race.publication_link = self.publication;
        }
        if self.ranking.is_some() {
            race.ranking_link = self.ranking;
        }
        if self.live_result.is_some() {
            race.live_result_link = self.live_result;
        }
        if self.inscription.is_some() {
            race.inscription_link = self.inscription;
        }
        if self.departure.is_some() {
            race.departure_link = self.departure;
        }
    }
}

fn keep_first(slot: &mut Option<String>, matched: bool, link: &str) {
    if matched && slot.is_none() {
        *slot = Some(link.to_string());
    }
}

pub fn classify_terrain(value: &str) -> Option<Terrain> {
    let value = value.to_lowercase();
    if value.contains("urban") {
        Some(Terrain::Urban)
    } else if value.contains("wald") {
        Some(Terrain::Forest)
    } else if value.contains("mix") {
        Some(Terrain::Mix)
    } else {
        None
    }
}

pub fn classify_distance(value: &str) -> Option<DistanceCategory> {
    let value = value.to_lowercase();
    if value.contains("sprint") {
        Some(DistanceCategory::Sprint)
    } else if value.contains("mittel") {
        Some(DistanceCategory::Middle)
    } else if value.contains("lang") {
        Some(DistanceCategory::Long)
    } else {
        None
    }
}

/// Fetches detail pages and completes races with what they show.
pub struct RaceDecorator<'a> {
    transport: &'a dyn Transport,
    source: &'a SourceConfig,
    anchor_sel: Selector,
    row_sel: Selector,
    cell_sel: Selector,
}

impl<'a> RaceDecorator<'a> {
    pub fn new(transport: &'a dyn Transport, source: &'a SourceConfig) -> Result<Self> {
        Ok(Self {
            transport,
            source,
            anchor_sel: parse_selector("a[href]")?,
            row_sel: parse_selector("tr")?,
            cell_sel: parse_selector("td")?,
        })
    }

    /// Decorate every race in place. A transport failure aborts the batch.
    pub async fn decorate_all(&self, races: &mut [Race]) -> Result<usize> {
        let mut decorated = 0;
        for race in races.iter_mut() {
            if self.decorate(race).await? {
                decorated += 1;
            }
        }
        Ok(decorated)
    }

    /// Fetch the detail page of `race` and decorate it.
    ///
    /// Returns `false` when the race was left untouched.
    pub async fn decorate(&self, race: &mut Race) -> Result<bool> {
        if race.original_data_id.trim().is_empty() {
            log::debug!("Skipping decoration of race without source id");
            return Ok(false);
        }

        let url = self.source.fixture_detail_url(&race.original_data_id);
        log::debug!("Decorating race {}", race.original_data_id);

        let Some(body) = self.transport.get(&url).await? else {
            log::warn!("Detail page of race {} was empty", race.original_data_id);
            return Ok(false);
        };

        self.decorate_from_html(race, &String::from_utf8_lossy(&body));
        Ok(true)
    }

    /// Decorate `race` from an already fetched detail page.
    pub fn decorate_from_html(&self, race: &mut Race, html: &str) {
        let document = Html::parse_document(html);

        self.find_links(&document).apply_to(race);

        if let Some(terrain) = self.row_value(&document, TERRAIN_LABEL).and_then(|v| classify_terrain(&v)) {
            race.terrain = Some(terrain);
        }
        if let Some(distance) = self.row_value(&document, DISTANCE_LABEL).and_then(|v| classify_distance(&v)) {
            race.distance = Some(distance);
        }
    }

    fn find_links(&self, document: &Html) -> DetailLinks {
        let labels: &LinkLabels = &self.source.links;
        let mut links = DetailLinks::default();

        for anchor in document.select(&self.anchor_sel) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let text: String = anchor.text().collect();
            let link = complete_link(&self.source.base_url, href.trim());

            keep_first(&mut links.publication, text.contains(&labels.publication), &link);
            keep_first(&mut links.ranking, text.contains(&labels.ranking), &link);
            keep_first(&mut links.live_result, text.contains(&labels.live_result), &link);
            keep_first(
                &mut links.inscription,
                labels.inscription.iter().any(|label| text.contains(label.as_str())),
                &link,
            );
            keep_first(&mut links.departure, text.contains(&labels.departure), &link);
        }
        links
    }

    /// Text of the second cell of the first row whose first cell reads `label`.
    fn row_value(&self, document: &Html, label: &str) -> Option<String> {
        document.select(&self.row_sel).find_map(|row| {
            let mut cells = row.select(&self.cell_sel);
            let first = cells.next()?;
            if cell_text(first) != label {
                return None;
            }
            Some(cells.next().map(cell_text).unwrap_or_default())
        })
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

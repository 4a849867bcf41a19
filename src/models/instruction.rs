//! Race instruction and news feed records.

use serde::{Deserialize, Serialize};

use crate::storage::{Entity, ItemId};

/// Instruction document of one race.
///
/// The crawl only writes `link_crawled`; the remaining fields belong to the
/// manual override and to the AI enrichment step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaceInstruction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    pub race: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_crawled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_manual: Option<String>,
    /// Hash of the last uploaded document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    /// Handle of the uploaded document at the AI provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transit_stops: Option<String>,
}

impl RaceInstruction {
    pub fn crawled(race: ItemId, link: impl Into<String>) -> Self {
        Self {
            race,
            link_crawled: Some(link.into()),
            ..Self::default()
        }
    }
}

impl Entity for RaceInstruction {
    const COLLECTION: &'static str = "RaceInstruction";
    const NATURAL_KEY: &'static [&'static str] = &["race"];
}

/// One article of the federation news feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    pub link: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead: Option<String>,
    pub source: String,
}

impl Entity for NewsItem {
    const COLLECTION: &'static str = "News";
    const NATURAL_KEY: &'static [&'static str] = &["link"];
}

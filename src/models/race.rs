//! Race data structure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{Entity, ItemId};

/// Geographic reach of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeographicalScale {
    National,
}

/// Dominant terrain of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Urban,
    Forest,
    Mix,
}

/// Distance format of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceCategory {
    Sprint,
    Middle,
    Long,
}

/// A competitive event.
///
/// Fields the fixture export owns (`date`, `deadline`, `geographicalScale`)
/// are always written, as `null` when unset, so a re-crawl clears them. Other
/// unset fields are not serialized and reconciliation keeps whatever the
/// store already holds for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Race {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,

    /// Source name, first half of the natural key
    pub original_data_source: String,

    /// Row id within the source, second half of the natural key
    pub original_data_id: String,

    /// Raw source row
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_data_full: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    /// Registration deadline
    pub deadline: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_name: Option<String>,

    pub geographical_scale: Option<GeographicalScale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain: Option<Terrain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<DistanceCategory>,

    /// Event website
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_result_link: Option<String>,
    /// Registration portal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inscription_link: Option<String>,
    /// Start list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_link: Option<String>,
}

impl Race {
    /// Create a race carrying only its natural key.
    pub fn new(source: impl Into<String>, original_id: impl Into<String>) -> Self {
        Self {
            original_data_source: source.into(),
            original_data_id: original_id.into(),
            ..Self::default()
        }
    }

    /// Short label for log lines.
    pub fn label(&self) -> String {
        match (&self.id, &self.name) {
            (Some(id), Some(name)) => format!("{name} (#{id})"),
            (None, Some(name)) => format!("{name} ({})", self.original_data_id),
            (Some(id), None) => format!("#{id}"),
            (None, None) => self.original_data_id.clone(),
        }
    }
}

impl Entity for Race {
    const COLLECTION: &'static str = "Race";
    const NATURAL_KEY: &'static [&'static str] = &["originalDataSource", "originalDataId"];
}

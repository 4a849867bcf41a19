//! Row of the yearly fixtures CSV export.

use serde::{Deserialize, Serialize};

/// One fixture as published in the CSV export.
///
/// Every column is optional text; interpretation happens in the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureRow {
    pub map: String,
    pub club: String,
    pub date: String,
    pub kind: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub region: String,
    pub coord_x: String,
    pub coord_y: String,
    pub deadline: String,
    pub duration: String,
    pub location: String,
    pub national: String,
    pub day_night: String,
    pub unique_id: String,
    pub event_link: String,
    pub event_name: String,
    pub entryportal: String,
    pub last_modification: String,
}

//! Start list entities: categories, participants and their departures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{Entity, Item, ItemId};

/// Status given to participants created by a crawl.
pub const UNVERIFIED: &str = "unverified";

/// A competition class within one race.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaceCategory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    pub race: ItemId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_in_meter: Option<f64>,
    /// Climb between controls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equidistance_in_meter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_of_controls: Option<u32>,
}

impl Entity for RaceCategory {
    const COLLECTION: &'static str = "RaceCategory";
    const NATURAL_KEY: &'static [&'static str] = &["race", "name"];
}

/// A participant appearing in start lists.
///
/// The federation publishes no participant id; `composed_identifier` is
/// derived from the name and the birth year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    pub composed_identifier: String,
    #[serde(rename = "first_name", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "last_name", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i32>,
    /// Verification status, owned by curation once the user exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
    const NATURAL_KEY: &'static [&'static str] = &["composedIdentifier"];

    fn insert_defaults(item: &mut Item) {
        item.entry("status")
            .or_insert_with(|| Value::from(UNVERIFIED));
    }
}

/// Assignment of one participant to one category of a race.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDeparture {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    pub race: ItemId,
    pub user: ItemId,
    pub race_category: ItemId,
    /// Minutes since midnight
    pub start_time_in_minutes: u32,
}

impl Entity for UserDeparture {
    const COLLECTION: &'static str = "UserDeparture";
    const NATURAL_KEY: &'static [&'static str] = &["race", "user"];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::to_item;

    #[test]
    fn test_user_field_names() {
        let user = User {
            composed_identifier: "hansmuster1985".into(),
            first_name: Some("Hans".into()),
            last_name: Some("Muster".into()),
            birth_year: Some(1985),
            ..User::default()
        };
        let item = to_item(&user).unwrap();
        assert_eq!(item["composedIdentifier"], "hansmuster1985");
        assert_eq!(item["first_name"], "Hans");
        assert_eq!(item["birthYear"], 1985);
        assert!(!item.contains_key("status"));
    }

    #[test]
    fn test_new_users_default_to_unverified() {
        let mut item = Item::new();
        User::insert_defaults(&mut item);
        assert_eq!(item["status"], UNVERIFIED);

        let mut curated = Item::new();
        curated.insert("status".into(), Value::from("active"));
        User::insert_defaults(&mut curated);
        assert_eq!(curated["status"], "active");
    }
}

//! Filters and queries over JSON items.

use std::cmp::Ordering;

use serde_json::Value;

use crate::storage::Item;

/// Row limit of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Limit {
    /// Return every matching item.
    #[default]
    Unlimited,
    Count(usize),
}

/// Predicate over the fields of an item.
///
/// A missing field never satisfies a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    NotNull(String),
    Gte(String, Value),
    Lt(String, Value),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In(field.into(), values)
    }

    pub fn not_null(field: impl Into<String>) -> Self {
        Self::NotNull(field.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    /// Evaluate the filter against one item.
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Filter::Eq(field, value) => item.get(field) == Some(value),
            Filter::In(field, values) => item
                .get(field)
                .is_some_and(|current| values.contains(current)),
            Filter::NotNull(field) => item.get(field).is_some_and(|v| !v.is_null()),
            Filter::Gte(field, value) => compare(item.get(field), value)
                .is_some_and(|ord| ord != Ordering::Less),
            Filter::Lt(field, value) => {
                compare(item.get(field), value) == Some(Ordering::Less)
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(item)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(item)),
        }
    }
}

/// Numbers compare numerically, strings lexicographically (ISO dates sort
/// correctly this way); anything else is incomparable.
fn compare(current: Option<&Value>, bound: &Value) -> Option<Ordering> {
    match (current?, bound) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

/// Read query against one collection.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Option<Filter>,
    /// Field projection; `None` returns whole items
    pub fields: Option<Vec<String>>,
    pub limit: Limit,
}

impl Query {
    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.filter.as_ref().is_none_or(|f| f.matches(item))
    }
}

/// Keep only the listed fields of an item.
pub fn project(item: &Item, fields: Option<&[String]>) -> Item {
    match fields {
        None => item.clone(),
        Some(fields) => item
            .iter()
            .filter(|(key, _)| fields.iter().any(|f| f == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_eq_and_in() {
        let race = item(json!({"originalDataSource": "solv", "originalDataId": "12"}));
        assert!(Filter::eq("originalDataSource", "solv").matches(&race));
        assert!(!Filter::eq("originalDataId", "13").matches(&race));
        assert!(Filter::is_in("originalDataId", vec![json!("11"), json!("12")]).matches(&race));
        assert!(!Filter::eq("missing", "x").matches(&race));
    }

    #[test]
    fn test_not_null() {
        let race = item(json!({"departureLink": null, "eventLink": "https://x.ch"}));
        assert!(!Filter::not_null("departureLink").matches(&race));
        assert!(Filter::not_null("eventLink").matches(&race));
        assert!(!Filter::not_null("rankingLink").matches(&race));
    }

    #[test]
    fn test_date_range() {
        let race = item(json!({"date": "2025-06-10"}));
        let window = Filter::And(vec![
            Filter::gte("date", "2025-06-10"),
            Filter::lt("date", "2025-08-01"),
        ]);
        assert!(window.matches(&race));
        assert!(!Filter::gte("date", "2025-06-11").matches(&race));
        assert!(!Filter::lt("date", "2025-06-10").matches(&race));
    }

    #[test]
    fn test_or_of_composite_keys() {
        let category = item(json!({"race": 3, "name": "H21E"}));
        let filter = Filter::Or(vec![
            Filter::And(vec![Filter::eq("race", 3), Filter::eq("name", "D21E")]),
            Filter::And(vec![Filter::eq("race", 3), Filter::eq("name", "H21E")]),
        ]);
        assert!(filter.matches(&category));
        assert!(!Filter::Or(vec![]).matches(&category));
    }

    #[test]
    fn test_project() {
        let user = item(json!({"id": 1, "status": "active", "birthYear": 1990}));
        let fields = vec!["id".to_string(), "status".to_string()];
        let projected = project(&user, Some(&fields));
        assert_eq!(projected.len(), 2);
        assert!(!projected.contains_key("birthYear"));
    }
}

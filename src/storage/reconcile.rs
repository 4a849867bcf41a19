//! Reconciliation of crawled records with stored ones.
//!
//! A crawl only knows part of a record. Fields written by other processes
//! (manual curation, AI enrichment, verification status) must survive every
//! re-crawl, so a batch is never written blindly:
//!
//! 1. match stored items by natural key (one disjunctive filter)
//! 2. overlay the crawled fields on the stored item
//! 3. write the merged batch with a single upsert

use std::sync::Arc;

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::storage::{Entity, Filter, Item, ItemId, Query, StoreProvider, to_item};

/// Overlay `crawled` on `stored`. Crawled values win; absent fields are kept.
pub fn merge(stored: &Item, crawled: &Item) -> Item {
    let mut merged = stored.clone();
    for (key, value) in crawled {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Values of the natural key fields of one record.
fn key_values<'a>(record: &'a Item, key: &[&str]) -> Option<Vec<&'a Value>> {
    key.iter()
        .map(|field| record.get(*field).filter(|v| !v.is_null()))
        .collect()
}

/// Filter matching any of the natural keys carried by `records`.
pub fn natural_key_filter(records: &[Item], key: &[&str]) -> Result<Filter> {
    let alternatives = records
        .iter()
        .map(|record| {
            let values = key_values(record, key).ok_or_else(|| {
                AppError::validation(format!(
                    "record is missing natural key ({}): {}",
                    key.join(", "),
                    Value::Object(record.clone())
                ))
            })?;
            Ok(Filter::And(
                key.iter()
                    .zip(values)
                    .map(|(field, value)| Filter::eq(*field, value.clone()))
                    .collect(),
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Filter::Or(alternatives))
}

/// Merge every crawled record with its stored counterpart, if any.
///
/// Records without a stored counterpart receive `insert_defaults`.
pub fn merge_batch(
    crawled: Vec<Item>,
    stored: &[Item],
    key: &[&str],
    insert_defaults: fn(&mut Item),
) -> Vec<Item> {
    crawled
        .into_iter()
        .map(|record| {
            let record_key = key_values(&record, key);
            let existing = stored
                .iter()
                .find(|candidate| record_key.is_some() && key_values(candidate, key) == record_key);
            match existing {
                Some(existing) => merge(existing, &record),
                None => {
                    let mut record = record;
                    insert_defaults(&mut record);
                    record
                }
            }
        })
        .collect()
}

/// Upserts batches by natural key.
#[derive(Clone)]
pub struct Reconciler {
    provider: Arc<dyn StoreProvider>,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn StoreProvider>) -> Self {
        Self { provider }
    }

    /// Reconcile typed records into their collection.
    ///
    /// Returns the ids of the written items in batch order.
    pub async fn reconcile<T: Entity>(&self, records: &[T]) -> Result<Vec<ItemId>> {
        let items = records.iter().map(to_item).collect::<Result<Vec<_>>>()?;
        self.reconcile_items(T::COLLECTION, T::NATURAL_KEY, items, T::insert_defaults)
            .await
    }

    /// Reconcile raw items into `collection`.
    pub async fn reconcile_items(
        &self,
        collection: &str,
        key: &[&str],
        records: Vec<Item>,
        insert_defaults: fn(&mut Item),
    ) -> Result<Vec<ItemId>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let store = self.provider.items(collection);
        let filter = natural_key_filter(&records, key)?;
        let stored = store.read_by_query(&Query::filtered(filter)).await?;

        log::debug!(
            "{}: merging {} crawled records with {} stored",
            collection,
            records.len(),
            stored.len()
        );

        let merged = merge_batch(records, &stored, key, insert_defaults);
        store.upsert_many(merged).await
    }
}

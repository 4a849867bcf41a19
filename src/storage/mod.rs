//! Item store abstractions.
//!
//! Records are persisted as JSON objects grouped in named collections
//! (`Race`, `RaceCategory`, `users`, ...). Every item carries a
//! store-assigned numeric `id`; crawled records are matched to stored ones
//! by their natural key in [`reconcile`], never by the store itself.
//!
//! ## Contract
//!
//! ```text
//! read_by_query  filter + projection + limit
//! read_many      by ids, optional projection
//! create_many    assigns ids, returns them in input order
//! update_one     field-level patch of one item
//! delete_many    by ids
//! upsert_many    update items carrying an id, create the rest
//! ```

pub mod local;
pub mod query;
pub mod reconcile;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

// Re-export for convenience
pub use local::LocalStore;
pub use query::{Filter, Limit, Query};
pub use reconcile::Reconciler;

/// Primary key assigned by the store.
pub type ItemId = u64;

/// One stored record.
pub type Item = Map<String, Value>;

/// Name of the primary key field of every item.
pub const ID_FIELD: &str = "id";

/// Read the store-assigned id of an item.
pub fn item_id(item: &Item) -> Option<ItemId> {
    item.get(ID_FIELD).and_then(Value::as_u64)
}

/// Operations on one collection.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn read_by_query(&self, query: &Query) -> Result<Vec<Item>>;

    async fn read_many(&self, ids: &[ItemId], fields: Option<&[String]>) -> Result<Vec<Item>>;

    async fn create_many(&self, items: Vec<Item>) -> Result<Vec<ItemId>>;

    async fn update_one(&self, id: ItemId, patch: Item) -> Result<ItemId>;

    async fn delete_many(&self, ids: &[ItemId]) -> Result<()>;

    /// Update every item that carries an id and create the others.
    ///
    /// Returned ids follow the input order.
    async fn upsert_many(&self, items: Vec<Item>) -> Result<Vec<ItemId>> {
        let mut slots: Vec<Option<ItemId>> = Vec::with_capacity(items.len());
        let mut to_create = Vec::new();

        for item in items {
            match item_id(&item) {
                Some(id) => slots.push(Some(self.update_one(id, item).await?)),
                None => {
                    slots.push(None);
                    to_create.push(item);
                }
            }
        }

        let mut created = self.create_many(to_create).await?.into_iter();
        slots
            .into_iter()
            .map(|slot| {
                slot.or_else(|| created.next())
                    .ok_or_else(|| AppError::store("create_many returned fewer ids than items"))
            })
            .collect()
    }
}

/// Capability to obtain a store handle by collection name.
pub trait StoreProvider: Send + Sync {
    fn items(&self, collection: &str) -> Arc<dyn ItemStore>;
}

/// A typed record living in one collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Collection the entity is stored in
    const COLLECTION: &'static str;

    /// Fields identifying the entity across crawls
    const NATURAL_KEY: &'static [&'static str];

    /// Fill fields that only a newly created item receives.
    fn insert_defaults(_item: &mut Item) {}
}

/// Convert an entity into a JSON item.
pub fn to_item<T: Serialize>(record: &T) -> Result<Item> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::store(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Convert a JSON item into an entity.
pub fn from_item<T: DeserializeOwned>(item: Item) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(item))?)
}

/// Typed view of one collection.
pub struct Collection<T: Entity> {
    store: Arc<dyn ItemStore>,
    _entity: PhantomData<T>,
}

impl<T: Entity> Collection<T> {
    pub fn new(provider: &dyn StoreProvider) -> Self {
        Self {
            store: provider.items(T::COLLECTION),
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn ItemStore> {
        &self.store
    }

    /// Run a query and deserialize every match.
    pub async fn query(&self, query: &Query) -> Result<Vec<T>> {
        self.store
            .read_by_query(query)
            .await?
            .into_iter()
            .map(from_item)
            .collect()
    }

    /// Read items by id, projected to `fields`.
    pub async fn read_many(&self, ids: &[ItemId], fields: &[&str]) -> Result<Vec<T>> {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        self.store
            .read_many(ids, Some(&fields))
            .await?
            .into_iter()
            .map(from_item)
            .collect()
    }
}

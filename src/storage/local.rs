//! Local filesystem item store.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── Race.json
//! ├── RaceCategory.json
//! ├── RaceInstruction.json
//! ├── UserDeparture.json
//! ├── News.json
//! └── users.json
//! ```
//!
//! Each file holds `{ "next_id": n, "items": [...] }`. Every operation is a
//! read-modify-write of one file under a store-wide lock, written atomically
//! through a temp file and a rename.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::query::{Limit, project};
use crate::storage::{ID_FIELD, Item, ItemId, ItemStore, Query, StoreProvider, item_id};

/// Local filesystem store backend.
#[derive(Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Names of the collections present on disk.
    pub async fn collections(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(AppError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl StoreProvider for LocalStore {
    fn items(&self, collection: &str) -> Arc<dyn ItemStore> {
        Arc::new(LocalCollection {
            path: self.root_dir.join(format!("{collection}.json")),
            name: collection.to_string(),
            lock: Arc::clone(&self.lock),
        })
    }
}

/// On-disk content of one collection.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionFile {
    next_id: ItemId,
    items: Vec<Item>,
}

impl CollectionFile {
    fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item_id(item) == Some(id))
    }

    fn assign_id(&mut self) -> ItemId {
        self.next_id += 1;
        self.next_id
    }
}

/// Handle on one collection file.
pub struct LocalCollection {
    path: PathBuf,
    name: String,
    lock: Arc<Mutex<()>>,
}

impl LocalCollection {
    /// Read the collection, returning an empty one if the file doesn't exist.
    async fn load(&self) -> Result<CollectionFile> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CollectionFile::default()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write the collection atomically (write to temp, then rename).
    async fn save(&self, file: &CollectionFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(file)?;

        let tmp = self.path.with_extension("tmp");
        let mut out = tokio::fs::File::create(&tmp).await?;
        out.write_all(&bytes).await?;
        out.flush().await?;
        drop(out);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ItemStore for LocalCollection {
    async fn read_by_query(&self, query: &Query) -> Result<Vec<Item>> {
        let _guard = self.lock.lock().await;
        let file = self.load().await?;

        let matches = file
            .items
            .iter()
            .filter(|item| query.matches(item))
            .map(|item| project(item, query.fields.as_deref()));

        Ok(match query.limit {
            Limit::Unlimited => matches.collect(),
            Limit::Count(n) => matches.take(n).collect(),
        })
    }

    async fn read_many(&self, ids: &[ItemId], fields: Option<&[String]>) -> Result<Vec<Item>> {
        let _guard = self.lock.lock().await;
        let file = self.load().await?;

        Ok(ids
            .iter()
            .filter_map(|id| file.position(*id).map(|idx| &file.items[idx]))
            .map(|item| project(item, fields))
            .collect())
    }

    async fn create_many(&self, items: Vec<Item>) -> Result<Vec<ItemId>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;

        let mut ids = Vec::with_capacity(items.len());
        for mut item in items {
            let id = file.assign_id();
            item.insert(ID_FIELD.to_string(), Value::from(id));
            file.items.push(item);
            ids.push(id);
        }

        self.save(&file).await?;
        log::debug!("{}: created {} items", self.name, ids.len());
        Ok(ids)
    }

    async fn update_one(&self, id: ItemId, patch: Item) -> Result<ItemId> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;

        let idx = file
            .position(id)
            .ok_or_else(|| AppError::store(format!("{}: no item with id {id}", self.name)))?;
        let stored = &mut file.items[idx];
        for (key, value) in patch {
            if key != ID_FIELD {
                stored.insert(key, value);
            }
        }

        self.save(&file).await?;
        Ok(id)
    }

    async fn delete_many(&self, ids: &[ItemId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;

        let doomed: HashSet<ItemId> = ids.iter().copied().collect();
        let before = file.items.len();
        file.items
            .retain(|item| item_id(item).is_none_or(|id| !doomed.contains(&id)));

        self.save(&file).await?;
        log::debug!("{}: deleted {} items", self.name, before - file.items.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Filter;
    use serde_json::json;
    use tempfile::TempDir;

    fn item(value: Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_read_nonexistent_collection() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        let items = store.items("Race").read_by_query(&Query::default()).await.unwrap();
        assert!(items.is_empty());
        assert!(store.collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let races = store.items("Race");

        let ids = races
            .create_many(vec![item(json!({"name": "A"})), item(json!({"name": "B"}))])
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 2]);

        let more = races.create_many(vec![item(json!({"name": "C"}))]).await.unwrap();
        assert_eq!(more, vec![3]);
        assert_eq!(store.collections().await.unwrap(), vec!["Race".to_string()]);
    }

    #[tokio::test]
    async fn test_update_one_patches_fields() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let races = store.items("Race");

        let ids = races
            .create_many(vec![item(json!({"name": "A", "city": "Bern"}))])
            .await
            .unwrap();
        races
            .update_one(ids[0], item(json!({"instructionLink": "https://x.ch/w.pdf"})))
            .await
            .unwrap();

        let stored = races.read_many(&ids, None).await.unwrap();
        assert_eq!(stored[0]["city"], "Bern");
        assert_eq!(stored[0]["instructionLink"], "https://x.ch/w.pdf");
    }

    #[tokio::test]
    async fn test_update_missing_item_fails() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let result = store.items("Race").update_one(42, Item::new()).await;
        assert!(matches!(result, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_upsert_many_keeps_input_order() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let races = store.items("Race");

        races.create_many(vec![item(json!({"name": "old"}))]).await.unwrap();
        let ids = races
            .upsert_many(vec![
                item(json!({"name": "new"})),
                item(json!({"id": 1, "name": "renamed"})),
            ])
            .await
            .unwrap();
        assert_eq!(ids, vec![2, 1]);

        let stored = races.read_many(&[1], None).await.unwrap();
        assert_eq!(stored[0]["name"], "renamed");
    }

    #[tokio::test]
    async fn test_query_filter_projection_and_limit() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let users = store.items("users");

        users
            .create_many(vec![
                item(json!({"composedIdentifier": "annabolt1990", "status": "active"})),
                item(json!({"composedIdentifier": "carlocrupi2001", "status": "unverified"})),
                item(json!({"composedIdentifier": "dinadaro1985", "status": "unverified"})),
            ])
            .await
            .unwrap();

        let query = Query::filtered(Filter::eq("status", "unverified"))
            .with_fields(&["id"])
            .with_limit(Limit::Count(1));
        let found = users.read_by_query(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].len(), 1);
        assert_eq!(found[0]["id"], 2);
    }

    #[tokio::test]
    async fn test_delete_many() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let departures = store.items("UserDeparture");

        let ids = departures
            .create_many(vec![
                item(json!({"race": 1, "user": 1})),
                item(json!({"race": 1, "user": 2})),
            ])
            .await
            .unwrap();
        departures.delete_many(&ids[..1]).await.unwrap();

        let left = departures.read_by_query(&Query::default()).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0]["user"], 2);
    }
}

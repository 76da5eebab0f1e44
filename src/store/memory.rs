//! In-memory document store.
//!
//! Fake backend for tests and `--memory` mode. Implements the same operator
//! semantics as the managed backends via the query module; data lives for the
//! process lifetime only.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Document};

use crate::query::{self, Query};
use crate::store::{DocumentStore, StoreError, StoreResult};

type Collections = BTreeMap<String, BTreeMap<String, Document>>;

/// In-memory store; one instance per project.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.read()?.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn insert(&self, collection: &str, data: Document) -> StoreResult<String> {
        let id = ObjectId::new().to_hex();
        self.write()?
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data);
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Document, merge: bool) -> StoreResult<()> {
        let mut collections = self.write()?;
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) if merge => {
                for (k, v) in data {
                    existing.insert(k, v);
                }
            }
            _ => {
                docs.insert(id.to_string(), data);
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut collections = self.write()?;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
            // Collections exist only while they hold documents, like the
            // managed backends.
            if docs.is_empty() {
                collections.remove(collection);
            }
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query)
        -> StoreResult<Vec<(String, Document)>> {
        let collections = self.read()?;
        let mut matches: Vec<(String, Document)> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| query.filters.iter().all(|f| f.matches(doc)))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default();
        drop(collections);

        query::sort_documents(&mut matches, &query.order_by);
        if let Some(limit) = query.limit {
            matches.truncate(limit as usize);
        }
        Ok(matches)
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }
}

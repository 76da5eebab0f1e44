//! Document store backends.
//!
//! [`DocumentStore`] is the seam between the tool dispatcher and a concrete
//! database. The production backend speaks to a managed database through the
//! vendor SDK; the in-memory backend backs tests and `--memory` mode.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use mongodb::bson::Document;

use crate::query::Query;

/// Errors from a document store backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Any failure reported by the backend (network, permission, malformed query).
    #[error("{0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A handle to one project's document database.
///
/// Documents are ordered field maps addressed by `(collection, id)`. The id is
/// not part of the field map; backends that persist it (as `_id`) strip it on
/// the way out.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Human-readable backend name, for logs.
    fn backend_name(&self) -> &'static str;

    /// Fetch one document by id. `None` if absent.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Insert with an auto-generated id; returns the id.
    async fn insert(&self, collection: &str, data: Document) -> StoreResult<String>;

    /// Write at a known id. `merge = true` shallow-merges the fields into any
    /// existing document; `merge = false` replaces it wholesale. Creates the
    /// document if absent either way.
    async fn set(&self, collection: &str, id: &str, data: Document, merge: bool) -> StoreResult<()>;

    /// Delete by id. Deleting an absent document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Run a filtered/ordered/limited query over one collection.
    async fn query(&self, collection: &str, query: &Query)
        -> StoreResult<Vec<(String, Document)>>;

    /// Collection names visible at the database root.
    async fn list_collections(&self) -> StoreResult<Vec<String>>;
}

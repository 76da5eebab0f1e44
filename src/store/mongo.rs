//! MongoDB-backed document store.
//!
//! A thin translation onto the vendor SDK. Connection pooling, retries, and
//! timeouts are the driver's business; failures surface as [`StoreError`] on
//! the first operation that hits the network.

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::{Client, Collection, Database};

use crate::query::Query;
use crate::store::{DocumentStore, StoreResult};

/// Document store backed by one MongoDB database.
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Build a store from a connection string and database name.
    ///
    /// The client connects lazily; bad credentials or an unreachable host
    /// show up on the first operation, not here.
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            db: client.database(database),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

/// Split the `_id` out of a stored document.
fn split_id(mut doc: Document) -> (String, Document) {
    let id = match doc.remove("_id") {
        Some(Bson::String(s)) => s,
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    (id, doc)
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let found = self
            .collection(collection)
            .find_one(doc! { "_id": id })
            .await?;
        Ok(found.map(|doc| split_id(doc).1))
    }

    async fn insert(&self, collection: &str, data: Document) -> StoreResult<String> {
        let id = ObjectId::new().to_hex();
        let mut doc = doc! { "_id": id.as_str() };
        doc.extend(data);
        self.collection(collection).insert_one(doc).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Document, merge: bool) -> StoreResult<()> {
        let filter = doc! { "_id": id };
        let coll = self.collection(collection);
        if merge {
            if data.is_empty() {
                // $set rejects an empty document; still create-if-absent.
                coll.update_one(filter, doc! { "$setOnInsert": { "_id": id } })
                    .upsert(true)
                    .await?;
            } else {
                coll.update_one(filter, doc! { "$set": data })
                    .upsert(true)
                    .await?;
            }
        } else {
            coll.replace_one(filter, data).upsert(true).await?;
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.collection(collection)
            .delete_one(doc! { "_id": id })
            .await?;
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query)
        -> StoreResult<Vec<(String, Document)>> {
        let coll = self.collection(collection);
        let mut find = coll.find(query.filter_doc());
        if !query.order_by.is_empty() {
            find = find.sort(query.sort_doc());
        }
        if let Some(limit) = query.limit {
            find = find.limit(limit);
        }
        let docs: Vec<Document> = find.await?.try_collect().await?;
        Ok(docs.into_iter().map(split_id).collect())
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        Ok(self.db.list_collection_names().await?)
    }
}

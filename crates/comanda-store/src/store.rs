use bson::oid::ObjectId;
use bson::{Document, doc};
use comanda_query::Query;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::pipeline::Stage;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    /// Fields carrying a unique index.
    #[serde(default)]
    pub unique: Vec<String>,
}

impl CollectionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: Vec::new(),
        }
    }

    pub fn unique(mut self, field: impl Into<String>) -> Self {
        self.unique.push(field.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Per-collection document operations.
///
/// Collections are created on first write. Documents inserted without an
/// `_id` get a fresh `ObjectId`. Every single-document write is atomic; bulk
/// writes are not transactional.
pub trait DocumentStore: Send + Sync {
    /// Create the collection and its unique indexes if missing.
    fn create_collection(&self, config: &CollectionConfig) -> Result<(), StoreError>;

    /// Filter, sort, skip, limit, then project.
    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    fn find_by_id(&self, collection: &str, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        let query = Query {
            take: Some(1),
            ..Query::new(doc! { "_id": *id })
        };
        Ok(self.find(collection, &query)?.into_iter().next())
    }

    /// Returns the stored document, `_id` included.
    fn insert_one(&self, collection: &str, doc: Document) -> Result<Document, StoreError>;

    /// Unordered insert: every valid document is written even when others are
    /// rejected, in which case the result is [`StoreError::PartialInsert`].
    fn insert_many(&self, collection: &str, docs: Vec<Document>)
    -> Result<Vec<Document>, StoreError>;

    /// Apply `update` to the document with this id and return it as stored
    /// after the update.
    fn find_by_id_and_update(
        &self,
        collection: &str,
        id: &ObjectId,
        update: &Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove the document with this id and return it.
    fn find_by_id_and_delete(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError>;

    /// Apply `update` to the first document matching `filter`.
    fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult, StoreError>;

    fn update_many(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult, StoreError>;

    fn delete_many(&self, collection: &str, filter: &Document) -> Result<DeleteResult, StoreError>;

    fn count_documents(&self, collection: &str, filter: &Document) -> Result<u64, StoreError>;

    fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> Result<Vec<Document>, StoreError>;
}

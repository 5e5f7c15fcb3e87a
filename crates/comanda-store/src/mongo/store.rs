use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use comanda_query::Query;
use mongodb::IndexModel;
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::sync::{Client, Collection, Database};

use crate::error::StoreError;
use crate::pipeline::Stage;
use crate::store::{CollectionConfig, DeleteResult, DocumentStore, UpdateResult};
use crate::update::Mutation;

use super::pipeline::to_native;

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store over the synchronous driver.
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connect and ping, so a bad URI fails at startup instead of on the first
    /// request.
    pub fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).map_err(|e| backend("connect", e))?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 })
            .run()
            .map_err(|e| backend("ping", e))?;
        tracing::info!(database, "connected to mongodb");
        Ok(Self { db })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

fn backend(op: &str, e: mongodb::error::Error) -> StoreError {
    StoreError::Backend(format!("{op}: {e}"))
}

/// Map driver write errors, surfacing E11000 as a duplicate key.
fn write_error(collection: &str, e: mongodb::error::Error) -> StoreError {
    use mongodb::error::{ErrorKind, WriteFailure};

    let duplicate = match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY => {
            Some(we.message.clone())
        }
        ErrorKind::Command(ce) if ce.code == DUPLICATE_KEY => Some(ce.message.clone()),
        _ => None,
    };
    match duplicate {
        Some(message) => {
            let (field, value) = parse_dup_key(&message);
            StoreError::DuplicateKey {
                collection: collection.to_string(),
                field,
                value,
            }
        }
        None => StoreError::Backend(e.to_string()),
    }
}

/// `... dup key: { correo: "ana@x.mx" }` → (`correo`, `ana@x.mx`)
fn parse_dup_key(message: &str) -> (String, String) {
    let body = message
        .split_once("dup key: {")
        .map(|(_, rest)| rest.trim_end().trim_end_matches('}').trim())
        .unwrap_or_default();
    match body.split_once(':') {
        Some((field, value)) => (
            field.trim().to_string(),
            value.trim().trim_matches('"').to_string(),
        ),
        None => ("unknown".into(), message.to_string()),
    }
}

/// Plain field-merge patches become `$set`; operator documents pass through.
fn native_update(update: &Document) -> Document {
    if update.keys().any(|k| k.starts_with('$')) {
        update.clone()
    } else {
        doc! { "$set": update.clone() }
    }
}

fn ensure_id(doc: Document) -> Document {
    if doc.contains_key("_id") {
        return doc;
    }
    let mut with_id = doc! { "_id": ObjectId::new() };
    for (key, value) in doc {
        with_id.insert(key, value);
    }
    with_id
}

impl DocumentStore for MongoStore {
    fn create_collection(&self, config: &CollectionConfig) -> Result<(), StoreError> {
        let coll = self.collection(&config.name);
        for field in &config.unique {
            let index = IndexModel::builder()
                .keys(doc! { field.as_str(): 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();
            coll.create_index(index)
                .run()
                .map_err(|e| write_error(&config.name, e))?;
        }
        tracing::debug!(collection = %config.name, unique = ?config.unique, "collection ready");
        Ok(())
    }

    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut action = self.collection(collection).find(query.filter.clone());
        if let Some(columns) = &query.projection {
            let mut projection = Document::new();
            for column in columns {
                projection.insert(column.as_str(), 1);
            }
            action = action.projection(projection);
        }
        if !query.sort.is_empty() {
            let mut sort = Document::new();
            for key in &query.sort {
                sort.insert(key.field.as_str(), key.direction.as_i32());
            }
            action = action.sort(sort);
        }
        if let Some(skip) = query.skip {
            action = action.skip(skip as u64);
        }
        if let Some(take) = query.take {
            action = action.limit(i64::try_from(take).unwrap_or(i64::MAX));
        }

        let cursor = action.run().map_err(|e| backend("find", e))?;
        cursor
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| backend("find", e))
    }

    fn find_by_id(&self, collection: &str, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        self.collection(collection)
            .find_one(doc! { "_id": *id })
            .run()
            .map_err(|e| backend("find_one", e))
    }

    fn insert_one(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let doc = ensure_id(doc);
        self.collection(collection)
            .insert_one(&doc)
            .run()
            .map_err(|e| write_error(collection, e))?;
        Ok(doc)
    }

    fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        if docs.is_empty() {
            return Ok(docs);
        }
        let docs: Vec<Document> = docs.into_iter().map(ensure_id).collect();
        let coll = self.collection(collection);
        match coll.insert_many(&docs).ordered(false).run() {
            Ok(_) => Ok(docs),
            Err(e) => {
                // ids were assigned up front, so the survivors can be counted
                let ids: Vec<Bson> = docs.iter().filter_map(|d| d.get("_id").cloned()).collect();
                let inserted = coll
                    .count_documents(doc! { "_id": { "$in": ids } })
                    .run()
                    .map_err(|e| backend("count_documents", e))?;
                tracing::warn!(collection, inserted, total = docs.len(), "bulk insert partially failed");
                Err(StoreError::PartialInsert {
                    inserted: inserted as usize,
                    message: write_error(collection, e).to_string(),
                })
            }
        }
    }

    fn find_by_id_and_update(
        &self,
        collection: &str,
        id: &ObjectId,
        update: &Document,
    ) -> Result<Option<Document>, StoreError> {
        if Mutation::parse(update)?.is_empty() {
            return self.find_by_id(collection, id);
        }
        self.collection(collection)
            .find_one_and_update(doc! { "_id": *id }, native_update(update))
            .return_document(ReturnDocument::After)
            .run()
            .map_err(|e| write_error(collection, e))
    }

    fn find_by_id_and_delete(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        self.collection(collection)
            .find_one_and_delete(doc! { "_id": *id })
            .run()
            .map_err(|e| backend("find_one_and_delete", e))
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult, StoreError> {
        if Mutation::parse(update)?.is_empty() {
            let matched = self.count_documents(collection, filter)?.min(1);
            return Ok(UpdateResult {
                matched_count: matched,
                modified_count: 0,
            });
        }
        let result = self
            .collection(collection)
            .update_one(filter.clone(), native_update(update))
            .run()
            .map_err(|e| write_error(collection, e))?;
        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    fn update_many(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult, StoreError> {
        if Mutation::parse(update)?.is_empty() {
            return Ok(UpdateResult {
                matched_count: self.count_documents(collection, filter)?,
                modified_count: 0,
            });
        }
        let result = self
            .collection(collection)
            .update_many(filter.clone(), native_update(update))
            .run()
            .map_err(|e| write_error(collection, e))?;
        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    fn delete_many(&self, collection: &str, filter: &Document) -> Result<DeleteResult, StoreError> {
        let result = self
            .collection(collection)
            .delete_many(filter.clone())
            .run()
            .map_err(|e| backend("delete_many", e))?;
        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    fn count_documents(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        self.collection(collection)
            .count_documents(filter.clone())
            .run()
            .map_err(|e| backend("count_documents", e))
    }

    fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> Result<Vec<Document>, StoreError> {
        let cursor = self
            .collection(collection)
            .aggregate(to_native(pipeline))
            .run()
            .map_err(|e| backend("aggregate", e))?;
        cursor
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| backend("aggregate", e))
    }
}

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use arc_swap::ArcSwap;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use comanda_query::{Query, Sort, SortDirection};

use crate::document::{compare_values, get_path};
use crate::error::StoreError;
use crate::filter::{Expression, matches, parse_filter};
use crate::pipeline::Stage;
use crate::projection::apply_projection;
use crate::store::{CollectionConfig, DeleteResult, DocumentStore, UpdateResult};
use crate::update::Mutation;

use super::aggregate;
use super::collection::CollectionData;

type Handle = Arc<ArcSwap<CollectionData>>;

/// In-process document store.
///
/// Reads load the current collection snapshot without locking. Writes are
/// serialized by a single lock, applied to a clone of the snapshot and
/// published with one atomic swap, so readers never see half a bulk write.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Handle>>,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    fn handle(&self, name: &str) -> Result<Option<Handle>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Backend(format!("collections lock poisoned: {e}")))?;
        Ok(collections.get(name).cloned())
    }

    fn handle_or_create(&self, name: &str) -> Result<Handle, StoreError> {
        if let Some(handle) = self.handle(name)? {
            return Ok(handle);
        }
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(format!("collections lock poisoned: {e}")))?;
        let handle = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ArcSwap::from_pointee(CollectionData::default())));
        Ok(handle.clone())
    }

    /// Current snapshot of a collection. A missing collection reads as empty.
    pub(crate) fn snapshot(&self, name: &str) -> Result<Arc<CollectionData>, StoreError> {
        Ok(match self.handle(name)? {
            Some(handle) => handle.load_full(),
            None => Arc::new(CollectionData::default()),
        })
    }

    /// Run `f` against a private copy of the collection and publish the copy
    /// when `f` succeeds. On error nothing is published.
    pub(crate) fn write<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut CollectionData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        // a panicking writer never published its copy, so the data behind a
        // poisoned lock is still consistent
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let handle = self.handle_or_create(name)?;
        let mut data = (**handle.load()).clone();
        let out = f(&mut data)?;
        handle.store(Arc::new(data));
        Ok(out)
    }

    fn matching(data: &CollectionData, expr: &Expression) -> Vec<u64> {
        data.iter()
            .filter(|(_, doc)| matches(doc, expr))
            .map(|(seq, _)| seq)
            .collect()
    }

    fn update_seqs(
        collection: &str,
        data: &mut CollectionData,
        seqs: Vec<u64>,
        mutation: &Mutation,
    ) -> Result<UpdateResult, StoreError> {
        let mut result = UpdateResult {
            matched_count: seqs.len() as u64,
            modified_count: 0,
        };
        for seq in seqs {
            let Some(mut doc) = data.get(seq).cloned() else {
                continue;
            };
            if mutation.apply(&mut doc)? {
                data.replace(collection, seq, doc)?;
                result.modified_count += 1;
            }
        }
        Ok(result)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable multi-key sort; missing fields order first ascending.
pub(crate) fn sort_documents(docs: &mut [Document], sort: &[Sort]) {
    if sort.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for key in sort {
            let ord = compare_values(get_path(a, &key.field), get_path(b, &key.field));
            let ord = match key.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

impl DocumentStore for MemoryStore {
    fn create_collection(&self, config: &CollectionConfig) -> Result<(), StoreError> {
        self.write(&config.name, |data| {
            for field in &config.unique {
                data.add_unique_index(&config.name, field)?;
            }
            Ok(())
        })?;
        tracing::debug!(collection = %config.name, unique = ?config.unique, "collection ready");
        Ok(())
    }

    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let expr = parse_filter(&query.filter)?;
        let data = self.snapshot(collection)?;

        let mut docs: Vec<Document> = data
            .iter()
            .filter(|(_, doc)| matches(doc, &expr))
            .map(|(_, doc)| doc.clone())
            .collect();
        sort_documents(&mut docs, &query.sort);

        let rest = docs.into_iter().skip(query.skip.unwrap_or(0));
        let mut out: Vec<Document> = match query.take {
            Some(n) => rest.take(n).collect(),
            None => rest.collect(),
        };
        if let Some(columns) = &query.projection {
            for doc in &mut out {
                apply_projection(doc, columns);
            }
        }
        Ok(out)
    }

    fn find_by_id(&self, collection: &str, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        let data = self.snapshot(collection)?;
        Ok(data
            .seq_of(&Bson::ObjectId(*id))
            .and_then(|seq| data.get(seq).cloned()))
    }

    fn insert_one(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        self.write(collection, |data| data.insert(collection, doc))
    }

    fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let (inserted, errors) = self.write(collection, |data| {
            let mut inserted = Vec::with_capacity(docs.len());
            let mut errors = Vec::new();
            for doc in docs {
                match data.insert(collection, doc) {
                    Ok(stored) => inserted.push(stored),
                    Err(e) => errors.push(e),
                }
            }
            Ok((inserted, errors))
        })?;

        match errors.first() {
            None => Ok(inserted),
            Some(first) => {
                tracing::warn!(
                    collection,
                    inserted = inserted.len(),
                    rejected = errors.len(),
                    "bulk insert partially failed"
                );
                Err(StoreError::PartialInsert {
                    inserted: inserted.len(),
                    message: first.to_string(),
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
        let mutation = Mutation::parse(update)?;
        if self.handle(collection)?.is_none() {
            return Ok(None);
        }
        self.write(collection, |data| {
            let Some(seq) = data.seq_of(&Bson::ObjectId(*id)) else {
                return Ok(None);
            };
            let Some(mut doc) = data.get(seq).cloned() else {
                return Ok(None);
            };
            if mutation.apply(&mut doc)? {
                data.replace(collection, seq, doc.clone())?;
            }
            Ok(Some(doc))
        })
    }

    fn find_by_id_and_delete(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        if self.handle(collection)?.is_none() {
            return Ok(None);
        }
        self.write(collection, |data| {
            Ok(data
                .seq_of(&Bson::ObjectId(*id))
                .and_then(|seq| data.remove(seq)))
        })
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult, StoreError> {
        let expr = parse_filter(filter)?;
        let mutation = Mutation::parse(update)?;
        if self.handle(collection)?.is_none() {
            return Ok(UpdateResult::default());
        }
        self.write(collection, |data| {
            let first: Vec<u64> = Self::matching(data, &expr).into_iter().take(1).collect();
            Self::update_seqs(collection, data, first, &mutation)
        })
    }

    fn update_many(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult, StoreError> {
        let expr = parse_filter(filter)?;
        let mutation = Mutation::parse(update)?;
        if self.handle(collection)?.is_none() {
            return Ok(UpdateResult::default());
        }
        self.write(collection, |data| {
            let seqs = Self::matching(data, &expr);
            Self::update_seqs(collection, data, seqs, &mutation)
        })
    }

    fn delete_many(&self, collection: &str, filter: &Document) -> Result<DeleteResult, StoreError> {
        let expr = parse_filter(filter)?;
        if self.handle(collection)?.is_none() {
            return Ok(DeleteResult::default());
        }
        self.write(collection, |data| {
            let seqs = Self::matching(data, &expr);
            let deleted_count = seqs
                .into_iter()
                .filter(|seq| data.remove(*seq).is_some())
                .count() as u64;
            Ok(DeleteResult { deleted_count })
        })
    }

    fn count_documents(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        let expr = parse_filter(filter)?;
        let data = self.snapshot(collection)?;
        Ok(Self::matching(&data, &expr).len() as u64)
    }

    fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> Result<Vec<Document>, StoreError> {
        aggregate::run(self, collection, pipeline)
    }
}

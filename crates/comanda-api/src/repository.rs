use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use comanda_query::Query;
use comanda_store::{DeleteResult, DocumentStore, StoreError, UpdateResult};

use crate::model::{Entity, Reference};

/// Typed access to one entity's collection.
///
/// Every read resolves `E::POPULATE` references; writes run the entity's
/// hooks after the store call succeeds.
pub struct Repository<E> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn find(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut docs = self.store.find(E::COLLECTION, query)?;
        self.populate(&mut docs)?;
        Ok(docs)
    }

    pub fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        let Some(doc) = self.store.find_by_id(E::COLLECTION, id)? else {
            return Ok(None);
        };
        let mut docs = vec![doc];
        self.populate(&mut docs)?;
        Ok(docs.pop())
    }

    pub fn create(&self, doc: Document) -> Result<Document, StoreError> {
        let stored = self.store.insert_one(E::COLLECTION, doc)?;
        E::after_create(self.store.as_ref(), &stored)?;
        Ok(stored)
    }

    /// Unordered insert. Hooks run only when every document was written.
    pub fn create_many(&self, docs: Vec<Document>) -> Result<Vec<Document>, StoreError> {
        let stored = self.store.insert_many(E::COLLECTION, docs)?;
        for doc in &stored {
            E::after_create(self.store.as_ref(), doc)?;
        }
        Ok(stored)
    }

    pub fn update_by_id(
        &self,
        id: &ObjectId,
        patch: &Document,
    ) -> Result<Option<Document>, StoreError> {
        self.store.find_by_id_and_update(E::COLLECTION, id, patch)
    }

    pub fn update_many(
        &self,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult, StoreError> {
        self.store.update_many(E::COLLECTION, filter, update)
    }

    pub fn delete_by_id(&self, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        let removed = self.store.find_by_id_and_delete(E::COLLECTION, id)?;
        if let Some(doc) = &removed {
            E::after_delete(self.store.as_ref(), doc)?;
        }
        Ok(removed)
    }

    pub fn delete_many(&self, filter: &Document) -> Result<DeleteResult, StoreError> {
        self.store.delete_many(E::COLLECTION, filter)
    }

    pub fn count(&self, filter: &Document) -> Result<u64, StoreError> {
        self.store.count_documents(E::COLLECTION, filter)
    }

    /// Replace each reference with the document it points at, or `null` when
    /// that document no longer exists. One `$in` lookup per reference.
    pub fn populate(&self, docs: &mut [Document]) -> Result<(), StoreError> {
        for reference in E::POPULATE {
            populate_reference(self.store.as_ref(), docs, reference)?;
        }
        Ok(())
    }
}

fn populate_reference(
    store: &dyn DocumentStore,
    docs: &mut [Document],
    reference: &Reference,
) -> Result<(), StoreError> {
    let mut ids: Vec<ObjectId> = Vec::new();
    for doc in docs.iter_mut() {
        visit_refs(doc, reference.path, &mut |value| {
            if let Bson::ObjectId(oid) = *value {
                if !ids.contains(&oid) {
                    ids.push(oid);
                }
            }
        });
    }
    if ids.is_empty() {
        return Ok(());
    }

    let in_ids: Vec<Bson> = ids.iter().copied().map(Bson::ObjectId).collect();
    let query = Query::new(doc! { "_id": { "$in": in_ids } });
    let found: HashMap<ObjectId, Document> = store
        .find(reference.collection, &query)?
        .into_iter()
        .filter_map(|d| Some((d.get_object_id("_id").ok()?, d)))
        .collect();

    for doc in docs.iter_mut() {
        visit_refs(doc, reference.path, &mut |value| {
            if let Bson::ObjectId(oid) = *value {
                *value = found
                    .get(&oid)
                    .map_or(Bson::Null, |d| Bson::Document(d.clone()));
            }
        });
    }
    Ok(())
}

/// Call `f` on the value at `path`, fanning out over arrays of documents at
/// intermediate segments.
fn visit_refs(doc: &mut Document, path: &str, f: &mut dyn FnMut(&mut Bson)) {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let Some(value) = doc.get_mut(head) else {
        return;
    };
    match rest {
        None => f(value),
        Some(rest) => match value {
            Bson::Document(inner) => visit_refs(inner, rest, f),
            Bson::Array(items) => {
                for item in items {
                    if let Bson::Document(inner) = item {
                        visit_refs(inner, rest, f);
                    }
                }
            }
            _ => {}
        },
    }
}

/// Cast 24-char hex strings to `ObjectId` for the given top-level fields,
/// including inside `$in`/`$nin`/`$eq`/`$ne` operator documents.
pub fn cast_ids(filter: &mut Document, fields: &[&str]) {
    for field in fields {
        if let Some(value) = filter.get_mut(*field) {
            cast_value(value);
        }
    }
}

fn cast_value(value: &mut Bson) {
    match value {
        Bson::String(s) if s.len() == 24 => {
            if let Ok(oid) = ObjectId::parse_str(s.as_str()) {
                *value = Bson::ObjectId(oid);
            }
        }
        Bson::Array(items) => items.iter_mut().for_each(cast_value),
        Bson::Document(ops) => {
            for (key, operand) in ops.iter_mut() {
                if matches!(key.as_str(), "$in" | "$nin" | "$eq" | "$ne") {
                    cast_value(operand);
                }
            }
        }
        _ => {}
    }
}

use bson::oid::ObjectId;
use bson::{Bson, Document};
use imbl::{HashMap, OrdMap};

use crate::document::{IdKey, display_value, get_path};
use crate::error::StoreError;

/// Immutable snapshot of one collection. Writers clone it (cheap, structural
/// sharing), mutate the clone and swap it in.
///
/// Documents are keyed by an insertion sequence so unsorted reads come back
/// in insertion order.
#[derive(Debug, Clone, Default)]
pub(crate) struct CollectionData {
    next_seq: u64,
    docs: OrdMap<u64, Document>,
    ids: HashMap<IdKey, u64>,
    // field → value → seq; documents without the field are not indexed
    unique: HashMap<String, HashMap<IdKey, u64>>,
}

impl CollectionData {
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &Document)> {
        self.docs.iter().map(|(seq, doc)| (*seq, doc))
    }

    pub fn get(&self, seq: u64) -> Option<&Document> {
        self.docs.get(&seq)
    }

    pub fn seq_of(&self, id: &Bson) -> Option<u64> {
        self.ids.get(&IdKey::of(id)).copied()
    }

    pub fn has_unique(&self, field: &str) -> bool {
        self.unique.contains_key(field)
    }

    /// Build a unique index over the existing documents.
    pub fn add_unique_index(&mut self, collection: &str, field: &str) -> Result<(), StoreError> {
        if self.has_unique(field) {
            return Ok(());
        }
        let mut index = HashMap::new();
        for (seq, doc) in self.iter() {
            if let Some(value) = indexed_value(doc, field) {
                if index.insert(IdKey::of(value), seq).is_some() {
                    return Err(duplicate(collection, field, value));
                }
            }
        }
        self.unique.insert(field.to_string(), index);
        Ok(())
    }

    /// Insert a document, assigning an `ObjectId` when `_id` is missing.
    pub fn insert(&mut self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let doc = if doc.contains_key("_id") {
            doc
        } else {
            let mut with_id = Document::new();
            with_id.insert("_id", ObjectId::new());
            for (key, value) in doc {
                with_id.insert(key, value);
            }
            with_id
        };

        let id_key = doc
            .get("_id")
            .map(IdKey::of)
            .ok_or_else(|| StoreError::Backend("document lost its _id".into()))?;
        if self.ids.contains_key(&id_key) {
            let id = doc.get("_id").map(display_value).unwrap_or_default();
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                field: "_id".into(),
                value: id,
            });
        }
        self.check_unique(collection, &doc, None)?;

        let seq = self.next_seq;
        self.next_seq += 1;
        self.index_unique(&doc, seq);
        self.ids.insert(id_key, seq);
        self.docs.insert(seq, doc.clone());
        Ok(doc)
    }

    /// Replace the document stored at `seq`. The `_id` must not change.
    pub fn replace(&mut self, collection: &str, seq: u64, doc: Document) -> Result<(), StoreError> {
        let Some(old) = self.docs.get(&seq).cloned() else {
            return Ok(());
        };
        self.check_unique(collection, &doc, Some(seq))?;
        self.unindex_unique(&old, seq);
        self.index_unique(&doc, seq);
        self.docs.insert(seq, doc);
        Ok(())
    }

    pub fn remove(&mut self, seq: u64) -> Option<Document> {
        let doc = self.docs.remove(&seq)?;
        if let Some(id) = doc.get("_id") {
            self.ids.remove(&IdKey::of(id));
        }
        self.unindex_unique(&doc, seq);
        Some(doc)
    }

    fn check_unique(
        &self,
        collection: &str,
        doc: &Document,
        own_seq: Option<u64>,
    ) -> Result<(), StoreError> {
        for (field, index) in self.unique.iter() {
            let Some(value) = indexed_value(doc, field) else {
                continue;
            };
            match index.get(&IdKey::of(value)) {
                Some(holder) if Some(*holder) != own_seq => {
                    return Err(duplicate(collection, field, value));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn index_unique(&mut self, doc: &Document, seq: u64) {
        let fields: Vec<String> = self.unique.keys().cloned().collect();
        for field in fields {
            if let (Some(value), Some(index)) =
                (indexed_value(doc, &field), self.unique.get_mut(&field))
            {
                index.insert(IdKey::of(value), seq);
            }
        }
    }

    fn unindex_unique(&mut self, doc: &Document, seq: u64) {
        let fields: Vec<String> = self.unique.keys().cloned().collect();
        for field in fields {
            let Some(value) = indexed_value(doc, &field) else {
                continue;
            };
            if let Some(index) = self.unique.get_mut(&field) {
                let key = IdKey::of(value);
                if index.get(&key) == Some(&seq) {
                    index.remove(&key);
                }
            }
        }
    }
}

fn indexed_value<'a>(doc: &'a Document, field: &str) -> Option<&'a Bson> {
    get_path(doc, field).filter(|v| !matches!(v, Bson::Null))
}

fn duplicate(collection: &str, field: &str, value: &Bson) -> StoreError {
    StoreError::DuplicateKey {
        collection: collection.to_string(),
        field: field.to_string(),
        value: display_value(value),
    }
}

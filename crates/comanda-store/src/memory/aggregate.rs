use bson::oid::ObjectId;
use bson::{Bson, Document};

use crate::document::{get_path, path_values, set_path, values_eq};
use crate::error::StoreError;
use crate::filter::{matches, parse_filter};
use crate::pipeline::{ArrayOp, Stage};

use super::collection::CollectionData;
use super::store::MemoryStore;

/// Interpret a pipeline over a snapshot of `collection`.
///
/// A pipeline ending in `Merge` runs entirely under the writer lock of its
/// target, reading the locked copy wherever it touches that collection, so
/// the merged documents are derived from their current stored versions.
pub(super) fn run(
    store: &MemoryStore,
    collection: &str,
    pipeline: &[Stage],
) -> Result<Vec<Document>, StoreError> {
    match pipeline.split_last() {
        Some((Stage::Merge { into }, stages)) => store.write(into, |data| {
            let source = if collection == into.as_str() {
                documents(data)
            } else {
                documents(&*store.snapshot(collection)?)
            };
            let docs = evaluate(store, source, stages, Some((into.as_str(), &*data)))?;
            merge(into, data, docs)?;
            Ok(Vec::new())
        }),
        _ => {
            let source = documents(&*store.snapshot(collection)?);
            evaluate(store, source, pipeline, None)
        }
    }
}

fn documents(data: &CollectionData) -> Vec<Document> {
    data.iter().map(|(_, doc)| doc.clone()).collect()
}

/// Run every stage but a trailing merge. `locked` is the collection held by
/// the caller, which lookups must read instead of its published snapshot.
fn evaluate(
    store: &MemoryStore,
    mut docs: Vec<Document>,
    stages: &[Stage],
    locked: Option<(&str, &CollectionData)>,
) -> Result<Vec<Document>, StoreError> {
    for stage in stages {
        docs = match stage {
            Stage::Match(filter) => {
                let expr = parse_filter(filter)?;
                docs.into_iter().filter(|d| matches(d, &expr)).collect()
            }
            Stage::ToObjectId { field, as_field } => docs
                .into_iter()
                .map(|mut d| {
                    let converted = to_object_id(get_path(&d, field));
                    set_path(&mut d, as_field, converted);
                    d
                })
                .collect(),
            Stage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => {
                let foreign = match locked {
                    Some((name, data)) if name == from.as_str() => documents(data),
                    _ => documents(&*store.snapshot(from)?),
                };
                docs.into_iter()
                    .map(|mut d| {
                        let local = get_path(&d, local_field).cloned().unwrap_or(Bson::Null);
                        let joined: Vec<Bson> = foreign
                            .iter()
                            .filter(|f| join_matches(&local, f, foreign_field))
                            .map(|f| Bson::Document(f.clone()))
                            .collect();
                        set_path(&mut d, as_field, Bson::Array(joined));
                        d
                    })
                    .collect()
            }
            Stage::Unwind(path) => unwind(docs, path),
            Stage::UpdateArray { field, op, item } => docs
                .into_iter()
                .map(|d| update_array(d, field, *op, item))
                .collect::<Result<_, _>>()?,
            Stage::Merge { .. } => {
                return Err(StoreError::InvalidPipeline(
                    "merge must be the last stage".into(),
                ));
            }
        };
    }
    Ok(docs)
}

fn to_object_id(value: Option<&Bson>) -> Bson {
    match value {
        Some(Bson::ObjectId(oid)) => Bson::ObjectId(*oid),
        Some(Bson::String(hex)) => ObjectId::parse_str(hex).map_or(Bson::Null, Bson::ObjectId),
        _ => Bson::Null,
    }
}

/// Equality join: an array on the local side matches on any element, and a
/// missing foreign field compares as `null`.
fn join_matches(local: &Bson, foreign: &Document, foreign_field: &str) -> bool {
    let locals: Vec<&Bson> = match local {
        Bson::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let remote = path_values(foreign, foreign_field);
    if remote.is_empty() {
        return locals.iter().any(|l| matches!(l, Bson::Null));
    }
    remote.iter().any(|r| {
        locals.iter().any(|l| match r {
            Bson::Array(items) => items.iter().any(|item| values_eq(item, l)),
            _ => values_eq(r, l),
        })
    })
}

fn unwind(docs: Vec<Document>, path: &str) -> Vec<Document> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        match get_path(&doc, path) {
            Some(Bson::Array(items)) => {
                for item in items.clone() {
                    let mut copy = doc.clone();
                    set_path(&mut copy, path, item);
                    out.push(copy);
                }
            }
            None | Some(Bson::Null) => {}
            Some(_) => out.push(doc),
        }
    }
    out
}

fn update_array(
    mut doc: Document,
    field: &str,
    op: ArrayOp,
    item: &Bson,
) -> Result<Document, StoreError> {
    let mut items = match get_path(&doc, field) {
        None | Some(Bson::Null) => Vec::new(),
        Some(Bson::Array(items)) => items.clone(),
        Some(_) => {
            return Err(StoreError::InvalidPipeline(format!(
                "field '{field}' is not an array"
            )));
        }
    };
    match op {
        ArrayOp::Push => items.push(item.clone()),
        ArrayOp::AddToSet => {
            dedupe(&mut items);
            if !items.iter().any(|i| values_eq(i, item)) {
                items.push(item.clone());
            }
        }
        ArrayOp::Pull => {
            items.retain(|i| !values_eq(i, item));
            dedupe(&mut items);
        }
    }
    set_path(&mut doc, field, Bson::Array(items));
    Ok(doc)
}

/// Set semantics: keep the first occurrence of each value.
fn dedupe(items: &mut Vec<Bson>) {
    let mut kept: Vec<Bson> = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        if !kept.iter().any(|k| values_eq(k, &item)) {
            kept.push(item);
        }
    }
    *items = kept;
}

fn merge(into: &str, data: &mut CollectionData, docs: Vec<Document>) -> Result<(), StoreError> {
    for doc in docs {
        let Some(seq) = doc.get("_id").and_then(|id| data.seq_of(id)) else {
            continue;
        };
        data.replace(into, seq, doc)?;
    }
    Ok(())
}

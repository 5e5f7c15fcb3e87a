use bson::{Bson, Document};

use crate::document::values_eq;
use crate::error::StoreError;

/// A single field-level update operator.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Set a field to a value. Creates the field if it doesn't exist.
    Set(Bson),
    /// Remove a field from the document.
    Unset,
    /// Increment a numeric field by the given amount.
    Inc(Bson),
    /// Append values to an array field. Creates the array if missing.
    Push(Vec<Bson>),
    /// Append values not already present in the array.
    AddToSet(Vec<Bson>),
    /// Remove every element equal to the value.
    Pull(Bson),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: String,
    pub op: UpdateOp,
}

/// A parsed update document: a list of (field, operator) pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mutation {
    pub ops: Vec<FieldUpdate>,
}

impl Mutation {
    /// Parse an update document.
    ///
    /// Recognizes `$set`, `$unset`, `$inc`, `$push`, `$addToSet` and `$pull`.
    /// A document with no operator keys is a field-merge patch (implicit
    /// `$set`). Mixing the two forms is rejected, as is touching `_id`.
    pub fn parse(update: &Document) -> Result<Self, StoreError> {
        let has_ops = update.keys().any(|k| k.starts_with('$'));
        let has_fields = update.keys().any(|k| !k.starts_with('$'));
        if has_ops && has_fields {
            return Err(StoreError::InvalidUpdate(
                "cannot mix update operators and plain fields".into(),
            ));
        }

        let mut ops = Vec::new();
        if !has_ops {
            for (field, value) in update {
                push_op(&mut ops, field, UpdateOp::Set(value.clone()))?;
            }
            return Ok(Mutation { ops });
        }

        for (op, spec) in update {
            let Bson::Document(fields) = spec else {
                return Err(StoreError::InvalidUpdate(format!("{op} value must be a document")));
            };
            for (field, operand) in fields {
                let parsed = match op.as_str() {
                    "$set" => UpdateOp::Set(operand.clone()),
                    "$unset" => UpdateOp::Unset,
                    "$inc" => match operand {
                        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
                            UpdateOp::Inc(operand.clone())
                        }
                        _ => {
                            return Err(StoreError::InvalidUpdate(format!(
                                "$inc amount for '{field}' must be numeric"
                            )));
                        }
                    },
                    "$push" => UpdateOp::Push(each(operand)),
                    "$addToSet" => UpdateOp::AddToSet(each(operand)),
                    "$pull" => UpdateOp::Pull(operand.clone()),
                    other => {
                        return Err(StoreError::InvalidUpdate(format!(
                            "unknown update operator: {other}"
                        )));
                    }
                };
                push_op(&mut ops, field, parsed)?;
            }
        }
        Ok(Mutation { ops })
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply in place. Returns whether the document changed.
    pub fn apply(&self, doc: &mut Document) -> Result<bool, StoreError> {
        let mut changed = false;
        for fu in &self.ops {
            let creates = !matches!(fu.op, UpdateOp::Unset | UpdateOp::Pull(_));
            let Some((parent, leaf)) = resolve_parent_mut(doc, &fu.field, creates)? else {
                continue;
            };
            changed |= match &fu.op {
                UpdateOp::Set(value) => op_set(parent, leaf, value),
                UpdateOp::Unset => parent.remove(leaf).is_some(),
                UpdateOp::Inc(amount) => op_inc(parent, leaf, amount)?,
                UpdateOp::Push(values) => op_push(parent, leaf, values, false)?,
                UpdateOp::AddToSet(values) => op_push(parent, leaf, values, true)?,
                UpdateOp::Pull(value) => op_pull(parent, leaf, value)?,
            };
        }
        Ok(changed)
    }
}

fn push_op(ops: &mut Vec<FieldUpdate>, field: &str, op: UpdateOp) -> Result<(), StoreError> {
    if field == "_id" || field.starts_with("_id.") {
        return Err(StoreError::InvalidUpdate("the _id field is immutable".into()));
    }
    if field.is_empty() || field.split('.').any(str::is_empty) {
        return Err(StoreError::InvalidUpdate(format!("invalid field path '{field}'")));
    }
    ops.push(FieldUpdate {
        field: field.to_string(),
        op,
    });
    Ok(())
}

/// `{ "$each": [..] }` expands to several values; anything else is one value.
fn each(operand: &Bson) -> Vec<Bson> {
    match operand {
        Bson::Document(d) if d.len() == 1 => match d.get("$each") {
            Some(Bson::Array(items)) => items.clone(),
            _ => vec![operand.clone()],
        },
        _ => vec![operand.clone()],
    }
}

/// Resolve a dot-path to its parent document and leaf field name, creating
/// missing intermediate documents when `create` is set.
fn resolve_parent_mut<'d, 'p>(
    doc: &'d mut Document,
    path: &'p str,
    create: bool,
) -> Result<Option<(&'d mut Document, &'p str)>, StoreError> {
    let Some((head, rest)) = path.split_once('.') else {
        return Ok(Some((doc, path)));
    };
    if !doc.contains_key(head) {
        if !create {
            return Ok(None);
        }
        doc.insert(head, Document::new());
    }
    match doc.get_mut(head) {
        Some(Bson::Document(sub)) => resolve_parent_mut(sub, rest, create),
        Some(_) if !create => Ok(None),
        Some(_) => Err(StoreError::InvalidUpdate(format!(
            "field path '{path}': '{head}' is not a document"
        ))),
        None => Ok(None),
    }
}

fn op_set(doc: &mut Document, field: &str, value: &Bson) -> bool {
    if doc.get(field) == Some(value) {
        return false;
    }
    doc.insert(field, value.clone());
    true
}

fn op_inc(doc: &mut Document, field: &str, amount: &Bson) -> Result<bool, StoreError> {
    let current = doc.get(field).cloned().unwrap_or(match amount {
        Bson::Int64(_) => Bson::Int64(0),
        Bson::Double(_) => Bson::Double(0.0),
        _ => Bson::Int32(0),
    });

    let overflow = || StoreError::InvalidUpdate(format!("$inc overflow on field '{field}'"));
    let result = match (&current, amount) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        },
        (Bson::Int32(a), Bson::Int64(b)) => {
            Bson::Int64(i64::from(*a).checked_add(*b).ok_or_else(overflow)?)
        }
        (Bson::Int64(a), Bson::Int32(b)) => {
            Bson::Int64(a.checked_add(i64::from(*b)).ok_or_else(overflow)?)
        }
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a.checked_add(*b).ok_or_else(overflow)?),
        (Bson::Double(a), Bson::Double(b)) => Bson::Double(a + b),
        (Bson::Int32(a), Bson::Double(b)) => Bson::Double(f64::from(*a) + b),
        (Bson::Int64(a), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        (Bson::Double(a), Bson::Int32(b)) => Bson::Double(a + f64::from(*b)),
        (Bson::Double(a), Bson::Int64(b)) => Bson::Double(a + *b as f64),
        _ => {
            return Err(StoreError::InvalidUpdate(format!(
                "$inc: field '{field}' is not numeric"
            )));
        }
    };

    let changed = !values_eq(&current, &result) || !doc.contains_key(field);
    doc.insert(field, result);
    Ok(changed)
}

fn op_push(
    doc: &mut Document,
    field: &str,
    values: &[Bson],
    unique: bool,
) -> Result<bool, StoreError> {
    if !doc.contains_key(field) {
        doc.insert(field, Bson::Array(Vec::new()));
    }
    let Some(Bson::Array(items)) = doc.get_mut(field) else {
        return Err(StoreError::InvalidUpdate(format!(
            "field '{field}' is not an array"
        )));
    };
    let before = items.len();
    for value in values {
        if unique && items.iter().any(|item| values_eq(item, value)) {
            continue;
        }
        items.push(value.clone());
    }
    Ok(items.len() != before)
}

fn op_pull(doc: &mut Document, field: &str, value: &Bson) -> Result<bool, StoreError> {
    match doc.get_mut(field) {
        None => Ok(false),
        Some(Bson::Array(items)) => {
            let before = items.len();
            items.retain(|item| !values_eq(item, value));
            Ok(items.len() != before)
        }
        Some(_) => Err(StoreError::InvalidUpdate(format!(
            "field '{field}' is not an array"
        ))),
    }
}

use std::cmp::Ordering;

use bson::{Bson, Document};

/// Resolve a dot-notation path without expanding arrays.
///
/// - `"estado"`         → the `estado` value
/// - `"ubicacion.lat"`  → `ubicacion` sub-document's `lat`
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(sub) => sub.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

/// All values reachable through `path`, walking into arrays of documents at
/// intermediate segments. The leaf value is returned as stored, so a leaf
/// array comes back as a single `Bson::Array`.
///
/// - `"articulos.articulo_id"` → one value per order line
pub(crate) fn path_values<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    collect_from_doc(doc, &segments, &mut out);
    out
}

fn collect_from_doc<'a>(doc: &'a Document, segments: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if let Some(value) = doc.get(*head) {
        collect_from_value(value, rest, out);
    }
}

fn collect_from_value<'a>(value: &'a Bson, segments: &[&str], out: &mut Vec<&'a Bson>) {
    if segments.is_empty() {
        out.push(value);
        return;
    }
    match value {
        Bson::Document(sub) => collect_from_doc(sub, segments, out),
        Bson::Array(items) => {
            for item in items {
                if let Bson::Document(sub) = item {
                    collect_from_doc(sub, segments, out);
                }
            }
        }
        _ => {}
    }
}

/// Set a dot-notation path, replacing non-document intermediates with empty
/// documents.
pub(crate) fn set_path(doc: &mut Document, path: &str, value: Bson) {
    let Some((head, rest)) = path.split_once('.') else {
        doc.insert(path, value);
        return;
    };
    if !matches!(doc.get(head), Some(Bson::Document(_))) {
        doc.insert(head, Document::new());
    }
    if let Some(Bson::Document(sub)) = doc.get_mut(head) {
        set_path(sub, rest, value);
    }
}

/// Human-readable rendering for error messages.
pub(crate) fn display_value(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}

/// Equality as the store sees it: numbers compare across int/double widths,
/// everything else must match in type. A string never equals a number.
pub fn values_eq(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        (None, None) => match (a, b) {
            (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis() == y.timestamp_millis(),
            (Bson::Array(x), Bson::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_eq(l, r))
            }
            (Bson::Document(x), Bson::Document(y)) => {
                x.len() == y.len()
                    && x.iter()
                        .zip(y.iter())
                        .all(|((lk, lv), (rk, rv))| lk == rk && values_eq(lv, rv))
            }
            _ => a == b,
        },
        _ => false,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Cross-type rank following the store's BSON comparison order.
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 13,
        _ => 12,
    }
}

/// Sort comparison. Missing fields order like `null`, before everything else.
pub fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let a = a.unwrap_or(&Bson::Null);
    let b = b.unwrap_or(&Bson::Null);

    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        (Bson::Array(x), Bson::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(Some(l), Some(r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

/// Canonical map key for a document `_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdKey {
    ObjectId([u8; 12]),
    String(String),
    Int(i64),
    Other(String),
}

impl IdKey {
    pub fn of(id: &Bson) -> Self {
        match id {
            Bson::ObjectId(oid) => IdKey::ObjectId(oid.bytes()),
            Bson::String(s) => IdKey::String(s.clone()),
            Bson::Int32(n) => IdKey::Int(i64::from(*n)),
            Bson::Int64(n) => IdKey::Int(*n),
            other => IdKey::Other(other.clone().into_relaxed_extjson().to_string()),
        }
    }
}

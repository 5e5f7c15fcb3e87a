use axum::extract::FromRequest;
use bson::{Bson, Document};
use serde_json::{Map, Number, Value};

use crate::error::ApiError;

/// `axum::Json` with rejections rendered as `{ "error": ... }`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Response rendering: ids as 24-char hex strings, dates as RFC 3339.
pub fn to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        Bson::Double(n) => Number::from_f64(n).map_or(Value::Null, Value::Number),
        Bson::String(s) => Value::String(s),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::from(dt.timestamp_millis()),
        },
        Bson::Array(items) => Value::Array(items.into_iter().map(to_json).collect()),
        Bson::Document(doc) => document(doc),
        other => other.into_relaxed_extjson(),
    }
}

pub fn document(doc: Document) -> Value {
    let map: Map<String, Value> = doc.into_iter().map(|(k, v)| (k, to_json(v))).collect();
    Value::Object(map)
}

pub fn documents(docs: Vec<Document>) -> Value {
    Value::Array(docs.into_iter().map(document).collect())
}

/// Request filters and raw updates. Extended JSON (`{"$oid": ...}`) is
/// honored; operator keys such as `$in` pass through.
pub fn to_document(field: &str, value: Value) -> Result<Document, ApiError> {
    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(_) => Err(ApiError::BadRequest(format!("{field} must be an object"))),
        Err(e) => Err(ApiError::BadRequest(format!("invalid {field}: {e}"))),
    }
}

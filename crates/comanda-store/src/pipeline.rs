use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// Array update applied by [`Stage::UpdateArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrayOp {
    /// Append, duplicates allowed.
    Push,
    /// Append unless already present.
    AddToSet,
    /// Remove every occurrence.
    Pull,
}

impl ArrayOp {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "push" => Some(ArrayOp::Push),
            "addToSet" => Some(ArrayOp::AddToSet),
            "pull" => Some(ArrayOp::Pull),
            _ => None,
        }
    }
}

/// One step of an aggregation pipeline.
///
/// The set is closed: each backend knows how to run every stage, the memory
/// store by interpreting it and MongoDB by translating it to the native
/// stage document.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep documents matching a filter document.
    Match(Document),
    /// Convert a hex string field into an ObjectId stored at `as_field`.
    /// Values that are not valid ids become `null`.
    ToObjectId { field: String, as_field: String },
    /// Left outer join: `as_field` gets every document of `from` whose
    /// `foreign_field` equals this document's `local_field`.
    Lookup {
        from: String,
        local_field: String,
        foreign_field: String,
        as_field: String,
    },
    /// One output document per element of the array at the path. Documents
    /// with a missing or empty array are dropped.
    Unwind(String),
    /// Update an array field in every document. A missing field counts as an
    /// empty array.
    UpdateArray {
        field: String,
        op: ArrayOp,
        item: Bson,
    },
    /// Write each document back to `into`, replacing the stored document with
    /// the same `_id`. Documents without a stored counterpart are discarded.
    /// Produces no output.
    Merge { into: String },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "match",
            Stage::ToObjectId { .. } => "toObjectId",
            Stage::Lookup { .. } => "lookup",
            Stage::Unwind(_) => "unwind",
            Stage::UpdateArray { .. } => "updateArray",
            Stage::Merge { .. } => "merge",
        }
    }
}

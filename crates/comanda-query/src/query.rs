use bson::Document;
use serde::{Deserialize, Serialize};

use crate::sort::{Sort, SortDirection};

/// A read request against a single collection.
///
/// Execution order is filter, sort, skip, take. `projection` trims the
/// surviving documents; `_id` is always kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub filter: Document,
    pub projection: Option<Vec<String>>,
    #[serde(default)]
    pub sort: Vec<Sort>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

impl Query {
    pub fn new(filter: Document) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn sorted(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(Sort::new(field, direction));
        self
    }
}

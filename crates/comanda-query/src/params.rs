use bson::{Bson, Document};

use crate::error::QueryError;
use crate::query::Query;
use crate::sort::{Sort, SortDirection};

pub const SORT_FIELD: &str = "sortField";
pub const SORT_ORDER: &str = "sortOrder";
pub const SKIP: &str = "skip";
pub const LIMIT: &str = "limit";
pub const FIELDS: &str = "fields";

/// Query-string keys that control the read instead of filtering it.
pub const RESERVED: [&str; 5] = [SORT_FIELD, SORT_ORDER, SKIP, LIMIT, FIELDS];

pub fn is_reserved(key: &str) -> bool {
    RESERVED.contains(&key)
}

/// Request parameters split into reserved controls and equality filters.
///
/// Repeated keys keep the last value. Filter values are kept verbatim as
/// strings: `?precio=5` only matches documents whose `precio` is the string
/// `"5"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    filter: Document,
    sort_field: Option<String>,
    sort_order: Option<String>,
    skip: Option<String>,
    limit: Option<String>,
    fields: Option<String>,
}

impl QueryParams {
    pub fn partition<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut out = QueryParams::default();
        for (key, value) in params {
            let key = key.into();
            let value = value.into();
            match key.as_str() {
                SORT_FIELD => out.sort_field = Some(value),
                SORT_ORDER => out.sort_order = Some(value),
                SKIP => out.skip = Some(value),
                LIMIT => out.limit = Some(value),
                FIELDS => out.fields = Some(value),
                _ => {
                    out.filter.insert(key, Bson::String(value));
                }
            }
        }
        out
    }

    pub fn filter(&self) -> &Document {
        &self.filter
    }

    /// Inclusion projection from `fields`. Empty tokens are dropped; an empty
    /// or missing `fields` means every field.
    pub fn projection(&self) -> Option<Vec<String>> {
        let fields: Vec<String> = self
            .fields
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        if fields.is_empty() { None } else { Some(fields) }
    }

    /// Sorting applies only when both `sortField` and `sortOrder` are given.
    pub fn sort(&self) -> Option<Sort> {
        let field = self.sort_field.as_deref().filter(|f| !f.is_empty())?;
        let order = self.sort_order.as_deref()?;
        Some(Sort::new(field, SortDirection::from_order(order)))
    }

    pub fn skip(&self) -> Result<Option<usize>, QueryError> {
        parse_count(SKIP, self.skip.as_deref())
    }

    /// `limit=0` means no limit, as in the store.
    pub fn limit(&self) -> Result<Option<usize>, QueryError> {
        Ok(parse_count(LIMIT, self.limit.as_deref())?.filter(|n| *n > 0))
    }

    pub fn into_query(self) -> Result<Query, QueryError> {
        let skip = self.skip()?;
        let take = self.limit()?;
        let projection = self.projection();
        let sort = self.sort().into_iter().collect();
        Ok(Query {
            filter: self.filter,
            projection,
            sort,
            skip,
            take,
        })
    }
}

fn parse_count(param: &'static str, raw: Option<&str>) -> Result<Option<usize>, QueryError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };
    raw.parse::<usize>()
        .map(Some)
        .map_err(|_| QueryError::InvalidNumber {
            param,
            value: raw.to_string(),
        })
}

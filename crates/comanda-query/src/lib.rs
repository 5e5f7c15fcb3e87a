mod error;
mod params;
mod query;
mod sort;

pub use error::QueryError;
pub use params::{FIELDS, LIMIT, QueryParams, RESERVED, SKIP, SORT_FIELD, SORT_ORDER, is_reserved};
pub use query::Query;
pub use sort::{Sort, SortDirection};

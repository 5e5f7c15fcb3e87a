use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Only the literal `"asc"` sorts ascending. Every other value, including
    /// the empty string and typos, sorts descending.
    pub fn from_order(order: &str) -> Self {
        if order == "asc" {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }

    /// Direction for the `?order=` parameter of the sorted-by-X endpoints,
    /// falling back to `default` when the parameter is omitted.
    pub fn from_order_or(order: Option<&str>, default: SortDirection) -> Self {
        order.map_or(default, Self::from_order)
    }

    /// Store convention: `1` ascending, `-1` descending.
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

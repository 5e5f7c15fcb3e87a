use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidNumber { param: &'static str, value: String },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidNumber { param, value } => write!(
                f,
                "invalid value for '{param}': expected a non-negative integer, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for QueryError {}

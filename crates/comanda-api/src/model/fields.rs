use bson::oid::ObjectId;
use bson::{Bson, DateTime, Document, doc};
use serde::Deserialize;

use super::ValidationError;

/// Trimmed, non-empty text.
pub(super) fn text(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(trimmed.to_string())
}

pub(super) fn at_least(field: &'static str, value: f64, min: f64) -> Result<f64, ValidationError> {
    if value.is_nan() || value < min {
        return Err(ValidationError::Range {
            field,
            min,
            max: None,
        });
    }
    Ok(value)
}

pub(super) fn between(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, ValidationError> {
    if value.is_nan() || value < min || value > max {
        return Err(ValidationError::Range {
            field,
            min,
            max: Some(max),
        });
    }
    Ok(value)
}

pub(super) fn object_id(field: &'static str, value: &str) -> Result<ObjectId, ValidationError> {
    ObjectId::parse_str(value.trim()).map_err(|_| ValidationError::Invalid {
        field,
        message: format!("'{value}' is not a valid ObjectId"),
    })
}

pub(super) fn object_ids(field: &'static str, values: &[String]) -> Result<Bson, ValidationError> {
    values
        .iter()
        .map(|v| object_id(field, v).map(Bson::ObjectId))
        .collect::<Result<Vec<_>, _>>()
        .map(Bson::Array)
}

/// RFC 3339 date.
pub(super) fn date(field: &'static str, value: &str) -> Result<DateTime, ValidationError> {
    DateTime::parse_rfc3339_str(value.trim()).map_err(|_| ValidationError::Invalid {
        field,
        message: format!("'{value}' is not an RFC 3339 date"),
    })
}

/// Missing dates default to the time of the request.
pub(super) fn date_or_now(
    field: &'static str,
    value: Option<&str>,
) -> Result<DateTime, ValidationError> {
    value.map_or_else(|| Ok(DateTime::now()), |v| date(field, v))
}

pub(super) fn strings(values: Vec<String>) -> Bson {
    Bson::Array(
        values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Bson::String)
            .collect(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Ubicacion {
    pub lat: f64,
    pub lng: f64,
}

impl Ubicacion {
    pub fn to_document(self) -> Document {
        doc! { "lat": self.lat, "lng": self.lng }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed() {
        assert_eq!(text("nombre", "  Ana ".into()).unwrap(), "Ana");
        assert_eq!(
            text("nombre", "   ".into()).unwrap_err(),
            ValidationError::Required("nombre")
        );
    }

    #[test]
    fn ranges_are_inclusive() {
        assert!(between("calificacion", 5.0, 0.0, 5.0).is_ok());
        assert!(between("calificacion", 5.1, 0.0, 5.0).is_err());
        assert!(at_least("precio", 0.0, 0.0).is_ok());
        assert!(at_least("precio", -0.5, 0.0).is_err());
    }

    #[test]
    fn dates_parse_rfc3339() {
        let d = date("fecha", "2024-01-02T03:04:05Z").unwrap();
        assert_eq!(d.timestamp_millis(), 1_704_164_645_000);
        assert!(date("fecha", "ayer").is_err());
    }

    #[test]
    fn blank_categories_are_dropped() {
        assert_eq!(
            strings(vec![" italiano ".into(), "".into()]),
            Bson::Array(vec![Bson::from("italiano")])
        );
    }
}

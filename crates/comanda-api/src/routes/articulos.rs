use axum::Json;
use axum::Router;
use axum::extract::{Query as QueryString, State};
use axum::routing::get;
use bson::{Document, doc};
use comanda_query::{Query, SortDirection};
use serde::Deserialize;
use serde_json::Value;

use super::crud;
use super::{OrderParam, given};
use crate::error::ApiError;
use crate::model::ArticuloMenu;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud::routes::<ArticuloMenu>()
        .route("/sorted-by-price", get(sorted_by_price))
        .route("/available", get(available))
        .route("/by-price", get(by_price))
}

async fn sorted_by_price(
    State(state): State<AppState>,
    QueryString(param): QueryString<OrderParam>,
) -> Result<Json<Value>, ApiError> {
    let query = Query::default().sorted("precio", param.direction(SortDirection::Asc));
    crud::find::<ArticuloMenu>(state, query).await
}

async fn available(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    crud::find::<ArticuloMenu>(state, Query::new(doc! { "disponible": true })).await
}

#[derive(Debug, Deserialize)]
struct PriceRange {
    min: Option<String>,
    max: Option<String>,
}

fn bound(param: &str, raw: Option<String>) -> Result<Option<f64>, ApiError> {
    let Some(raw) = given(raw) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ApiError::BadRequest(format!(
            "'{param}' debe ser un número, se recibió '{raw}'"
        ))),
    }
}

/// Inclusive `precio` range; either bound may be omitted, not both.
fn price_filter(range: PriceRange) -> Result<Document, ApiError> {
    let min = bound("min", range.min)?;
    let max = bound("max", range.max)?;
    if min.is_none() && max.is_none() {
        return Err(ApiError::BadRequest(
            "Debe proporcionar 'min' o 'max'".into(),
        ));
    }
    let mut precio = Document::new();
    if let Some(min) = min {
        precio.insert("$gte", min);
    }
    if let Some(max) = max {
        precio.insert("$lte", max);
    }
    Ok(doc! { "precio": precio })
}

async fn by_price(
    State(state): State<AppState>,
    QueryString(range): QueryString<PriceRange>,
) -> Result<Json<Value>, ApiError> {
    let filter = price_filter(range)?;
    crud::find::<ArticuloMenu>(state, Query::new(filter)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: Option<&str>, max: Option<&str>) -> PriceRange {
        PriceRange {
            min: min.map(str::to_string),
            max: max.map(str::to_string),
        }
    }

    #[test]
    fn one_sided_range() {
        assert_eq!(
            price_filter(range(Some("10"), None)).unwrap(),
            doc! { "precio": { "$gte": 10.0 } }
        );
    }

    #[test]
    fn no_bounds_is_rejected() {
        assert!(price_filter(range(None, Some(""))).is_err());
        assert!(price_filter(range(Some("barato"), None)).is_err());
    }
}

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query as QueryString, State};
use axum::routing::get;
use bson::doc;
use comanda_query::{Query, SortDirection};
use serde_json::Value;

use super::OrderParam;
use super::crud::{self, parse_id};
use crate::error::ApiError;
use crate::model::Resena;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud::routes::<Resena>()
        .route("/by-user/{id}", get(by_user))
        .route("/sorted-by-rating", get(sorted_by_rating))
        .route("/sorted-by-date", get(sorted_by_date))
}

async fn by_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    crud::find::<Resena>(state, Query::new(doc! { "usuario_id": id })).await
}

async fn sorted_by_rating(
    State(state): State<AppState>,
    QueryString(param): QueryString<OrderParam>,
) -> Result<Json<Value>, ApiError> {
    let query = Query::default().sorted("calificacion", param.direction(SortDirection::Desc));
    crud::find::<Resena>(state, query).await
}

async fn sorted_by_date(
    State(state): State<AppState>,
    QueryString(param): QueryString<OrderParam>,
) -> Result<Json<Value>, ApiError> {
    let query = Query::default().sorted("fecha", param.direction(SortDirection::Desc));
    crud::find::<Resena>(state, query).await
}

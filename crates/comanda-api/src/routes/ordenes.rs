use axum::Json;
use axum::Router;
use axum::extract::{Path, Query as QueryString, State};
use axum::routing::get;
use bson::doc;
use comanda_query::{Query, SortDirection};
use serde::Deserialize;
use serde_json::Value;

use super::crud::{self, parse_id};
use super::{OrderParam, given};
use crate::error::ApiError;
use crate::model::Orden;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud::routes::<Orden>()
        .route("/by-status", get(by_status))
        .route("/by-restaurant/{id}", get(by_restaurant))
        .route("/sorted-by-date", get(sorted_by_date))
        .route("/sorted-by-total", get(sorted_by_total))
}

#[derive(Debug, Deserialize)]
struct ByStatus {
    estado: Option<String>,
}

async fn by_status(
    State(state): State<AppState>,
    QueryString(params): QueryString<ByStatus>,
) -> Result<Json<Value>, ApiError> {
    let Some(estado) = given(params.estado) else {
        return Err(ApiError::BadRequest(
            "El parámetro 'estado' es requerido".into(),
        ));
    };
    crud::find::<Orden>(state, Query::new(doc! { "estado": estado })).await
}

async fn by_restaurant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    crud::find::<Orden>(state, Query::new(doc! { "restaurante_id": id })).await
}

async fn sorted_by_date(
    State(state): State<AppState>,
    QueryString(param): QueryString<OrderParam>,
) -> Result<Json<Value>, ApiError> {
    let query = Query::default().sorted("fecha_pedido", param.direction(SortDirection::Desc));
    crud::find::<Orden>(state, query).await
}

async fn sorted_by_total(
    State(state): State<AppState>,
    QueryString(param): QueryString<OrderParam>,
) -> Result<Json<Value>, ApiError> {
    let query = Query::default().sorted("total", param.direction(SortDirection::Asc));
    crud::find::<Orden>(state, query).await
}

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query as QueryString, State};
use axum::http::StatusCode;
use axum::routing::get;
use bson::doc;
use comanda_query::{Query, SortDirection};
use serde::Deserialize;
use serde_json::Value;

use super::crud::{self, parse_id, with_parent};
use super::{OrderParam, contains, given};
use crate::error::ApiError;
use crate::json::JsonBody;
use crate::model::{Orden, Usuario};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud::routes::<Usuario>()
        .route("/{id}/ordenes", get(ordenes).post(create_orden))
        .route("/by-name", get(by_name))
        .route("/sorted-by-registration", get(sorted_by_registration))
}

async fn ordenes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    crud::find::<Orden>(state, Query::new(doc! { "usuario_id": id })).await
}

async fn create_orden(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = parse_id(&id)?;
    let body = with_parent(body, "usuario_id", id)?;
    crud::insert::<Orden>(state, body).await
}

#[derive(Debug, Deserialize)]
struct ByName {
    nombre: Option<String>,
    apellido: Option<String>,
}

async fn by_name(
    State(state): State<AppState>,
    QueryString(params): QueryString<ByName>,
) -> Result<Json<Value>, ApiError> {
    let mut any_of = Vec::new();
    if let Some(nombre) = given(params.nombre) {
        any_of.push(contains("nombre", &nombre));
    }
    if let Some(apellido) = given(params.apellido) {
        any_of.push(contains("apellido", &apellido));
    }
    if any_of.is_empty() {
        return Err(ApiError::BadRequest(
            "Debe proporcionar 'nombre' o 'apellido'".into(),
        ));
    }
    crud::find::<Usuario>(state, Query::new(doc! { "$or": any_of })).await
}

async fn sorted_by_registration(
    State(state): State<AppState>,
    QueryString(param): QueryString<OrderParam>,
) -> Result<Json<Value>, ApiError> {
    let query = Query::default().sorted("fecha_registro", param.direction(SortDirection::Desc));
    crud::find::<Usuario>(state, query).await
}

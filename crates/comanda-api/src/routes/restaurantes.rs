use axum::Json;
use axum::Router;
use axum::extract::{Path, Query as QueryString, State};
use axum::http::StatusCode;
use axum::routing::get;
use bson::{Bson, doc};
use comanda_query::{Query, SortDirection};
use serde::Deserialize;
use serde_json::Value;

use super::crud::{self, parse_id, with_parent};
use super::{OrderParam, contains, given};
use crate::error::ApiError;
use crate::json::JsonBody;
use crate::model::{ArticuloMenu, Resena, Restaurante};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    crud::routes::<Restaurante>()
        .route("/{id}/resenas", get(resenas).post(create_resena))
        .route("/{id}/articulos", get(articulos).post(create_articulo))
        .route("/by-categories", get(by_categories))
        .route("/sorted-by-rating", get(sorted_by_rating))
        .route("/by-name", get(by_name))
}

async fn resenas(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    crud::find::<Resena>(state, Query::new(doc! { "restaurante_id": id })).await
}

async fn create_resena(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = parse_id(&id)?;
    crud::insert::<Resena>(state, with_parent(body, "restaurante_id", id)?).await
}

async fn articulos(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    crud::find::<ArticuloMenu>(state, Query::new(doc! { "restaurante_id": id })).await
}

async fn create_articulo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = parse_id(&id)?;
    crud::insert::<ArticuloMenu>(state, with_parent(body, "restaurante_id", id)?).await
}

#[derive(Debug, Deserialize)]
struct Categories {
    categories: Option<String>,
}

async fn by_categories(
    State(state): State<AppState>,
    QueryString(params): QueryString<Categories>,
) -> Result<Json<Value>, ApiError> {
    let Some(categories) = given(params.categories) else {
        return Err(ApiError::BadRequest(
            "El parámetro 'categories' es requerido".into(),
        ));
    };
    let any_of: Vec<Bson> = categories
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(Bson::from)
        .collect();
    crud::find::<Restaurante>(state, Query::new(doc! { "categorias": { "$in": any_of } })).await
}

async fn sorted_by_rating(
    State(state): State<AppState>,
    QueryString(param): QueryString<OrderParam>,
) -> Result<Json<Value>, ApiError> {
    let query =
        Query::default().sorted("calificacion_promedio", param.direction(SortDirection::Desc));
    crud::find::<Restaurante>(state, query).await
}

#[derive(Debug, Deserialize)]
struct ByName {
    nombre: Option<String>,
}

async fn by_name(
    State(state): State<AppState>,
    QueryString(params): QueryString<ByName>,
) -> Result<Json<Value>, ApiError> {
    let Some(nombre) = given(params.nombre) else {
        return Err(ApiError::BadRequest(
            "El parámetro 'nombre' es requerido".into(),
        ));
    };
    crud::find::<Restaurante>(state, Query::new(contains("nombre", &nombre))).await
}

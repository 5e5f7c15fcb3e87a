//! The nine handlers every entity gets.

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query as QueryString, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use bson::Document;
use bson::oid::ObjectId;
use comanda_query::{Query, QueryParams};
use serde_json::{Value, json};

use crate::error::{ApiError, blocking};
use crate::json::{self, JsonBody};
use crate::model::{Entity, validate};
use crate::repository::cast_ids;
use crate::state::AppState;

pub fn routes<E: Entity>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<E>).post(create::<E>))
        .route(
            "/bulk",
            post(create_many::<E>)
                .put(update_many::<E>)
                .delete(delete_many::<E>),
        )
        .route("/query", get(query::<E>))
        .route(
            "/{id}",
            get(get_one::<E>).put(update::<E>).delete(delete::<E>),
        )
}

pub fn parse_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::invalid_id())
}

/// Read with repository populate; store failures are 500s.
pub async fn find<E: Entity>(state: AppState, query: Query) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let docs = state.repo::<E>().find(&query).map_err(ApiError::read)?;
        Ok(Json(json::documents(docs)))
    })
    .await
}

/// Validate a body against `E::New` and insert it.
pub async fn insert<E: Entity>(
    state: AppState,
    body: Value,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let doc = validate::<E::New>(body)?;
    blocking(move || {
        let stored = state.repo::<E>().create(doc).map_err(ApiError::write)?;
        Ok((StatusCode::CREATED, Json(json::document(stored))))
    })
    .await
}

/// Copy a path id into the body before validation, as nested create routes do.
pub fn with_parent(body: Value, field: &str, parent: ObjectId) -> Result<Value, ApiError> {
    let Value::Object(mut map) = body else {
        return Err(ApiError::BadRequest(
            "request body must be a JSON object".into(),
        ));
    };
    map.insert(field.to_string(), Value::String(parent.to_hex()));
    Ok(Value::Object(map))
}

async fn list<E: Entity>(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    find::<E>(state, Query::default()).await
}

async fn get_one<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    blocking(move || match state.repo::<E>().find_by_id(&id) {
        Ok(Some(doc)) => Ok(Json(json::document(doc))),
        Ok(None) => Err(ApiError::not_found(E::LABEL)),
        Err(e) => Err(ApiError::read(e)),
    })
    .await
}

async fn create<E: Entity>(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    insert::<E>(state, body).await
}

/// Every element is validated before anything is written.
async fn create_many<E: Entity>(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Value::Array(items) = body else {
        return Err(ApiError::BadRequest(format!(
            "Se esperaba un array de {}",
            E::PLURAL
        )));
    };
    let docs = items
        .into_iter()
        .map(validate::<E::New>)
        .collect::<Result<Vec<Document>, _>>()?;
    blocking(move || {
        let stored = state
            .repo::<E>()
            .create_many(docs)
            .map_err(ApiError::write)?;
        Ok((StatusCode::CREATED, Json(json::documents(stored))))
    })
    .await
}

async fn update<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let patch = validate::<E::Patch>(body)?;
    blocking(move || match state.repo::<E>().update_by_id(&id, &patch) {
        Ok(Some(doc)) => Ok(Json(json::document(doc))),
        Ok(None) => Err(ApiError::not_found(E::LABEL)),
        Err(e) => Err(ApiError::write(e)),
    })
    .await
}

fn present(body: &mut Value, key: &str) -> Option<Value> {
    body.get_mut(key)
        .map(Value::take)
        .filter(|v| !v.is_null())
}

/// `{filter, update}`. A plain update is validated like a patch; an operator
/// update is passed to the store as given.
async fn update_many<E: Entity>(
    State(state): State<AppState>,
    JsonBody(mut body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let (Some(filter), Some(update)) = (present(&mut body, "filter"), present(&mut body, "update"))
    else {
        return Err(ApiError::BadRequest(
            "Se requiere filter y update en el body".into(),
        ));
    };
    let mut filter = json::to_document("filter", filter)?;
    cast_ids(&mut filter, E::ID_FIELDS);
    let is_operator = update
        .as_object()
        .is_some_and(|m| m.keys().any(|k| k.starts_with('$')));
    let update = if is_operator {
        json::to_document("update", update)?
    } else {
        validate::<E::Patch>(update)?
    };

    blocking(move || {
        let result = state
            .repo::<E>()
            .update_many(&filter, &update)
            .map_err(ApiError::write)?;
        Ok(Json(json!({
            "matchedCount": result.matched_count,
            "modifiedCount": result.modified_count,
        })))
    })
    .await
}

async fn delete<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    blocking(move || match state.repo::<E>().delete_by_id(&id) {
        Ok(Some(_)) => Ok(Json(
            json!({ "message": format!("{} deleted successfully", E::LABEL) }),
        )),
        Ok(None) => Err(ApiError::not_found(E::LABEL)),
        Err(e) => Err(ApiError::read(e)),
    })
    .await
}

async fn delete_many<E: Entity>(
    State(state): State<AppState>,
    JsonBody(mut body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let Some(filter) = present(&mut body, "filter") else {
        return Err(ApiError::BadRequest(
            "Se requiere un filter en el body".into(),
        ));
    };
    let mut filter = json::to_document("filter", filter)?;
    cast_ids(&mut filter, E::ID_FIELDS);

    blocking(move || {
        let result = state
            .repo::<E>()
            .delete_many(&filter)
            .map_err(ApiError::read)?;
        Ok(Json(json!({
            "deletedCount": result.deleted_count,
            "message": E::BULK_DELETED,
        })))
    })
    .await
}

/// `GET /query`: reserved parameters shape the read, the rest are string
/// equality filters.
async fn query<E: Entity>(
    State(state): State<AppState>,
    QueryString(params): QueryString<Vec<(String, String)>>,
) -> Result<Json<Value>, ApiError> {
    let query = QueryParams::partition(params).into_query()?;
    find::<E>(state, query).await
}

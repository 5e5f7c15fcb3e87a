use axum::Json;
use axum::Router;
use axum::extract::{Path, Query as QueryString, State};
use axum::routing::{get, patch};
use bson::{Bson, Document, doc};
use comanda_store::{ArrayOp, Stage};
use serde::Deserialize;
use serde_json::{Value, json};

use super::crud::parse_id;
use super::given;
use crate::error::{ApiError, blocking};
use crate::json::{self, JsonBody};
use crate::model::{Entity, Orden, Restaurante, Usuario};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders/count", get(count_orders))
        .route("/orders/with-restaurant", get(orders_with_restaurant))
        .route("/users/{id}/favorites", patch(update_favorites))
        .route("/restaurantes/{id}/location", patch(update_location))
}

#[derive(Debug, Deserialize)]
struct CountParams {
    status: Option<String>,
}

async fn count_orders(
    State(state): State<AppState>,
    QueryString(params): QueryString<CountParams>,
) -> Result<Json<Value>, ApiError> {
    let filter = match given(params.status) {
        Some(status) => doc! { "estado": status },
        None => Document::new(),
    };
    blocking(move || {
        let count = state.repo::<Orden>().count(&filter).map_err(ApiError::read)?;
        Ok(Json(json!({ "count": count })))
    })
    .await
}

/// Each order with its restaurant embedded; orders whose restaurant is gone
/// are dropped.
fn with_restaurant_pipeline() -> Vec<Stage> {
    vec![
        Stage::ToObjectId {
            field: "restaurante_id".into(),
            as_field: "restaurante_oid".into(),
        },
        Stage::Lookup {
            from: Restaurante::COLLECTION.into(),
            local_field: "restaurante_oid".into(),
            foreign_field: "_id".into(),
            as_field: "restaurante".into(),
        },
        Stage::Unwind("restaurante".into()),
    ]
}

async fn orders_with_restaurant(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    blocking(move || {
        let docs = state
            .store
            .aggregate(Orden::COLLECTION, &with_restaurant_pipeline())
            .map_err(ApiError::read)?;
        Ok(Json(json::documents(docs)))
    })
    .await
}

fn favorites_pipeline(id: bson::oid::ObjectId, op: ArrayOp, item: &str) -> Vec<Stage> {
    vec![
        Stage::Match(doc! { "_id": id }),
        Stage::UpdateArray {
            field: "favoritos".into(),
            op,
            item: Bson::from(item),
        },
        Stage::Merge {
            into: Usuario::COLLECTION.into(),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct FavoritesBody {
    action: Option<String>,
    item: Option<Value>,
}

async fn update_favorites(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<FavoritesBody>,
) -> Result<Json<Value>, ApiError> {
    let Some(op) = body.action.as_deref().and_then(ArrayOp::parse) else {
        return Err(ApiError::BadRequest("Acción no válida".into()));
    };
    let item = match body.item {
        Some(Value::String(item)) if !item.trim().is_empty() => item,
        _ => {
            return Err(ApiError::BadRequest(
                "Item debe ser un string no vacío".into(),
            ));
        }
    };
    let id = parse_id(&id)?;

    blocking(move || {
        let favoritos = |doc: &Document| doc.get("favoritos").cloned();

        let Some(before) = state
            .store
            .find_by_id(Usuario::COLLECTION, &id)
            .map_err(ApiError::read)?
        else {
            return Err(ApiError::not_found(Usuario::LABEL));
        };
        state
            .store
            .aggregate(Usuario::COLLECTION, &favorites_pipeline(id, op, &item))
            .map_err(ApiError::write)?;
        let after = state
            .store
            .find_by_id(Usuario::COLLECTION, &id)
            .map_err(ApiError::read)?;

        let modified = after.as_ref().map(favoritos) != Some(favoritos(&before));
        tracing::debug!(%id, ?op, modified, "favorites updated");
        Ok(Json(json!({ "matched": 1, "modified": u8::from(modified) })))
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LocationBody {
    lat: Option<f64>,
    lng: Option<f64>,
    remove_location: bool,
}

/// `$set` for the given coordinates, `$unset` for removal. Both at once would
/// write and clear the same field.
fn location_update(body: &LocationBody) -> Result<Document, ApiError> {
    let mut set = Document::new();
    if let Some(lat) = body.lat {
        set.insert("ubicacion.lat", lat);
    }
    if let Some(lng) = body.lng {
        set.insert("ubicacion.lng", lng);
    }
    match (set.is_empty(), body.remove_location) {
        (true, false) => Err(ApiError::BadRequest(
            "Debes enviar al menos lat, lng, o removeLocation".into(),
        )),
        (false, true) => Err(ApiError::BadRequest(
            "removeLocation no se puede combinar con lat o lng".into(),
        )),
        (false, false) => Ok(doc! { "$set": set }),
        (true, true) => Ok(doc! { "$unset": { "ubicacion": "" } }),
    }
}

async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<LocationBody>,
) -> Result<Json<Value>, ApiError> {
    let update = location_update(&body)?;
    let id = parse_id(&id)?;
    blocking(move || {
        let result = state
            .store
            .update_one(Restaurante::COLLECTION, &doc! { "_id": id }, &update)
            .map_err(ApiError::write)?;
        if result.matched_count == 0 {
            return Err(ApiError::not_found(Restaurante::LABEL));
        }
        Ok(Json(json!({
            "matched": result.matched_count,
            "modified": result.modified_count,
        })))
    })
    .await
}

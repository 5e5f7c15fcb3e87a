mod aggregations;
mod articulos;
mod auth;
pub mod crud;
mod health;
mod ordenes;
mod rating;
mod restaurantes;
mod usuarios;

use axum::Router;
use axum::http::header::{
    AUTHORIZATION, CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post};
use bson::{Document, doc};
use comanda_query::SortDirection;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer;
use crate::state::AppState;

/// `?order=` for the sorted-by-X endpoints.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct OrderParam {
    pub order: Option<String>,
}

impl OrderParam {
    pub fn direction(&self, default: SortDirection) -> SortDirection {
        SortDirection::from_order_or(self.order.as_deref(), default)
    }
}

/// Case-insensitive substring match on `field`. The needle is escaped, so it
/// never acts as a pattern.
pub(crate) fn contains(field: &str, needle: &str) -> Document {
    doc! { field: { "$regex": regex::escape(needle), "$options": "i" } }
}

/// Non-empty query parameter.
pub(crate) fn given(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The full HTTP surface under `/api/v1`.
pub fn router(state: AppState, cors_origin: HeaderValue) -> Router {
    let mut protected = Router::new()
        .nest("/usuarios", usuarios::routes())
        .nest("/restaurantes", restaurantes::routes())
        .nest("/ordenes", ordenes::routes())
        .nest("/rating", rating::routes())
        .nest("/articulos", articulos::routes())
        .nest("/aggregations", aggregations::routes());
    if state.require_auth {
        protected =
            protected.route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));
    }

    let api = protected
        .route("/healthcheck", get(health::healthcheck))
        .route("/auth/login", post(auth::login));

    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([AUTHORIZATION])
        .allow_credentials(true);

    Router::new()
        .nest("/api/v1", api)
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needle_is_escaped() {
        assert_eq!(
            contains("nombre", "a.b*"),
            doc! { "nombre": { "$regex": "a\\.b\\*", "$options": "i" } }
        );
    }
}

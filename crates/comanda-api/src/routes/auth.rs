use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::auth::Credentials;
use crate::error::ApiError;
use crate::json::JsonBody;
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<Json<Value>, ApiError> {
    let token = state
        .auth
        .login(&credentials.user, &credentials.password)
        .inspect_err(|_| tracing::warn!(user = %credentials.user, "login rejected"))?;
    Ok(Json(json!({
        "role": credentials.user,
        "message": "Login successful",
        "token": token,
    })))
}

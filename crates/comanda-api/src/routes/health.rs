use axum::Json;

pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "I'm alive" }))
}

mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;

// ── CRUD ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_normalizes_and_fills_defaults() {
    let app = app();
    let created = create(
        &app.router,
        "/api/v1/usuarios",
        usuario("Ana", "  Ana@Example.COM "),
    )
    .await;

    assert_eq!(created["correo"], "ana@example.com");
    assert_eq!(created["favoritos"], json!([]));
    assert!(created["fecha_registro"].is_string());
    assert_eq!(created["_id"].as_str().unwrap().len(), 24);
}

#[tokio::test]
async fn duplicate_correo_is_rejected() {
    let app = app();
    create(&app.router, "/api/v1/usuarios", usuario("Ana", "ana@example.com")).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/v1/usuarios",
        Some(usuario("Otra", "ANA@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(count(&app.store, "Usuario"), 1);
}

#[tokio::test]
async fn missing_required_field_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/v1/usuarios",
        Some(json!({ "nombre": "Ana", "correo": "ana@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("validation failed"));
    assert_eq!(count(&app.store, "Usuario"), 0);
}

#[tokio::test]
async fn get_update_delete_by_id() {
    let app = app();
    let created = create(&app.router, "/api/v1/usuarios", usuario("Ana", "ana@example.com")).await;
    let uri = format!("/api/v1/usuarios/{}", id_of(&created));

    let (status, found) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["nombre"], "Ana");

    let (status, updated) = send(
        &app.router,
        Method::PUT,
        &uri,
        Some(json!({ "direccion": "Insurgentes 5" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["direccion"], "Insurgentes 5");
    assert_eq!(updated["nombre"], "Ana");

    let (status, deleted) = send(&app.router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "Usuario deleted successfully");

    let (status, body) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Usuario not found");
}

#[tokio::test]
async fn malformed_id_is_bad_request() {
    let app = app();
    for method in [Method::GET, Method::DELETE] {
        let (status, body) = send(&app.router, method, "/api/v1/usuarios/not-an-id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid ID format");
    }
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let app = app();
    let uri = "/api/v1/usuarios/65a1b2c3d4e5f60718293a4b";
    let (status, _) = get(&app.router, uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.router, Method::PUT, uri, Some(json!({ "nombre": "X" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_body_is_bad_request() {
    let app = app();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/usuarios")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = call(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

// ── Named lookups ───────────────────────────────────────────────

#[tokio::test]
async fn by_name_matches_either_field_case_insensitively() {
    let app = app();
    create(&app.router, "/api/v1/usuarios", usuario("Mariana", "m@example.com")).await;
    create(&app.router, "/api/v1/usuarios", usuario("Pedro", "p@example.com")).await;

    let (status, found) = get(&app.router, "/api/v1/usuarios/by-name?nombre=MARI").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["nombre"], "Mariana");

    let (_, found) = get(&app.router, "/api/v1/usuarios/by-name?apellido=lop").await;
    assert_eq!(found.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn by_name_treats_input_literally() {
    let app = app();
    create(&app.router, "/api/v1/usuarios", usuario("Ana", "a@example.com")).await;

    let (status, found) = get(&app.router, "/api/v1/usuarios/by-name?nombre=.*").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, json!([]));
}

#[tokio::test]
async fn by_name_requires_a_parameter() {
    let app = app();
    let (status, body) = get(&app.router, "/api/v1/usuarios/by-name?nombre=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Debe proporcionar 'nombre' o 'apellido'");
}

#[tokio::test]
async fn sorted_by_registration_defaults_to_newest_first() {
    let app = app();
    for (nombre, fecha) in [
        ("Vieja", "2022-01-01T00:00:00Z"),
        ("Nueva", "2024-06-01T00:00:00Z"),
        ("Media", "2023-03-01T00:00:00Z"),
    ] {
        let mut body = usuario(nombre, &format!("{nombre}@example.com"));
        body["fecha_registro"] = json!(fecha);
        create(&app.router, "/api/v1/usuarios", body).await;
    }

    let names = |v: &serde_json::Value| -> Vec<String> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|u| u["nombre"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, desc) = get(&app.router, "/api/v1/usuarios/sorted-by-registration").await;
    assert_eq!(names(&desc), ["Nueva", "Media", "Vieja"]);

    let (_, asc) = get(&app.router, "/api/v1/usuarios/sorted-by-registration?order=asc").await;
    assert_eq!(names(&asc), ["Vieja", "Media", "Nueva"]);
}

// ── Nested orders ───────────────────────────────────────────────

#[tokio::test]
async fn nested_orders_take_the_path_user() {
    let app = app();
    let (usuario_id, restaurante_id) = seed_parents(&app.router).await;
    let other = id_of(&create(&app.router, "/api/v1/usuarios", usuario("Luis", "l@example.com")).await);

    let uri = format!("/api/v1/usuarios/{usuario_id}/ordenes");
    // the body's usuario_id is overridden by the path
    create(&app.router, &uri, orden(&other, &restaurante_id, "pendiente", 12.5)).await;
    create(
        &app.router,
        &format!("/api/v1/usuarios/{other}/ordenes"),
        orden(&other, &restaurante_id, "completada", 3.0),
    )
    .await;

    let (status, ordenes) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    let ordenes = ordenes.as_array().unwrap();
    assert_eq!(ordenes.len(), 1);
    assert_eq!(ordenes[0]["total"], 12.5);
    assert_eq!(ordenes[0]["usuario_id"]["_id"], usuario_id.as_str());
}

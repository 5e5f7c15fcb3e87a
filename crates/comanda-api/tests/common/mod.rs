#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, Request, Response, StatusCode};
use bson::Document;
use bson::oid::ObjectId;
use comanda_api::auth::{Authenticator, Credentials};
use comanda_api::model::ensure_collections;
use comanda_api::routes;
use comanda_api::state::AppState;
use comanda_query::Query;
use comanda_store::{
    CollectionConfig, DeleteResult, DocumentStore, MemoryStore, Stage, StoreError, UpdateResult,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ORIGIN: &str = "http://localhost:4200";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub auth: Arc<Authenticator>,
}

fn build(store: Arc<dyn DocumentStore>, require_auth: bool) -> (Router, Arc<Authenticator>) {
    ensure_collections(store.as_ref()).unwrap();
    let auth = Arc::new(Authenticator::new(
        "test-secret",
        vec![Credentials {
            user: "admin".into(),
            password: "admin-pw".into(),
        }],
    ));
    let state = AppState {
        store,
        auth: Arc::clone(&auth),
        require_auth,
    };
    (
        routes::router(state, HeaderValue::from_static(ORIGIN)),
        auth,
    )
}

/// Router over a fresh memory store, tokens not enforced.
pub fn app() -> TestApp {
    with_auth(false)
}

pub fn secured_app() -> TestApp {
    with_auth(true)
}

fn with_auth(require_auth: bool) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let (router, auth) = build(store.clone(), require_auth);
    TestApp {
        router,
        store,
        auth,
    }
}

pub async fn call(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub fn request(method: Method, uri: &str, body: Option<&Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn with_token(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    request
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = call(router, request(method, uri, body.as_ref())).await;
    let status = response.status();
    (status, body_json(response).await)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri, None).await
}

/// POST that must succeed; returns the created document.
pub async fn create(router: &Router, uri: &str, body: Value) -> Value {
    let (status, created) = send(router, Method::POST, uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {created}");
    created
}

pub fn id_of(doc: &Value) -> String {
    doc["_id"].as_str().unwrap().to_string()
}

// ── Bodies ──────────────────────────────────────────────────────

pub fn usuario(nombre: &str, correo: &str) -> Value {
    json!({
        "nombre": nombre,
        "apellido": "Lopez",
        "correo": correo,
        "direccion": "Av. Reforma 10",
        "ubicacion": { "lat": 19.43, "lng": -99.13 },
    })
}

pub fn restaurante(nombre: &str) -> Value {
    json!({
        "nombre": nombre,
        "direccion": "Centro",
        "categorias": ["mexicano"],
    })
}

pub fn articulo(nombre: &str, precio: f64, restaurante_id: &str) -> Value {
    json!({
        "nombre": nombre,
        "descripcion": "de la casa",
        "precio": precio,
        "restaurante_id": restaurante_id,
    })
}

pub fn orden(usuario_id: &str, restaurante_id: &str, estado: &str, total: f64) -> Value {
    json!({
        "usuario_id": usuario_id,
        "restaurante_id": restaurante_id,
        "estado": estado,
        "total": total,
    })
}

/// One user and one restaurant, returned as (usuario_id, restaurante_id).
pub async fn seed_parents(router: &Router) -> (String, String) {
    let u = create(router, "/api/v1/usuarios", usuario("Ana", "ana@example.com")).await;
    let r = create(router, "/api/v1/restaurantes", restaurante("La Esquina")).await;
    (id_of(&u), id_of(&r))
}

pub fn count(store: &MemoryStore, collection: &str) -> u64 {
    store
        .count_documents(collection, &Document::new())
        .unwrap()
}

// ── Counting store ──────────────────────────────────────────────

/// Memory store that records how many calls reached it.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) -> &MemoryStore {
        self.calls.fetch_add(1, Ordering::SeqCst);
        &self.inner
    }
}

impl DocumentStore for CountingStore {
    fn create_collection(&self, config: &CollectionConfig) -> Result<(), StoreError> {
        self.inner.create_collection(config)
    }

    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.hit().find(collection, query)
    }

    fn find_by_id(&self, collection: &str, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        self.hit().find_by_id(collection, id)
    }

    fn insert_one(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        self.hit().insert_one(collection, doc)
    }

    fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        self.hit().insert_many(collection, docs)
    }

    fn find_by_id_and_update(
        &self,
        collection: &str,
        id: &ObjectId,
        update: &Document,
    ) -> Result<Option<Document>, StoreError> {
        self.hit().find_by_id_and_update(collection, id, update)
    }

    fn find_by_id_and_delete(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        self.hit().find_by_id_and_delete(collection, id)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult, StoreError> {
        self.hit().update_one(collection, filter, update)
    }

    fn update_many(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateResult, StoreError> {
        self.hit().update_many(collection, filter, update)
    }

    fn delete_many(&self, collection: &str, filter: &Document) -> Result<DeleteResult, StoreError> {
        self.hit().delete_many(collection, filter)
    }

    fn count_documents(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        self.hit().count_documents(collection, filter)
    }

    fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> Result<Vec<Document>, StoreError> {
        self.hit().aggregate(collection, pipeline)
    }
}

pub fn counting_app() -> (Router, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::default());
    let (router, _) = build(store.clone(), false);
    (router, store)
}

//! Product listing and editing against an in-process mock backend.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use storefront_core::auth::{Identity, MemoryStorage, SessionStore};
use storefront_core::config::Config;
use storefront_core::models::{ImageUpload, ProductDraft};
use storefront_core::StorefrontClient;

/// A multipart field as the backend saw it
#[derive(Debug, Clone, PartialEq)]
enum Field {
    Text(String),
    File { file_name: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone)]
struct Submission {
    method: Method,
    auth: Option<String>,
    fields: BTreeMap<String, Field>,
}

struct Backend {
    valid_access: Mutex<String>,
    refresh_calls: AtomicUsize,
    submissions: Mutex<Vec<Submission>>,
}

impl Backend {
    fn new(valid_access: &str) -> Self {
        Self {
            valid_access: Mutex::new(valid_access.to_string()),
            refresh_calls: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    fn is_valid(&self, auth: Option<&str>) -> bool {
        let expected = format!("Bearer {}", self.valid_access.lock().unwrap());
        auth == Some(expected.as_str())
    }
}

type Shared = State<Arc<Backend>>;

fn text(fields: &BTreeMap<String, Field>, name: &str) -> String {
    match fields.get(name) {
        Some(Field::Text(value)) => value.clone(),
        _ => String::new(),
    }
}

fn product_json(id: i64, fields: &BTreeMap<String, Field>) -> Value {
    json!({
        "id": id,
        "title": text(fields, "title"),
        "description": text(fields, "description"),
        "price": text(fields, "price"),
        "category": {"id": 2, "name": "Home"},
        "image": fields.get("image").map(|_| format!("/media/products/{}.png", id)),
        "created_by": "alice",
        "is_active": text(fields, "is_active") == "true",
    })
}

async fn record(backend: &Backend, method: Method, headers: &HeaderMap, mut multipart: Multipart) -> Submission {
    let mut fields = BTreeMap::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        let value = match file_name {
            Some(file_name) => Field::File { file_name, bytes },
            None => Field::Text(String::from_utf8(bytes).unwrap()),
        };
        fields.insert(name, value);
    }

    let submission = Submission {
        method,
        auth: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        fields,
    };
    backend.submissions.lock().unwrap().push(submission.clone());
    submission
}

async fn create_product(
    State(backend): Shared,
    headers: HeaderMap,
    multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let submission = record(&backend, Method::POST, &headers, multipart).await;
    if !backend.is_valid(submission.auth.as_deref()) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Token expired"})));
    }
    (StatusCode::CREATED, Json(product_json(31, &submission.fields)))
}

async fn update_product(
    State(backend): Shared,
    Path(id): Path<i64>,
    headers: HeaderMap,
    multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let submission = record(&backend, Method::PATCH, &headers, multipart).await;
    if !backend.is_valid(submission.auth.as_deref()) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Token expired"})));
    }
    (StatusCode::OK, Json(product_json(id, &submission.fields)))
}

async fn get_product(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({
        "id": id,
        "title": "Desk Lamp",
        "description": "Warm white",
        "price": "24.50",
        "category": {"id": 2, "name": "Home"},
        "image": "/media/products/lamp.png",
        "created_by": "alice",
        "is_active": true,
    }))
}

async fn list_products() -> Json<Value> {
    Json(json!([
        {"id": 1, "title": "Desk Lamp", "price": "24.50", "category": null, "is_active": true},
        {"id": 2, "title": "Mug", "price": "8.00", "category": null, "is_active": false}
    ]))
}

async fn all_orders() -> Json<Value> {
    Json(json!({"count": 2, "results": [
        {"id": 1, "status": "PENDING", "total_price": "24.50", "items": []},
        {"id": 2, "status": "DELIVERED", "total_price": "16.00", "items": []}
    ]}))
}

async fn list_categories() -> Json<Value> {
    Json(json!([{"id": 2, "name": "Home"}]))
}

async fn refresh(State(backend): Shared) -> Json<Value> {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    *backend.valid_access.lock().unwrap() = "A2".to_string();
    Json(json!({"access": "A2"}))
}

async fn spawn_backend(backend: Arc<Backend>) -> SocketAddr {
    let app = Router::new()
        .route("/api/products/", get(list_products).post(create_product))
        .route("/api/products/categories/", get(list_categories))
        .route("/api/orders/", get(all_orders))
        .route("/api/products/{id}/", get(get_product).patch(update_product))
        .route("/api/users/refresh/", post(refresh))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn signed_in_client(addr: SocketAddr) -> StorefrontClient {
    let config = Config {
        api_base_url: format!("http://{}/api/", addr),
        ..Config::default()
    };
    let session = Arc::new(SessionStore::open(MemoryStorage::new()));
    session
        .establish(
            Identity {
                id: 1,
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                is_admin: false,
            },
            "A1".to_string(),
            "R1".to_string(),
        )
        .unwrap();
    StorefrontClient::new(&config, session).unwrap()
}

fn lamp_draft() -> ProductDraft {
    let mut draft = ProductDraft::new("Desk Lamp", "24.50");
    draft.description = "Warm white".to_string();
    draft.category_id = Some(2);
    draft.image = Some(ImageUpload {
        file_name: "lamp.png".to_string(),
        mime: "image/png".to_string(),
        bytes: vec![0x89, b'P', b'N', b'G'],
    });
    draft
}

#[tokio::test]
async fn create_product_sends_multipart_form_with_image() {
    let backend = Arc::new(Backend::new("A1"));
    let client = signed_in_client(spawn_backend(backend.clone()).await);

    let product = client.create_product(&lamp_draft()).await.unwrap();
    assert_eq!(product.id, 31);
    assert_eq!(product.title, "Desk Lamp");
    assert!(product.image.is_some());

    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 1);
    let fields = &submissions[0].fields;
    assert_eq!(submissions[0].method, Method::POST);
    assert_eq!(fields.get("title"), Some(&Field::Text("Desk Lamp".to_string())));
    assert_eq!(fields.get("price"), Some(&Field::Text("24.50".to_string())));
    assert_eq!(fields.get("category_id"), Some(&Field::Text("2".to_string())));
    assert_eq!(fields.get("is_active"), Some(&Field::Text("true".to_string())));
    assert_eq!(
        fields.get("image"),
        Some(&Field::File {
            file_name: "lamp.png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        })
    );
}

#[tokio::test]
async fn expired_credential_resends_the_same_form() {
    let backend = Arc::new(Backend::new("expired-elsewhere"));
    let client = signed_in_client(spawn_backend(backend.clone()).await);

    client.create_product(&lamp_draft()).await.unwrap();

    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].auth.as_deref(), Some("Bearer A1"));
    assert_eq!(submissions[1].auth.as_deref(), Some("Bearer A2"));
    assert_eq!(submissions[0].fields, submissions[1].fields);
}

#[tokio::test]
async fn edit_keeps_fields_that_were_not_changed() {
    let backend = Arc::new(Backend::new("A1"));
    let client = signed_in_client(spawn_backend(backend.clone()).await);

    let current = client.get_product(8).await.unwrap();
    let mut draft = ProductDraft::from_product(&current);
    draft.price = "19.99".to_string();
    let updated = client.update_product(8, &draft).await.unwrap();

    assert_eq!(updated.id, 8);
    assert_eq!(updated.price, "19.99");

    let submissions = backend.submissions();
    let fields = &submissions[0].fields;
    assert_eq!(submissions[0].method, Method::PATCH);
    assert_eq!(fields.get("title"), Some(&Field::Text("Desk Lamp".to_string())));
    assert_eq!(fields.get("description"), Some(&Field::Text("Warm white".to_string())));
    assert_eq!(fields.get("category_id"), Some(&Field::Text("2".to_string())));
    // No new file: the stored image stays
    assert!(!fields.contains_key("image"));
}

#[tokio::test]
async fn invalid_draft_is_rejected_before_sending() {
    let backend = Arc::new(Backend::new("A1"));
    let client = signed_in_client(spawn_backend(backend.clone()).await);

    let err = client
        .create_product(&ProductDraft::new("Lamp", "free"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid price"));
    assert!(backend.submissions().is_empty());
}

#[tokio::test]
async fn dashboard_combines_products_orders_and_categories() {
    let backend = Arc::new(Backend::new("A1"));
    let client = signed_in_client(spawn_backend(backend).await);

    let stats = client.dashboard().await.unwrap();
    assert_eq!(stats.total_products, 2);
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.total_categories, 1);
    assert_eq!(stats.pending_orders, 1);
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::access::{Actor, Role};
use crate::api::ApiState;
use crate::auth::TokenIssuer;
use crate::staff::{PasswordHasher, StaffDirectory, StaffInput};
use crate::store::MemoryStore;

pub(super) const ADMIN_PASSWORD: &str = "admin-pass";

pub(super) fn hasher() -> PasswordHasher {
    PasswordHasher::new(64, 1)
}

pub(super) fn directory() -> (StaffDirectory<MemoryStore>, Arc<MemoryStore>, Actor) {
    let store = Arc::new(MemoryStore::new());
    let directory = StaffDirectory::new(store.clone(), hasher());
    let admin = directory
        .seed_admin("root", ADMIN_PASSWORD)
        .expect("seed admin")
        .expect("admin created")
        .actor();
    (directory, store, admin)
}

pub(super) fn staff_input(username: &str, role: Role) -> StaffInput {
    StaffInput {
        username: username.to_string(),
        password: Some("initial-pass".to_string()),
        first_name: "Meera".to_string(),
        last_name: "Nair".to_string(),
        email: format!("{username}@example.com"),
        phone: "9876543210".to_string(),
        role,
        team: "Admissions".to_string(),
        is_active: true,
    }
}

/// State with a seeded admin, plus the admin's access token and identity.
pub(super) fn api_state() -> (ApiState<MemoryStore>, String, Actor) {
    let store = Arc::new(MemoryStore::new());
    let state = ApiState::new(store, hasher(), TokenIssuer::default());
    let admin = state
        .staff
        .seed_admin("root", ADMIN_PASSWORD)
        .expect("seed admin")
        .expect("admin created")
        .actor();
    let token = state
        .auth
        .login(crate::auth::Credentials {
            username: "root".to_string(),
            password: ADMIN_PASSWORD.to_string(),
        })
        .expect("admin login")
        .access;
    (state, token, admin)
}

pub(super) fn authorized(
    method: &str,
    uri: &str,
    token: &str,
    body: Option<&Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).expect("serialize")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::service::{AuthError, AuthService, Credentials, Registration, INVALID_CREDENTIALS};
use super::tokens::TokenIssuer;
use crate::access::Role;
use crate::api::{api_router, ApiState};
use crate::staff::{PasswordHasher, StaffDirectory, StaffPatch, StaffRepository};
use crate::store::MemoryStore;
use crate::validation::NON_FIELD_ERRORS;

struct Fixture {
    store: Arc<MemoryStore>,
    staff: Arc<StaffDirectory<MemoryStore>>,
    auth: AuthService<MemoryStore>,
}

fn fixture_with(issuer: TokenIssuer) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let staff = Arc::new(StaffDirectory::new(store.clone(), PasswordHasher::new(64, 1)));
    let auth = AuthService::new(store.clone(), staff.clone(), issuer);
    Fixture { store, staff, auth }
}

fn fixture() -> Fixture {
    fixture_with(TokenIssuer::default())
}

fn registration(username: &str, role: Role) -> Registration {
    Registration {
        username: username.to_string(),
        password: "s3cret-pass".to_string(),
        role,
        email: String::new(),
        first_name: String::new(),
        last_name: String::new(),
    }
}

fn credentials(username: &str, password: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: password.to_string(),
    }
}

fn non_field_messages(error: AuthError) -> Vec<String> {
    match error {
        AuthError::Validation(errors) => errors.messages(NON_FIELD_ERRORS).to_vec(),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn registration_refuses_the_admin_role() {
    let f = fixture();
    let error = f
        .auth
        .register(registration("mallory", Role::Admin))
        .expect_err("admin refused");
    assert!(matches!(error, AuthError::Validation(ref errors) if errors.contains("role")));
    assert!(f
        .store
        .find_staff_by_username("mallory")
        .expect("lookup")
        .is_none());
}

#[test]
fn registration_enforces_password_length() {
    let f = fixture();
    let mut input = registration("meera", Role::AdmExec);
    input.password = "12345".to_string();
    let error = f.auth.register(input).expect_err("too short");
    assert!(matches!(error, AuthError::Validation(ref errors) if errors.contains("password")));
}

#[test]
fn login_returns_tokens_and_stamps_last_login() {
    let f = fixture();
    let account = f
        .auth
        .register(registration("meera", Role::AdmExec))
        .expect("registered");
    assert_eq!(account.last_login, None);

    let grant = f
        .auth
        .login(credentials("meera", "s3cret-pass"))
        .expect("login");
    assert_eq!(grant.user.username, "meera");
    assert_eq!(grant.user.role, Role::AdmExec);
    assert_ne!(grant.access, grant.refresh);

    let stored = f
        .store
        .fetch_staff(account.id)
        .expect("fetch")
        .expect("account");
    assert!(stored.last_login.is_some());

    let actor = f.auth.authenticate(&grant.access).expect("access token");
    assert_eq!(actor.id, account.id);
}

#[test]
fn wrong_password_and_unknown_user_share_one_message() {
    let f = fixture();
    f.auth
        .register(registration("meera", Role::AdmExec))
        .expect("registered");

    for attempt in [credentials("meera", "nope"), credentials("ghost", "s3cret-pass")] {
        let error = f.auth.login(attempt).expect_err("refused");
        assert_eq!(non_field_messages(error), vec![INVALID_CREDENTIALS.to_string()]);
    }
}

#[test]
fn disabled_accounts_cannot_log_in_or_use_tokens() {
    let f = fixture();
    let account = f
        .auth
        .register(registration("meera", Role::AdmExec))
        .expect("registered");
    let grant = f
        .auth
        .login(credentials("meera", "s3cret-pass"))
        .expect("login");

    f.store
        .update_staff(account.id, |account| {
            account.is_active = false;
            Ok::<(), crate::store::RepositoryError>(())
        })
        .expect("deactivate");

    let error = f
        .auth
        .login(credentials("meera", "s3cret-pass"))
        .expect_err("disabled");
    assert_eq!(
        non_field_messages(error),
        vec!["User account is disabled".to_string()]
    );
    assert!(matches!(
        f.auth.authenticate(&grant.access),
        Err(AuthError::Unauthorized(_))
    ));
}

#[test]
fn refresh_tokens_only_mint_access_tokens() {
    let f = fixture();
    f.auth
        .register(registration("meera", Role::AdmExec))
        .expect("registered");
    let grant = f
        .auth
        .login(credentials("meera", "s3cret-pass"))
        .expect("login");

    assert!(matches!(
        f.auth.authenticate(&grant.refresh),
        Err(AuthError::Unauthorized(_))
    ));
    assert!(matches!(
        f.auth.refresh(&grant.access),
        Err(AuthError::Unauthorized(_))
    ));

    let access = f.auth.refresh(&grant.refresh).expect("refreshed");
    f.auth.authenticate(&access).expect("new access token works");
}

#[test]
fn expired_access_tokens_are_rejected() {
    let f = fixture_with(TokenIssuer::new(Duration::zero(), Duration::days(1)));
    f.auth
        .register(registration("meera", Role::AdmExec))
        .expect("registered");
    let grant = f
        .auth
        .login(credentials("meera", "s3cret-pass"))
        .expect("login");

    assert!(matches!(
        f.auth.authenticate(&grant.access),
        Err(AuthError::Unauthorized(_))
    ));
}

#[test]
fn password_change_through_directory_is_honoured_at_login() {
    let f = fixture();
    let account = f
        .auth
        .register(registration("meera", Role::AdmExec))
        .expect("registered");
    let admin = f
        .staff
        .seed_admin("root", "root-pass")
        .expect("seed")
        .expect("created")
        .actor();

    let patch = StaffPatch {
        password: Some("rotated-pass".to_string()),
        ..StaffPatch::default()
    };
    f.staff.update(account.id, patch, &admin).expect("rotated");

    f.auth
        .login(credentials("meera", "s3cret-pass"))
        .expect_err("old password");
    f.auth
        .login(credentials("meera", "rotated-pass"))
        .expect("new password");
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize")))
        .expect("request")
}

async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn register_then_login_over_http() {
    let state = ApiState::new(
        Arc::new(MemoryStore::new()),
        PasswordHasher::new(64, 1),
        TokenIssuer::default(),
    );
    let router = api_router(state);

    let response = router
        .clone()
        .oneshot(post_json(
            "/auth/register/",
            &json!({ "username": "meera", "password": "s3cret-pass", "role": "PROCESSING" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["role"], "PROCESSING");

    let response = router
        .clone()
        .oneshot(post_json(
            "/auth/login/",
            &json!({ "username": "meera", "password": "s3cret-pass" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["username"], "meera");
    let refresh = body["refresh"].as_str().expect("refresh token").to_string();

    let response = router
        .clone()
        .oneshot(post_json("/auth/token/refresh/", &json!({ "refresh": refresh })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert!(body["access"].as_str().is_some_and(|token| !token.is_empty()));

    let response = router
        .oneshot(post_json(
            "/auth/login/",
            &json!({ "username": "meera", "password": "wrong" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body[NON_FIELD_ERRORS][0], INVALID_CREDENTIALS);
}

#[tokio::test]
async fn refresh_with_unknown_token_is_unauthorized() {
    let state = ApiState::new(
        Arc::new(MemoryStore::new()),
        PasswordHasher::new(64, 1),
        TokenIssuer::default(),
    );
    let response = api_router(state)
        .oneshot(post_json("/auth/token/refresh/", &json!({ "refresh": "bogus" })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

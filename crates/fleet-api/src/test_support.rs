//! In-process fake backend and client helpers for tests

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use fleet_auth::{MemoryTokenStore, TokenPair, TokenStore};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::client::{ApiClient, ClientConfig};
use crate::redirect::LoginRedirect;

/// Server-side view of the session: tokens of generation `n` are `Tn`/`Rn`.
#[derive(Default)]
struct Session {
    generation: usize,
    access_valid: bool,
}

#[derive(Default)]
pub struct MockState {
    session: Mutex<Session>,
    /// Reject every bearer token, even freshly issued ones
    pub deny_all: AtomicBool,
    pub refresh_fails: AtomicBool,
    pub logout_fails: AtomicBool,
    pub total_calls: AtomicUsize,
    pub echo_calls: AtomicUsize,
    pub broken_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    refresh_tokens_seen: Mutex<Vec<String>>,
    profile_auth_headers: Mutex<Vec<Vec<String>>>,
}

impl MockState {
    fn hit(&self, counter: &AtomicUsize) {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        if self.deny_all.load(Ordering::SeqCst) {
            return false;
        }
        let session = self.session.lock().unwrap();
        let expected = format!("Bearer T{}", session.generation);
        session.generation > 0
            && session.access_valid
            && headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == expected)
    }

    fn issue(&self) -> TokenPair {
        let mut session = self.session.lock().unwrap();
        session.generation += 1;
        session.access_valid = true;
        TokenPair::new(
            format!("T{}", session.generation),
            format!("R{}", session.generation),
        )
    }
}

/// Fake fleet backend bound to an ephemeral localhost port.
pub struct MockBackend {
    pub url: String,
    pub state: Arc<MockState>,
    _server: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let app = axum::Router::new()
            .route("/api/v1/auth/login", post(login))
            .route("/api/v1/auth/refresh", post(refresh))
            .route("/api/v1/auth/logout", post(logout))
            .route("/api/v1/auth/profile", get(profile))
            .route("/api/v1/auth/validate", post(validate))
            .route("/api/v1/auth/change-password", post(change_password))
            .route("/api/v1/echo", get(echo).post(echo))
            .route("/api/v1/vehicles/broken", get(broken))
            .route("/api/v1/slow", get(slow))
            .route("/api/v1/not-json", get(not_json))
            .with_state(state.clone());

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url,
            state,
            _server: server,
        }
    }

    /// Pretend a login already happened and `T{generation}` is valid.
    pub fn seed_session(&self, generation: usize) {
        let mut session = self.state.session.lock().unwrap();
        session.generation = generation;
        session.access_valid = true;
    }

    /// Invalidate the current access token; the refresh token stays valid.
    pub fn expire_access_token(&self) {
        self.state.session.lock().unwrap().access_valid = false;
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.state.refresh_tokens_seen.lock().unwrap().clone()
    }

    /// Authorization header values of each profile request, in order.
    pub fn profile_auth_headers(&self) -> Vec<Vec<String>> {
        self.state.profile_auth_headers.lock().unwrap().clone()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Could not validate credentials"})),
    )
        .into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.hit(&state.login_calls);
    if body["password"] == "pw" && body["email"].is_string() {
        Json(state.issue()).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect email or password"})),
        )
            .into_response()
    }
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.hit(&state.refresh_calls);
    let presented = body["refresh_token"].as_str().unwrap_or_default().to_owned();
    state.refresh_tokens_seen.lock().unwrap().push(presented.clone());

    let current = {
        let session = state.session.lock().unwrap();
        (session.generation > 0).then(|| format!("R{}", session.generation))
    };
    if state.refresh_fails.load(Ordering::SeqCst) || current.as_deref() != Some(presented.as_str())
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": "INVALID_REFRESH_TOKEN", "message": "refresh token expired"})),
        )
            .into_response();
    }
    Json(state.issue()).into_response()
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    state.hit(&state.logout_calls);
    if state.logout_fails.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.hit(&state.profile_calls);
    let auth: Vec<String> = headers
        .get_all(header::AUTHORIZATION)
        .iter()
        .map(|v| v.to_str().unwrap_or("").to_owned())
        .collect();
    state.profile_auth_headers.lock().unwrap().push(auth);

    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "id": 42,
        "email": "a@b.com",
        "full_name": "Ada Byron",
        "role": "fleet_manager",
        "company_id": 7,
        "is_active": true
    }))
    .into_response()
}

async fn validate(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.total_calls.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"valid": true, "user_id": 42, "expires_at": "2026-10-14T12:00:00Z"}))
        .into_response()
}

async fn change_password(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.total_calls.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let new_ok = body["new_password"].as_str().is_some_and(|p| !p.is_empty());
    if body["current_password"] == "pw" && new_ok {
        Json(json!({"message": "Password updated"})).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": "INVALID_PASSWORD", "message": "Current password is incorrect"})),
        )
            .into_response()
    }
}

/// Echo request headers, method and JSON body.
///
/// Requests carrying a bearer must present the current one; requests with
/// `require_auth` in the query are rejected when unauthenticated.
async fn echo(
    State(state): State<Arc<MockState>>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.hit(&state.echo_calls);
    let has_bearer = headers.contains_key(header::AUTHORIZATION);
    let requires_auth = query.is_some_and(|q| q.contains("require_auth"));
    if (has_bearer || requires_auth) && !state.authorized(&headers) {
        return unauthorized();
    }

    let mut echoed: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        echoed
            .entry(name.to_string())
            .or_default()
            .push(value.to_str().unwrap_or("").to_owned());
    }
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    Json(json!({"headers": echoed, "method": method.as_str(), "body": body})).into_response()
}

async fn broken(State(state): State<Arc<MockState>>) -> Response {
    state.hit(&state.broken_calls);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": {"code": "DB_UNAVAILABLE", "message": "database offline"}})),
    )
        .into_response()
}

async fn slow(State(state): State<Arc<MockState>>) -> Response {
    state.total_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({})).into_response()
}

async fn not_json(State(state): State<Arc<MockState>>) -> Response {
    state.total_calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        "oops",
    )
        .into_response()
}

/// Redirect that counts how often it fired.
#[derive(Default)]
pub struct RecordingRedirect {
    count: AtomicUsize,
}

impl RecordingRedirect {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl LoginRedirect for RecordingRedirect {
    fn redirect_to_login(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn client_for(url: &str, tokens: Option<TokenPair>) -> (ApiClient, Arc<RecordingRedirect>) {
    client_with_timeout(url, tokens, Duration::from_secs(5))
}

pub fn client_with_timeout(
    url: &str,
    tokens: Option<TokenPair>,
    timeout: Duration,
) -> (ApiClient, Arc<RecordingRedirect>) {
    let store: Arc<dyn TokenStore> = Arc::new(match tokens {
        Some(pair) => MemoryTokenStore::with_tokens(pair),
        None => MemoryTokenStore::new(),
    });
    client_with_store(url, store, timeout)
}

pub fn client_with_store(
    url: &str,
    store: Arc<dyn TokenStore>,
    timeout: Duration,
) -> (ApiClient, Arc<RecordingRedirect>) {
    let redirect = Arc::new(RecordingRedirect::default());
    let client = ApiClient::new(
        ClientConfig::new(url).with_timeout(timeout),
        store,
        redirect.clone(),
    )
    .unwrap();
    (client, redirect)
}

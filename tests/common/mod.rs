#![allow(dead_code)]

use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use zeefit_client::session_store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use zeefit_client::{ApiClient, MemorySessionStore, SessionStore, SharedSessionStore};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Rotate,
    Reject,
    /// 200 with empty tokens.
    EmptyTokens,
    /// Never answers within a test's client timeout.
    Hang,
}

/// In-process stand-in for the ZeeFit backend.
#[derive(Debug)]
pub struct FakeBackend {
    pub requests: Vec<RecordedRequest>,
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_mode: RefreshMode,
    pub refresh_bodies: Vec<Value>,
    pub otp_bodies: Vec<Value>,
    rotations: u32,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            access_token: "a1".to_string(),
            refresh_token: "r1".to_string(),
            refresh_mode: RefreshMode::Rotate,
            refresh_bodies: Vec::new(),
            otp_bodies: Vec::new(),
            rotations: 1,
        }
    }
}

impl FakeBackend {
    pub fn hits(&self, path: &str) -> usize {
        self.requests.iter().filter(|r| r.path == path).count()
    }

    pub fn last(&self, path: &str) -> Option<&RecordedRequest> {
        self.requests.iter().rev().find(|r| r.path == path)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.access_token);
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }
}

#[derive(Clone)]
pub struct Backend(Arc<Mutex<FakeBackend>>);

impl Backend {
    pub fn state(&self) -> MutexGuard<'_, FakeBackend> {
        self.0.lock().expect("backend lock")
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Unauthorized", "status_code": 401 })),
    )
        .into_response()
}

fn user_json() -> Value {
    json!({
        "_id": "u1",
        "phone": "9876543210",
        "countryCode": "+91",
        "name": "Asha",
        "gender": "female"
    })
}

fn challenge_json(id: &str) -> Value {
    json!({
        "_id": id,
        "slug": format!("{id}-slug"),
        "name": "Step it up",
        "status": "active",
        "startsAt": "2025-01-01T00:00:00.000Z",
        "endsAt": "2025-02-01T00:00:00.000Z",
        "goalType": "steps",
        "rules": { "minSteps": 8000, "proofRequired": false },
        "visibility": "public"
    })
}

async fn record(State(backend): State<Backend>, req: Request, next: Next) -> Response {
    let recorded = {
        let header_str = |name: header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        RecordedRequest {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(str::to_string),
            authorization: header_str(header::AUTHORIZATION),
            content_type: header_str(header::CONTENT_TYPE),
        }
    };
    backend.state().requests.push(recorded);
    next.run(req).await
}

async fn otp_request(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    backend.state().otp_bodies.push(body);
    Json(json!({ "message": "OTP sent successfully", "status_code": 200 })).into_response()
}

async fn otp_verify(Json(body): Json<Value>) -> Response {
    if body["otp"] != "123456" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid OTP", "status_code": 400 })),
        )
            .into_response();
    }
    let mut user = user_json();
    user["age"] = json!("29");
    if let Some(fields) = user.as_object_mut() {
        fields.remove("countryCode");
    }
    Json(json!({
        "accessToken": "a1",
        "refreshToken": "r1",
        "user": user,
        "status_code": 200,
        "isNewUser": true,
        "extra": { "ignored": true }
    }))
    .into_response()
}

async fn refresh(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    let mode = {
        let mut state = backend.state();
        state.refresh_bodies.push(body.clone());
        state.refresh_mode
    };
    match mode {
        RefreshMode::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            return StatusCode::GATEWAY_TIMEOUT.into_response();
        }
        RefreshMode::EmptyTokens => {
            return Json(json!({ "accessToken": "", "refreshToken": "" })).into_response();
        }
        RefreshMode::Reject | RefreshMode::Rotate => {}
    }

    let mut state = backend.state();
    if mode == RefreshMode::Reject || body["refreshToken"] != state.refresh_token {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid refresh token", "status_code": 401 })),
        )
            .into_response();
    }
    state.rotations += 1;
    state.access_token = format!("a{}", state.rotations);
    state.refresh_token = format!("r{}", state.rotations);
    Json(json!({
        "accessToken": state.access_token,
        "refreshToken": state.refresh_token
    }))
    .into_response()
}

async fn logout(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if !backend.state().authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "message": "Logged out successfully", "status_code": 200 })).into_response()
}

async fn me(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if !backend.state().authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "message": "User fetched", "status_code": 200, "data": user_json() }))
        .into_response()
}

async fn update_me(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !backend.state().authorized(&headers) {
        return unauthorized();
    }
    let mut user = user_json();
    if let (Some(user), Some(patch)) = (user.as_object_mut(), body.as_object()) {
        for (k, v) in patch {
            user.insert(k.clone(), v.clone());
        }
    }
    Json(json!({ "message": "Profile updated", "status_code": 200, "data": user })).into_response()
}

async fn all_challenges(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if !backend.state().authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "message": "Challenges fetched",
        "status_code": 200,
        "data": {
            "challenges": [challenge_json("c1"), challenge_json("c2")],
            "pagination": { "page": 1, "limit": 10, "total": 2 }
        }
    }))
    .into_response()
}

async fn challenge_by_slug(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    if !backend.state().authorized(&headers) {
        return unauthorized();
    }
    let mut challenge = challenge_json("c1");
    challenge["slug"] = Value::String(slug);
    Json(json!({ "message": "ok", "status_code": 200, "data": challenge })).into_response()
}

async fn join(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !backend.state().authorized(&headers) {
        return unauthorized();
    }
    if id == "full" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Challenge is full", "status_code": 409 })),
        )
            .into_response();
    }
    Json(json!({
        "message": "Joined challenge",
        "status_code": 200,
        "data": {
            "participant": {
                "_id": format!("p-{id}"),
                "challengeId": id,
                "userId": "u1",
                "joinedAt": "2025-01-02T00:00:00.000Z"
            },
            "challenge": challenge_json(&id)
        }
    }))
    .into_response()
}

async fn broken() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Database unavailable", "status_code": 500 })),
    )
        .into_response()
}

async fn always_unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "status_code": 401 }))).into_response()
}

pub fn router(backend: Backend) -> Router {
    let api = Router::new()
        .route("/auth/otp/request", post(otp_request))
        .route("/auth/otp/verify", post(otp_verify))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/users/me", get(me).put(update_me))
        .route("/challenges/get-all", get(all_challenges))
        .route("/challenges/slug/:slug", get(challenge_by_slug))
        .route("/challenges/:id/join", post(join))
        .route("/broken", get(broken))
        .route("/always-401", get(always_unauthorized));
    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(backend.clone(), record))
        .with_state(backend)
}

/// Starts the fake backend on an ephemeral port and returns its API base URL.
pub async fn spawn_backend() -> (String, Backend) {
    let backend = Backend(Arc::new(Mutex::new(FakeBackend::default())));
    let app = router(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });
    (format!("http://{addr}/api"), backend)
}

pub fn client_with_store(base_url: &str) -> (ApiClient, Arc<MemorySessionStore>) {
    client_with_timeout(base_url, Duration::from_secs(10))
}

pub fn client_with_timeout(
    base_url: &str,
    timeout: Duration,
) -> (ApiClient, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    let shared: SharedSessionStore = store.clone();
    let client = ApiClient::builder()
        .base_url(base_url)
        .timeout(timeout)
        .session_store(shared)
        .build()
        .expect("client");
    (client, store)
}

pub fn seed_session(store: &dyn SessionStore, access: &str, refresh: Option<&str>) {
    store
        .set(ACCESS_TOKEN_KEY, access, Some(7))
        .expect("seed access");
    if let Some(refresh) = refresh {
        store
            .set(REFRESH_TOKEN_KEY, refresh, Some(30))
            .expect("seed refresh");
    }
    store
        .set(USER_KEY, &user_json().to_string(), Some(7))
        .expect("seed user");
}

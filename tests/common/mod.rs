#![allow(dead_code)]

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, Method, Request, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use hireboard::api::AppState;
use hireboard::config::Config;

/// In-memory stand-in for the hosted backend: password auth, row store,
/// object store and a webhook sink, just enough surface for the app.
#[derive(Default)]
pub struct StubState {
    /// email -> (password, user id)
    pub users: Mutex<HashMap<String, (String, Uuid)>>,
    /// access token -> (user id, email)
    pub tokens: Mutex<HashMap<String, (Uuid, String)>>,
    pub tables: Mutex<HashMap<String, Vec<Value>>>,
    /// "{bucket}/{path}" -> bytes
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub webhooks: Mutex<Vec<Value>>,
}

impl StubState {
    pub fn insert_row(&self, table: &str, row: Value) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn webhook_events(&self) -> Vec<Value> {
        self.webhooks.lock().unwrap().clone()
    }
}

pub struct TestBackend {
    pub url: String,
    pub state: Arc<StubState>,
}

pub async fn spawn_backend() -> TestBackend {
    let state = Arc::new(StubState::default());

    let app = Router::new()
        .route("/auth/v1/signup", post(auth_signup))
        .route("/auth/v1/token", post(auth_token))
        .route("/auth/v1/user", get(auth_user))
        .route("/auth/v1/logout", post(|| async { StatusCode::NO_CONTENT }))
        .route(
            "/rest/v1/{table}",
            get(rest_get)
                .post(rest_post)
                .patch(rest_patch)
                .delete(rest_delete),
        )
        .route("/storage/v1/object/list/{bucket}", post(storage_list))
        .route(
            "/storage/v1/object/{bucket}/{*path}",
            post(storage_upload),
        )
        .route(
            "/storage/v1/object/{bucket}",
            axum::routing::delete(storage_remove),
        )
        .route("/hooks", post(webhook_sink))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub backend");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    TestBackend {
        url: format!("http://{addr}"),
        state,
    }
}

pub async fn spawn_app() -> (Router, TestBackend) {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(adjust: impl FnOnce(&mut Config)) -> (Router, TestBackend) {
    let (app, _, backend) = spawn_app_with_state(adjust).await;
    (app, backend)
}

/// Same as [`spawn_app_with`], keeping the app state so tests can reach the
/// event bus.
pub async fn spawn_app_with_state(
    adjust: impl FnOnce(&mut Config),
) -> (Router, Arc<AppState>, TestBackend) {
    let backend = spawn_backend().await;

    let mut config = Config::default();
    config.backend.base_url = backend.url.clone();
    config.backend.anon_key = "test-anon-key".to_string();
    config.server.secure_cookies = false;
    adjust(&mut config);

    let state =
        hireboard::api::create_app_state_from_config(config).expect("Failed to create app state");
    let app = hireboard::api::router(state.clone()).await;

    (app, state, backend)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder()
        .method(Method::from_bytes(method.as_bytes()).unwrap())
        .uri(uri);

    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

pub async fn send_multipart(
    app: &Router,
    uri: &str,
    cookie: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Response {
    let boundary = "hireboard-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// Session cookie from a login response, in request form.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("id="))
        .map(|v| v.split(';').next().unwrap_or(v).to_string())
}

/// Registers and signs in a user, returning (session cookie, user id).
pub async fn sign_in_user(
    app: &Router,
    email: &str,
    role: &str,
    full_name: &str,
) -> (String, Uuid) {
    let response = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "hunter22",
            "full_name": full_name,
            "role": role,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "hunter22" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = session_cookie(&response).expect("login sets a session cookie");
    let body = json_body(response).await;
    let user_id = body["data"]["user"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("login returns the user id");

    (cookie, user_id)
}

pub fn seed_job(backend: &TestBackend, recruiter_id: Uuid, title: &str, active: bool) -> Uuid {
    seed_job_at(
        backend,
        recruiter_id,
        title,
        active,
        &chrono::Utc::now().to_rfc3339(),
    )
}

pub fn seed_job_at(
    backend: &TestBackend,
    recruiter_id: Uuid,
    title: &str,
    active: bool,
    posted_at: &str,
) -> Uuid {
    let id = Uuid::new_v4();
    backend.state.insert_row(
        "jobs",
        json!({
            "id": id,
            "title": title,
            "company": "Acme",
            "location": "Remote",
            "salary": null,
            "currency": null,
            "type": "Full-time",
            "description": "Build things",
            "skills_required": ["rust"],
            "experience_level": "Mid",
            "is_active": active,
            "posted_at": posted_at,
            "recruiter_id": recruiter_id,
        }),
    );
    id
}

// ---------------------------------------------------------------------------
// Auth surface
// ---------------------------------------------------------------------------

async fn auth_signup(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let email = body["email"].as_str().unwrap_or_default().to_string();

    if state.users.lock().unwrap().contains_key(&email) {
        // Existing accounts come back with an empty identities list.
        return Json(json!({ "email": email, "identities": [] })).into_response();
    }

    let id = Uuid::new_v4();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    state
        .users
        .lock()
        .unwrap()
        .insert(email.clone(), (password, id));

    state.insert_row(
        "profiles",
        json!({
            "id": id,
            "full_name": body["data"]["full_name"],
            "role": body["data"]["role"],
            "avatar_url": null,
        }),
    );

    Json(json!({
        "id": id,
        "email": email,
        "identities": [{ "id": Uuid::new_v4() }],
    }))
    .into_response()
}

async fn auth_token(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default();

    let user_id = {
        let users = state.users.lock().unwrap();
        match users.get(&email) {
            Some((stored, id)) if stored == password => *id,
            _ => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error_description": "Invalid login credentials" })),
                )
                    .into_response();
            }
        }
    };

    let token = Uuid::new_v4().to_string();
    state
        .tokens
        .lock()
        .unwrap()
        .insert(token.clone(), (user_id, email.clone()));

    Json(json!({
        "access_token": token,
        "refresh_token": Uuid::new_v4().to_string(),
        "user": { "id": user_id, "email": email },
    }))
    .into_response()
}

async fn auth_user(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let token = bearer_token(&headers);
    let tokens = state.tokens.lock().unwrap();

    match token.and_then(|t| tokens.get(&t)) {
        Some((id, email)) => Json(json!({ "id": id, "email": email })).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Row store surface
// ---------------------------------------------------------------------------

struct RestQuery {
    select: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<usize>,
}

fn parse_rest_query(uri: &Uri) -> RestQuery {
    let mut query = RestQuery {
        select: "*".to_string(),
        filters: Vec::new(),
        order: None,
        limit: None,
    };

    for (key, value) in url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes()) {
        match key.as_ref() {
            "select" => query.select = value.to_string(),
            "order" => query.order = Some(value.to_string()),
            "limit" => query.limit = value.parse().ok(),
            _ => query.filters.push((key.to_string(), value.to_string())),
        }
    }

    query
}

fn value_matches(row_value: Option<&Value>, expected: &str) -> bool {
    match row_value {
        Some(Value::String(s)) => s == expected,
        Some(Value::Bool(b)) => b.to_string() == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        Some(Value::Null) | None => expected == "null",
        _ => false,
    }
}

fn row_matches(row: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(column, predicate)| {
        if let Some(expected) = predicate.strip_prefix("eq.") {
            value_matches(row.get(column), expected)
        } else if let Some(list) = predicate
            .strip_prefix("in.(")
            .and_then(|s| s.strip_suffix(')'))
        {
            list.split(',')
                .any(|expected| value_matches(row.get(column), expected))
        } else {
            false
        }
    })
}

fn sort_rows(rows: &mut [Value], order: Option<&str>) {
    if let Some(order) = order {
        if let Some(column) = order.strip_suffix(".desc") {
            rows.sort_by(|a, b| {
                let a = a[column].as_str().unwrap_or_default();
                let b = b[column].as_str().unwrap_or_default();
                b.cmp(a)
            });
        }
    }
}

/// Resolves the embedded-resource aliases the app actually asks for.
fn apply_embeds(state: &StubState, select: &str, row: &mut Value) {
    if select.contains("job:jobs(") {
        let job = state
            .rows("jobs")
            .into_iter()
            .find(|j| j["id"] == row["job_id"]);
        row["job"] = job
            .map(|j| {
                json!({
                    "id": j["id"],
                    "title": j["title"],
                    "company": j["company"],
                    "location": j["location"],
                })
            })
            .unwrap_or(Value::Null);
    }

    if select.contains("candidate:profiles(") {
        let profile = state
            .rows("profiles")
            .into_iter()
            .find(|p| p["id"] == row["candidate_id"]);
        row["candidate"] = profile.unwrap_or(Value::Null);
    }

    if select.contains("resume:resumes(") {
        let resume = state
            .rows("resumes")
            .into_iter()
            .find(|r| r["id"] == row["resume_id"]);
        row["resume"] = resume.unwrap_or(Value::Null);
    }
}

fn wants_object(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("vnd.pgrst.object"))
}

fn prefer(headers: &HeaderMap) -> String {
    headers
        .get("Prefer")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn rest_get(
    State(state): State<Arc<StubState>>,
    Path(table): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let query = parse_rest_query(&uri);

    let mut rows: Vec<Value> = state
        .rows(&table)
        .into_iter()
        .filter(|row| row_matches(row, &query.filters))
        .collect();
    sort_rows(&mut rows, query.order.as_deref());

    let total = rows.len();
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }

    for row in &mut rows {
        apply_embeds(&state, &query.select, row);
    }

    let mut response = if wants_object(&headers) {
        match rows.into_iter().next() {
            Some(row) => Json(row).into_response(),
            None => (
                StatusCode::NOT_ACCEPTABLE,
                Json(json!({ "code": "PGRST116" })),
            )
                .into_response(),
        }
    } else {
        Json(rows).into_response()
    };

    if prefer(&headers).contains("count=exact") {
        response.headers_mut().insert(
            header::CONTENT_RANGE,
            format!("0-0/{total}").parse().unwrap(),
        );
    }

    response
}

async fn rest_post(
    State(state): State<Arc<StubState>>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if prefer(&headers).contains("resolution=merge-duplicates") {
        let mut tables = state.tables.lock().unwrap();
        let rows = tables.entry(table).or_default();
        if let Some(existing) = rows.iter_mut().find(|r| r["id"] == body["id"]) {
            if let (Some(target), Some(patch)) = (existing.as_object_mut(), body.as_object()) {
                for (key, value) in patch {
                    target.insert(key.clone(), value.clone());
                }
            }
        } else {
            rows.push(body);
        }
        return StatusCode::CREATED.into_response();
    }

    if body.get("id").is_none() {
        body["id"] = json!(Uuid::new_v4());
    }
    state.insert_row(&table, body.clone());

    if wants_object(&headers) {
        (StatusCode::CREATED, Json(body)).into_response()
    } else {
        (StatusCode::CREATED, Json(json!([body]))).into_response()
    }
}

async fn rest_patch(
    State(state): State<Arc<StubState>>,
    Path(table): Path<String>,
    uri: Uri,
    Json(patch): Json<Value>,
) -> Response {
    let query = parse_rest_query(&uri);
    let mut updated = Vec::new();

    let mut tables = state.tables.lock().unwrap();
    if let Some(rows) = tables.get_mut(&table) {
        for row in rows.iter_mut().filter(|r| row_matches(r, &query.filters)) {
            if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
    }

    Json(updated).into_response()
}

async fn rest_delete(
    State(state): State<Arc<StubState>>,
    Path(table): Path<String>,
    uri: Uri,
) -> Response {
    let query = parse_rest_query(&uri);
    let mut removed = Vec::new();

    let mut tables = state.tables.lock().unwrap();
    if let Some(rows) = tables.get_mut(&table) {
        rows.retain(|row| {
            if row_matches(row, &query.filters) {
                removed.push(row.clone());
                false
            } else {
                true
            }
        });
    }

    Json(removed).into_response()
}

// ---------------------------------------------------------------------------
// Object store surface
// ---------------------------------------------------------------------------

async fn storage_upload(
    State(state): State<Arc<StubState>>,
    Path((bucket, path)): Path<(String, String)>,
    bytes: Bytes,
) -> impl IntoResponse {
    state
        .objects
        .lock()
        .unwrap()
        .insert(format!("{bucket}/{path}"), bytes.to_vec());
    StatusCode::OK
}

async fn storage_remove(
    State(state): State<Arc<StubState>>,
    Path(bucket): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut objects = state.objects.lock().unwrap();
    if let Some(prefixes) = body["prefixes"].as_array() {
        for prefix in prefixes.iter().filter_map(Value::as_str) {
            objects.remove(&format!("{bucket}/{prefix}"));
        }
    }
    Json(json!([]))
}

async fn storage_list(
    State(state): State<Arc<StubState>>,
    Path(bucket): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let prefix = format!("{bucket}/{}/", body["prefix"].as_str().unwrap_or_default());

    let names: Vec<Value> = state
        .objects
        .lock()
        .unwrap()
        .keys()
        .filter_map(|key| key.strip_prefix(&prefix))
        .map(|name| json!({ "name": name }))
        .collect();

    Json(names)
}

async fn webhook_sink(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.webhooks.lock().unwrap().push(body);
    StatusCode::OK
}

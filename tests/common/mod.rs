// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use auth_gateway::config::Config;
use auth_gateway::db::AuthDb;
use auth_gateway::routes::create_router;
use auth_gateway::services::Provider;
use auth_gateway::AppState;
use axum::{
    body::Body,
    extract::{Form, Path, Query, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Offline app with every login method enabled and an in-memory store.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn with_config(config: Config) -> Self {
        let db = AuthDb::in_memory()
            .await
            .expect("Failed to open in-memory store");
        let state = Arc::new(AppState::new(config, db).expect("Failed to build app state"));
        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    /// Send one request through a clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_with_bearer(&self, uri: &str, token: &str) -> Response {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// `/login` for `provider`, returning the issued state.
    pub async fn start_login(&self, provider: Provider) -> String {
        let response = self.get(&format!("/api/auth/{}/login", provider)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        body["state"].as_str().unwrap().to_string()
    }

    /// Full login round trip for `provider` using the mock's `code`.
    pub async fn oauth_login(&self, provider: Provider, code: &str) -> Response {
        let state = self.start_login(provider).await;
        self.get(&format!(
            "/api/auth/{}/callback?code={}&state={}",
            provider, code, state
        ))
        .await
    }
}

/// Offline app; OAuth providers point at the real endpoints and must not be
/// called.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    TestApp::with_config(Config::test_default()).await
}

/// App wired to a freshly started [`MockProvider`].
#[allow(dead_code)]
pub async fn create_test_app_with_mock() -> (TestApp, MockProvider) {
    let mock = MockProvider::start().await;
    let mut config = Config::test_default();
    mock.point_config_at_mock(&mut config);
    (TestApp::with_config(config).await, mock)
}

/// Collect a JSON response body.
pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ─── Mock OAuth Provider ─────────────────────────────────────

#[derive(Default)]
struct MockState {
    /// Authorization code -> profile returned for its access token
    profiles: Mutex<HashMap<String, Value>>,
    /// Codes exchanged so far, in order
    exchanged: Mutex<Vec<String>>,
    /// `scope` of every client credentials grant, in order
    app_scopes: Mutex<Vec<String>>,
    /// Directory group id -> (displayName, members)
    groups: Mutex<HashMap<String, (String, Vec<Value>)>>,
}

/// App-only token handed out for the client credentials grant.
pub const MOCK_APP_TOKEN: &str = "app-token";

/// Local OAuth2 provider serving `/{provider}/token` and `/{provider}/profile`.
///
/// Codes registered with [`MockProvider::add_code`] exchange for the access
/// token `at-{code}`; anything else gets a 400 `invalid_grant`. Codes
/// starting with `str-` report `expires_in` as a string. The client
/// credentials grant yields [`MOCK_APP_TOKEN`], which unlocks a small Graph
/// directory under `/graph`.
pub struct MockProvider {
    pub base_url: String,
    state: Arc<MockState>,
}

#[allow(dead_code)]
impl MockProvider {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/{provider}/token", post(mock_token))
            .route("/{provider}/profile", get(mock_profile))
            .route("/graph/groups", get(mock_groups))
            .route("/graph/groups/{group_id}/members", get(mock_group_members))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Make `code` exchangeable; its profile request returns `profile`.
    pub fn add_code(&self, code: &str, profile: Value) {
        self.state
            .profiles
            .lock()
            .unwrap()
            .insert(code.to_string(), profile);
    }

    pub fn exchanged_codes(&self) -> Vec<String> {
        self.state.exchanged.lock().unwrap().clone()
    }

    /// Add a directory group with the given members.
    pub fn add_group(&self, id: &str, display_name: &str, members: Vec<Value>) {
        self.state
            .groups
            .lock()
            .unwrap()
            .insert(id.to_string(), (display_name.to_string(), members));
    }

    pub fn app_scopes_requested(&self) -> Vec<String> {
        self.state.app_scopes.lock().unwrap().clone()
    }

    /// Rewrite token and profile endpoints of every provider to this mock.
    pub fn point_config_at_mock(&self, config: &mut Config) {
        for provider in &mut config.providers {
            let name = provider.provider.as_str();
            provider.endpoints.token_url = format!("{}/{}/token", self.base_url, name);
            provider.endpoints.profile_url = format!("{}/{}/profile", self.base_url, name);
            if let Some(graph) = provider.endpoints.graph.as_mut() {
                graph.base_url = format!("{}/graph", self.base_url);
            }
        }
    }
}

async fn mock_token(
    State(state): State<Arc<MockState>>,
    Path(_provider): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let invalid_grant = || {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        )
            .into_response()
    };

    if !form.contains_key("client_secret") {
        return invalid_grant();
    }

    match form.get("grant_type").map(String::as_str) {
        Some("client_credentials") => {
            let scope = form.get("scope").cloned().unwrap_or_default();
            if scope.is_empty() {
                return invalid_grant();
            }
            state.app_scopes.lock().unwrap().push(scope);
            Json(json!({
                "access_token": MOCK_APP_TOKEN,
                "expires_in": 3599,
                "token_type": "Bearer",
            }))
            .into_response()
        }
        Some("authorization_code") => {
            let code = form.get("code").cloned().unwrap_or_default();
            state.exchanged.lock().unwrap().push(code.clone());
            if !state.profiles.lock().unwrap().contains_key(&code) {
                return invalid_grant();
            }

            let expires_in = if code.starts_with("str-") {
                json!("3600")
            } else {
                json!(3600)
            };
            Json(json!({
                "access_token": format!("at-{}", code),
                "refresh_token": format!("rt-{}", code),
                "expires_in": expires_in,
                "token_type": "Bearer",
            }))
            .into_response()
        }
        _ => invalid_grant(),
    }
}

fn has_app_token(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        == Some(format!("Bearer {}", MOCK_APP_TOKEN).as_str())
}

fn graph_unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"code": "InvalidAuthenticationToken"}})),
    )
        .into_response()
}

/// Graph list response; echoes `$select` so tests can check it was sent.
async fn mock_groups(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !has_app_token(&headers) {
        return graph_unauthorized();
    }
    let mut groups: Vec<Value> = state
        .groups
        .lock()
        .unwrap()
        .iter()
        .map(|(id, (name, _))| json!({"id": id, "displayName": name}))
        .collect();
    groups.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
    Json(json!({"value": groups, "select": query.get("$select")})).into_response()
}

async fn mock_group_members(
    State(state): State<Arc<MockState>>,
    Path(group_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !has_app_token(&headers) {
        return graph_unauthorized();
    }
    let members = state
        .groups
        .lock()
        .unwrap()
        .get(&group_id)
        .map(|(_, members)| members.clone());
    match members {
        Some(members) => {
            Json(json!({"value": members, "select": query.get("$select")})).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "Request_ResourceNotFound"}})),
        )
            .into_response(),
    }
}

async fn mock_profile(
    State(state): State<Arc<MockState>>,
    Path(_provider): Path<String>,
    headers: HeaderMap,
) -> Response {
    let code = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer at-"))
        .map(str::to_string);

    let profile = code.and_then(|c| state.profiles.lock().unwrap().get(&c).cloned());
    match profile {
        Some(profile) => Json(profile).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_token"})),
        )
            .into_response(),
    }
}

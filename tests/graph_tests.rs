// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Microsoft Graph directory routes against the mock provider.

use auth_gateway::config::Config;
use auth_gateway::services::Provider;
use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{create_test_app_with_mock, json_body, MockProvider, TestApp, MOCK_APP_TOKEN};

const APP_TOKEN: &str = "/api/auth/microsoft/app-token";
const GROUPS: &str = "/api/auth/microsoft/groups";

/// Register a standard user and return its gateway bearer token.
async fn bearer(app: &TestApp) -> String {
    let response = app
        .post_json(
            "/api/auth/standard/register",
            json!({"email": "admin@x.com", "password": "p1"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_graph_routes_require_bearer() {
    let (app, mock) = create_test_app_with_mock().await;
    mock.add_group("g1", "Staff", vec![]);

    for uri in [APP_TOKEN, GROUPS, "/api/auth/microsoft/groups/g1/members"] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        let response = app.get_with_bearer(uri, "not-a-token").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
    assert!(mock.app_scopes_requested().is_empty());
}

#[tokio::test]
async fn test_app_token_uses_client_credentials() {
    let (app, mock) = create_test_app_with_mock().await;
    let token = bearer(&app).await;

    let response = app.get_with_bearer(APP_TOKEN, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["access_token"], MOCK_APP_TOKEN);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 3599);

    assert_eq!(
        mock.app_scopes_requested(),
        vec!["https://graph.microsoft.com/.default".to_string()]
    );
}

#[tokio::test]
async fn test_list_groups_selects_fields() {
    let (app, mock) = create_test_app_with_mock().await;
    mock.add_group("g2", "Engineering", vec![]);
    mock.add_group("g1", "Staff", vec![]);
    let token = bearer(&app).await;

    let response = app.get_with_bearer(GROUPS, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    assert_eq!(body["select"], "id,displayName,description");
    assert_eq!(body["value"][0]["id"], "g1");
    assert_eq!(body["value"][1]["displayName"], "Engineering");
}

#[tokio::test]
async fn test_group_members() {
    let (app, mock) = create_test_app_with_mock().await;
    mock.add_group(
        "g1",
        "Staff",
        vec![json!({
            "id": "u1",
            "displayName": "Ada",
            "mail": "ada@x.com",
            "userPrincipalName": "ada@contoso.example",
        })],
    );
    let token = bearer(&app).await;

    let response = app
        .get_with_bearer("/api/auth/microsoft/groups/g1/members", &token)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["select"], "id,displayName,mail,userPrincipalName");
    assert_eq!(body["value"][0]["mail"], "ada@x.com");
}

#[tokio::test]
async fn test_unknown_group_is_not_found() {
    let (app, _mock) = create_test_app_with_mock().await;
    let token = bearer(&app).await;

    let response = app
        .get_with_bearer("/api/auth/microsoft/groups/missing/members", &token)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_rejected_app_token_is_provider_error() {
    let mock = MockProvider::start().await;
    let mut config = Config::test_default();
    mock.point_config_at_mock(&mut config);
    for provider in &mut config.providers {
        if let Some(graph) = provider.endpoints.graph.as_mut() {
            graph.app_scopes.clear();
        }
    }
    let app = TestApp::with_config(config).await;
    let token = bearer(&app).await;

    let response = app.get_with_bearer(GROUPS, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"], "provider_error");
}

#[tokio::test]
async fn test_graph_routes_only_on_microsoft() {
    let mut config = Config::test_default();
    config.providers.retain(|p| p.provider != Provider::Microsoft);
    let app = TestApp::with_config(config).await;
    let token = bearer(&app).await;

    let response = app.get_with_bearer(APP_TOKEN, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app
        .get_with_bearer("/api/auth/google/groups", &token)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use settings_cell::router::create_settings_router;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockStoreResponses, TestConfig, TestUser};

async fn create_test_app(config: AppConfig) -> Router {
    create_settings_router(Arc::new(config))
}

fn authed_request(method: &str, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json");

    match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_get_settings_returns_row() {
    let mock_server = MockServer::start().await;

    let user = TestUser::practitioner("doc@example.com");
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let settings_id = Uuid::new_v4().to_string();
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::settings_row(&settings_id)
        ])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(authed_request("GET", "/", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["id"], settings_id);
    assert_eq!(json_response["working_days"], json!([1, 2, 3, 4, 5]));
}

#[tokio::test]
async fn test_get_settings_unconfigured_returns_null() {
    let mock_server = MockServer::start().await;

    let user = TestUser::practitioner("doc@example.com");
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(authed_request("GET", "/", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json_response.is_null());
}

#[tokio::test]
async fn test_save_settings_creates_when_missing() {
    let mock_server = MockServer::start().await;

    let user = TestUser::practitioner("doc@example.com");
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let settings_id = Uuid::new_v4().to_string();
    Mock::given(method("POST"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::settings_row(&settings_id)
        ])))
        .mount(&mock_server)
        .await;

    let request_body = json!({
        "first_name": "María",
        "last_name": "Pérez",
        "specialty": "Clínica médica",
        "phone": "+54 11 5555-0000",
        "email": "doctora@example.com",
        "address": "Av. Santa Fe 1234",
        "license_number": "MN 112233",
        "working_days": [1, 2, 3, 4, 5],
        "opening_time": "08:00:00",
        "closing_time": "18:00:00",
        "default_duration_minutes": 30,
        "default_price": 5000.0
    });

    let response = app
        .oneshot(authed_request("PUT", "/", &token, Some(request_body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_save_settings_rejects_inverted_hours() {
    let user = TestUser::practitioner("doc@example.com");
    let config = TestConfig::default().to_app_config();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let request_body = json!({
        "first_name": "María",
        "last_name": "Pérez",
        "specialty": "Clínica médica",
        "phone": "+54 11 5555-0000",
        "email": "doctora@example.com",
        "address": "Av. Santa Fe 1234",
        "license_number": "MN 112233",
        "working_days": [1, 2, 3],
        "opening_time": "18:00:00",
        "closing_time": "08:00:00",
        "default_duration_minutes": 30,
        "default_price": 5000.0
    });

    let response = app
        .oneshot(authed_request("PUT", "/", &token, Some(request_body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_non_working_dates_deduplicates() {
    let mock_server = MockServer::start().await;

    let user = TestUser::practitioner("doc@example.com");
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let settings_id = Uuid::new_v4().to_string();
    let mut row = MockStoreResponses::settings_row(&settings_id);
    row["non_working_dates"] = json!(["2024-02-01"]);

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let mut updated = MockStoreResponses::settings_row(&settings_id);
    updated["non_working_dates"] = json!(["2024-02-01", "2024-02-02"]);

    // The PATCH body must contain each blocked date exactly once
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clinic_settings"))
        .and(query_param("id", format!("eq.{}", settings_id)))
        .and(body_json(json!({ "non_working_dates": ["2024-02-01", "2024-02-02"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .mount(&mock_server)
        .await;

    let request_body = json!({ "dates": ["2024-02-01", "2024-02-02"] });

    let response = app
        .oneshot(authed_request(
            "POST",
            "/non-working-dates",
            &token,
            Some(request_body),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_remove_non_working_dates_ignores_unknown() {
    let mock_server = MockServer::start().await;

    let user = TestUser::practitioner("doc@example.com");
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let settings_id = Uuid::new_v4().to_string();
    let mut row = MockStoreResponses::settings_row(&settings_id);
    row["non_working_dates"] = json!(["2024-02-01", "2024-02-05"]);

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let mut updated = MockStoreResponses::settings_row(&settings_id);
    updated["non_working_dates"] = json!(["2024-02-05"]);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clinic_settings"))
        .and(body_json(json!({ "non_working_dates": ["2024-02-05"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .mount(&mock_server)
        .await;

    // 2024-03-01 was never blocked; removing it is a no-op
    let request_body = json!({ "dates": ["2024-02-01", "2024-03-01"] });

    let response = app
        .oneshot(authed_request(
            "DELETE",
            "/non-working-dates",
            &token,
            Some(request_body),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_price_requires_existing_settings() {
    let mock_server = MockServer::start().await;

    let user = TestUser::practitioner("doc@example.com");
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(authed_request(
            "PATCH",
            "/price",
            &token,
            Some(json!({ "default_price": 6000.0 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unauthorized_requests() {
    let config = TestConfig::default().to_app_config();

    let protected_endpoints = vec![
        ("GET", "/"),
        ("PUT", "/"),
        ("PATCH", "/working-hours"),
        ("PATCH", "/price"),
        ("POST", "/non-working-dates"),
    ];

    for (method, uri) in protected_endpoints {
        let app = create_test_app(config.clone()).await;

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "Failed for {} {}",
            method,
            uri
        );
    }
}

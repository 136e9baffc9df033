use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, MockDaraja, ORG_INFO, STK_PUSH, TOKEN_PATH};
use serde_json::{json, Value};
use tower::ServiceExt;

// base64("key:secret")
const BASIC: &str = "Basic a2V5OnNlY3JldA==";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn token_request(authorization: &str) -> Request<String> {
    Request::builder()
        .uri(format!("{TOKEN_PATH}?grant_type=client_credentials"))
        .header(http::header::AUTHORIZATION, authorization)
        .body(String::new())
        .unwrap()
}

fn json_request(uri: &str, token: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(body.to_string())
        .unwrap()
}

async fn issue_token(state: &MockDaraja) -> String {
    let resp = app(state.clone()).oneshot(token_request(BASIC)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await["access_token"].as_str().unwrap().to_string()
}

// --- oauth ---

#[tokio::test]
async fn token_issued_for_valid_credentials() {
    let state = MockDaraja::new().with_credentials("key", "secret");
    let resp = app(state.clone()).oneshot(token_request(BASIC)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(!body["access_token"].as_str().unwrap().is_empty());
    assert_eq!(body["expires_in"], "3599");
    assert_eq!(state.token_requests().await, 1);
}

#[tokio::test]
async fn token_rejected_for_wrong_credentials() {
    let state = MockDaraja::new().with_credentials("key", "other");
    let resp = app(state).oneshot(token_request(BASIC)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["errorMessage"], "Invalid Authentication passed");
}

#[tokio::test]
async fn token_requires_client_credentials_grant() {
    let resp = app(MockDaraja::new())
        .oneshot(
            Request::builder()
                .uri(TOKEN_PATH)
                .header(http::header::AUTHORIZATION, BASIC)
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["errorMessage"], "Invalid grant type passed");
}

// --- business endpoints ---

#[tokio::test]
async fn business_call_requires_issued_token() {
    let state = MockDaraja::new();
    let resp = app(state.clone())
        .oneshot(json_request(STK_PUSH, "forged", r#"{"Amount":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["errorMessage"], "Invalid Access Token");
    // Rejected requests are still recorded.
    assert_eq!(state.requests().await.len(), 1);
}

#[tokio::test]
async fn stk_push_accepted_and_recorded() {
    let state = MockDaraja::new();
    let token = issue_token(&state).await;
    let resp = app(state.clone())
        .oneshot(json_request(STK_PUSH, &token, r#"{"Amount":1,"PhoneNumber":"254712345678"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["ResponseCode"], "0");
    assert!(body["CheckoutRequestID"].as_str().unwrap().starts_with("ws_CO_"));

    let recorded = state.requests().await;
    assert_eq!(recorded[0].path, STK_PUSH);
    assert_eq!(recorded[0].authorization.as_deref(), Some(format!("Bearer {token}").as_str()));
    assert_eq!(recorded[0].body, json!({"Amount": 1, "PhoneNumber": "254712345678"}));
}

#[tokio::test]
async fn org_info_returns_configured_name() {
    let state = MockDaraja::new().with_organization_name("Acme Ltd");
    let token = issue_token(&state).await;
    let resp = app(state)
        .oneshot(json_request(ORG_INFO, &token, r#"{"IdentifierType":"4","Identifier":"600000"}"#))
        .await
        .unwrap();

    assert_eq!(body_json(resp).await["OrganizationName"], "Acme Ltd");
}

#[tokio::test]
async fn override_replaces_default_response() {
    let state = MockDaraja::new();
    state
        .respond_with(STK_PUSH, 400, json!({"ResponseMessage": "Invalid Amount"}))
        .await;
    let token = issue_token(&state).await;
    let resp = app(state)
        .oneshot(json_request(STK_PUSH, &token, r#"{"Amount":0}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await, json!({"ResponseMessage": "Invalid Amount"}));
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let state = MockDaraja::new();
    let token = issue_token(&state).await;
    let resp = app(state)
        .oneshot(json_request(STK_PUSH, &token, "not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["errorMessage"], "Bad Request - Invalid JSON");
}

#[tokio::test]
async fn unknown_endpoint_returns_404() {
    let resp = app(MockDaraja::new())
        .oneshot(json_request("/mpesa/unknown/v1", "t", "{}"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn token_endpoint_rejects_post() {
    let resp = app(MockDaraja::new())
        .oneshot(json_request(TOKEN_PATH, "t", "{}"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

//! Phone login with one-time SMS codes.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use nexx_integration_tests::{OTP_CODE, TestApp};

#[tokio::test]
async fn test_send_and_verify_creates_account() {
    let app = TestApp::new().await;
    let mut client = app.client();

    let resp = client
        .post("/api/auth/sms/send", &json!({ "phone": "8 (900) 123-45-67" }))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let sent = resp.json();
    assert_eq!(sent["success"], true);
    assert_eq!(sent["phone"], "+79001234567");
    assert!(sent["provider"].as_str().unwrap().ends_with("_mock"));

    let resp = client
        .post(
            "/api/auth/sms/verify",
            &json!({ "phone": "+7 900 123 45 67", "code": OTP_CODE }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let verified = resp.json();
    assert_eq!(verified["is_new_user"], true);
    assert_eq!(verified["user"]["phone"], "+79001234567");
    assert_eq!(verified["user"]["has_password"], false);

    let me = client.get("/api/auth/me").await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["id"], verified["user"]["id"]);
}

#[tokio::test]
async fn test_second_login_finds_existing_account() {
    let app = TestApp::new().await;
    let mut client = app.client();
    let phone = json!({ "phone": "+79001234567" });
    let verify = json!({ "phone": "+79001234567", "code": OTP_CODE });

    client.post("/api/auth/sms/send", &phone).await;
    let first = client.post("/api/auth/sms/verify", &verify).await.json();

    let mut other = app.client();
    other.post("/api/auth/sms/send", &phone).await;
    let second = other.post("/api/auth/sms/verify", &verify).await.json();

    assert_eq!(second["is_new_user"], false);
    assert_eq!(second["user"]["id"], first["user"]["id"]);
}

#[tokio::test]
async fn test_code_is_single_use() {
    let app = TestApp::new().await;
    let mut client = app.client();
    let verify = json!({ "phone": "+79001234567", "code": OTP_CODE });

    client
        .post("/api/auth/sms/send", &json!({ "phone": "+79001234567" }))
        .await;
    assert_eq!(
        client.post("/api/auth/sms/verify", &verify).await.status,
        StatusCode::OK
    );
    assert_eq!(
        client.post("/api/auth/sms/verify", &verify).await.status,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_verify_without_code_sent_fails() {
    let app = TestApp::new().await;
    let mut client = app.client();

    let resp = client
        .post(
            "/api/auth/sms/verify",
            &json!({ "phone": "+79001234567", "code": OTP_CODE }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(!client.is_logged_in());
}

#[tokio::test]
async fn test_invalid_phone_rejected() {
    let app = TestApp::new().await;
    let resp = app
        .client()
        .post("/api/auth/sms/send", &json!({ "phone": "12345" }))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

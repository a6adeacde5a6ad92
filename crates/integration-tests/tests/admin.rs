//! Account management and the staff dashboard.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use nexx_core::UserRole;
use nexx_integration_tests::{STAFF_PASSWORD, TestApp};

#[tokio::test]
async fn test_user_management_roles() {
    let app = TestApp::new().await;
    let mut manager = app.staff_client("manager", UserRole::Manager).await;
    let mut admin = app.staff_client("admin", UserRole::Admin).await;
    let (mut customer, _) = app.customer_client("ivan").await;

    assert_eq!(
        customer.get("/api/admin/users").await.status,
        StatusCode::FORBIDDEN
    );

    let resp = manager.get("/api/admin/users").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"].as_array().unwrap().len(), 3);

    let new_user = json!({
        "username": "sklad",
        "email": "sklad@nexx.ru",
        "password": "Sklad-Nexx-2024",
        "name": "Склад",
        "role": "manager",
    });
    let resp = manager.post("/api/admin/users", &new_user).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.json()["error"], "Admin access required");

    let resp = admin.post("/api/admin/users", &new_user).await;
    assert_eq!(resp.status, StatusCode::OK);
    let created = resp.json();
    assert_eq!(created["data"]["role"], "manager");
    let id = created["data"]["id"].as_str().unwrap().to_owned();

    let resp = admin.post("/api/admin/users", &new_user).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = admin.delete(&format!("/api/admin/users/{id}")).await;
    assert_eq!(resp.status, StatusCode::OK);
    let resp = admin.get(&format!("/api/admin/users/{id}")).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_cannot_lock_themselves_out() {
    let app = TestApp::new().await;
    let mut admin = app.staff_client("admin", UserRole::Admin).await;
    let me = admin.get("/api/auth/me").await.json();
    let uri = format!("/api/admin/users/{}", me["id"].as_str().unwrap());

    let resp = admin.put(&uri, &json!({ "role": "user" })).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = admin.put(&uri, &json!({ "active": false })).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = admin.delete(&uri).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deactivated_account_cannot_log_in() {
    let app = TestApp::new().await;
    let mut admin = app.staff_client("admin", UserRole::Admin).await;
    app.create_staff("manager", UserRole::Manager).await;

    let users = admin.get("/api/admin/users").await.json();
    let manager_id = users["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "manager")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_owned();

    let resp = admin
        .put(
            &format!("/api/admin/users/{manager_id}"),
            &json!({ "active": false }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"]["active"], false);

    let resp = app
        .client()
        .post(
            "/api/auth/login",
            &json!({ "username": "manager", "password": STAFF_PASSWORD }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["error"], "Account is disabled");
}

#[tokio::test]
async fn test_open_session_loses_access_after_demotion() {
    let app = TestApp::new().await;
    let mut admin = app.staff_client("admin", UserRole::Admin).await;
    let mut manager = app.staff_client("manager", UserRole::Manager).await;
    assert_eq!(manager.get("/api/orders").await.status, StatusCode::OK);

    let me = manager.get("/api/auth/me").await.json();
    let manager_id = me["id"].as_str().unwrap().to_owned();

    let resp = admin
        .put(
            &format!("/api/admin/users/{manager_id}"),
            &json!({ "role": "user" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(manager.get("/api/orders").await.status, StatusCode::FORBIDDEN);

    let resp = admin
        .put(
            &format!("/api/admin/users/{manager_id}"),
            &json!({ "active": false }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        manager.get("/api/orders").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        manager.get("/api/auth/me").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_dashboard_counts() {
    let app = TestApp::new().await;
    let filter = app.create_product("Фильтр", 8500, 15).await;
    app.create_product("Гидронасос", 185_000, 0).await;

    let (mut customer, user_id) = app.customer_client("ivan").await;
    customer
        .post(
            &format!("/api/cart/{user_id}/items"),
            &json!({ "product_id": filter.id, "quantity": 2 }),
        )
        .await;
    customer
        .post(
            &format!("/api/orders/{user_id}"),
            &json!({
                "user_name": "Иван",
                "user_email": "ivan@mail.ru",
                "user_phone": "+79001234567",
                "delivery_address": "Москва",
            }),
        )
        .await;

    assert_eq!(
        customer.get("/api/analytics/dashboard").await.status,
        StatusCode::FORBIDDEN
    );

    let mut manager = app.staff_client("manager", UserRole::Manager).await;
    let resp = manager.get("/api/analytics/dashboard").await;
    assert_eq!(resp.status, StatusCode::OK);
    let dashboard = &resp.json()["data"];
    assert_eq!(dashboard["orders"]["total"], 1);
    assert_eq!(dashboard["orders"]["pending"], 1);
    assert_eq!(dashboard["orders"]["today"], 1);
    assert_eq!(dashboard["products"]["total"], 2);
    assert_eq!(dashboard["products"]["out_of_stock"], 1);
}

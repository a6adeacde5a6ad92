//! Supplier integrations, ABCP configuration and the 1C sync.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use nexx_core::UserRole;
use nexx_integration_tests::TestApp;

#[tokio::test]
async fn test_supplier_crud_masks_credentials() {
    let app = TestApp::new().await;
    let mut manager = app.staff_client("manager", UserRole::Manager).await;

    let resp = manager
        .post(
            "/api/suppliers",
            &json!({
                "name": "Emex",
                "api_type": "emex",
                "api_credentials": { "login": "nexx", "token": "s3cr3t" },
                "markup_percentage": "20",
                "delivery_days": 4,
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let supplier = resp.json()["data"].clone();
    assert_eq!(supplier["api_credentials"]["token"], "***");
    let id = supplier["id"].as_str().unwrap().to_owned();

    let listed = manager.get("/api/suppliers").await.json();
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let resp = manager
        .post("/api/suppliers", &json!({ "name": "", "api_type": "emex" }))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = manager.delete(&format!("/api/suppliers/{id}")).await;
    assert_eq!(resp.status, StatusCode::OK);
    let resp = manager.get(&format!("/api/suppliers/{id}")).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_configured_supplier_quotes_replace_fallback() {
    let app = TestApp::new().await;
    let product = app.create_product("Гидронасос", 185_000, 2).await;
    let mut manager = app.staff_client("manager", UserRole::Manager).await;
    let offers_uri = format!("/api/products/{}/offers", product.id);

    // Warm the cache with the built-in offers.
    let before = manager.get(&offers_uri).await.json();
    assert_eq!(before["data"][0]["supplier_id"], "mock_supplier_1");

    manager
        .post(
            "/api/suppliers",
            &json!({ "name": "Exist", "api_type": "exist", "delivery_days": 2 }),
        )
        .await;

    let after = manager.get(&offers_uri).await.json();
    let offers = after["data"].as_array().unwrap();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["supplier_name"], "Exist");
    assert_eq!(offers[0]["delivery_time_days"], 2);
}

#[tokio::test]
async fn test_abcp_requires_configuration() {
    let app = TestApp::new().await;
    let mut manager = app.staff_client("manager", UserRole::Manager).await;

    let resp = manager
        .get("/api/suppliers/abcp/search?number=320%2F03336&brand=JCB")
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["error"], "ABCP service not configured");

    let resp = manager
        .post(
            "/api/suppliers/abcp/settings",
            &json!({ "username": "nexx", "password": "abcp-pass" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let saved = resp.json()["data"].clone();
    assert_eq!(saved["password"], "***");
    assert_eq!(saved["host"], "api.abcp.ru");

    let resp = manager.get("/api/suppliers/abcp/settings").await;
    assert_eq!(resp.json()["data"]["username"], "nexx");

    let resp = manager.get("/api/suppliers/abcp/search?number=%20").await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_onec_sync_records_history() {
    let app = TestApp::new().await;
    app.create_product("Фильтр", 8500, 15).await;
    app.create_product("Коленвал", 95_000, 3).await;
    let mut manager = app.staff_client("manager", UserRole::Manager).await;

    let resp = manager.post("/api/admin/1c/sync", &json!({})).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = manager
        .post(
            "/api/admin/1c/settings",
            &json!({
                "server_url": "not a url",
                "database": "nexx",
                "username": "obmen",
                "password": "1c-pass",
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = manager
        .post(
            "/api/admin/1c/settings",
            &json!({
                "server_url": "http://1c.nexx.local/base",
                "database": "nexx",
                "username": "obmen",
                "password": "1c-pass",
                "sync_orders": false,
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"]["password"], "***");

    let resp = manager
        .post("/api/admin/1c/sync", &json!({ "sync_type": "all" }))
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let run = resp.json();
    assert_eq!(run["success"], true);
    assert_eq!(run["results"]["products_synced"], 2);
    assert_eq!(run["results"]["prices_updated"], 2);
    assert_eq!(run["results"]["orders_sent"], 0);

    let history = manager.get("/api/admin/1c/sync/history").await.json();
    let runs = history["data"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["id"], run["sync_id"]);
}

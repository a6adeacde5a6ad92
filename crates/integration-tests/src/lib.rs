//! End-to-end tests for the NEXX API.
//!
//! Every test builds the full router (sessions, CORS, request ids, tracing)
//! over a fresh temporary data directory and drives it in-process with
//! `tower::ServiceExt::oneshot`. No network or external services are used:
//! SMS goes to the mock gateway, payments run in mock mode and the OTP code
//! is fixed to [`OTP_CODE`].
//!
//! ```bash
//! cargo test -p nexx-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use nexx_api::db::ProductRepository;
use nexx_api::middleware::session::SESSION_COOKIE_NAME;
use nexx_api::models::{NewProduct, Product, UserDetails};
use nexx_api::services::auth::{AuthService, Registration};
use nexx_api::{ApiConfig, AppState, build_router};
use nexx_core::{Email, UserRole, UserType};

/// SMS code every test app accepts.
pub const OTP_CODE: &str = "4821";

/// Password of accounts created with [`TestApp::create_staff`].
pub const STAFF_PASSWORD: &str = "Zapchasti-2024!";

/// A running application over its own data directory.
pub struct TestApp {
    router: Router,
    state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ApiConfig::for_data_dir(dir.path().join("data"));
        config.otp.fixed_code = Some(SecretString::from(OTP_CODE));

        let state = AppState::new(config).await.unwrap();
        Self {
            router: build_router(state.clone()),
            state,
            _dir: dir,
        }
    }

    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// A client with an empty cookie jar.
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// Insert a catalog product directly into the store.
    pub async fn create_product(&self, name: &str, price: i64, stock: u32) -> Product {
        ProductRepository::new(self.state.db())
            .create(NewProduct {
                name: name.to_owned(),
                description: None,
                part_number: format!("{price}/{stock}"),
                brand: "JCB".to_owned(),
                category: "Гидравлика".to_owned(),
                price: Decimal::new(price, 0),
                image_url: None,
                slug: None,
                stock_quantity: stock,
            })
            .await
            .unwrap()
    }

    /// Create a password account with the given role.
    pub async fn create_staff(&self, username: &str, role: UserRole) {
        AuthService::new(self.state.db())
            .register(Registration {
                username: username.to_owned(),
                email: Some(Email::parse(&format!("{username}@nexx.ru")).unwrap()),
                password: Some(STAFF_PASSWORD.to_owned()),
                phone: None,
                name: username.to_owned(),
                user_type: UserType::Retail,
                role,
                details: UserDetails::default(),
                address: None,
                active: true,
            })
            .await
            .unwrap();
    }

    /// A client logged in as a freshly created account with `role`.
    pub async fn staff_client(&self, username: &str, role: UserRole) -> TestClient {
        self.create_staff(username, role).await;
        let mut client = self.client();
        let resp = client
            .post(
                "/api/auth/login",
                &serde_json::json!({ "username": username, "password": STAFF_PASSWORD }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login failed: {}", resp.text());
        client
    }

    /// A client registered and logged in as a retail customer.
    ///
    /// Returns the client and the new account's id.
    pub async fn customer_client(&self, username: &str) -> (TestClient, String) {
        let mut client = self.client();
        let resp = client
            .post(
                "/api/auth/register",
                &serde_json::json!({
                    "username": username,
                    "email": format!("{username}@mail.ru"),
                    "password": "Traktor-3CX-2024",
                    "name": "Иван Петров",
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "register failed: {}", resp.text());
        let id = resp.json()["user"]["id"].as_str().unwrap().to_owned();
        (client, id)
    }
}

/// In-process HTTP client that keeps the session cookie between requests.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub const fn is_logged_in(&self) -> bool {
        self.cookie.is_some()
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    /// Send a request with a raw body and extra headers.
    pub async fn send_raw(
        &mut self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: impl Into<Body>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(body.into()).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();

        self.store_cookie(&headers);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn send(&mut self, method: Method, uri: &str, body: Option<&Value>) -> TestResponse {
        match body {
            Some(json) => {
                self.send_raw(
                    method,
                    uri,
                    &[("content-type", "application/json")],
                    json.to_string(),
                )
                .await
            }
            None => self.send_raw(method, uri, &[], Body::empty()).await,
        }
    }

    fn store_cookie(&mut self, headers: &HeaderMap) {
        let prefix = format!("{SESSION_COOKIE_NAME}=");
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let Some(pair) = value.split(';').next().filter(|p| p.starts_with(&prefix)) else {
                continue;
            };
            let removed = pair.len() == prefix.len() || value.contains("Max-Age=0");
            self.cookie = if removed { None } else { Some(pair.to_owned()) };
        }
    }
}

/// A buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("invalid JSON ({e}): {}", self.text()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

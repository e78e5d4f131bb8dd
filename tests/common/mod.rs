#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use steel_erp_api::{
    app_router,
    auth::{roles, AuthUser},
    config::AppConfig,
    db::{self, DbConfig},
    entities::societe,
    services::societes::CreateSocieteRequest,
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "k8Vq2mZr9XwT4bLp7NcY1dHs6FgJ3uAe0RiOkWqEzMxCvBnTyUaSdFgHjKlPoIuY";

/// Full application over an in-memory SQLite database with one seeded société.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub societe: societe::Model,
    admin_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "redis://127.0.0.1:6379".to_string(),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.csrf.secret = Some("csrf-test-master-secret".to_string());

        // a single connection keeps every query on the same in-memory database
        let pool = db::establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("failed to open in-memory database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(pool, cfg).await;

        let societe = state
            .services
            .societes
            .create(
                CreateSocieteRequest {
                    code: "ACIER".to_string(),
                    nom: "Aciers de Test".to_string(),
                    siret: Some("12345678901234".to_string()),
                    database_name: None,
                    configuration: None,
                },
                None,
            )
            .await
            .expect("seed société");

        let admin = AuthUser {
            user_id: Uuid::new_v4().to_string(),
            name: Some("Test Admin".to_string()),
            email: Some("admin@example.com".to_string()),
            roles: vec![roles::ADMIN.to_string()],
            permissions: vec![],
            societe_id: Some(societe.id),
            site_id: None,
            token_id: Uuid::new_v4().to_string(),
        };
        let admin_token = state.auth.issue_token(&admin).expect("sign admin token");

        Self {
            router: app_router(state.clone()),
            state,
            societe,
            admin_token,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Token for a plain user of the seeded société
    pub fn user_token(&self, roles: &[&str], permissions: &[&str]) -> String {
        let user = AuthUser {
            user_id: Uuid::new_v4().to_string(),
            name: Some("Test User".to_string()),
            email: Some("user@example.com".to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            societe_id: Some(self.societe.id),
            site_id: None,
            token_id: Uuid::new_v4().to_string(),
        };
        self.state.auth.issue_token(&user).expect("sign user token")
    }

    /// Fetches a fresh CSRF token; each one is valid for a single unsafe request.
    pub async fn csrf_token(&self) -> String {
        let response = self.raw(Method::GET, "/api/csrf/token", None, &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        body["token"]
            .as_str()
            .expect("token in CSRF response")
            .to_string()
    }

    /// Sends a request as `token`; unsafe methods get a fresh CSRF token attached.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut headers: Vec<(String, String)> = Vec::new();
        if let Some(token) = token {
            headers.push((header::AUTHORIZATION.to_string(), format!("Bearer {}", token)));
        }
        if !matches!(method, Method::GET | Method::HEAD | Method::OPTIONS) {
            let csrf = self.csrf_token().await;
            let cookie_name = self.state.csrf.config().token_cookie_name.clone();
            headers.push((header::COOKIE.to_string(), format!("{}={}", cookie_name, csrf)));
            headers.push(("x-csrf-token".to_string(), csrf));
        }
        let headers: Vec<(&str, &str)> = headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        self.raw(method, uri, body, &headers).await
    }

    /// Sends as the seeded admin
    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.send(method, uri, body, Some(self.admin_token())).await
    }

    /// Sends exactly what it is given, without CSRF help
    pub async fn raw(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

/// `data` of an `ApiResponse` envelope, asserting the expected status first
pub async fn data_of(response: Response, expected: StatusCode) -> Value {
    let status = response.status();
    let body = body_json(response).await;
    assert_eq!(status, expected, "unexpected status, body: {}", body);
    body["data"].clone()
}

//! Steel ERP API Library
//!
//! Multi-tenant backend of the steel fabrication ERP: shared catalog, articles,
//! rule-based pricing, per-role menus and the administration endpoints around them.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod cache;
pub mod config;
pub mod csrf;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod pricing;
pub mod services;
pub mod tracing;
pub mod tree;

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Extension, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthConfig, AuthService};
use crate::cache::{CacheBackend, CacheFactory};
use crate::csrf::{csrf_middleware, CsrfConfig, CsrfService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
    pub csrf: CsrfService,
    pub cache: Arc<dyn CacheBackend>,
}

impl AppState {
    /// Wires every service on top of an established connection
    pub async fn new(db: DatabaseConnection, config: config::AppConfig) -> Self {
        let db = Arc::new(db);
        let cache = CacheFactory::create_cache(&config.cache, &config.redis_url).await;
        let services = handlers::AppServices::new(db.clone(), cache.clone(), &config);
        let auth = Arc::new(AuthService::new(AuthConfig::from_app_config(&config)));
        let csrf = CsrfService::new(CsrfConfig::from_app_config(&config));

        Self {
            db,
            config,
            services,
            auth,
            csrf,
            cache,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Every business route, mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/csrf", handlers::csrf::csrf_routes())
        .nest("/shared", handlers::catalog::shared_catalog_routes())
        .nest("/articles", handlers::articles::article_routes())
        .nest("/pricing", handlers::pricing::pricing_routes())
        .nest("/price-rules", handlers::price_rules::price_rule_routes())
        .nest("/menu", handlers::menu::user_menu_routes())
        .nest("/admin/menus", handlers::menu::menu_admin_routes())
        .nest("/admin/societes", handlers::societes::societe_routes())
        .nest("/admin/database", handlers::admin_database::database_admin_routes())
}

/// Full application router with the cross-cutting layers, ready to serve.
///
/// Layers run outside-in: request id, tracing, security headers, auth service
/// injection, then CSRF validation.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(axum::middleware::from_fn_with_state(
            state.csrf.clone(),
            csrf_middleware,
        ))
        .layer(Extension(state.auth.clone()))
        .layer(axum::middleware::from_fn(
            middleware_helpers::security_headers_middleware,
        ))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };
    let status = if database == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": database,
            "service": "steel-erp-api",
            "version": env!("CARGO_PKG_VERSION"),
            "checks": { "database": database },
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

use crate::auth::SOCIETE_HEADER;
use crate::config::AppConfig;
use crate::csrf::ALTERNATE_HEADER;
use crate::middleware_helpers::REQUEST_ID_HEADER;
use http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use tower_http::cors::CorsLayer;
use tracing::info;

const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Headers browsers may send cross-origin. Listed explicitly: tower-http
/// refuses wildcards once credentials are allowed.
fn allowed_headers(cfg: &AppConfig) -> Vec<HeaderName> {
    let mut headers = vec![
        CONTENT_TYPE,
        AUTHORIZATION,
        ACCEPT,
        HeaderName::from_static(ALTERNATE_HEADER),
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderName::from_static(SOCIETE_HEADER),
    ];
    if let Ok(csrf_header) = HeaderName::from_bytes(cfg.csrf.header_name.as_bytes()) {
        if !headers.contains(&csrf_header) {
            headers.push(csrf_header);
        }
    }
    headers
}

fn configured_origins(cfg: &AppConfig) -> Vec<HeaderValue> {
    cfg.cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect()
}

/// CORS policy for the configured origins, permissive when the environment
/// allows it. `None` when origins are required but missing.
pub fn cors_layer(cfg: &AppConfig) -> Option<CorsLayer> {
    let origins = configured_origins(cfg);
    if !origins.is_empty() {
        let mut exposed = allowed_headers(cfg);
        exposed.retain(|name| *name != AUTHORIZATION && *name != ACCEPT && *name != CONTENT_TYPE);
        return Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(ALLOWED_METHODS.to_vec())
                .allow_headers(allowed_headers(cfg))
                .expose_headers(exposed)
                .allow_credentials(cfg.cors_allow_credentials),
        );
    }

    if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        return Some(CorsLayer::permissive());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::post, Router};
    use http::Request;
    use tower::ServiceExt;

    fn production_config() -> AppConfig {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "redis://127.0.0.1:6379".into(),
            "secret".into(),
            3600,
            "0.0.0.0".into(),
            8080,
            "production".into(),
        );
        cfg.cors_allowed_origins = Some("https://erp.example.com, https://admin.example.com".into());
        cfg.cors_allow_credentials = true;
        cfg
    }

    fn app(layer: CorsLayer) -> Router {
        Router::new()
            .route("/api/shared/materials", post(|| async { "ok" }))
            .layer(layer)
    }

    #[tokio::test]
    async fn credentialed_preflight_lists_headers_and_methods() {
        let cfg = production_config();
        let response = app(cors_layer(&cfg).unwrap())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/shared/materials")
                    .header("origin", "https://erp.example.com")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "x-csrf-token, content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "https://erp.example.com"
        );
        assert_eq!(
            headers.get("access-control-allow-credentials").unwrap(),
            "true"
        );
        let allowed = headers
            .get("access-control-allow-headers")
            .unwrap()
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(allowed.contains("x-csrf-token"));
        assert!(!allowed.contains('*'));
        let methods = headers
            .get("access-control-allow-methods")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("DELETE"));
        assert!(!methods.contains('*'));
    }

    #[tokio::test]
    async fn unknown_origins_get_no_grant() {
        let response = app(cors_layer(&production_config()).unwrap())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/shared/materials")
                    .header("origin", "https://evil.example.net")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(!response
            .headers()
            .contains_key("access-control-allow-origin"));
    }

    #[test]
    fn missing_origins_outside_development_yield_nothing() {
        let mut cfg = production_config();
        cfg.cors_allowed_origins = None;
        assert!(cors_layer(&cfg).is_none());

        cfg.cors_allow_any_origin = true;
        assert!(cors_layer(&cfg).is_some());
    }
}

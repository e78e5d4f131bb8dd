use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Swagger UI serves its own scripts and styles, so it gets no CSP.
const DOCS_PREFIXES: [&str; 2] = ["/swagger-ui", "/api-docs"];

/// Adds browser hardening headers to every API response.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let is_docs = DOCS_PREFIXES
        .iter()
        .any(|prefix| req.uri().path().starts_with(prefix));

    let mut res = next.run(req).await;
    let headers = res.headers_mut();

    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        HeaderName::from_static("strict-transport-security"),
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    if !is_docs {
        headers.insert(
            HeaderName::from_static("content-security-policy"),
            HeaderValue::from_static(
                "default-src 'none'; frame-ancestors 'none'; form-action 'none'; base-uri 'none'",
            ),
        );
    }

    headers.insert(
        HeaderName::from_static("x-permitted-cross-domain-policies"),
        HeaderValue::from_static("none"),
    );

    // CSRF tokens and tenant data must never land in shared caches
    if !headers.contains_key("cache-control") {
        headers.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, private"),
        );
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "ok"
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(test_handler))
            .route("/swagger-ui/index.html", get(test_handler))
            .layer(axum::middleware::from_fn(security_headers_middleware))
    }

    async fn get_headers(uri: &str) -> axum::http::HeaderMap {
        app()
            .oneshot(
                axum::http::Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .headers()
            .clone()
    }

    #[tokio::test]
    async fn security_headers_are_set() {
        let headers = get_headers("/").await;

        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert!(headers.contains_key("content-security-policy"));
        assert_eq!(headers.get("cache-control").unwrap(), "no-store, private");
    }

    #[tokio::test]
    async fn docs_are_served_without_csp() {
        let headers = get_headers("/swagger-ui/index.html").await;

        assert!(!headers.contains_key("content-security-policy"));
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    }
}

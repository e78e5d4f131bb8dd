use crate::{
    csrf::{CsrfStats, EXCLUDED_PATHS, PROTECTED_METHODS},
    errors::ServiceError,
    AppState,
};
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use tracing::debug;
use utoipa::ToSchema;

pub const TOKEN_RESPONSE_HEADER: &str = "x-csrf-token";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub token: String,
    pub header_name: String,
    pub cookie_name: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrfConfigResponse {
    pub header_name: String,
    pub cookie_name: String,
    pub token_cookie_name: String,
    pub token_ttl_seconds: u64,
    pub protected_methods: Vec<String>,
    pub excluded_paths: Vec<String>,
    pub stats: CsrfStats,
}

#[utoipa::path(
    get,
    path = "/api/csrf/token",
    tag = "CSRF",
    summary = "Issue a CSRF token",
    description = "Sets the secret cookie and the JS-readable token cookie, and echoes the token \
                   in the X-CSRF-Token header. Send it back in that header on unsafe requests.",
    responses(
        (status = 200, description = "Fresh token", body = CsrfTokenResponse,
            headers(("X-CSRF-Token" = String, description = "Issued token"))
        ),
    )
)]
pub async fn issue_token(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, HeaderMap, Json<CsrfTokenResponse>), ServiceError> {
    let csrf = &state.csrf;
    let config = csrf.config();
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());
    let session_id = csrf.session_id(&headers, peer);
    let pair = csrf.generate_tokens(&session_id)?;

    let secret_cookie = Cookie::build((config.cookie_name.clone(), pair.secret))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.production)
        .path("/")
        .build();
    let token_cookie = Cookie::build((config.token_cookie_name.clone(), pair.token.clone()))
        .http_only(false)
        .same_site(SameSite::Strict)
        .secure(config.production)
        .path("/")
        .build();

    let mut response_headers = HeaderMap::new();
    let token_header = HeaderValue::from_str(&pair.token)
        .map_err(|e| ServiceError::InternalError(format!("CSRF token is not a valid header: {}", e)))?;
    response_headers.insert(HeaderName::from_static(TOKEN_RESPONSE_HEADER), token_header);

    debug!("CSRF token issued");
    Ok((
        jar.add(secret_cookie).add(token_cookie),
        response_headers,
        Json(CsrfTokenResponse {
            token: pair.token,
            header_name: config.header_name.clone(),
            cookie_name: config.token_cookie_name.clone(),
            expires_at: pair.expires_at,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/csrf/config",
    tag = "CSRF",
    summary = "CSRF settings for clients",
    responses(
        (status = 200, description = "Names, lifetimes and protection rules", body = CsrfConfigResponse),
    )
)]
pub async fn csrf_config(State(state): State<AppState>) -> Json<CsrfConfigResponse> {
    let config = state.csrf.config();
    Json(CsrfConfigResponse {
        header_name: config.header_name.clone(),
        cookie_name: config.cookie_name.clone(),
        token_cookie_name: config.token_cookie_name.clone(),
        token_ttl_seconds: config.token_ttl.as_secs(),
        protected_methods: PROTECTED_METHODS.iter().map(|m| m.to_string()).collect(),
        excluded_paths: EXCLUDED_PATHS.iter().map(|p| p.to_string()).collect(),
        stats: state.csrf.stats(),
    })
}

pub fn csrf_routes() -> Router<AppState> {
    Router::new()
        .route("/token", get(issue_token))
        .route("/config", get(csrf_config))
}

/*!
 * # Authentication and Authorization Module
 *
 * Bearer JWTs (HS256) identify the caller, its roles and permissions, and the
 * société (tenant) it works for. Routers opt into checks through
 * [`AuthRouterExt`]; handlers read the caller through the [`AuthUser`] and
 * [`TenantContext`] extractors.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

mod permissions;
mod tenant;

pub use permissions::*;
pub use tenant::{TenantContext, SOCIETE_HEADER};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Société the token was issued for
    #[serde(default)]
    pub societe_id: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub societe_id: Option<Uuid>,
    pub site_id: Option<Uuid>,
    pub token_id: String,
}

impl AuthUser {
    /// Role names are compared case-insensitively
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.has_role(role.as_ref()))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|granted| permission_matches(granted, permission))
    }

    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions
            .iter()
            .any(|permission| self.has_permission(permission.as_ref()))
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(roles::SUPER_ADMIN)
    }

    /// Admins and super admins bypass permission checks
    pub fn is_admin(&self) -> bool {
        self.has_role(roles::ADMIN) || self.is_super_admin()
    }

    /// Parsed user id, when the subject is a UUID
    pub fn user_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.user_id).ok()
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let parse = |value: Option<String>| -> Result<Option<Uuid>, AuthError> {
            value
                .filter(|v| !v.is_empty())
                .map(|v| Uuid::parse_str(&v).map_err(|_| AuthError::InvalidToken))
                .transpose()
        };

        Ok(Self {
            societe_id: parse(claims.societe_id)?,
            site_id: parse(claims.site_id)?,
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            roles: claims.roles,
            permissions: claims.permissions,
            token_id: claims.jti,
        })
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
        }
    }

    pub fn from_app_config(config: &crate::config::AppConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.auth_audience.clone(),
            config.auth_issuer.clone(),
            Duration::from_secs(config.jwt_expiration as u64),
        )
    }
}

/// Issues and validates access tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Sign an access token for the given identity
    pub fn issue_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            roles: user.roles.clone(),
            permissions: user.permissions.clone(),
            societe_id: user.societe_id.map(|id| id.to_string()),
            site_id: user.site_id.map(|id| id.to_string()),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => {
                debug!(error = %e, "rejected bearer token");
                AuthError::InvalidToken
            }
        })
    }

    /// Resolve the caller from request headers
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingAuth)?;
        let claims = self.validate_token(token)?;
        AuthUser::try_from(claims)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                "Token creation failed".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
                "request_id": crate::tracing::current_request_id().map(|id| id.0),
            }
        }));

        (status, body).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Permission middleware to check if a user has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.is_admin() && !user.has_permission(&required_permission) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Role middleware; super admins satisfy every role requirement
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.is_super_admin() && !user.has_role(&required_role) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("authentication service not available".into())
                .into_response();
        }
    };

    match auth_service.authenticate(request.headers()) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::{body::Body, routing::get, Router};
    use tower::ServiceExt;

    const SECRET: &str = "k8Vq2mZr9XwT4bLp7NcY1dHs6FgJ3uAe0RiOkWqEzMxCvBnTyUaSdFgHjKlPoIuY";

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            SECRET.into(),
            "steel-erp-api".into(),
            "steel-erp-auth".into(),
            Duration::from_secs(600),
        ))
    }

    fn user(roles: &[&str], permissions: &[&str]) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4().to_string(),
            name: Some("Camille".into()),
            email: Some("camille@example.com".into()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            societe_id: Some(Uuid::new_v4()),
            site_id: None,
            token_id: String::new(),
        }
    }

    #[test]
    fn issued_token_round_trips_identity() {
        let svc = service();
        let original = user(&["USER"], &[consts::PRICING_READ]);
        let token = svc.issue_token(&original).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        let resolved = svc.authenticate(&headers).unwrap();

        assert_eq!(resolved.user_id, original.user_id);
        assert_eq!(resolved.societe_id, original.societe_id);
        assert!(resolved.has_permission(consts::PRICING_READ));
    }

    #[test]
    fn token_for_another_audience_is_rejected() {
        let token = service().issue_token(&user(&[], &[])).unwrap();
        let other = AuthService::new(AuthConfig::new(
            SECRET.into(),
            "someone-else".into(),
            "steel-erp-auth".into(),
            Duration::from_secs(600),
        ));
        assert_matches!(other.validate_token(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn missing_header_is_missing_auth() {
        assert_matches!(
            service().authenticate(&HeaderMap::new()),
            Err(AuthError::MissingAuth)
        );
    }

    #[test]
    fn admin_roles_are_case_insensitive() {
        assert!(user(&["admin"], &[]).is_admin());
        assert!(user(&["SUPER_ADMIN"], &[]).is_admin());
        assert!(!user(&["USER"], &[]).is_admin());
    }

    async fn ok() -> &'static str {
        "ok"
    }

    async fn call(router: Router, caller: Option<AuthUser>) -> StatusCode {
        let svc = Arc::new(service());
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(caller) = caller {
            let token = svc.issue_token(&caller).unwrap();
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request.extensions_mut().insert(svc);
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn permission_gate_enforces_grants() {
        let router = || {
            Router::new()
                .route("/", get(ok))
                .with_permission(consts::MENU_MANAGE)
        };

        assert_eq!(call(router(), None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            call(router(), Some(user(&["USER"], &[consts::MENU_READ]))).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            call(router(), Some(user(&["USER"], &["menu:*"]))).await,
            StatusCode::OK
        );
        assert_eq!(
            call(router(), Some(user(&["ADMIN"], &[]))).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn role_gate_lets_super_admin_through() {
        let router = || Router::new().route("/", get(ok)).with_role(roles::ADMIN);

        assert_eq!(
            call(router(), Some(user(&["USER"], &[]))).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            call(router(), Some(user(&["SUPER_ADMIN"], &[]))).await,
            StatusCode::OK
        );
    }
}

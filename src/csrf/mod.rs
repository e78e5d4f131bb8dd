//! Double-submit-cookie CSRF protection.
//!
//! A token is an HMAC over `session:timestamp:secret` keyed by the master
//! secret. Only the SHA-256 of each issued token is kept, per session, and a
//! token is consumed by the first request that validates it. The browser
//! echoes the token in a header while the same value travels back in the
//! readable token cookie; both must agree.

pub mod middleware;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use axum::http::{header, HeaderMap, Method};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use metrics::counter;
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;
use utoipa::ToSchema;

pub use middleware::csrf_middleware;

type HmacSha256 = Hmac<Sha256>;

static TOKEN_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{32,}$").unwrap());

/// Alternate header accepted next to the configured one
pub const ALTERNATE_HEADER: &str = "x-xsrf-token";
/// Query parameter fallback for clients that cannot set headers
pub const QUERY_PARAM: &str = "_csrf";
/// Cookie carrying an explicit session identifier
pub const SESSION_COOKIE: &str = "sessionId";

pub const SAFE_METHODS: [Method; 3] = [Method::GET, Method::HEAD, Method::OPTIONS];
pub const PROTECTED_METHODS: [&str; 4] = ["POST", "PUT", "PATCH", "DELETE"];
pub const EXCLUDED_PATHS: [&str; 7] = [
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/forgot-password",
    "/api/webhooks/",
    "/api/health",
    "/api/metrics",
    "/health",
];

/// Runtime CSRF settings derived from [`AppConfig`]
#[derive(Clone)]
pub struct CsrfConfig {
    pub enabled: bool,
    master_secret: String,
    pub cookie_name: String,
    pub token_cookie_name: String,
    pub header_name: String,
    pub token_ttl: Duration,
    pub max_tokens_per_session: usize,
    pub cleanup_interval: Duration,
    pub allowed_hosts: Vec<String>,
    pub production: bool,
}

impl std::fmt::Debug for CsrfConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfConfig")
            .field("enabled", &self.enabled)
            .field("cookie_name", &self.cookie_name)
            .field("header_name", &self.header_name)
            .field("token_ttl", &self.token_ttl)
            .field("max_tokens_per_session", &self.max_tokens_per_session)
            .field("allowed_hosts", &self.allowed_hosts)
            .field("production", &self.production)
            .finish_non_exhaustive()
    }
}

impl CsrfConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let settings = &config.csrf;
        let master_secret = match settings.secret.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret.to_string(),
            None => {
                warn!("CSRF secret not configured; generated an ephemeral one. Set APP__CSRF__SECRET for production.");
                let mut bytes = [0u8; 64];
                rand::thread_rng().fill_bytes(&mut bytes);
                base64::engine::general_purpose::STANDARD.encode(bytes)
            }
        };

        let allowed_hosts = settings
            .frontend_url
            .iter()
            .cloned()
            .chain(settings.allowed_origins())
            .filter_map(|entry| normalize_host(&entry))
            .collect();

        Self {
            enabled: settings.enabled,
            master_secret,
            cookie_name: settings.cookie_name.clone(),
            token_cookie_name: format!("{}-token", settings.cookie_name),
            header_name: settings.header_name.to_ascii_lowercase(),
            token_ttl: settings.token_ttl(),
            max_tokens_per_session: settings.max_tokens_per_session,
            cleanup_interval: settings.cleanup_interval(),
            allowed_hosts,
            production: config.is_production(),
        }
    }
}

/// `host[:port]` of an origin entry; bare hosts are accepted as-is.
fn normalize_host(entry: &str) -> Option<String> {
    let entry = entry.trim().trim_end_matches('/');
    if entry.is_empty() {
        return None;
    }
    if entry.contains("://") {
        Url::parse(entry).ok().and_then(|url| url_authority(&url))
    } else {
        Some(entry.to_ascii_lowercase())
    }
}

fn url_authority(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Freshly issued secret/token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub secret: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Why a request failed validation, in check order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfRejection {
    MissingToken,
    InvalidFormat,
    InvalidOrigin,
    InvalidReferer,
    InvalidToken,
    DoubleSubmitFailure,
}

impl CsrfRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::InvalidOrigin => "INVALID_ORIGIN",
            Self::InvalidReferer => "INVALID_REFERER",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::DoubleSubmitFailure => "DOUBLE_SUBMIT_FAILURE",
        }
    }
}

impl From<CsrfRejection> for ServiceError {
    fn from(rejection: CsrfRejection) -> Self {
        match rejection {
            CsrfRejection::MissingToken => ServiceError::csrf_missing(),
            other => ServiceError::csrf_invalid(other.as_str()),
        }
    }
}

/// Request data needed to validate a token
#[derive(Debug, Clone, Copy)]
pub struct CsrfCheck<'a> {
    pub session_id: &'a str,
    pub headers: &'a HeaderMap,
    pub query: Option<&'a str>,
}

#[derive(Debug)]
struct StoredToken {
    hash: String,
    expires_at: Instant,
}

#[derive(Debug)]
struct SessionTokens {
    tokens: VecDeque<StoredToken>,
    last_activity: Instant,
}

impl SessionTokens {
    fn drop_expired(&mut self, now: Instant) {
        self.tokens.retain(|token| token.expires_at > now);
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrfStatsConfiguration {
    pub cookie_name: String,
    pub header_name: String,
    pub token_ttl_seconds: u64,
    pub max_tokens_per_session: usize,
    pub is_production: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrfStats {
    pub active_sessions: usize,
    pub total_tokens: usize,
    pub configuration: CsrfStatsConfiguration,
}

/// Issues and validates CSRF tokens; cheap to clone
#[derive(Debug, Clone)]
pub struct CsrfService {
    config: Arc<CsrfConfig>,
    sessions: Arc<DashMap<String, SessionTokens>>,
}

impl CsrfService {
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Creates a pair bound to `session_id` and remembers its hash.
    pub fn generate_tokens(&self, session_id: &str) -> Result<TokenPair, ServiceError> {
        let mut secret_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret_bytes);
        let secret = URL_SAFE_NO_PAD.encode(secret_bytes);

        let timestamp = Utc::now().timestamp_millis();
        let token = self.sign(&format!("{}:{}:{}", session_id, timestamp, secret))?;
        self.store(session_id, hash_token(&token));

        counter!("csrf.tokens.issued", 1);
        debug!(session = %short(session_id), "issued CSRF token");

        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.config.token_ttl)
                .unwrap_or_else(|_| chrono::Duration::hours(1));

        Ok(TokenPair {
            secret,
            token,
            expires_at,
        })
    }

    /// Runs every check in order and consumes the token on success.
    pub fn validate(&self, check: CsrfCheck<'_>) -> Result<(), CsrfRejection> {
        let result = self.run_checks(check);
        match &result {
            Ok(()) => counter!("csrf.validations.accepted", 1),
            Err(rejection) => {
                counter!("csrf.validations.rejected", 1, "reason" => rejection.as_str());
                warn!(
                    reason = rejection.as_str(),
                    session = %short(check.session_id),
                    "CSRF validation failed"
                );
            }
        }
        result
    }

    fn run_checks(&self, check: CsrfCheck<'_>) -> Result<(), CsrfRejection> {
        let token = self
            .extract_token(check.headers, check.query)
            .ok_or(CsrfRejection::MissingToken)?;

        if !TOKEN_FORMAT.is_match(&token) {
            return Err(CsrfRejection::InvalidFormat);
        }

        let request_host = header_str(check.headers, header::HOST.as_str());

        if !self.origin_allowed(header_str(check.headers, header::ORIGIN.as_str()), request_host) {
            return Err(CsrfRejection::InvalidOrigin);
        }

        if !self.referer_allowed(header_str(check.headers, header::REFERER.as_str()), request_host)
        {
            return Err(CsrfRejection::InvalidReferer);
        }

        let token_hash = hash_token(&token);
        if !self.is_known(check.session_id, &token_hash) {
            return Err(CsrfRejection::InvalidToken);
        }

        let cookie_token = CookieJar::from_headers(check.headers)
            .get(&self.config.token_cookie_name)
            .map(|cookie| cookie.value().to_string());
        if cookie_token.as_deref() != Some(token.as_str()) {
            return Err(CsrfRejection::DoubleSubmitFailure);
        }

        self.consume(check.session_id, &token_hash);
        Ok(())
    }

    /// Unsafe methods outside the public allow-list need a token.
    pub fn should_protect(&self, method: &Method, path: &str) -> bool {
        if SAFE_METHODS.contains(method) {
            return false;
        }
        let path = path.to_ascii_lowercase();
        !EXCLUDED_PATHS.iter().any(|route| path.starts_with(route))
    }

    /// `sessionId` cookie when present, else a fingerprint of the client.
    pub fn session_id(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> String {
        if let Some(cookie) = CookieJar::from_headers(headers).get(SESSION_COOKIE) {
            if !cookie.value().is_empty() {
                return cookie.value().to_string();
            }
        }

        let ip = header_str(headers, "x-forwarded-for")
            .and_then(|raw| raw.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .or_else(|| peer.map(|ip| ip.to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        let user_agent = header_str(headers, header::USER_AGENT.as_str()).unwrap_or("");

        hash_token(&format!(
            "{}:{}:{}",
            ip, user_agent, self.config.master_secret
        ))
    }

    /// Drops expired tokens, then sessions left empty and idle for longer
    /// than the token TTL. Returns how many sessions went.
    pub fn cleanup_expired(&self) -> usize {
        let ttl = self.config.token_ttl;
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| {
            session.drop_expired(now);
            !session.tokens.is_empty() || session.last_activity.elapsed() <= ttl
        });
        let cleaned = before.saturating_sub(self.sessions.len());
        if cleaned > 0 {
            debug!(cleaned, "removed expired CSRF sessions");
        }
        cleaned
    }

    /// Periodic cleanup on the configured interval
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.config.cleanup_interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                service.cleanup_expired();
            }
        })
    }

    pub fn stats(&self) -> CsrfStats {
        CsrfStats {
            active_sessions: self.sessions.len(),
            total_tokens: self
                .sessions
                .iter()
                .map(|entry| entry.value().tokens.len())
                .sum(),
            configuration: CsrfStatsConfiguration {
                cookie_name: self.config.cookie_name.clone(),
                header_name: self.config.header_name.clone(),
                token_ttl_seconds: self.config.token_ttl.as_secs(),
                max_tokens_per_session: self.config.max_tokens_per_session,
                is_production: self.config.production,
            },
        }
    }

    fn sign(&self, data: &str) -> Result<String, ServiceError> {
        let mut mac = HmacSha256::new_from_slice(self.config.master_secret.as_bytes())
            .map_err(|e| ServiceError::InternalError(format!("CSRF key rejected: {}", e)))?;
        mac.update(data.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    fn extract_token(&self, headers: &HeaderMap, query: Option<&str>) -> Option<String> {
        header_str(headers, &self.config.header_name)
            .or_else(|| header_str(headers, ALTERNATE_HEADER))
            .map(str::to_string)
            .or_else(|| {
                query.and_then(|q| {
                    url::form_urlencoded::parse(q.as_bytes())
                        .find(|(key, _)| key == QUERY_PARAM)
                        .map(|(_, value)| value.into_owned())
                })
            })
            .filter(|token| !token.is_empty())
    }

    fn host_allowed(&self, host: &str, request_host: Option<&str>) -> bool {
        request_host
            .map(str::to_ascii_lowercase)
            .iter()
            .chain(self.config.allowed_hosts.iter())
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    fn origin_allowed(&self, origin: Option<&str>, request_host: Option<&str>) -> bool {
        match origin {
            None => !self.config.production,
            Some(origin) => Url::parse(origin)
                .ok()
                .and_then(|url| url_authority(&url))
                .map(|host| self.host_allowed(&host, request_host))
                .unwrap_or(false),
        }
    }

    fn referer_allowed(&self, referer: Option<&str>, request_host: Option<&str>) -> bool {
        match referer {
            None => !self.config.production,
            Some(referer) => Url::parse(referer)
                .ok()
                .and_then(|url| url_authority(&url))
                .map(|host| self.host_allowed(&host, request_host))
                .unwrap_or(false),
        }
    }

    fn store(&self, session_id: &str, token_hash: String) {
        let mut session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionTokens {
                tokens: VecDeque::new(),
                last_activity: Instant::now(),
            });

        let now = Instant::now();
        session.drop_expired(now);
        while session.tokens.len() >= self.config.max_tokens_per_session.max(1) {
            session.tokens.pop_front();
        }
        session.tokens.push_back(StoredToken {
            hash: token_hash,
            expires_at: now + self.config.token_ttl,
        });
        session.last_activity = now;
    }

    /// Each token expires on its own deadline, however active its session is.
    fn is_known(&self, session_id: &str, token_hash: &str) -> bool {
        let Some(mut session) = self.sessions.get_mut(session_id) else {
            return false;
        };
        session.drop_expired(Instant::now());
        session.tokens.iter().any(|token| token.hash == token_hash)
    }

    fn consume(&self, session_id: &str, token_hash: &str) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.tokens.retain(|token| token.hash != token_hash);
            session.last_activity = Instant::now();
        }
    }
}

fn hash_token(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn short(session_id: &str) -> &str {
    session_id.get(..8).unwrap_or(session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    const JWT: &str = "k8Vq2mZr9XwT4bLp7NcY1dHs6FgJ3uAe0RiOkWqEzMxCvBnTyUaSdFgHjKlPoIuY";

    fn config(environment: &str) -> AppConfig {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "redis://127.0.0.1:6379".into(),
            JWT.into(),
            3600,
            "127.0.0.1".into(),
            8080,
            environment.into(),
        );
        cfg.csrf.secret = Some("unit-test-master-secret".into());
        cfg.csrf.frontend_url = Some("https://app.steel-erp.fr".into());
        cfg.csrf.allowed_origins = Some("partners.example.com".into());
        cfg
    }

    fn service(environment: &str) -> CsrfService {
        CsrfService::new(CsrfConfig::from_app_config(&config(environment)))
    }

    fn headers_with(token: &str, cookie_token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-csrf-token", HeaderValue::from_str(token).unwrap());
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("_csrf-token={}", cookie_token)).unwrap(),
        );
        headers.insert(header::HOST, HeaderValue::from_static("api.steel-erp.fr"));
        headers
    }

    fn check<'a>(session: &'a str, headers: &'a HeaderMap) -> CsrfCheck<'a> {
        CsrfCheck {
            session_id: session,
            headers,
            query: None,
        }
    }

    #[test]
    fn generated_tokens_are_distinct_and_well_formed() {
        let csrf = service("development");
        let a = csrf.generate_tokens("session-a").unwrap();
        let b = csrf.generate_tokens("session-a").unwrap();

        assert_ne!(a.token, b.token);
        assert_ne!(a.secret, b.secret);
        assert!(TOKEN_FORMAT.is_match(&a.token));
        assert!(a.expires_at > Utc::now());
    }

    #[test]
    fn token_validates_exactly_once() {
        let csrf = service("development");
        let pair = csrf.generate_tokens("s1").unwrap();
        let headers = headers_with(&pair.token, &pair.token);

        assert_eq!(csrf.validate(check("s1", &headers)), Ok(()));
        assert_eq!(
            csrf.validate(check("s1", &headers)),
            Err(CsrfRejection::InvalidToken)
        );
    }

    #[test]
    fn token_is_bound_to_its_session() {
        let csrf = service("development");
        let pair = csrf.generate_tokens("s1").unwrap();
        let headers = headers_with(&pair.token, &pair.token);

        assert_eq!(
            csrf.validate(check("s2", &headers)),
            Err(CsrfRejection::InvalidToken)
        );
    }

    #[test]
    fn missing_and_malformed_tokens_are_rejected() {
        let csrf = service("development");
        assert_eq!(
            csrf.validate(check("s1", &HeaderMap::new())),
            Err(CsrfRejection::MissingToken)
        );

        let headers = headers_with("short", "short");
        assert_eq!(
            csrf.validate(check("s1", &headers)),
            Err(CsrfRejection::InvalidFormat)
        );
    }

    #[test]
    fn cookie_mismatch_is_double_submit_failure() {
        let csrf = service("development");
        let pair = csrf.generate_tokens("s1").unwrap();
        let other = csrf.generate_tokens("s1").unwrap();
        let headers = headers_with(&pair.token, &other.token);

        assert_eq!(
            csrf.validate(check("s1", &headers)),
            Err(CsrfRejection::DoubleSubmitFailure)
        );
    }

    #[test]
    fn query_parameter_is_a_fallback() {
        let csrf = service("development");
        let pair = csrf.generate_tokens("s1").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("_csrf-token={}", pair.token)).unwrap(),
        );
        let query = format!("page=1&_csrf={}", pair.token);

        let result = csrf.validate(CsrfCheck {
            session_id: "s1",
            headers: &headers,
            query: Some(&query),
        });
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn oldest_token_is_evicted_past_the_session_limit() {
        let mut cfg = config("development");
        cfg.csrf.max_tokens_per_session = 2;
        let csrf = CsrfService::new(CsrfConfig::from_app_config(&cfg));

        let first = csrf.generate_tokens("s1").unwrap();
        csrf.generate_tokens("s1").unwrap();
        csrf.generate_tokens("s1").unwrap();

        assert_eq!(csrf.stats().total_tokens, 2);
        let headers = headers_with(&first.token, &first.token);
        assert_eq!(
            csrf.validate(check("s1", &headers)),
            Err(CsrfRejection::InvalidToken)
        );
    }

    #[rstest]
    #[case(None, false)]
    #[case(Some("https://api.steel-erp.fr"), true)]
    #[case(Some("https://app.steel-erp.fr"), true)]
    #[case(Some("https://eu.partners.example.com"), true)]
    #[case(Some("https://evil.example.net"), false)]
    #[case(Some("https://notsteel-erp.fr"), false)]
    #[case(Some("not a url"), false)]
    fn production_origin_policy(#[case] origin: Option<&str>, #[case] accepted: bool) {
        let csrf = service("production");
        assert_eq!(csrf.origin_allowed(origin, Some("api.steel-erp.fr")), accepted);
    }

    #[test]
    fn production_referer_must_match_an_allowed_host() {
        let csrf = service("production");
        let host = Some("api.steel-erp.fr");
        assert!(csrf.referer_allowed(Some("https://app.steel-erp.fr/admin/menus"), host));
        assert!(!csrf.referer_allowed(Some("https://evil.example.net/form"), host));
        assert!(!csrf.referer_allowed(None, host));
    }

    #[test]
    fn development_accepts_missing_origin_but_not_foreign_one() {
        let csrf = service("development");
        let pair = csrf.generate_tokens("s1").unwrap();
        let mut headers = headers_with(&pair.token, &pair.token);
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_static("https://evil.example.net"),
        );

        assert_eq!(
            csrf.validate(check("s1", &headers)),
            Err(CsrfRejection::InvalidOrigin)
        );
    }

    #[rstest]
    #[case(Method::GET, "/shared/materials", false)]
    #[case(Method::HEAD, "/shared/materials", false)]
    #[case(Method::OPTIONS, "/api/articles", false)]
    #[case(Method::POST, "/shared/materials", true)]
    #[case(Method::PUT, "/api/articles/1", true)]
    #[case(Method::PATCH, "/api/pricing/rules/1", true)]
    #[case(Method::DELETE, "/shared/suppliers/1", true)]
    #[case(Method::POST, "/api/auth/login", false)]
    #[case(Method::POST, "/API/Webhooks/stripe", false)]
    #[case(Method::POST, "/health", false)]
    fn protection_classification(
        #[case] method: Method,
        #[case] path: &str,
        #[case] protected: bool,
    ) {
        assert_eq!(service("development").should_protect(&method, path), protected);
    }

    #[test]
    fn session_id_prefers_cookie_then_fingerprint() {
        let csrf = service("development");

        let mut with_cookie = HeaderMap::new();
        with_cookie.insert(header::COOKIE, HeaderValue::from_static("sessionId=abc123"));
        assert_eq!(csrf.session_id(&with_cookie, None), "abc123");

        let mut forwarded = HeaderMap::new();
        forwarded.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        forwarded.insert(header::USER_AGENT, HeaderValue::from_static("curl/8"));
        let a = csrf.session_id(&forwarded, Some("127.0.0.1".parse().unwrap()));
        let b = csrf.session_id(&forwarded, None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other = csrf.session_id(&HeaderMap::new(), Some("10.0.0.1".parse().unwrap()));
        assert_ne!(a, other);
    }

    #[test]
    fn cleanup_drops_idle_sessions() {
        let mut cfg = config("development");
        cfg.csrf.token_ttl_secs = 1;
        let csrf = CsrfService::new(CsrfConfig::from_app_config(&cfg));
        csrf.generate_tokens("s1").unwrap();
        assert_eq!(csrf.cleanup_expired(), 0);

        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(csrf.cleanup_expired(), 1);
        assert_eq!(csrf.stats().active_sessions, 0);
    }

    #[test]
    fn tokens_expire_even_in_an_active_session() {
        let mut cfg = CsrfConfig::from_app_config(&config("development"));
        cfg.token_ttl = Duration::from_millis(50);
        let csrf = CsrfService::new(cfg);

        let stale = csrf.generate_tokens("s1").unwrap();
        std::thread::sleep(Duration::from_millis(80));
        // keeps the session busy past the first token's deadline
        let fresh = csrf.generate_tokens("s1").unwrap();

        let headers = headers_with(&stale.token, &stale.token);
        assert_eq!(
            csrf.validate(check("s1", &headers)),
            Err(CsrfRejection::InvalidToken)
        );
        let headers = headers_with(&fresh.token, &fresh.token);
        assert_eq!(csrf.validate(check("s1", &headers)), Ok(()));
        assert_eq!(csrf.stats().total_tokens, 0);
    }

    #[test]
    fn rejections_map_to_error_codes() {
        let missing: ServiceError = CsrfRejection::MissingToken.into();
        assert_eq!(missing.error_code(), Some(crate::errors::CSRF_TOKEN_MISSING));

        let invalid: ServiceError = CsrfRejection::InvalidOrigin.into();
        assert_eq!(invalid.error_code(), Some(crate::errors::CSRF_TOKEN_INVALID));
    }
}

use super::{CsrfCheck, CsrfService};
use crate::errors::ServiceError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

/// Rejects unsafe requests that do not carry a valid CSRF token.
pub async fn csrf_middleware(
    State(csrf): State<CsrfService>,
    request: Request,
    next: Next,
) -> Response {
    if !csrf.config().enabled || !csrf.should_protect(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let session_id = csrf.session_id(request.headers(), peer);

    let outcome = csrf.validate(CsrfCheck {
        session_id: &session_id,
        headers: request.headers(),
        query: request.uri().query(),
    });

    match outcome {
        Ok(()) => next.run(request).await,
        Err(rejection) => ServiceError::from(rejection).into_response(),
    }
}

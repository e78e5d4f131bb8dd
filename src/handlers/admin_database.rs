use super::common::success_response;
use crate::{
    auth::{roles, AuthRouterExt},
    errors::ServiceError,
    services::database_admin::{ConnectionStatus, IntegrityReport, MigrationReport, MigrationRunReport},
    ApiResponse, AppState,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

#[utoipa::path(
    get,
    path = "/api/admin/database/connection",
    tag = "Database administration",
    responses(
        (status = 200, description = "Connection state; failures are reported in the body", body = ApiResponse<ConnectionStatus>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn connection_status(State(state): State<AppState>) -> Json<ApiResponse<ConnectionStatus>> {
    success_response(state.services.database.connection().await)
}

#[utoipa::path(
    get,
    path = "/api/admin/database/integrity",
    tag = "Database administration",
    responses(
        (status = 200, description = "Managed tables compared with the live schema", body = ApiResponse<IntegrityReport>),
        (status = 500, description = "Schema could not be read", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn integrity(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<IntegrityReport>>, ServiceError> {
    Ok(success_response(state.services.database.integrity().await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/database/migrations",
    tag = "Database administration",
    responses(
        (status = 200, description = "Applied and pending migrations", body = ApiResponse<MigrationReport>),
    ),
    security(("Bearer" = []))
)]
pub async fn migration_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MigrationReport>>, ServiceError> {
    Ok(success_response(state.services.database.migrations().await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/database/migrations/run",
    tag = "Database administration",
    responses(
        (status = 200, description = "Migrations executed by this call and the resulting status", body = ApiResponse<MigrationRunReport>),
        (status = 500, description = "A migration failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn run_migrations(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MigrationRunReport>>, ServiceError> {
    Ok(success_response(state.services.database.run_migrations().await?))
}

pub fn database_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/connection", get(connection_status))
        .route("/integrity", get(integrity))
        .route("/migrations", get(migration_status))
        .route("/migrations/run", post(run_migrations))
        .with_role(roles::ADMIN)
}

use super::common::{created_response, no_content_response, paginated, success_response};
use crate::{
    auth::{roles, AuthRouterExt, AuthUser},
    entities::societe::{self, SocieteStatus},
    errors::ServiceError,
    services::{
        societes::{CreateSocieteRequest, UpdateSocieteRequest},
        PageRequest,
    },
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SocieteListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matches code or name
    pub search: Option<String>,
    #[param(inline)]
    pub status: Option<SocieteStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeStatusRequest {
    pub status: SocieteStatus,
}

#[utoipa::path(
    get,
    path = "/api/admin/societes",
    tag = "Sociétés",
    params(SocieteListParams),
    responses(
        (status = 200, description = "Page of sociétés", body = ApiResponse<PaginatedResponse<serde_json::Value>>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_societes(
    State(state): State<AppState>,
    Query(params): Query<SocieteListParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<societe::Model>>>, ServiceError> {
    let page = PageRequest::new(params.page, state.config.page_size(params.per_page));
    let page = state
        .services
        .societes
        .list(params.search.as_deref(), params.status, page)
        .await?;
    Ok(success_response(paginated(page)))
}

#[utoipa::path(
    get,
    path = "/api/admin/societes/{id}",
    tag = "Sociétés",
    params(("id" = Uuid, Path, description = "Société id")),
    responses(
        (status = 200, description = "Société", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Société not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_societe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<societe::Model>>, ServiceError> {
    Ok(success_response(state.services.societes.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/societes",
    tag = "Sociétés",
    request_body = CreateSocieteRequest,
    responses(
        (status = 201, description = "Société created", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid code or SIRET", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already used", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_societe(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateSocieteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<societe::Model>>), ServiceError> {
    let societe = state
        .services
        .societes
        .create(request, auth_user.user_uuid())
        .await?;
    Ok(created_response(societe))
}

#[utoipa::path(
    put,
    path = "/api/admin/societes/{id}",
    tag = "Sociétés",
    params(("id" = Uuid, Path, description = "Société id")),
    request_body = UpdateSocieteRequest,
    responses(
        (status = 200, description = "Société updated", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Société not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_societe(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSocieteRequest>,
) -> Result<Json<ApiResponse<societe::Model>>, ServiceError> {
    let societe = state
        .services
        .societes
        .update(id, request, auth_user.user_uuid())
        .await?;
    Ok(success_response(societe))
}

#[utoipa::path(
    patch,
    path = "/api/admin/societes/{id}/status",
    tag = "Sociétés",
    params(("id" = Uuid, Path, description = "Société id")),
    request_body = ChangeStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Société not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn change_societe_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<ApiResponse<societe::Model>>, ServiceError> {
    let societe = state
        .services
        .societes
        .change_status(id, request.status, auth_user.user_uuid())
        .await?;
    Ok(success_response(societe))
}

#[utoipa::path(
    delete,
    path = "/api/admin/societes/{id}",
    tag = "Sociétés",
    params(("id" = Uuid, Path, description = "Société id")),
    responses(
        (status = 204, description = "Société soft deleted and deactivated"),
        (status = 404, description = "Société not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_societe(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .societes
        .soft_delete(id, auth_user.user_uuid())
        .await?;
    Ok(no_content_response())
}

pub fn societe_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_societes).post(create_societe))
        .route(
            "/:id",
            get(get_societe).put(update_societe).delete(delete_societe),
        )
        .route("/:id/status", patch(change_societe_status))
        .with_role(roles::ADMIN)
}

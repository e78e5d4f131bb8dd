use super::common::{created_response, no_content_response, paginated, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt, TenantContext},
    entities::price_rule::{self, PriceChannel},
    errors::ServiceError,
    services::{
        price_rules::{CreatePriceRuleRequest, PriceRuleFilter, UpdatePriceRuleRequest},
        PageRequest,
    },
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PriceRuleListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub active: Option<bool>,
    pub channel: Option<PriceChannel>,
    pub article_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/price-rules",
    tag = "Price rules",
    params(PriceRuleListParams),
    responses(
        (status = 200, description = "Page of rules ordered by priority", body = ApiResponse<PaginatedResponse<serde_json::Value>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_price_rules(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(params): Query<PriceRuleListParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<price_rule::Model>>>, ServiceError> {
    let page = PageRequest::new(params.page, state.config.page_size(params.per_page));
    let filter = PriceRuleFilter {
        active: params.active,
        channel: params.channel,
        article_id: params.article_id,
    };
    let result = state
        .services
        .price_rules
        .list(tenant.societe_id, &filter, page)
        .await?;
    Ok(success_response(paginated(result)))
}

#[utoipa::path(
    get,
    path = "/api/price-rules/active",
    tag = "Price rules",
    responses(
        (status = 200, description = "Active rules evaluated by the pricing engine", body = ApiResponse<Vec<Object>>),
    ),
    security(("Bearer" = []))
)]
pub async fn list_active_price_rules(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<ApiResponse<Vec<price_rule::Model>>>, ServiceError> {
    let rules = state
        .services
        .price_rules
        .list_active(tenant.societe_id)
        .await?;
    Ok(success_response(rules))
}

#[utoipa::path(
    get,
    path = "/api/price-rules/{id}",
    tag = "Price rules",
    params(("id" = Uuid, Path, description = "Rule id")),
    responses(
        (status = 200, description = "Rule", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Rule not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_price_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<price_rule::Model>>, ServiceError> {
    let rule = state.services.price_rules.get(tenant.societe_id, id).await?;
    Ok(success_response(rule))
}

#[utoipa::path(
    post,
    path = "/api/price-rules",
    tag = "Price rules",
    request_body = CreatePriceRuleRequest,
    responses(
        (status = 201, description = "Rule created", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid rule definition", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_price_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(request): Json<CreatePriceRuleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<price_rule::Model>>), ServiceError> {
    let rule = state
        .services
        .price_rules
        .create(tenant.societe_id, request, tenant.actor())
        .await?;
    Ok(created_response(rule))
}

#[utoipa::path(
    put,
    path = "/api/price-rules/{id}",
    tag = "Price rules",
    params(("id" = Uuid, Path, description = "Rule id")),
    request_body = UpdatePriceRuleRequest,
    responses(
        (status = 200, description = "Rule updated", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid rule definition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Rule not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_price_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePriceRuleRequest>,
) -> Result<Json<ApiResponse<price_rule::Model>>, ServiceError> {
    let rule = state
        .services
        .price_rules
        .update(tenant.societe_id, id, request, tenant.actor())
        .await?;
    Ok(success_response(rule))
}

#[utoipa::path(
    post,
    path = "/api/price-rules/{id}/toggle",
    tag = "Price rules",
    params(("id" = Uuid, Path, description = "Rule id")),
    responses(
        (status = 200, description = "Rule with flipped activation", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Rule not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn toggle_price_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<price_rule::Model>>, ServiceError> {
    let rule = state
        .services
        .price_rules
        .toggle(tenant.societe_id, id, tenant.actor())
        .await?;
    Ok(success_response(rule))
}

#[utoipa::path(
    delete,
    path = "/api/price-rules/{id}",
    tag = "Price rules",
    params(("id" = Uuid, Path, description = "Rule id")),
    responses(
        (status = 204, description = "Rule soft deleted and deactivated"),
        (status = 404, description = "Rule not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_price_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .price_rules
        .soft_delete(tenant.societe_id, id, tenant.actor())
        .await?;
    Ok(no_content_response())
}

pub fn price_rule_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_price_rules))
        .route("/active", get(list_active_price_rules))
        .route("/:id", get(get_price_rule))
        .with_permission(perm::PRICING_READ);

    let manage = Router::new()
        .route("/", post(create_price_rule))
        .route("/:id", put(update_price_rule).delete(delete_price_rule))
        .route("/:id/toggle", post(toggle_price_rule))
        .with_permission(perm::PRICING_MANAGE);

    read.merge(manage)
}

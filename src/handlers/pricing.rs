use super::common::success_response;
use crate::{
    auth::{consts as perm, AuthRouterExt, TenantContext},
    errors::ServiceError,
    pricing::{PriceCalculation, RulePreview},
    services::pricing::{BulkPriceRequest, PreviewRequest, PriceRequest},
    ApiResponse, AppState,
};
use axum::{extract::State, routing::post, Json, Router};

#[utoipa::path(
    post,
    path = "/api/pricing/calculate",
    tag = "Pricing",
    summary = "Price one article",
    description = "Applies the active rules of the caller's société to one article. \
                   An unknown article yields a result flagged with a warning instead of a 404.",
    request_body = PriceRequest,
    responses(
        (status = 200, description = "Price calculation", body = ApiResponse<PriceCalculation>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn calculate_price(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(request): Json<PriceRequest>,
) -> Result<Json<ApiResponse<PriceCalculation>>, ServiceError> {
    let calculation = state
        .services
        .pricing
        .calculate_price(tenant.societe_id, &request)
        .await?;
    Ok(success_response(calculation))
}

#[utoipa::path(
    post,
    path = "/api/pricing/bulk",
    tag = "Pricing",
    summary = "Price several articles with the same context",
    request_body = BulkPriceRequest,
    responses(
        (status = 200, description = "One calculation per article, in request order", body = ApiResponse<Vec<PriceCalculation>>),
        (status = 400, description = "Empty or oversized article list", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn calculate_bulk_prices(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(request): Json<BulkPriceRequest>,
) -> Result<Json<ApiResponse<Vec<PriceCalculation>>>, ServiceError> {
    let calculations = state
        .services
        .pricing
        .calculate_bulk_prices(tenant.societe_id, &request)
        .await?;
    Ok(success_response(calculations))
}

#[utoipa::path(
    post,
    path = "/api/pricing/preview",
    tag = "Pricing",
    summary = "Preview a draft rule on an article",
    request_body = PreviewRequest,
    responses(
        (status = 200, description = "Price before and after the draft rule", body = ApiResponse<RulePreview>),
        (status = 400, description = "Invalid rule definition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Article not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn preview_rule(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<ApiResponse<RulePreview>>, ServiceError> {
    let preview = state
        .services
        .pricing
        .preview_rule(tenant.societe_id, &request)
        .await?;
    Ok(success_response(preview))
}

pub fn pricing_routes() -> Router<AppState> {
    let calculate = Router::new()
        .route("/calculate", post(calculate_price))
        .route("/bulk", post(calculate_bulk_prices))
        .with_permission(perm::PRICING_READ);

    let preview = Router::new()
        .route("/preview", post(preview_rule))
        .with_permission(perm::PRICING_MANAGE);

    calculate.merge(preview)
}

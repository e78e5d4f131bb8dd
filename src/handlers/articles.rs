use super::common::{created_response, no_content_response, paginated, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt, TenantContext},
    entities::article::{self, ArticleStatus, ArticleType},
    errors::ServiceError,
    services::{
        articles::{ArticleFilter, CreateArticleRequest, UpdateArticleRequest},
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
pub struct ArticleListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matched against reference and designation
    pub search: Option<String>,
    pub famille: Option<String>,
    pub status: Option<ArticleStatus>,
    #[serde(rename = "type")]
    pub article_type: Option<ArticleType>,
}

#[utoipa::path(
    get,
    path = "/api/articles",
    tag = "Articles",
    summary = "List articles of the current société",
    params(ArticleListParams),
    responses(
        (status = 200, description = "Page of articles", body = ApiResponse<PaginatedResponse<serde_json::Value>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_articles(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(params): Query<ArticleListParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<article::Model>>>, ServiceError> {
    let page = PageRequest::new(params.page, state.config.page_size(params.per_page));
    let filter = ArticleFilter {
        search: params.search,
        famille: params.famille,
        status: params.status,
        article_type: params.article_type,
    };
    let result = state
        .services
        .articles
        .list(tenant.societe_id, &filter, page)
        .await?;
    Ok(success_response(paginated(result)))
}

#[utoipa::path(
    get,
    path = "/api/articles/{id}",
    tag = "Articles",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Article not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_article(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<article::Model>>, ServiceError> {
    let article = state.services.articles.get(tenant.societe_id, id).await?;
    Ok(success_response(article))
}

#[utoipa::path(
    get,
    path = "/api/articles/reference/{reference}",
    tag = "Articles",
    params(("reference" = String, Path, description = "Article reference")),
    responses(
        (status = 200, description = "Article", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Article not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_article_by_reference(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(reference): Path<String>,
) -> Result<Json<ApiResponse<article::Model>>, ServiceError> {
    let article = state
        .services
        .articles
        .get_by_reference(tenant.societe_id, &reference)
        .await?;
    Ok(success_response(article))
}

#[utoipa::path(
    post,
    path = "/api/articles",
    tag = "Articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Article created", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Reference already used in this société", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_article(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(request): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<article::Model>>), ServiceError> {
    let article = state
        .services
        .articles
        .create(tenant.societe_id, request, tenant.actor())
        .await?;
    Ok(created_response(article))
}

#[utoipa::path(
    put,
    path = "/api/articles/{id}",
    tag = "Articles",
    params(("id" = Uuid, Path, description = "Article id")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Article updated", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Article not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Reference already used in this société", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_article(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateArticleRequest>,
) -> Result<Json<ApiResponse<article::Model>>, ServiceError> {
    let article = state
        .services
        .articles
        .update(tenant.societe_id, id, request, tenant.actor())
        .await?;
    Ok(success_response(article))
}

#[utoipa::path(
    delete,
    path = "/api/articles/{id}",
    tag = "Articles",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 204, description = "Article soft deleted"),
        (status = 404, description = "Article not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_article(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .articles
        .soft_delete(tenant.societe_id, id, tenant.actor())
        .await?;
    Ok(no_content_response())
}

pub fn article_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_articles))
        .route("/reference/:reference", get(get_article_by_reference))
        .route("/:id", get(get_article))
        .with_permission(perm::ARTICLES_READ);

    let write = Router::new()
        .route("/", post(create_article))
        .route("/:id", put(update_article).delete(delete_article))
        .with_permission(perm::ARTICLES_WRITE);

    read.merge(write)
}

//! Menu administration and the per-user menu.

use super::common::{created_response, no_content_response, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt, AuthUser},
    entities::{menu_configuration, menu_item},
    errors::ServiceError,
    services::menu::{
        CreateMenuConfigRequest, CreateMenuItemRequest, MenuExport, MenuImport, MenuItemNode,
        MoveMenuItemRequest, UpdateMenuConfigRequest, UpdateMenuItemRequest,
    },
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/menu",
    tag = "Menu",
    summary = "Menu of the current user",
    description = "Active configuration trimmed to the items the caller's roles and permissions allow.",
    responses(
        (status = 200, description = "Visible menu tree", body = ApiResponse<Vec<MenuItemNode>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn user_menu(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<MenuItemNode>>>, ServiceError> {
    let menu = state.services.menu.filtered_menu(&auth_user).await?;
    Ok(success_response(menu))
}

#[utoipa::path(
    get,
    path = "/api/admin/menus/configurations",
    tag = "Menu",
    responses(
        (status = 200, description = "Configurations, system ones first", body = ApiResponse<Vec<Object>>),
    ),
    security(("Bearer" = []))
)]
pub async fn list_configurations(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<menu_configuration::Model>>>, ServiceError> {
    Ok(success_response(state.services.menu.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/menus/configurations/active",
    tag = "Menu",
    responses(
        (status = 200, description = "Active configuration, null when none", body = ApiResponse<serde_json::Value>),
    ),
    security(("Bearer" = []))
)]
pub async fn active_configuration(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Option<menu_configuration::Model>>>, ServiceError> {
    Ok(success_response(state.services.menu.active().await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/menus/configurations/{id}",
    tag = "Menu",
    params(("id" = Uuid, Path, description = "Configuration id")),
    responses(
        (status = 200, description = "Configuration", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Configuration not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_configuration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<menu_configuration::Model>>, ServiceError> {
    Ok(success_response(state.services.menu.get(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/menus/configurations/{id}/tree",
    tag = "Menu",
    params(("id" = Uuid, Path, description = "Configuration id")),
    responses(
        (status = 200, description = "Full item tree", body = ApiResponse<Vec<MenuItemNode>>),
        (status = 404, description = "Configuration not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn configuration_tree(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MenuItemNode>>>, ServiceError> {
    Ok(success_response(state.services.menu.get_menu_tree(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/menus/configurations/{id}/export",
    tag = "Menu",
    params(("id" = Uuid, Path, description = "Configuration id")),
    responses(
        (status = 200, description = "Portable export document", body = ApiResponse<MenuExport>),
        (status = 404, description = "Configuration not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn export_configuration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MenuExport>>, ServiceError> {
    Ok(success_response(state.services.menu.export(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/menus/configurations",
    tag = "Menu",
    request_body = CreateMenuConfigRequest,
    responses(
        (status = 201, description = "Configuration created with its items", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already used", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_configuration(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateMenuConfigRequest>,
) -> Result<(StatusCode, Json<ApiResponse<menu_configuration::Model>>), ServiceError> {
    let config = state
        .services
        .menu
        .create(request, auth_user.user_uuid())
        .await?;
    Ok(created_response(config))
}

#[utoipa::path(
    post,
    path = "/api/admin/menus/configurations/default",
    tag = "Menu",
    responses(
        (status = 201, description = "System configuration created", body = ApiResponse<serde_json::Value>),
        (status = 409, description = "Default configuration already exists", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_default_configuration(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<menu_configuration::Model>>), ServiceError> {
    let config = state
        .services
        .menu
        .create_default_configuration(auth_user.user_uuid())
        .await?;
    Ok(created_response(config))
}

#[utoipa::path(
    post,
    path = "/api/admin/menus/configurations/import",
    tag = "Menu",
    request_body = MenuImport,
    responses(
        (status = 201, description = "Configuration imported", body = ApiResponse<serde_json::Value>),
        (status = 409, description = "Name already used", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn import_configuration(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(import): Json<MenuImport>,
) -> Result<(StatusCode, Json<ApiResponse<menu_configuration::Model>>), ServiceError> {
    let config = state
        .services
        .menu
        .import(import, auth_user.user_uuid())
        .await?;
    Ok(created_response(config))
}

#[utoipa::path(
    put,
    path = "/api/admin/menus/configurations/{id}",
    tag = "Menu",
    params(("id" = Uuid, Path, description = "Configuration id")),
    request_body = UpdateMenuConfigRequest,
    responses(
        (status = 200, description = "Configuration updated", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "System configurations cannot be renamed", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already used", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_configuration(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMenuConfigRequest>,
) -> Result<Json<ApiResponse<menu_configuration::Model>>, ServiceError> {
    let config = state
        .services
        .menu
        .update(id, request, auth_user.user_uuid())
        .await?;
    Ok(success_response(config))
}

#[utoipa::path(
    delete,
    path = "/api/admin/menus/configurations/{id}",
    tag = "Menu",
    params(("id" = Uuid, Path, description = "Configuration id")),
    responses(
        (status = 204, description = "Configuration and items soft deleted"),
        (status = 403, description = "System or active configuration", body = crate::errors::ErrorResponse),
        (status = 404, description = "Configuration not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_configuration(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .menu
        .delete(id, auth_user.user_uuid())
        .await?;
    Ok(no_content_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/menus/configurations/{id}/activate",
    tag = "Menu",
    params(("id" = Uuid, Path, description = "Configuration id")),
    responses(
        (status = 200, description = "Configuration is now the only active one", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Configuration not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn activate_configuration(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<menu_configuration::Model>>, ServiceError> {
    let config = state
        .services
        .menu
        .activate(id, auth_user.user_uuid())
        .await?;
    Ok(success_response(config))
}

#[utoipa::path(
    post,
    path = "/api/admin/menus/configurations/{id}/items",
    tag = "Menu",
    params(("id" = Uuid, Path, description = "Configuration id")),
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Item added", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid item or parent is not a folder", body = crate::errors::ErrorResponse),
        (status = 404, description = "Configuration or parent not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn add_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<menu_item::Model>>), ServiceError> {
    let item = state
        .services
        .menu
        .add_item(id, request, auth_user.user_uuid())
        .await?;
    Ok(created_response(item))
}

#[utoipa::path(
    put,
    path = "/api/admin/menus/configurations/{id}/items/{item_id}",
    tag = "Menu",
    params(
        ("id" = Uuid, Path, description = "Configuration id"),
        ("item_id" = Uuid, Path, description = "Item id"),
    ),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateMenuItemRequest>,
) -> Result<Json<ApiResponse<menu_item::Model>>, ServiceError> {
    let item = state
        .services
        .menu
        .update_item(id, item_id, request, auth_user.user_uuid())
        .await?;
    Ok(success_response(item))
}

#[utoipa::path(
    delete,
    path = "/api/admin/menus/configurations/{id}/items/{item_id}",
    tag = "Menu",
    params(
        ("id" = Uuid, Path, description = "Configuration id"),
        ("item_id" = Uuid, Path, description = "Item id"),
    ),
    responses(
        (status = 204, description = "Item and its descendants soft deleted"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state.services.menu.delete_item(id, item_id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/menus/configurations/{id}/items/move",
    tag = "Menu",
    summary = "Drag and drop an item",
    params(("id" = Uuid, Path, description = "Configuration id")),
    request_body = MoveMenuItemRequest,
    responses(
        (status = 200, description = "Tree after the move", body = ApiResponse<Vec<MenuItemNode>>),
        (status = 400, description = "Move would create a cycle or exceed the depth limit", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn move_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<MoveMenuItemRequest>,
) -> Result<Json<ApiResponse<Vec<MenuItemNode>>>, ServiceError> {
    let tree = state
        .services
        .menu
        .move_item(id, &request, auth_user.user_uuid())
        .await?;
    Ok(success_response(tree))
}

/// Menu of the current user; any authenticated caller
pub fn user_menu_routes() -> Router<AppState> {
    Router::new().route("/", get(user_menu)).with_auth()
}

pub fn menu_admin_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/configurations", get(list_configurations))
        .route("/configurations/active", get(active_configuration))
        .route("/configurations/:id", get(get_configuration))
        .route("/configurations/:id/tree", get(configuration_tree))
        .route("/configurations/:id/export", get(export_configuration))
        .with_permission(perm::MENU_READ);

    let manage = Router::new()
        .route("/configurations", post(create_configuration))
        .route("/configurations/default", post(create_default_configuration))
        .route("/configurations/import", post(import_configuration))
        .route(
            "/configurations/:id",
            put(update_configuration).delete(delete_configuration),
        )
        .route("/configurations/:id/activate", post(activate_configuration))
        .route("/configurations/:id/items", post(add_item))
        .route("/configurations/:id/items/move", post(move_item))
        .route(
            "/configurations/:id/items/:item_id",
            put(update_item).delete(delete_item),
        )
        .with_permission(perm::MENU_MANAGE);

    read.merge(manage)
}

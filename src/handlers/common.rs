use crate::{services::Page, services::PageRequest, ApiResponse, AppState, PaginatedResponse};
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Standard no content response
pub fn no_content_response() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Query parameters shared by list endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Page number, starting at 1
    pub page: Option<u64>,
    /// Items per page, capped by `api_max_page_size`
    pub per_page: Option<u64>,
    /// Free-text search on code and name
    pub search: Option<String>,
    /// Exact type filter
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ListParams {
    pub fn page_request(&self, state: &AppState) -> PageRequest {
        PageRequest::new(self.page, state.config.page_size(self.per_page))
    }
}

/// Converts a service page into the wire shape
pub fn paginated<T>(page: Page<T>) -> PaginatedResponse<T> {
    let total_pages = page.total_pages();
    PaginatedResponse {
        items: page.items,
        total: page.total,
        page: page.page,
        limit: page.per_page,
        total_pages,
    }
}

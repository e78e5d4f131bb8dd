//! Shared catalog endpoints: materials, processes, quality standards and suppliers.
//!
//! The four resources share the same routes and semantics; only their payloads
//! differ. Payloads are declared here, handlers are generated per resource by
//! `catalog_routes!`.

use super::common::{created_response, no_content_response, paginated, success_response, ListParams};
use crate::{
    auth::{consts as perm, AuthRouterExt, AuthUser},
    entities::{
        shared_material::{self, MaterialForm, MaterialType},
        shared_process::{self, ProcessComplexity, ProcessType},
        shared_quality_standard::{self, StandardType},
        shared_supplier::{self, SupplierType},
    },
    errors::ServiceError,
    services::catalog::{CatalogFilter, CatalogInput, CatalogPatch, CatalogStats},
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

static SIRET_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{14}$").unwrap());

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

// Materials

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMaterialRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub nom: String,
    pub description: Option<String>,
    #[serde(rename = "type", alias = "material_type")]
    pub material_type: MaterialType,
    pub forme: Option<MaterialForm>,
    #[validate(length(max = 100))]
    pub nuance: Option<String>,
    #[validate(length(max = 100))]
    pub norme: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub caracteristiques: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub dimensions: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl CatalogInput<shared_material::Entity> for CreateMaterialRequest {
    fn code(&self) -> String {
        normalize_code(&self.code)
    }

    fn into_active_model(self) -> shared_material::ActiveModel {
        shared_material::ActiveModel {
            code: Set(normalize_code(&self.code)),
            nom: Set(self.nom.trim().to_string()),
            description: Set(self.description),
            material_type: Set(self.material_type),
            forme: Set(self.forme),
            nuance: Set(self.nuance),
            norme: Set(self.norme),
            caracteristiques: Set(self.caracteristiques),
            dimensions: Set(self.dimensions),
            metadata: Set(self.metadata),
            deleted_at: Set(None),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMaterialRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub nom: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type", alias = "material_type")]
    pub material_type: Option<MaterialType>,
    pub forme: Option<MaterialForm>,
    #[validate(length(max = 100))]
    pub nuance: Option<String>,
    #[validate(length(max = 100))]
    pub norme: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub caracteristiques: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub dimensions: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl CatalogPatch<shared_material::Entity> for UpdateMaterialRequest {
    fn code(&self) -> Option<String> {
        self.code.as_deref().map(normalize_code)
    }

    fn apply(self, model: &mut shared_material::ActiveModel) {
        if let Some(v) = self.code {
            model.code = Set(normalize_code(&v));
        }
        if let Some(v) = self.nom {
            model.nom = Set(v.trim().to_string());
        }
        if let Some(v) = self.description {
            model.description = Set(Some(v));
        }
        if let Some(v) = self.material_type {
            model.material_type = Set(v);
        }
        if let Some(v) = self.forme {
            model.forme = Set(Some(v));
        }
        if let Some(v) = self.nuance {
            model.nuance = Set(Some(v));
        }
        if let Some(v) = self.norme {
            model.norme = Set(Some(v));
        }
        if let Some(v) = self.caracteristiques {
            model.caracteristiques = Set(Some(v));
        }
        if let Some(v) = self.dimensions {
            model.dimensions = Set(Some(v));
        }
        if let Some(v) = self.metadata {
            model.metadata = Set(Some(v));
        }
    }
}

// Processes

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProcessRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub nom: String,
    pub description: Option<String>,
    #[serde(rename = "type", alias = "process_type")]
    pub process_type: ProcessType,
    pub complexite: Option<ProcessComplexity>,
    #[schema(value_type = Option<Object>)]
    pub etapes: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub equipements: Option<Value>,
    #[validate(range(min = 0))]
    pub duree_estimee_minutes: Option<i32>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl CatalogInput<shared_process::Entity> for CreateProcessRequest {
    fn code(&self) -> String {
        normalize_code(&self.code)
    }

    fn into_active_model(self) -> shared_process::ActiveModel {
        shared_process::ActiveModel {
            code: Set(normalize_code(&self.code)),
            nom: Set(self.nom.trim().to_string()),
            description: Set(self.description),
            process_type: Set(self.process_type),
            complexite: Set(self.complexite),
            etapes: Set(self.etapes),
            equipements: Set(self.equipements),
            duree_estimee_minutes: Set(self.duree_estimee_minutes),
            metadata: Set(self.metadata),
            deleted_at: Set(None),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProcessRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub nom: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type", alias = "process_type")]
    pub process_type: Option<ProcessType>,
    pub complexite: Option<ProcessComplexity>,
    #[schema(value_type = Option<Object>)]
    pub etapes: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub equipements: Option<Value>,
    #[validate(range(min = 0))]
    pub duree_estimee_minutes: Option<i32>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl CatalogPatch<shared_process::Entity> for UpdateProcessRequest {
    fn code(&self) -> Option<String> {
        self.code.as_deref().map(normalize_code)
    }

    fn apply(self, model: &mut shared_process::ActiveModel) {
        if let Some(v) = self.code {
            model.code = Set(normalize_code(&v));
        }
        if let Some(v) = self.nom {
            model.nom = Set(v.trim().to_string());
        }
        if let Some(v) = self.description {
            model.description = Set(Some(v));
        }
        if let Some(v) = self.process_type {
            model.process_type = Set(v);
        }
        if let Some(v) = self.complexite {
            model.complexite = Set(Some(v));
        }
        if let Some(v) = self.etapes {
            model.etapes = Set(Some(v));
        }
        if let Some(v) = self.equipements {
            model.equipements = Set(Some(v));
        }
        if let Some(v) = self.duree_estimee_minutes {
            model.duree_estimee_minutes = Set(Some(v));
        }
        if let Some(v) = self.metadata {
            model.metadata = Set(Some(v));
        }
    }
}

// Quality standards

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateQualityStandardRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub nom: String,
    pub description: Option<String>,
    #[serde(rename = "type", alias = "standard_type")]
    pub standard_type: StandardType,
    #[serde(default)]
    pub domaines: Vec<String>,
    pub date_publication: Option<NaiveDate>,
    pub date_application: Option<NaiveDate>,
    #[schema(value_type = Option<Object>)]
    pub criteres: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl CatalogInput<shared_quality_standard::Entity> for CreateQualityStandardRequest {
    fn code(&self) -> String {
        normalize_code(&self.code)
    }

    fn into_active_model(self) -> shared_quality_standard::ActiveModel {
        shared_quality_standard::ActiveModel {
            code: Set(normalize_code(&self.code)),
            nom: Set(self.nom.trim().to_string()),
            description: Set(self.description),
            standard_type: Set(self.standard_type),
            domaines: Set(json!(self.domaines)),
            date_publication: Set(self.date_publication),
            date_application: Set(self.date_application),
            criteres: Set(self.criteres),
            metadata: Set(self.metadata),
            deleted_at: Set(None),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateQualityStandardRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub nom: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type", alias = "standard_type")]
    pub standard_type: Option<StandardType>,
    pub domaines: Option<Vec<String>>,
    pub date_publication: Option<NaiveDate>,
    pub date_application: Option<NaiveDate>,
    #[schema(value_type = Option<Object>)]
    pub criteres: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl CatalogPatch<shared_quality_standard::Entity> for UpdateQualityStandardRequest {
    fn code(&self) -> Option<String> {
        self.code.as_deref().map(normalize_code)
    }

    fn apply(self, model: &mut shared_quality_standard::ActiveModel) {
        if let Some(v) = self.code {
            model.code = Set(normalize_code(&v));
        }
        if let Some(v) = self.nom {
            model.nom = Set(v.trim().to_string());
        }
        if let Some(v) = self.description {
            model.description = Set(Some(v));
        }
        if let Some(v) = self.standard_type {
            model.standard_type = Set(v);
        }
        if let Some(v) = self.domaines {
            model.domaines = Set(json!(v));
        }
        if let Some(v) = self.date_publication {
            model.date_publication = Set(Some(v));
        }
        if let Some(v) = self.date_application {
            model.date_application = Set(Some(v));
        }
        if let Some(v) = self.criteres {
            model.criteres = Set(Some(v));
        }
        if let Some(v) = self.metadata {
            model.metadata = Set(Some(v));
        }
    }
}

// Suppliers

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub raison_sociale: String,
    #[validate(length(max = 255))]
    pub nom_commercial: Option<String>,
    #[validate(regex = "SIRET_FORMAT")]
    pub siret: Option<String>,
    #[validate(length(max = 20))]
    pub numero_tva: Option<String>,
    #[serde(rename = "type", alias = "supplier_type")]
    pub supplier_type: SupplierType,
    #[serde(default)]
    pub categories: Vec<String>,
    #[schema(value_type = Option<Object>)]
    pub coordonnees: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub contacts: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl CatalogInput<shared_supplier::Entity> for CreateSupplierRequest {
    fn code(&self) -> String {
        normalize_code(&self.code)
    }

    fn into_active_model(self) -> shared_supplier::ActiveModel {
        shared_supplier::ActiveModel {
            code: Set(normalize_code(&self.code)),
            raison_sociale: Set(self.raison_sociale.trim().to_string()),
            nom_commercial: Set(self.nom_commercial),
            siret: Set(self.siret),
            numero_tva: Set(self.numero_tva),
            supplier_type: Set(self.supplier_type),
            categories: Set(json!(self.categories)),
            coordonnees: Set(self.coordonnees),
            contacts: Set(self.contacts),
            metadata: Set(self.metadata),
            deleted_at: Set(None),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub raison_sociale: Option<String>,
    #[validate(length(max = 255))]
    pub nom_commercial: Option<String>,
    #[validate(regex = "SIRET_FORMAT")]
    pub siret: Option<String>,
    #[validate(length(max = 20))]
    pub numero_tva: Option<String>,
    #[serde(rename = "type", alias = "supplier_type")]
    pub supplier_type: Option<SupplierType>,
    pub categories: Option<Vec<String>>,
    #[schema(value_type = Option<Object>)]
    pub coordonnees: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub contacts: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl CatalogPatch<shared_supplier::Entity> for UpdateSupplierRequest {
    fn code(&self) -> Option<String> {
        self.code.as_deref().map(normalize_code)
    }

    fn apply(self, model: &mut shared_supplier::ActiveModel) {
        if let Some(v) = self.code {
            model.code = Set(normalize_code(&v));
        }
        if let Some(v) = self.raison_sociale {
            model.raison_sociale = Set(v.trim().to_string());
        }
        if let Some(v) = self.nom_commercial {
            model.nom_commercial = Set(Some(v));
        }
        if let Some(v) = self.siret {
            model.siret = Set(Some(v));
        }
        if let Some(v) = self.numero_tva {
            model.numero_tva = Set(Some(v));
        }
        if let Some(v) = self.supplier_type {
            model.supplier_type = Set(v);
        }
        if let Some(v) = self.categories {
            model.categories = Set(json!(v));
        }
        if let Some(v) = self.coordonnees {
            model.coordonnees = Set(Some(v));
        }
        if let Some(v) = self.contacts {
            model.contacts = Set(Some(v));
        }
        if let Some(v) = self.metadata {
            model.metadata = Set(Some(v));
        }
    }
}

fn filter_of(params: &ListParams) -> CatalogFilter {
    CatalogFilter {
        search: params.search.clone(),
        type_filter: params.kind.clone(),
    }
}

/// Generates the handlers and router of one catalog resource.
///
/// Paths are passed separately because `utoipa::path` needs literals.
macro_rules! catalog_routes {
    (
        $module:ident,
        model = $model:path,
        service = $field:ident,
        create = $create:ident,
        update = $update:ident,
        tag = $tag:tt,
        collection = $collection:tt,
        item = $item:tt,
        by_code = $by_code:tt,
        stats = $stats:tt $(,)?
    ) => {
        pub mod $module {
            use super::*;

            #[utoipa::path(
                get,
                path = $collection,
                tag = $tag,
                params(ListParams),
                responses(
                    (status = 200, description = "Page of live entries", body = ApiResponse<PaginatedResponse<serde_json::Value>>),
                    (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
                    (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
                ),
                security(("Bearer" = []))
            )]
            pub async fn list(
                State(state): State<AppState>,
                Query(params): Query<ListParams>,
            ) -> Result<Json<ApiResponse<PaginatedResponse<$model>>>, ServiceError> {
                let page = state
                    .services
                    .$field
                    .list(&filter_of(&params), params.page_request(&state))
                    .await?;
                Ok(success_response(paginated(page)))
            }

            #[utoipa::path(
                get,
                path = $item,
                tag = $tag,
                params(("id" = Uuid, Path, description = "Entry id")),
                responses(
                    (status = 200, description = "Entry", body = ApiResponse<serde_json::Value>),
                    (status = 404, description = "Not found or deleted", body = crate::errors::ErrorResponse),
                ),
                security(("Bearer" = []))
            )]
            pub async fn get_one(
                State(state): State<AppState>,
                Path(id): Path<Uuid>,
            ) -> Result<Json<ApiResponse<$model>>, ServiceError> {
                Ok(success_response(state.services.$field.get(id).await?))
            }

            #[utoipa::path(
                get,
                path = $by_code,
                tag = $tag,
                params(("code" = String, Path, description = "Entry code")),
                responses(
                    (status = 200, description = "Entry", body = ApiResponse<serde_json::Value>),
                    (status = 404, description = "Not found or deleted", body = crate::errors::ErrorResponse),
                ),
                security(("Bearer" = []))
            )]
            pub async fn get_by_code(
                State(state): State<AppState>,
                Path(code): Path<String>,
            ) -> Result<Json<ApiResponse<$model>>, ServiceError> {
                let code = normalize_code(&code);
                Ok(success_response(state.services.$field.get_by_code(&code).await?))
            }

            #[utoipa::path(
                get,
                path = $stats,
                tag = $tag,
                responses(
                    (status = 200, description = "Live entries per type", body = ApiResponse<CatalogStats>),
                ),
                security(("Bearer" = []))
            )]
            pub async fn stats(
                State(state): State<AppState>,
            ) -> Result<Json<ApiResponse<CatalogStats>>, ServiceError> {
                Ok(success_response(state.services.$field.stats().await?))
            }

            #[utoipa::path(
                post,
                path = $collection,
                tag = $tag,
                request_body = $create,
                responses(
                    (status = 201, description = "Entry created", body = ApiResponse<serde_json::Value>),
                    (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
                    (status = 409, description = "Code already used", body = crate::errors::ErrorResponse),
                ),
                security(("Bearer" = []))
            )]
            pub async fn create(
                State(state): State<AppState>,
                auth_user: AuthUser,
                Json(request): Json<$create>,
            ) -> Result<(StatusCode, Json<ApiResponse<$model>>), ServiceError> {
                let model = state
                    .services
                    .$field
                    .create(request, auth_user.user_uuid())
                    .await?;
                Ok(created_response(model))
            }

            #[utoipa::path(
                put,
                path = $item,
                tag = $tag,
                params(("id" = Uuid, Path, description = "Entry id")),
                request_body = $update,
                responses(
                    (status = 200, description = "Entry updated", body = ApiResponse<serde_json::Value>),
                    (status = 404, description = "Not found or deleted", body = crate::errors::ErrorResponse),
                    (status = 409, description = "Code already used", body = crate::errors::ErrorResponse),
                ),
                security(("Bearer" = []))
            )]
            pub async fn update(
                State(state): State<AppState>,
                auth_user: AuthUser,
                Path(id): Path<Uuid>,
                Json(request): Json<$update>,
            ) -> Result<Json<ApiResponse<$model>>, ServiceError> {
                let model = state
                    .services
                    .$field
                    .update(id, request, auth_user.user_uuid())
                    .await?;
                Ok(success_response(model))
            }

            #[utoipa::path(
                delete,
                path = $item,
                tag = $tag,
                params(("id" = Uuid, Path, description = "Entry id")),
                responses(
                    (status = 204, description = "Entry soft deleted"),
                    (status = 404, description = "Not found or deleted", body = crate::errors::ErrorResponse),
                ),
                security(("Bearer" = []))
            )]
            pub async fn remove(
                State(state): State<AppState>,
                auth_user: AuthUser,
                Path(id): Path<Uuid>,
            ) -> Result<StatusCode, ServiceError> {
                state
                    .services
                    .$field
                    .soft_delete(id, auth_user.user_uuid())
                    .await?;
                Ok(no_content_response())
            }

            pub fn routes() -> Router<AppState> {
                let read = Router::new()
                    .route("/", get(list))
                    .route("/stats", get(stats))
                    .route("/code/:code", get(get_by_code))
                    .route("/:id", get(get_one))
                    .with_permission(perm::CATALOG_READ);

                let write = Router::new()
                    .route("/", post(create))
                    .route("/:id", put(update).delete(remove))
                    .with_permission(perm::CATALOG_WRITE);

                read.merge(write)
            }
        }
    };
}

catalog_routes!(
    materials,
    model = shared_material::Model,
    service = materials,
    create = CreateMaterialRequest,
    update = UpdateMaterialRequest,
    tag = "Shared catalog",
    collection = "/api/shared/materials",
    item = "/api/shared/materials/{id}",
    by_code = "/api/shared/materials/code/{code}",
    stats = "/api/shared/materials/stats",
);

catalog_routes!(
    processes,
    model = shared_process::Model,
    service = processes,
    create = CreateProcessRequest,
    update = UpdateProcessRequest,
    tag = "Shared catalog",
    collection = "/api/shared/processes",
    item = "/api/shared/processes/{id}",
    by_code = "/api/shared/processes/code/{code}",
    stats = "/api/shared/processes/stats",
);

catalog_routes!(
    quality_standards,
    model = shared_quality_standard::Model,
    service = quality_standards,
    create = CreateQualityStandardRequest,
    update = UpdateQualityStandardRequest,
    tag = "Shared catalog",
    collection = "/api/shared/quality-standards",
    item = "/api/shared/quality-standards/{id}",
    by_code = "/api/shared/quality-standards/code/{code}",
    stats = "/api/shared/quality-standards/stats",
);

catalog_routes!(
    suppliers,
    model = shared_supplier::Model,
    service = suppliers,
    create = CreateSupplierRequest,
    update = UpdateSupplierRequest,
    tag = "Shared catalog",
    collection = "/api/shared/suppliers",
    item = "/api/shared/suppliers/{id}",
    by_code = "/api/shared/suppliers/code/{code}",
    stats = "/api/shared/suppliers/stats",
);

/// Every catalog resource under `/api/shared`
pub fn shared_catalog_routes() -> Router<AppState> {
    Router::new()
        .nest("/materials", materials::routes())
        .nest("/processes", processes::routes())
        .nest("/quality-standards", quality_standards::routes())
        .nest("/suppliers", suppliers::routes())
}

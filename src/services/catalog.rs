//! Soft-deletable CRUD shared by the four catalog tables.
//!
//! Each catalog entity describes its columns through [`CatalogEntity`]; request
//! payloads turn into active models through [`CatalogInput`] and
//! [`CatalogPatch`]. [`CatalogService`] does the rest.

use super::{map_write_error, Page, PageRequest};
use crate::entities::{shared_material, shared_process, shared_quality_standard, shared_supplier};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Value,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Column layout of a catalog table
pub trait CatalogEntity: EntityTrait {
    /// Singular label used in messages
    const LABEL: &'static str;

    fn id_column() -> Self::Column;
    fn code_column() -> Self::Column;
    fn name_column() -> Self::Column;
    fn type_column() -> Self::Column;
    fn deleted_at_column() -> Self::Column;
    fn created_by_column() -> Self::Column;
    fn updated_by_column() -> Self::Column;
}

/// Payload creating a catalog row
pub trait CatalogInput<E: EntityTrait>: Validate {
    /// Code as it will be stored
    fn code(&self) -> String;
    fn into_active_model(self) -> E::ActiveModel;
}

/// Partial update of a catalog row; `None` fields are left untouched
pub trait CatalogPatch<E: EntityTrait>: Validate {
    fn code(&self) -> Option<String>;
    fn apply(self, model: &mut E::ActiveModel);
}

/// Filters of a catalog listing
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    /// Matched against code and name
    pub search: Option<String>,
    /// Exact type value, e.g. `ACIER`
    pub type_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogStats {
    pub total: i64,
    pub by_type: BTreeMap<String, i64>,
}

pub struct CatalogService<E> {
    db: Arc<DatabaseConnection>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for CatalogService<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> CatalogService<E>
where
    E: CatalogEntity,
    E::Model: IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
{
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    #[instrument(skip(self), fields(entity = E::LABEL))]
    pub async fn list(
        &self,
        filter: &CatalogFilter,
        page: PageRequest,
    ) -> Result<Page<E::Model>, ServiceError> {
        let mut query = E::find().filter(E::deleted_at_column().is_null());

        if let Some(search) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let pattern = format!("%{}%", search);
            query = query.filter(
                Condition::any()
                    .add(E::code_column().like(pattern.as_str()))
                    .add(E::name_column().like(pattern.as_str())),
            );
        }
        if let Some(kind) = filter.type_filter.as_deref().filter(|k| !k.is_empty()) {
            query = query.filter(E::type_column().eq(kind.to_uppercase()));
        }

        let paginator = query
            .order_by_asc(E::code_column())
            .paginate(&*self.db, page.per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;

        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    #[instrument(skip(self), fields(entity = E::LABEL))]
    pub async fn get(&self, id: Uuid) -> Result<E::Model, ServiceError> {
        E::find()
            .filter(E::id_column().eq(id))
            .filter(E::deleted_at_column().is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", E::LABEL, id)))
    }

    #[instrument(skip(self), fields(entity = E::LABEL))]
    pub async fn get_by_code(&self, code: &str) -> Result<E::Model, ServiceError> {
        E::find()
            .filter(E::code_column().eq(code))
            .filter(E::deleted_at_column().is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("{} with code {} not found", E::LABEL, code))
            })
    }

    /// Codes stay reserved after a soft delete, matching the unique index.
    async fn ensure_code_free(&self, code: &str) -> Result<(), ServiceError> {
        let taken = E::find()
            .filter(E::code_column().eq(code))
            .count(&*self.db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!(
                "{} code {} already exists",
                E::LABEL,
                code
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(entity = E::LABEL))]
    pub async fn create<I>(&self, input: I, actor: Option<Uuid>) -> Result<E::Model, ServiceError>
    where
        I: CatalogInput<E> + Send,
    {
        input.validate()?;
        self.ensure_code_free(&input.code()).await?;

        let mut active = input.into_active_model();
        active.set(E::created_by_column(), actor.into());
        active.set(E::updated_by_column(), actor.into());

        let model = active
            .insert(&*self.db)
            .await
            .map_err(|e| map_write_error(e, E::LABEL))?;
        info!(entity = E::LABEL, "catalog entry created");
        Ok(model)
    }

    #[instrument(skip(self, patch), fields(entity = E::LABEL))]
    pub async fn update<P>(
        &self,
        id: Uuid,
        patch: P,
        actor: Option<Uuid>,
    ) -> Result<E::Model, ServiceError>
    where
        P: CatalogPatch<E> + Send,
    {
        patch.validate()?;
        let existing = self.get(id).await?;

        if let Some(code) = patch.code() {
            if existing.get(E::code_column()) != Value::from(code.as_str()) {
                self.ensure_code_free(&code).await?;
            }
        }

        let mut active: E::ActiveModel = existing.into_active_model();
        patch.apply(&mut active);
        active.set(E::updated_by_column(), actor.into());

        active
            .update(&*self.db)
            .await
            .map_err(|e| map_write_error(e, E::LABEL))
    }

    #[instrument(skip(self), fields(entity = E::LABEL))]
    pub async fn soft_delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        let mut active: E::ActiveModel = existing.into_active_model();
        active.set(E::deleted_at_column(), Some(Utc::now()).into());
        active.set(E::updated_by_column(), actor.into());
        active.update(&*self.db).await?;
        info!(entity = E::LABEL, %id, "catalog entry soft deleted");
        Ok(())
    }

    /// Live rows per type value
    #[instrument(skip(self), fields(entity = E::LABEL))]
    pub async fn stats(&self) -> Result<CatalogStats, ServiceError> {
        let rows: Vec<(String, i64)> = E::find()
            .select_only()
            .column(E::type_column())
            .column_as(Expr::col(E::id_column()).count(), "count")
            .filter(E::deleted_at_column().is_null())
            .group_by(E::type_column())
            .into_tuple()
            .all(&*self.db)
            .await?;

        let by_type: BTreeMap<String, i64> = rows.into_iter().collect();
        Ok(CatalogStats {
            total: by_type.values().sum(),
            by_type,
        })
    }
}

macro_rules! catalog_entity {
    ($module:ident, $label:literal, name = $name:ident, type = $kind:ident) => {
        impl CatalogEntity for $module::Entity {
            const LABEL: &'static str = $label;

            fn id_column() -> Self::Column {
                $module::Column::Id
            }
            fn code_column() -> Self::Column {
                $module::Column::Code
            }
            fn name_column() -> Self::Column {
                $module::Column::$name
            }
            fn type_column() -> Self::Column {
                $module::Column::$kind
            }
            fn deleted_at_column() -> Self::Column {
                $module::Column::DeletedAt
            }
            fn created_by_column() -> Self::Column {
                $module::Column::CreatedById
            }
            fn updated_by_column() -> Self::Column {
                $module::Column::UpdatedById
            }
        }
    };
}

catalog_entity!(shared_material, "Material", name = Nom, type = MaterialType);
catalog_entity!(shared_process, "Process", name = Nom, type = ProcessType);
catalog_entity!(
    shared_quality_standard,
    "Quality standard",
    name = Nom,
    type = StandardType
);
catalog_entity!(shared_supplier, "Supplier", name = RaisonSociale, type = SupplierType);

pub type MaterialService = CatalogService<shared_material::Entity>;
pub type ProcessService = CatalogService<shared_process::Entity>;
pub type QualityStandardService = CatalogService<shared_quality_standard::Entity>;
pub type SupplierService = CatalogService<shared_supplier::Entity>;

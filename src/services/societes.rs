use super::{map_write_error, Page, PageRequest};
use crate::{
    entities::societe::{self, Entity as SocieteEntity, SocieteStatus},
    errors::ServiceError,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

static CODE_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9_-]{2,20}$").unwrap());
static SIRET_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{14}$").unwrap());

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSocieteRequest {
    /// Upper-case code, 2 to 20 characters
    #[validate(regex = "CODE_FORMAT")]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub nom: String,
    #[validate(regex = "SIRET_FORMAT")]
    pub siret: Option<String>,
    #[validate(length(max = 100))]
    pub database_name: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub configuration: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSocieteRequest {
    #[validate(length(min = 1, max = 255))]
    pub nom: Option<String>,
    #[validate(regex = "SIRET_FORMAT")]
    pub siret: Option<String>,
    #[validate(length(max = 100))]
    pub database_name: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub configuration: Option<Value>,
}

#[derive(Clone)]
pub struct SocieteService {
    db: Arc<DatabaseConnection>,
}

impl SocieteService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        search: Option<&str>,
        status: Option<SocieteStatus>,
        page: PageRequest,
    ) -> Result<Page<societe::Model>, ServiceError> {
        let mut query = SocieteEntity::find().filter(societe::Column::DeletedAt.is_null());
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            query = query.filter(
                Condition::any()
                    .add(societe::Column::Code.like(pattern.as_str()))
                    .add(societe::Column::Nom.like(pattern.as_str())),
            );
        }
        if let Some(status) = status {
            query = query.filter(societe::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_asc(societe::Column::Code)
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

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<societe::Model, ServiceError> {
        SocieteEntity::find_by_id(id)
            .filter(societe::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Société {} not found", id)))
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        request: CreateSocieteRequest,
        actor: Option<Uuid>,
    ) -> Result<societe::Model, ServiceError> {
        request.validate()?;

        let taken = SocieteEntity::find()
            .filter(societe::Column::Code.eq(request.code.as_str()))
            .count(&*self.db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!(
                "Société code {} already exists",
                request.code
            )));
        }

        let active = societe::ActiveModel {
            code: Set(request.code),
            nom: Set(request.nom),
            siret: Set(request.siret),
            status: Set(SocieteStatus::Active),
            database_name: Set(request.database_name),
            configuration: Set(request.configuration),
            deleted_at: Set(None),
            created_by_id: Set(actor),
            updated_by_id: Set(actor),
            ..Default::default()
        };
        let model = active
            .insert(&*self.db)
            .await
            .map_err(|e| map_write_error(e, "Société"))?;
        info!(societe_id = %model.id, code = %model.code, "société created");
        Ok(model)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateSocieteRequest,
        actor: Option<Uuid>,
    ) -> Result<societe::Model, ServiceError> {
        request.validate()?;
        let mut active: societe::ActiveModel = self.get(id).await?.into_active_model();
        if let Some(v) = request.nom {
            active.nom = Set(v);
        }
        if let Some(v) = request.siret {
            active.siret = Set(Some(v));
        }
        if let Some(v) = request.database_name {
            active.database_name = Set(Some(v));
        }
        if let Some(v) = request.configuration {
            active.configuration = Set(Some(v));
        }
        active.updated_by_id = Set(actor);
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: Uuid,
        status: SocieteStatus,
        actor: Option<Uuid>,
    ) -> Result<societe::Model, ServiceError> {
        let existing = self.get(id).await?;
        if existing.status == status {
            return Ok(existing);
        }
        let mut active: societe::ActiveModel = existing.into_active_model();
        active.status = Set(status);
        active.updated_by_id = Set(actor);
        let model = active.update(&*self.db).await?;
        info!(societe_id = %id, status = ?status, "société status changed");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<(), ServiceError> {
        let mut active: societe::ActiveModel = self.get(id).await?.into_active_model();
        active.deleted_at = Set(Some(Utc::now()));
        active.status = Set(SocieteStatus::Inactive);
        active.updated_by_id = Set(actor);
        active.update(&*self.db).await?;
        info!(societe_id = %id, "société soft deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_and_siret_formats_are_enforced() {
        let valid = CreateSocieteRequest {
            code: "ACME-01".into(),
            nom: "Aciéries du Nord".into(),
            siret: Some("12345678901234".into()),
            database_name: None,
            configuration: None,
        };
        assert!(valid.validate().is_ok());

        let mut lower = valid.clone();
        lower.code = "acme".into();
        assert!(lower.validate().is_err());

        let mut short_siret = valid;
        short_siret.siret = Some("1234".into());
        assert!(short_siret.validate().is_err());
    }
}

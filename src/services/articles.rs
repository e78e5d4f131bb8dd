use super::{map_write_error, Page, PageRequest};
use crate::{
    entities::article::{self, ArticleStatus, ArticleType, Entity as ArticleEntity},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    Ok(())
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() || value.is_zero() {
        return Err(ValidationError::new("must_be_positive"));
    }
    Ok(())
}

fn default_status() -> ArticleStatus {
    ArticleStatus::Actif
}

fn default_coefficient() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 30))]
    pub reference: String,
    #[validate(length(min = 1, max = 255))]
    pub designation: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub article_type: ArticleType,
    #[serde(default = "default_status")]
    pub status: ArticleStatus,
    #[validate(length(max = 50))]
    pub famille: Option<String>,
    #[validate(length(max = 50))]
    pub sous_famille: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub unite_stock: String,
    #[validate(length(max = 10))]
    pub unite_achat: Option<String>,
    #[validate(length(max = 10))]
    pub unite_vente: Option<String>,
    #[serde(default = "default_coefficient")]
    #[validate(custom = "validate_positive")]
    pub coefficient_achat: Decimal,
    #[serde(default = "default_coefficient")]
    #[validate(custom = "validate_positive")]
    pub coefficient_vente: Decimal,
    #[validate(custom = "validate_non_negative")]
    pub prix_achat_standard: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub prix_vente_ht: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub taux_tva: Option<Decimal>,
    /// kg
    #[validate(custom = "validate_non_negative")]
    pub poids: Option<Decimal>,
    /// m³
    #[validate(custom = "validate_non_negative")]
    pub volume: Option<Decimal>,
    /// mm
    #[validate(custom = "validate_non_negative")]
    pub longueur: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub largeur: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub hauteur: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateArticleRequest {
    #[validate(length(min = 1, max = 30))]
    pub reference: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub designation: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub article_type: Option<ArticleType>,
    pub status: Option<ArticleStatus>,
    #[validate(length(max = 50))]
    pub famille: Option<String>,
    #[validate(length(max = 50))]
    pub sous_famille: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub unite_stock: Option<String>,
    #[validate(length(max = 10))]
    pub unite_achat: Option<String>,
    #[validate(length(max = 10))]
    pub unite_vente: Option<String>,
    #[validate(custom = "validate_positive")]
    pub coefficient_achat: Option<Decimal>,
    #[validate(custom = "validate_positive")]
    pub coefficient_vente: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub prix_achat_standard: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub prix_vente_ht: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub taux_tva: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub poids: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub volume: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub longueur: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub largeur: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub hauteur: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Matched against reference and designation
    pub search: Option<String>,
    pub famille: Option<String>,
    pub status: Option<ArticleStatus>,
    pub article_type: Option<ArticleType>,
}

/// Article master data, always scoped to one société
#[derive(Clone)]
pub struct ArticleService {
    db: Arc<DatabaseConnection>,
}

impl ArticleService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        societe_id: Uuid,
        filter: &ArticleFilter,
        page: PageRequest,
    ) -> Result<Page<article::Model>, ServiceError> {
        let mut query = ArticleEntity::find()
            .filter(article::Column::SocieteId.eq(societe_id))
            .filter(article::Column::DeletedAt.is_null());

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            query = query.filter(
                Condition::any()
                    .add(article::Column::Reference.like(pattern.as_str()))
                    .add(article::Column::Designation.like(pattern.as_str())),
            );
        }
        if let Some(famille) = &filter.famille {
            query = query.filter(article::Column::Famille.eq(famille.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(article::Column::Status.eq(status));
        }
        if let Some(kind) = filter.article_type {
            query = query.filter(article::Column::ArticleType.eq(kind));
        }

        let paginator = query
            .order_by_asc(article::Column::Reference)
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

    /// Live article of the société, if any
    #[instrument(skip(self))]
    pub async fn find(
        &self,
        societe_id: Uuid,
        id: Uuid,
    ) -> Result<Option<article::Model>, ServiceError> {
        Ok(ArticleEntity::find_by_id(id)
            .filter(article::Column::SocieteId.eq(societe_id))
            .filter(article::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?)
    }

    pub async fn get(&self, societe_id: Uuid, id: Uuid) -> Result<article::Model, ServiceError> {
        self.find(societe_id, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Article {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn get_by_reference(
        &self,
        societe_id: Uuid,
        reference: &str,
    ) -> Result<article::Model, ServiceError> {
        ArticleEntity::find()
            .filter(article::Column::SocieteId.eq(societe_id))
            .filter(article::Column::Reference.eq(reference))
            .filter(article::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Article with reference {} not found", reference))
            })
    }

    async fn ensure_reference_free(&self, societe_id: Uuid, reference: &str) -> Result<(), ServiceError> {
        let taken = ArticleEntity::find()
            .filter(article::Column::SocieteId.eq(societe_id))
            .filter(article::Column::Reference.eq(reference))
            .count(&*self.db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!(
                "Article reference {} already exists",
                reference
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        societe_id: Uuid,
        request: CreateArticleRequest,
        actor: Option<Uuid>,
    ) -> Result<article::Model, ServiceError> {
        request.validate()?;
        let reference = request.reference.trim().to_uppercase();
        self.ensure_reference_free(societe_id, &reference).await?;

        let active = article::ActiveModel {
            societe_id: Set(societe_id),
            reference: Set(reference),
            designation: Set(request.designation),
            description: Set(request.description),
            article_type: Set(request.article_type),
            status: Set(request.status),
            famille: Set(request.famille),
            sous_famille: Set(request.sous_famille),
            unite_stock: Set(request.unite_stock),
            unite_achat: Set(request.unite_achat),
            unite_vente: Set(request.unite_vente),
            coefficient_achat: Set(request.coefficient_achat),
            coefficient_vente: Set(request.coefficient_vente),
            prix_achat_standard: Set(request.prix_achat_standard),
            prix_vente_ht: Set(request.prix_vente_ht),
            taux_tva: Set(request.taux_tva),
            poids: Set(request.poids),
            volume: Set(request.volume),
            longueur: Set(request.longueur),
            largeur: Set(request.largeur),
            hauteur: Set(request.hauteur),
            deleted_at: Set(None),
            created_by_id: Set(actor),
            updated_by_id: Set(actor),
            ..Default::default()
        };

        let model = active
            .insert(&*self.db)
            .await
            .map_err(|e| map_write_error(e, "Article"))?;
        info!(article_id = %model.id, reference = %model.reference, "article created");
        Ok(model)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        societe_id: Uuid,
        id: Uuid,
        request: UpdateArticleRequest,
        actor: Option<Uuid>,
    ) -> Result<article::Model, ServiceError> {
        request.validate()?;
        let existing = self.get(societe_id, id).await?;

        let mut active: article::ActiveModel = existing.clone().into_active_model();
        if let Some(reference) = request.reference {
            let reference = reference.trim().to_uppercase();
            if reference != existing.reference {
                self.ensure_reference_free(societe_id, &reference).await?;
            }
            active.reference = Set(reference);
        }
        if let Some(v) = request.designation {
            active.designation = Set(v);
        }
        if let Some(v) = request.description {
            active.description = Set(Some(v));
        }
        if let Some(v) = request.article_type {
            active.article_type = Set(v);
        }
        if let Some(v) = request.status {
            active.status = Set(v);
        }
        if let Some(v) = request.famille {
            active.famille = Set(Some(v));
        }
        if let Some(v) = request.sous_famille {
            active.sous_famille = Set(Some(v));
        }
        if let Some(v) = request.unite_stock {
            active.unite_stock = Set(v);
        }
        if let Some(v) = request.unite_achat {
            active.unite_achat = Set(Some(v));
        }
        if let Some(v) = request.unite_vente {
            active.unite_vente = Set(Some(v));
        }
        if let Some(v) = request.coefficient_achat {
            active.coefficient_achat = Set(v);
        }
        if let Some(v) = request.coefficient_vente {
            active.coefficient_vente = Set(v);
        }
        if let Some(v) = request.prix_achat_standard {
            active.prix_achat_standard = Set(Some(v));
        }
        if let Some(v) = request.prix_vente_ht {
            active.prix_vente_ht = Set(Some(v));
        }
        if let Some(v) = request.taux_tva {
            active.taux_tva = Set(Some(v));
        }
        if let Some(v) = request.poids {
            active.poids = Set(Some(v));
        }
        if let Some(v) = request.volume {
            active.volume = Set(Some(v));
        }
        if let Some(v) = request.longueur {
            active.longueur = Set(Some(v));
        }
        if let Some(v) = request.largeur {
            active.largeur = Set(Some(v));
        }
        if let Some(v) = request.hauteur {
            active.hauteur = Set(Some(v));
        }
        active.updated_by_id = Set(actor);

        active
            .update(&*self.db)
            .await
            .map_err(|e| map_write_error(e, "Article"))
    }

    #[instrument(skip(self))]
    pub async fn soft_delete(
        &self,
        societe_id: Uuid,
        id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let existing = self.get(societe_id, id).await?;
        let mut active: article::ActiveModel = existing.into_active_model();
        active.deleted_at = Set(Some(Utc::now()));
        active.updated_by_id = Set(actor);
        active.update(&*self.db).await?;
        info!(article_id = %id, "article soft deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> CreateArticleRequest {
        serde_json::from_value(serde_json::json!({
            "reference": "TOL-INOX-2",
            "designation": "Tôle inox 304L ép. 2",
            "type": "MATIERE_PREMIERE",
            "unite_stock": "KG",
            "prix_vente_ht": "12.50"
        }))
        .unwrap()
    }

    #[test]
    fn defaults_apply_to_omitted_fields() {
        let req = request();
        assert_eq!(req.status, ArticleStatus::Actif);
        assert_eq!(req.coefficient_vente, Decimal::ONE);
        assert_eq!(req.prix_vente_ht, Some(dec!(12.50)));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn negative_prices_and_zero_coefficients_are_rejected() {
        let mut req = request();
        req.prix_vente_ht = Some(dec!(-1));
        assert!(req.validate().is_err());

        let mut req = request();
        req.coefficient_achat = Decimal::ZERO;
        assert!(req.validate().is_err());

        let mut req = request();
        req.reference = "X".repeat(31);
        assert!(req.validate().is_err());
    }
}

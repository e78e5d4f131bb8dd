use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleType {
    #[sea_orm(string_value = "MATIERE_PREMIERE")]
    MatierePremiere,
    #[sea_orm(string_value = "PRODUIT_FINI")]
    ProduitFini,
    #[sea_orm(string_value = "PRODUIT_SEMI_FINI")]
    ProduitSemiFini,
    #[sea_orm(string_value = "FOURNITURE")]
    Fourniture,
    #[sea_orm(string_value = "CONSOMMABLE")]
    Consommable,
    #[sea_orm(string_value = "SERVICE")]
    Service,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleStatus {
    #[sea_orm(string_value = "ACTIF")]
    Actif,
    #[sea_orm(string_value = "INACTIF")]
    Inactif,
    #[sea_orm(string_value = "OBSOLETE")]
    Obsolete,
    #[sea_orm(string_value = "EN_COURS_CREATION")]
    EnCoursCreation,
}

/// Article master data of a société.
///
/// Weight is in kg, volume in m³, dimensions in mm.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub societe_id: Uuid,
    pub reference: String,
    pub designation: String,
    pub description: Option<String>,
    #[sea_orm(column_name = "type")]
    pub article_type: ArticleType,
    pub status: ArticleStatus,
    pub famille: Option<String>,
    pub sous_famille: Option<String>,
    pub unite_stock: String,
    pub unite_achat: Option<String>,
    pub unite_vente: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 4)))")]
    pub coefficient_achat: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 4)))")]
    pub coefficient_vente: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))", nullable)]
    pub prix_achat_standard: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))", nullable)]
    pub prix_vente_ht: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub taux_tva: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))", nullable)]
    pub poids: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((15, 6)))", nullable)]
    pub volume: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub longueur: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub largeur: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub hauteur: Option<Decimal>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub version: i32,
    pub created_by_id: Option<Uuid>,
    pub updated_by_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::societe::Entity",
        from = "Column::SocieteId",
        to = "super::societe::Column::Id"
    )]
    Societe,
}

impl Related<super::societe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Societe.def()
    }
}

audited_behavior!();

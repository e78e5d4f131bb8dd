use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema, Display)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierType {
    #[sea_orm(string_value = "FABRICANT")]
    Fabricant,
    #[sea_orm(string_value = "DISTRIBUTEUR")]
    Distributeur,
    #[sea_orm(string_value = "GROSSISTE")]
    Grossiste,
    #[sea_orm(string_value = "IMPORTATEUR")]
    Importateur,
    #[sea_orm(string_value = "TRANSFORMATEUR")]
    Transformateur,
    #[sea_orm(string_value = "AUTRE")]
    Autre,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shared_suppliers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub raison_sociale: String,
    pub nom_commercial: Option<String>,
    pub siret: Option<String>,
    pub numero_tva: Option<String>,
    #[sea_orm(column_name = "type")]
    pub supplier_type: SupplierType,
    pub categories: Json,
    pub coordonnees: Option<Json>,
    pub contacts: Option<Json>,
    pub metadata: Option<Json>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub version: i32,
    pub created_by_id: Option<Uuid>,
    pub updated_by_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

audited_behavior!();

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema, Display)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialType {
    #[sea_orm(string_value = "ACIER")]
    Acier,
    #[sea_orm(string_value = "INOX")]
    Inox,
    #[sea_orm(string_value = "ALUMINIUM")]
    Aluminium,
    #[sea_orm(string_value = "CUIVRE")]
    Cuivre,
    #[sea_orm(string_value = "LAITON")]
    Laiton,
    #[sea_orm(string_value = "BRONZE")]
    Bronze,
    #[sea_orm(string_value = "ZINC")]
    Zinc,
    #[sea_orm(string_value = "PLASTIQUE")]
    Plastique,
    #[sea_orm(string_value = "COMPOSITE")]
    Composite,
    #[sea_orm(string_value = "AUTRE")]
    Autre,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialForm {
    #[sea_orm(string_value = "PLAQUE")]
    Plaque,
    #[sea_orm(string_value = "TUBE")]
    Tube,
    #[sea_orm(string_value = "BARRE")]
    Barre,
    #[sea_orm(string_value = "PROFILE")]
    Profile,
    #[sea_orm(string_value = "TOLE")]
    Tole,
    #[sea_orm(string_value = "FIL")]
    Fil,
    #[sea_orm(string_value = "BOBINE")]
    Bobine,
    #[sea_orm(string_value = "AUTRE")]
    Autre,
}

/// Material shared by every société
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shared_materials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub nom: String,
    pub description: Option<String>,
    #[sea_orm(column_name = "type")]
    pub material_type: MaterialType,
    pub forme: Option<MaterialForm>,
    pub nuance: Option<String>,
    pub norme: Option<String>,
    pub caracteristiques: Option<Json>,
    pub dimensions: Option<Json>,
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

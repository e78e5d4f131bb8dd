use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema, Display)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StandardType {
    #[sea_orm(string_value = "ISO")]
    Iso,
    #[sea_orm(string_value = "EN")]
    En,
    #[sea_orm(string_value = "NF")]
    Nf,
    #[sea_orm(string_value = "DIN")]
    Din,
    #[sea_orm(string_value = "ASTM")]
    Astm,
    #[sea_orm(string_value = "INTERNE")]
    Interne,
    #[sea_orm(string_value = "CLIENT")]
    Client,
    #[sea_orm(string_value = "AUTRE")]
    Autre,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shared_quality_standards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub nom: String,
    pub description: Option<String>,
    #[sea_orm(column_name = "type")]
    pub standard_type: StandardType,
    pub domaines: Json,
    pub date_publication: Option<Date>,
    pub date_application: Option<Date>,
    pub criteres: Option<Json>,
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

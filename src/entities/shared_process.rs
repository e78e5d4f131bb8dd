use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema, Display)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessType {
    #[sea_orm(string_value = "DECOUPE")]
    Decoupe,
    #[sea_orm(string_value = "PLIAGE")]
    Pliage,
    #[sea_orm(string_value = "SOUDAGE")]
    Soudage,
    #[sea_orm(string_value = "USINAGE")]
    Usinage,
    #[sea_orm(string_value = "PERCAGE")]
    Percage,
    #[sea_orm(string_value = "ASSEMBLAGE")]
    Assemblage,
    #[sea_orm(string_value = "TRAITEMENT")]
    Traitement,
    #[sea_orm(string_value = "FINITION")]
    Finition,
    #[sea_orm(string_value = "CONTROLE")]
    Controle,
    #[sea_orm(string_value = "AUTRE")]
    Autre,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessComplexity {
    #[sea_orm(string_value = "SIMPLE")]
    Simple,
    #[sea_orm(string_value = "MOYEN")]
    Moyen,
    #[sea_orm(string_value = "COMPLEXE")]
    Complexe,
    #[sea_orm(string_value = "EXPERT")]
    Expert,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shared_processes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub nom: String,
    pub description: Option<String>,
    #[sea_orm(column_name = "type")]
    pub process_type: ProcessType,
    pub complexite: Option<ProcessComplexity>,
    pub etapes: Option<Json>,
    pub equipements: Option<Json>,
    pub duree_estimee_minutes: Option<i32>,
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

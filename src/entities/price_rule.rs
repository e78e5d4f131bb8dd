use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Sales channel a rule targets. `All` matches every channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema, Display, EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum PriceChannel {
    #[sea_orm(string_value = "ALL")]
    All,
    #[sea_orm(string_value = "ERP")]
    Erp,
    #[sea_orm(string_value = "MARKETPLACE")]
    Marketplace,
    #[sea_orm(string_value = "API")]
    Api,
    #[sea_orm(string_value = "B2B")]
    B2b,
}

impl PriceChannel {
    pub fn matches(self, requested: PriceChannel) -> bool {
        self == PriceChannel::All || self == requested
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema, Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentType {
    #[sea_orm(string_value = "PERCENTAGE")]
    Percentage,
    #[sea_orm(string_value = "FIXED_AMOUNT")]
    FixedAmount,
    #[sea_orm(string_value = "FIXED_PRICE")]
    FixedPrice,
    #[sea_orm(string_value = "PRICE_PER_WEIGHT")]
    PricePerWeight,
    #[sea_orm(string_value = "PRICE_PER_LENGTH")]
    PricePerLength,
    #[sea_orm(string_value = "PRICE_PER_SURFACE")]
    PricePerSurface,
    #[sea_orm(string_value = "PRICE_PER_VOLUME")]
    PricePerVolume,
    #[sea_orm(string_value = "FORMULA")]
    Formula,
}

/// A pricing rule of a société.
///
/// `conditions` holds a JSON array of `pricing::PriceCondition`,
/// `customer_groups` a JSON array of group codes. `metadata.usageByCustomer`
/// tracks per-customer usage when `usage_limit_per_customer` is set.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "price_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub societe_id: Uuid,
    pub rule_name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub channel: PriceChannel,
    pub adjustment_type: AdjustmentType,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub adjustment_value: Decimal,
    pub adjustment_unit: Option<String>,
    pub formula: Option<String>,
    pub conditions: Json,
    pub priority: i32,
    pub combinable: bool,
    pub valid_from: Option<DateTimeUtc>,
    pub valid_until: Option<DateTimeUtc>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_customer: Option<i32>,
    pub usage_count: i32,
    pub article_id: Option<Uuid>,
    pub article_family: Option<String>,
    pub customer_groups: Json,
    pub metadata: Option<Json>,
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

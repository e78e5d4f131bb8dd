use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MenuItemType {
    #[sea_orm(string_value = "FOLDER")]
    Folder,
    #[sea_orm(string_value = "PROGRAM")]
    Program,
    #[sea_orm(string_value = "LINK")]
    Link,
    #[sea_orm(string_value = "DATA_VIEW")]
    DataView,
}

/// One entry of a menu configuration. `parent_id` is `None` for roots.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub config_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    #[sea_orm(column_name = "type")]
    pub item_type: MenuItemType,
    pub program_id: Option<String>,
    pub external_url: Option<String>,
    pub query_builder_id: Option<String>,
    pub icon: Option<String>,
    pub order_index: i32,
    pub is_visible: bool,
    pub open_in_new_tab: bool,
    pub required_roles: Json,
    pub required_permissions: Json,
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
        belongs_to = "super::menu_configuration::Entity",
        from = "Column::ConfigId",
        to = "super::menu_configuration::Column::Id",
        on_delete = "Cascade"
    )]
    Configuration,
}

impl Related<super::menu_configuration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Configuration.def()
    }
}

impl Model {
    pub fn required_roles(&self) -> Vec<String> {
        super::json_string_list(&self.required_roles)
    }

    pub fn required_permissions(&self) -> Vec<String> {
        super::json_string_list(&self.required_permissions)
    }
}

audited_behavior!();

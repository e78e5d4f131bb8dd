//! Menu configurations and their item trees.
//!
//! Exactly one configuration is active at a time; it is the one served to
//! users through [`MenuService::filtered_menu`]. System configurations cannot
//! be renamed or deleted.

use super::map_write_error;
use crate::{
    auth::AuthUser,
    entities::{
        menu_configuration::{self, Entity as MenuConfigEntity},
        menu_item::{self, Entity as MenuItemEntity, MenuItemType},
    },
    errors::ServiceError,
    tree::{self, DropPosition, MoveOptions, MoveOutcome, TreeError, TreeNode},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Deepest nesting a move may produce, roots being level 1
pub const MAX_MENU_DEPTH: usize = 5;

pub const DEFAULT_CONFIGURATION_NAME: &str = "Configuration par défaut";
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

fn default_true() -> bool {
    true
}

/// A menu item and, recursively, its children
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MenuItemInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: MenuItemType,
    #[validate(length(max = 255))]
    pub program_id: Option<String>,
    #[validate(url)]
    pub external_url: Option<String>,
    #[validate(length(max = 255))]
    pub query_builder_id: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    /// Defaults to the position in the list
    pub order_index: Option<i32>,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub open_in_new_tab: bool,
    #[serde(default)]
    pub required_roles: Vec<String>,
    #[serde(default)]
    pub required_permissions: Vec<String>,
    #[serde(default)]
    #[validate]
    #[schema(no_recursion)]
    pub children: Vec<MenuItemInput>,
}

impl MenuItemInput {
    fn check_target(&self) -> Result<(), ServiceError> {
        let missing = match self.item_type {
            MenuItemType::Folder => None,
            MenuItemType::Program if self.program_id.is_none() => Some("program_id"),
            MenuItemType::Link if self.external_url.is_none() => Some("external_url"),
            MenuItemType::DataView if self.query_builder_id.is_none() => Some("query_builder_id"),
            _ => None,
        };
        if let Some(field) = missing {
            return Err(ServiceError::ValidationError(format!(
                "Menu item '{}' of type {:?} requires {}",
                self.title, self.item_type, field
            )));
        }
        if self.item_type != MenuItemType::Folder && !self.children.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Only folders can have children ('{}')",
                self.title
            )));
        }
        self.children.iter().try_for_each(MenuItemInput::check_target)
    }

    /// Levels this item spans, itself included
    fn height(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(MenuItemInput::height)
            .max()
            .unwrap_or(0)
    }

    /// Fails when the item placed at `level` would reach below [`MAX_MENU_DEPTH`]
    fn check_depth(&self, level: usize) -> Result<(), ServiceError> {
        let depth = level + self.height() - 1;
        if depth > MAX_MENU_DEPTH {
            return Err(ServiceError::ValidationError(format!(
                "Menu item '{}' would reach depth {} (max {})",
                self.title, depth, MAX_MENU_DEPTH
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMenuConfigRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    pub societe_id: Option<Uuid>,
    #[serde(default)]
    #[validate]
    pub items: Vec<MenuItemInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuConfigRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    /// Replaces every item of the configuration when present
    pub items: Option<Vec<MenuItemInput>>,
}

/// Single item added to an existing configuration
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMenuItemRequest {
    pub parent_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate]
    pub item: MenuItemInput,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 255))]
    pub program_id: Option<String>,
    #[validate(url)]
    pub external_url: Option<String>,
    #[validate(length(max = 255))]
    pub query_builder_id: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub is_visible: Option<bool>,
    pub open_in_new_tab: Option<bool>,
    pub required_roles: Option<Vec<String>>,
    pub required_permissions: Option<Vec<String>>,
}

/// Drop of `dragged_id` onto `target_id`.
///
/// Either `position` or the pointer offset within the target row
/// (`offset_y` and `height`) must be given.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MoveMenuItemRequest {
    pub dragged_id: Uuid,
    pub target_id: Uuid,
    pub position: Option<DropPosition>,
    pub offset_y: Option<f64>,
    pub height: Option<f64>,
}

impl MoveMenuItemRequest {
    pub fn drop_position(&self) -> Result<DropPosition, ServiceError> {
        match (self.position, self.offset_y, self.height) {
            (Some(position), _, _) => Ok(position),
            (None, Some(offset_y), Some(height)) => Ok(DropPosition::from_pointer(offset_y, height)),
            _ => Err(ServiceError::ValidationError(
                "Either position or offset_y and height are required".to_string(),
            )),
        }
    }
}

/// Menu item with its children, as served to clients and exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MenuItemNode {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: MenuItemType,
    pub program_id: Option<String>,
    pub external_url: Option<String>,
    pub query_builder_id: Option<String>,
    pub icon: Option<String>,
    pub order_index: i32,
    pub is_visible: bool,
    pub open_in_new_tab: bool,
    pub required_roles: Vec<String>,
    pub required_permissions: Vec<String>,
    /// 0 for roots
    pub depth: usize,
    #[schema(no_recursion)]
    pub children: Vec<MenuItemNode>,
}

impl MenuItemNode {
    fn from_tree(node: TreeNode<Uuid, menu_item::Model>, depth: usize) -> Self {
        let TreeNode { data, children, .. } = node;
        Self {
            required_roles: data.required_roles(),
            required_permissions: data.required_permissions(),
            id: data.id,
            parent_id: data.parent_id,
            title: data.title,
            item_type: data.item_type,
            program_id: data.program_id,
            external_url: data.external_url,
            query_builder_id: data.query_builder_id,
            icon: data.icon,
            order_index: data.order_index,
            is_visible: data.is_visible,
            open_in_new_tab: data.open_in_new_tab,
            depth,
            children: children
                .into_iter()
                .map(|child| Self::from_tree(child, depth + 1))
                .collect(),
        }
    }

    /// Whether clicking the item leads somewhere
    pub fn has_target(&self) -> bool {
        self.program_id.is_some() || self.external_url.is_some() || self.query_builder_id.is_some()
    }

    fn can_access(&self, user: &AuthUser) -> bool {
        if !self.is_visible {
            return false;
        }
        if !self.required_roles.is_empty() && !user.has_any_role(&self.required_roles) {
            return false;
        }
        if !self.required_permissions.is_empty()
            && !user.has_any_permission(&self.required_permissions)
        {
            return false;
        }
        true
    }
}

/// Items the user may see. Folders left without children and without a
/// target of their own are dropped.
pub fn filter_for_user(nodes: Vec<MenuItemNode>, user: &AuthUser) -> Vec<MenuItemNode> {
    nodes
        .into_iter()
        .filter(|node| node.can_access(user))
        .filter_map(|mut node| {
            node.children = filter_for_user(std::mem::take(&mut node.children), user);
            (!node.children.is_empty() || node.has_target()).then_some(node)
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuExport {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub items: Vec<MenuItemNode>,
}

/// Import payload; an export document is accepted as is
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MenuImport {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    #[validate]
    pub items: Vec<MenuItemInput>,
}

fn config_not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Menu configuration {} not found", id))
}

fn item_not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Menu item {} not found", id))
}

fn tree_error(err: TreeError<Uuid>) -> ServiceError {
    match err {
        TreeError::NodeNotFound(id) => item_not_found(id),
        other => ServiceError::InvalidOperation(other.to_string()),
    }
}

/// Active models for `items` and their descendants, parents first
fn plan_items(
    config_id: Uuid,
    parent_id: Option<Uuid>,
    items: &[MenuItemInput],
    actor: Option<Uuid>,
    out: &mut Vec<menu_item::ActiveModel>,
) {
    for (position, item) in items.iter().enumerate() {
        let id = Uuid::new_v4();
        out.push(menu_item::ActiveModel {
            id: Set(id),
            config_id: Set(config_id),
            parent_id: Set(parent_id),
            title: Set(item.title.trim().to_string()),
            item_type: Set(item.item_type),
            program_id: Set(item.program_id.clone()),
            external_url: Set(item.external_url.clone()),
            query_builder_id: Set(item.query_builder_id.clone()),
            icon: Set(item.icon.clone()),
            order_index: Set(item.order_index.unwrap_or(position as i32)),
            is_visible: Set(item.is_visible),
            open_in_new_tab: Set(item.open_in_new_tab),
            required_roles: Set(json!(item.required_roles)),
            required_permissions: Set(json!(item.required_permissions)),
            deleted_at: Set(None),
            created_by_id: Set(actor),
            updated_by_id: Set(actor),
            ..Default::default()
        });
        plan_items(config_id, Some(id), &item.children, actor, out);
    }
}

fn default_items() -> Vec<MenuItemInput> {
    fn program(title: &str, program_id: &str, icon: &str, order: i32) -> MenuItemInput {
        MenuItemInput {
            title: title.to_string(),
            item_type: MenuItemType::Program,
            program_id: Some(program_id.to_string()),
            external_url: None,
            query_builder_id: None,
            icon: Some(icon.to_string()),
            order_index: Some(order),
            is_visible: true,
            open_in_new_tab: false,
            required_roles: Vec::new(),
            required_permissions: Vec::new(),
            children: Vec::new(),
        }
    }
    fn restricted(mut item: MenuItemInput, permission: &str) -> MenuItemInput {
        item.required_permissions = vec![permission.to_string()];
        item
    }

    let administration = MenuItemInput {
        title: "Administration".to_string(),
        item_type: MenuItemType::Folder,
        program_id: None,
        external_url: None,
        query_builder_id: None,
        icon: Some("Shield".to_string()),
        order_index: Some(100),
        is_visible: true,
        open_in_new_tab: false,
        required_roles: vec!["ADMIN".to_string(), "SUPER_ADMIN".to_string()],
        required_permissions: Vec::new(),
        children: vec![
            restricted(
                program("Gestion des utilisateurs", "/admin/users", "Users", 1),
                "USER_MANAGEMENT_VIEW",
            ),
            restricted(
                program("Gestion des rôles", "/admin/roles", "Shield", 2),
                "ROLE_MANAGEMENT_VIEW",
            ),
            restricted(
                program("Gestion des groupes", "/admin/groups", "Building", 3),
                "USER_MANAGEMENT_VIEW",
            ),
            restricted(
                program("Gestion des menus", "/admin/menus", "Menu", 4),
                "MENU_MANAGEMENT_VIEW",
            ),
        ],
    };

    vec![
        program("Tableau de bord", "/dashboard", "Home", 1),
        administration,
        program("Query Builder", "/query-builder", "Database", 50),
    ]
}

#[derive(Clone)]
pub struct MenuService {
    db: Arc<DatabaseConnection>,
}

impl MenuService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// System configurations first, then by name
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<menu_configuration::Model>, ServiceError> {
        Ok(MenuConfigEntity::find()
            .filter(menu_configuration::Column::DeletedAt.is_null())
            .order_by_desc(menu_configuration::Column::IsSystem)
            .order_by_asc(menu_configuration::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn active(&self) -> Result<Option<menu_configuration::Model>, ServiceError> {
        Ok(MenuConfigEntity::find()
            .filter(menu_configuration::Column::IsActive.eq(true))
            .filter(menu_configuration::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<menu_configuration::Model, ServiceError> {
        MenuConfigEntity::find_by_id(id)
            .filter(menu_configuration::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| config_not_found(id))
    }

    async fn ensure_name_free(&self, name: &str) -> Result<(), ServiceError> {
        let taken = MenuConfigEntity::find()
            .filter(menu_configuration::Column::Name.eq(name))
            .count(&*self.db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(format!(
                "A menu configuration named \"{}\" already exists",
                name
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        request: CreateMenuConfigRequest,
        actor: Option<Uuid>,
    ) -> Result<menu_configuration::Model, ServiceError> {
        self.create_configuration(request, false, actor).await
    }

    async fn create_configuration(
        &self,
        request: CreateMenuConfigRequest,
        is_system: bool,
        actor: Option<Uuid>,
    ) -> Result<menu_configuration::Model, ServiceError> {
        request.validate()?;
        request.items.iter().try_for_each(MenuItemInput::check_target)?;
        request.items.iter().try_for_each(|item| item.check_depth(1))?;
        let name = request.name.trim().to_string();
        self.ensure_name_free(&name).await?;

        let txn = self.db.begin().await?;
        let config = menu_configuration::ActiveModel {
            name: Set(name),
            description: Set(request.description),
            is_active: Set(false),
            is_system: Set(is_system),
            societe_id: Set(request.societe_id),
            deleted_at: Set(None),
            created_by_id: Set(actor),
            updated_by_id: Set(actor),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| map_write_error(e, "Menu configuration"))?;

        insert_items(&txn, config.id, None, &request.items, actor).await?;
        txn.commit().await?;

        info!(config_id = %config.id, is_system, "menu configuration created");
        Ok(config)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateMenuConfigRequest,
        actor: Option<Uuid>,
    ) -> Result<menu_configuration::Model, ServiceError> {
        request.validate()?;
        let existing = self.get(id).await?;

        if let Some(name) = request.name.as_deref().map(str::trim) {
            if existing.is_system && name != existing.name {
                return Err(ServiceError::Forbidden(
                    "System menu configurations cannot be renamed".to_string(),
                ));
            }
            if name != existing.name {
                self.ensure_name_free(name).await?;
            }
        }
        if let Some(items) = &request.items {
            for item in items {
                item.validate()?;
                item.check_target()?;
            }
        }

        let txn = self.db.begin().await?;
        let mut active: menu_configuration::ActiveModel = existing.into_active_model();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        active.updated_by_id = Set(actor);
        let config = active
            .update(&txn)
            .await
            .map_err(|e| map_write_error(e, "Menu configuration"))?;

        if let Some(items) = &request.items {
            soft_delete_items(&txn, id, None).await?;
            insert_items(&txn, id, None, items, actor).await?;
        }
        txn.commit().await?;
        Ok(config)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        if existing.is_system {
            return Err(ServiceError::Forbidden(
                "System menu configurations cannot be deleted".to_string(),
            ));
        }
        if existing.is_active {
            return Err(ServiceError::Forbidden(
                "The active menu configuration cannot be deleted".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        soft_delete_items(&txn, id, None).await?;
        let mut active: menu_configuration::ActiveModel = existing.into_active_model();
        active.deleted_at = Set(Some(Utc::now()));
        active.updated_by_id = Set(actor);
        active.update(&txn).await?;
        txn.commit().await?;

        info!(config_id = %id, "menu configuration deleted");
        Ok(())
    }

    /// Makes `id` the only active configuration
    #[instrument(skip(self))]
    pub async fn activate(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<menu_configuration::Model, ServiceError> {
        let existing = self.get(id).await?;

        let txn = self.db.begin().await?;
        MenuConfigEntity::update_many()
            .col_expr(menu_configuration::Column::IsActive, Expr::value(false))
            .filter(menu_configuration::Column::IsActive.eq(true))
            .filter(menu_configuration::Column::Id.ne(id))
            .exec(&txn)
            .await?;

        let config = if existing.is_active {
            existing
        } else {
            let mut active: menu_configuration::ActiveModel = existing.into_active_model();
            active.is_active = Set(true);
            active.updated_by_id = Set(actor);
            active.update(&txn).await?
        };
        txn.commit().await?;

        info!(config_id = %id, "menu configuration activated");
        Ok(config)
    }

    async fn load_forest(
        &self,
        config_id: Uuid,
    ) -> Result<Vec<TreeNode<Uuid, menu_item::Model>>, ServiceError> {
        let items = MenuItemEntity::find()
            .filter(menu_item::Column::ConfigId.eq(config_id))
            .filter(menu_item::Column::DeletedAt.is_null())
            .all(&*self.db)
            .await?;
        Ok(tree::build_forest(
            items,
            |item| item.id,
            |item| item.parent_id,
            |item| (item.order_index, item.created_at),
        ))
    }

    /// Items of the configuration as a tree, siblings ordered by `order_index`
    #[instrument(skip(self))]
    pub async fn get_menu_tree(&self, config_id: Uuid) -> Result<Vec<MenuItemNode>, ServiceError> {
        self.get(config_id).await?;
        let forest = self.load_forest(config_id).await?;
        Ok(forest
            .into_iter()
            .map(|node| MenuItemNode::from_tree(node, 0))
            .collect())
    }

    /// Active menu trimmed to what the user may see; empty without an active configuration
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn filtered_menu(&self, user: &AuthUser) -> Result<Vec<MenuItemNode>, ServiceError> {
        match self.active().await? {
            Some(config) => Ok(filter_for_user(self.get_menu_tree(config.id).await?, user)),
            None => Ok(Vec::new()),
        }
    }

    /// Creates the system configuration shipped with every installation
    #[instrument(skip(self))]
    pub async fn create_default_configuration(
        &self,
        actor: Option<Uuid>,
    ) -> Result<menu_configuration::Model, ServiceError> {
        self.create_configuration(
            CreateMenuConfigRequest {
                name: DEFAULT_CONFIGURATION_NAME.to_string(),
                description: Some("Configuration de menu par défaut".to_string()),
                societe_id: None,
                items: default_items(),
            },
            true,
            actor,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn export(&self, id: Uuid) -> Result<MenuExport, ServiceError> {
        let config = self.get(id).await?;
        let items = self.get_menu_tree(id).await?;
        Ok(MenuExport {
            name: config.name,
            description: config.description,
            version: EXPORT_FORMAT_VERSION.to_string(),
            exported_at: Utc::now(),
            items,
        })
    }

    #[instrument(skip(self, import), fields(name = %import.name))]
    pub async fn import(
        &self,
        import: MenuImport,
        actor: Option<Uuid>,
    ) -> Result<menu_configuration::Model, ServiceError> {
        import.validate()?;
        self.create(
            CreateMenuConfigRequest {
                name: import.name,
                description: import.description,
                societe_id: None,
                items: import.items,
            },
            actor,
        )
        .await
    }

    /// Appends an item (and its children) under `parent_id`, or at root level
    #[instrument(skip(self, request))]
    pub async fn add_item(
        &self,
        config_id: Uuid,
        request: CreateMenuItemRequest,
        actor: Option<Uuid>,
    ) -> Result<menu_item::Model, ServiceError> {
        request.validate()?;
        request.item.check_target()?;
        self.get(config_id).await?;

        if let Some(parent_id) = request.parent_id {
            let parent = self.get_item(config_id, parent_id).await?;
            if parent.item_type != MenuItemType::Folder {
                return Err(ServiceError::ValidationError(
                    "Items can only be added to folders".to_string(),
                ));
            }
            let forest = self.load_forest(config_id).await?;
            let parent_level =
                tree::level_of(&forest, &parent_id).ok_or_else(|| item_not_found(parent_id))?;
            request.item.check_depth(parent_level + 1)?;
        } else {
            request.item.check_depth(1)?;
        }

        let siblings = MenuItemEntity::find()
            .filter(menu_item::Column::ConfigId.eq(config_id))
            .filter(match request.parent_id {
                Some(parent_id) => menu_item::Column::ParentId.eq(parent_id),
                None => menu_item::Column::ParentId.is_null(),
            })
            .filter(menu_item::Column::DeletedAt.is_null())
            .count(&*self.db)
            .await?;

        let mut item = request.item;
        item.order_index.get_or_insert(siblings as i32);

        let txn = self.db.begin().await?;
        let inserted = insert_items(
            &txn,
            config_id,
            request.parent_id,
            std::slice::from_ref(&item),
            actor,
        )
        .await?;
        txn.commit().await?;

        let id = inserted.first().copied().ok_or_else(|| {
            ServiceError::InternalError("menu item insert returned no id".to_string())
        })?;
        self.get_item(config_id, id).await
    }

    pub async fn get_item(&self, config_id: Uuid, id: Uuid) -> Result<menu_item::Model, ServiceError> {
        MenuItemEntity::find_by_id(id)
            .filter(menu_item::Column::ConfigId.eq(config_id))
            .filter(menu_item::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| item_not_found(id))
    }

    #[instrument(skip(self, request))]
    pub async fn update_item(
        &self,
        config_id: Uuid,
        id: Uuid,
        request: UpdateMenuItemRequest,
        actor: Option<Uuid>,
    ) -> Result<menu_item::Model, ServiceError> {
        request.validate()?;
        let mut active: menu_item::ActiveModel =
            self.get_item(config_id, id).await?.into_active_model();

        if let Some(v) = request.title {
            active.title = Set(v.trim().to_string());
        }
        if let Some(v) = request.program_id {
            active.program_id = Set(Some(v));
        }
        if let Some(v) = request.external_url {
            active.external_url = Set(Some(v));
        }
        if let Some(v) = request.query_builder_id {
            active.query_builder_id = Set(Some(v));
        }
        if let Some(v) = request.icon {
            active.icon = Set(Some(v));
        }
        if let Some(v) = request.is_visible {
            active.is_visible = Set(v);
        }
        if let Some(v) = request.open_in_new_tab {
            active.open_in_new_tab = Set(v);
        }
        if let Some(v) = request.required_roles {
            active.required_roles = Set(json!(v));
        }
        if let Some(v) = request.required_permissions {
            active.required_permissions = Set(json!(v));
        }
        active.updated_by_id = Set(actor);
        Ok(active.update(&*self.db).await?)
    }

    /// Soft deletes the item with its whole subtree
    #[instrument(skip(self))]
    pub async fn delete_item(&self, config_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        self.get_item(config_id, id).await?;
        let forest = self.load_forest(config_id).await?;
        let subtree = tree::find_node(&forest, &id).ok_or_else(|| item_not_found(id))?;

        let mut ids = Vec::with_capacity(subtree.len());
        collect_ids(subtree, &mut ids);
        let txn = self.db.begin().await?;
        soft_delete_items(&txn, config_id, Some(ids)).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Moves an item and persists the resulting order of the whole configuration
    #[instrument(skip(self, request), fields(dragged = %request.dragged_id, target = %request.target_id))]
    pub async fn move_item(
        &self,
        config_id: Uuid,
        request: &MoveMenuItemRequest,
        actor: Option<Uuid>,
    ) -> Result<Vec<MenuItemNode>, ServiceError> {
        let position = request.drop_position()?;
        self.get(config_id).await?;

        let mut forest = self.load_forest(config_id).await?;
        let mut current: HashMap<Uuid, menu_item::Model> = HashMap::new();
        collect_models(&forest, &mut current);

        if let Some(target) = current.get(&request.target_id) {
            if position == DropPosition::Inside && target.item_type != MenuItemType::Folder {
                return Err(ServiceError::InvalidOperation(
                    "Items can only be dropped inside folders".to_string(),
                ));
            }
        }

        let outcome = tree::move_node(
            &mut forest,
            &request.dragged_id,
            &request.target_id,
            position,
            MoveOptions {
                max_depth: Some(MAX_MENU_DEPTH),
            },
        )
        .map_err(tree_error)?;

        if let MoveOutcome::Moved { .. } = outcome {
            let txn = self.db.begin().await?;
            let mut changed = 0usize;
            for row in tree::flatten_order(&forest) {
                let Some(model) = current.remove(&row.id) else {
                    continue;
                };
                let order_index = row.order_index as i32;
                if model.parent_id == row.parent_id && model.order_index == order_index {
                    continue;
                }
                let mut active: menu_item::ActiveModel = model.into_active_model();
                active.parent_id = Set(row.parent_id);
                active.order_index = Set(order_index);
                active.updated_by_id = Set(actor);
                active.update(&txn).await?;
                changed += 1;
            }
            txn.commit().await?;
            info!(config_id = %config_id, changed, "menu items reordered");
        }

        Ok(forest
            .into_iter()
            .map(|node| MenuItemNode::from_tree(node, 0))
            .collect())
    }
}

fn collect_ids(node: &TreeNode<Uuid, menu_item::Model>, out: &mut Vec<Uuid>) {
    out.push(node.id);
    for child in &node.children {
        collect_ids(child, out);
    }
}

fn collect_models(nodes: &[TreeNode<Uuid, menu_item::Model>], out: &mut HashMap<Uuid, menu_item::Model>) {
    for node in nodes {
        out.insert(node.id, node.data.clone());
        collect_models(&node.children, out);
    }
}

/// Inserts the planned items and returns their ids, parents first
async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    config_id: Uuid,
    parent_id: Option<Uuid>,
    items: &[MenuItemInput],
    actor: Option<Uuid>,
) -> Result<Vec<Uuid>, ServiceError> {
    let mut planned = Vec::new();
    plan_items(config_id, parent_id, items, actor, &mut planned);

    let mut ids = Vec::with_capacity(planned.len());
    for item in planned {
        let model = item.insert(conn).await?;
        ids.push(model.id);
    }
    Ok(ids)
}

/// Soft deletes the given items of a configuration, or all of them
async fn soft_delete_items<C: ConnectionTrait>(
    conn: &C,
    config_id: Uuid,
    ids: Option<Vec<Uuid>>,
) -> Result<(), ServiceError> {
    let mut update = MenuItemEntity::update_many()
        .col_expr(menu_item::Column::DeletedAt, Expr::value(Utc::now()))
        .filter(menu_item::Column::ConfigId.eq(config_id))
        .filter(menu_item::Column::DeletedAt.is_null());
    if let Some(ids) = ids {
        update = update.filter(menu_item::Column::Id.is_in(ids));
    }
    update.exec(conn).await?;
    Ok(())
}

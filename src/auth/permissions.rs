/*!
 * # Permissions Module
 *
 * Permission strings follow the `resource:action` convention. A grant of
 * `resource:*` covers every action on that resource and `*` covers everything.
 */

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const CREATE: &'static str = "create";
    pub const UPDATE: &'static str = "update";
    pub const DELETE: &'static str = "delete";
    pub const MANAGE: &'static str = "manage";
    pub const ALL: &'static str = "*";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const CATALOG: &'static str = "catalog";
    pub const ARTICLES: &'static str = "articles";
    pub const PRICING: &'static str = "pricing";
    pub const MENU: &'static str = "menu";
    pub const SOCIETES: &'static str = "societes";
    pub const DATABASE: &'static str = "database";
}

/// Role names carried in tokens
pub mod roles {
    pub const ADMIN: &str = "ADMIN";
    pub const SUPER_ADMIN: &str = "SUPER_ADMIN";
    pub const USER: &str = "USER";
}

/// Common permission string constants for compile-time safety
pub mod consts {
    // Shared catalog
    pub const CATALOG_READ: &str = "catalog:read";
    pub const CATALOG_WRITE: &str = "catalog:update";

    // Articles
    pub const ARTICLES_READ: &str = "articles:read";
    pub const ARTICLES_WRITE: &str = "articles:update";

    // Pricing
    pub const PRICING_READ: &str = "pricing:read";
    pub const PRICING_MANAGE: &str = "pricing:manage";

    // Menu
    pub const MENU_READ: &str = "menu:read";
    pub const MENU_MANAGE: &str = "menu:manage";
}

/// Whether `granted` covers `required`.
pub fn permission_matches(granted: &str, required: &str) -> bool {
    if granted == Actions::ALL || granted == required {
        return true;
    }
    match (granted.split_once(':'), required.split_once(':')) {
        (Some((granted_resource, Actions::ALL)), Some((required_resource, _))) => {
            granted_resource == required_resource
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_cover_resource_actions() {
        assert!(permission_matches("pricing:*", consts::PRICING_MANAGE));
        assert!(permission_matches("*", consts::MENU_MANAGE));
        assert!(permission_matches(consts::CATALOG_READ, consts::CATALOG_READ));
        assert!(!permission_matches("catalog:*", consts::PRICING_READ));
        assert!(!permission_matches(consts::CATALOG_READ, consts::CATALOG_WRITE));
    }
}

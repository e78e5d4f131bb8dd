use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Steel ERP API",
        version = "0.3.0",
        description = r#"
# Steel ERP API

Backend of a multi-tenant ERP for steel fabrication shops.

## Features

- **Shared catalog**: materials, processes, quality standards and suppliers shared by every société
- **Articles**: the priced items of each société
- **Pricing**: rule-based price calculation with a step-by-step breakdown
- **Menus**: configurable navigation trees filtered by role and permission
- **Administration**: sociétés and database health

## Authentication

Every business endpoint expects a bearer JWT issued for a société:

```
Authorization: Bearer <your-jwt-token>
```

## CSRF

Unsafe methods (`POST`, `PUT`, `PATCH`, `DELETE`) need a token from `GET /api/csrf/token`,
sent back in the `X-CSRF-Token` header together with the cookies set by that call.

## Pagination

List endpoints accept `page` (from 1) and `per_page`, capped by the server.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Shared catalog", description = "Materials, processes, quality standards and suppliers"),
        (name = "Articles", description = "Articles of the current société"),
        (name = "Pricing", description = "Price calculation and rule preview"),
        (name = "Price rules", description = "Pricing rule management"),
        (name = "Menu", description = "Menu of the current user"),
        (name = "Menu administration", description = "Menu configurations and items"),
        (name = "Sociétés", description = "Tenant administration"),
        (name = "Database administration", description = "Connection, schema integrity and migrations"),
        (name = "CSRF", description = "Anti-forgery tokens")
    ),
    paths(
        // Shared catalog
        crate::handlers::catalog::materials::list,
        crate::handlers::catalog::materials::get_one,
        crate::handlers::catalog::materials::get_by_code,
        crate::handlers::catalog::materials::stats,
        crate::handlers::catalog::materials::create,
        crate::handlers::catalog::materials::update,
        crate::handlers::catalog::materials::remove,
        crate::handlers::catalog::processes::list,
        crate::handlers::catalog::processes::get_one,
        crate::handlers::catalog::processes::get_by_code,
        crate::handlers::catalog::processes::stats,
        crate::handlers::catalog::processes::create,
        crate::handlers::catalog::processes::update,
        crate::handlers::catalog::processes::remove,
        crate::handlers::catalog::quality_standards::list,
        crate::handlers::catalog::quality_standards::get_one,
        crate::handlers::catalog::quality_standards::get_by_code,
        crate::handlers::catalog::quality_standards::stats,
        crate::handlers::catalog::quality_standards::create,
        crate::handlers::catalog::quality_standards::update,
        crate::handlers::catalog::quality_standards::remove,
        crate::handlers::catalog::suppliers::list,
        crate::handlers::catalog::suppliers::get_one,
        crate::handlers::catalog::suppliers::get_by_code,
        crate::handlers::catalog::suppliers::stats,
        crate::handlers::catalog::suppliers::create,
        crate::handlers::catalog::suppliers::update,
        crate::handlers::catalog::suppliers::remove,

        // Articles
        crate::handlers::articles::list_articles,
        crate::handlers::articles::get_article,
        crate::handlers::articles::get_article_by_reference,
        crate::handlers::articles::create_article,
        crate::handlers::articles::update_article,
        crate::handlers::articles::delete_article,

        // Pricing
        crate::handlers::pricing::calculate_price,
        crate::handlers::pricing::calculate_bulk_prices,
        crate::handlers::pricing::preview_rule,
        crate::handlers::price_rules::list_price_rules,
        crate::handlers::price_rules::list_active_price_rules,
        crate::handlers::price_rules::get_price_rule,
        crate::handlers::price_rules::create_price_rule,
        crate::handlers::price_rules::update_price_rule,
        crate::handlers::price_rules::toggle_price_rule,
        crate::handlers::price_rules::delete_price_rule,

        // Menus
        crate::handlers::menu::user_menu,
        crate::handlers::menu::list_configurations,
        crate::handlers::menu::active_configuration,
        crate::handlers::menu::get_configuration,
        crate::handlers::menu::configuration_tree,
        crate::handlers::menu::export_configuration,
        crate::handlers::menu::create_configuration,
        crate::handlers::menu::create_default_configuration,
        crate::handlers::menu::import_configuration,
        crate::handlers::menu::update_configuration,
        crate::handlers::menu::delete_configuration,
        crate::handlers::menu::activate_configuration,
        crate::handlers::menu::add_item,
        crate::handlers::menu::update_item,
        crate::handlers::menu::delete_item,
        crate::handlers::menu::move_item,

        // Administration
        crate::handlers::societes::list_societes,
        crate::handlers::societes::get_societe,
        crate::handlers::societes::create_societe,
        crate::handlers::societes::update_societe,
        crate::handlers::societes::change_societe_status,
        crate::handlers::societes::delete_societe,
        crate::handlers::admin_database::connection_status,
        crate::handlers::admin_database::integrity,
        crate::handlers::admin_database::migration_status,
        crate::handlers::admin_database::run_migrations,

        // CSRF
        crate::handlers::csrf::issue_token,
        crate::handlers::csrf::csrf_config,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::errors::ErrorResponse,
            crate::tree::DropPosition,
            crate::services::menu::MenuItemNode,
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

/// Registers the `Bearer` scheme referenced by secured paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_business_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Steel ERP API"));
        assert!(json.contains("/api/shared/materials/{id}"));
        assert!(json.contains("/api/pricing/calculate"));
        assert!(json.contains("/api/admin/menus/configurations/{id}/items/move"));
        assert!(json.contains("\"Bearer\""));
    }
}

pub mod admin_database;
pub mod articles;
pub mod catalog;
pub mod common;
pub mod csrf;
pub mod menu;
pub mod price_rules;
pub mod pricing;
pub mod societes;

use crate::{
    cache::CacheBackend,
    config::AppConfig,
    services::{
        articles::ArticleService,
        catalog::{MaterialService, ProcessService, QualityStandardService, SupplierService},
        database_admin::DatabaseAdminService,
        menu::MenuService,
        price_rules::PriceRuleService,
        pricing::PricingService,
        societes::SocieteService,
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub materials: MaterialService,
    pub processes: ProcessService,
    pub quality_standards: QualityStandardService,
    pub suppliers: SupplierService,
    pub articles: ArticleService,
    pub price_rules: PriceRuleService,
    pub pricing: PricingService,
    pub menu: MenuService,
    pub societes: SocieteService,
    pub database: DatabaseAdminService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        cache: Arc<dyn CacheBackend>,
        config: &AppConfig,
    ) -> Self {
        let articles = ArticleService::new(db.clone());
        let price_rules = PriceRuleService::new(db.clone(), cache);
        let pricing = PricingService::new(
            articles.clone(),
            price_rules.clone(),
            config.default_currency.clone(),
        );

        Self {
            materials: MaterialService::new(db.clone()),
            processes: ProcessService::new(db.clone()),
            quality_standards: QualityStandardService::new(db.clone()),
            suppliers: SupplierService::new(db.clone()),
            articles,
            price_rules,
            pricing,
            menu: MenuService::new(db.clone()),
            societes: SocieteService::new(db.clone()),
            database: DatabaseAdminService::new(db),
        }
    }
}

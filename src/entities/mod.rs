//! sea-orm entities.
//!
//! Every business table carries the same audit columns (`created_at`,
//! `updated_at`, `deleted_at`, `version`, `created_by_id`, `updated_by_id`).
//! Rows are soft deleted through `deleted_at`; reads must filter on it.

/// Stamps audit columns on save: ids and `version = 1` on insert, `version + 1`
/// on every update, `updated_at` always.
macro_rules! audited_behavior {
    () => {
        #[async_trait::async_trait]
        impl ActiveModelBehavior for ActiveModel {
            async fn before_save<C: ConnectionTrait>(
                mut self,
                _db: &C,
                insert: bool,
            ) -> Result<Self, DbErr> {
                let now = chrono::Utc::now();
                if insert {
                    if self.id.is_not_set() {
                        self.id = sea_orm::ActiveValue::Set(uuid::Uuid::new_v4());
                    }
                    self.created_at = sea_orm::ActiveValue::Set(now);
                    self.version = sea_orm::ActiveValue::Set(1);
                } else if let Some(version) = self.version.clone().take() {
                    self.version = sea_orm::ActiveValue::Set(version + 1);
                }
                self.updated_at = sea_orm::ActiveValue::Set(now);
                Ok(self)
            }
        }
    };
}

pub mod article;
pub mod menu_configuration;
pub mod menu_item;
pub mod price_rule;
pub mod shared_material;
pub mod shared_process;
pub mod shared_quality_standard;
pub mod shared_supplier;
pub mod societe;

/// Parses a JSON array column of strings, ignoring anything else.
pub fn json_string_list(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_lists_skip_non_strings() {
        assert_eq!(
            json_string_list(&json!(["ADMIN", 3, null, "USER"])),
            vec!["ADMIN".to_string(), "USER".to_string()]
        );
        assert!(json_string_list(&json!({"a": 1})).is_empty());
    }
}

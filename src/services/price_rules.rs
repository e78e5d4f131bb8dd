use super::{map_write_error, Page, PageRequest};
use crate::{
    cache::{self, CacheBackend},
    entities::price_rule::{self, AdjustmentType, Entity as PriceRuleEntity, PriceChannel},
    errors::ServiceError,
    pricing::{formula::Formula, PriceCondition},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const RULE_TTL: Duration = Duration::from_secs(3600);
const ACTIVE_RULES_TTL: Duration = Duration::from_secs(300);
const MAX_USAGE_ATTEMPTS: u32 = 16;

fn rule_key(id: Uuid) -> String {
    format!("price_rule:{}", id)
}

fn active_rules_key(societe_id: Uuid) -> String {
    format!("active_rules:{}", societe_id)
}

fn default_true() -> bool {
    true
}

fn default_channel() -> PriceChannel {
    PriceChannel::All
}

/// Payload creating a price rule; also used as a draft by rule previews
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePriceRuleRequest {
    #[validate(length(min = 1, max = 255))]
    pub rule_name: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_channel")]
    pub channel: PriceChannel,
    pub adjustment_type: AdjustmentType,
    pub adjustment_value: Decimal,
    #[validate(length(max = 10))]
    pub adjustment_unit: Option<String>,
    #[validate(length(max = 1000))]
    pub formula: Option<String>,
    #[serde(default)]
    pub conditions: Vec<PriceCondition>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub combinable: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub usage_limit: Option<i32>,
    #[validate(range(min = 1))]
    pub usage_limit_per_customer: Option<i32>,
    pub article_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub article_family: Option<String>,
    #[serde(default)]
    pub customer_groups: Vec<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl CreatePriceRuleRequest {
    /// A rule built from this payload, never persisted as is
    pub fn to_model(&self, societe_id: Uuid) -> price_rule::Model {
        let now = Utc::now();
        price_rule::Model {
            id: Uuid::new_v4(),
            societe_id,
            rule_name: self.rule_name.trim().to_string(),
            description: self.description.clone(),
            is_active: self.is_active,
            channel: self.channel,
            adjustment_type: self.adjustment_type,
            adjustment_value: self.adjustment_value,
            adjustment_unit: normalize_unit(self.adjustment_unit.as_deref()),
            formula: self.formula.clone(),
            conditions: json!(self.conditions),
            priority: self.priority,
            combinable: self.combinable,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            usage_limit: self.usage_limit,
            usage_limit_per_customer: self.usage_limit_per_customer,
            usage_count: 0,
            article_id: self.article_id,
            article_family: self.article_family.clone(),
            customer_groups: json!(self.customer_groups),
            metadata: self.metadata.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            version: 1,
            created_by_id: None,
            updated_by_id: None,
        }
    }
}

/// Partial update of a price rule; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePriceRuleRequest {
    #[validate(length(min = 1, max = 255))]
    pub rule_name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub channel: Option<PriceChannel>,
    pub adjustment_type: Option<AdjustmentType>,
    pub adjustment_value: Option<Decimal>,
    #[validate(length(max = 10))]
    pub adjustment_unit: Option<String>,
    #[validate(length(max = 1000))]
    pub formula: Option<String>,
    pub conditions: Option<Vec<PriceCondition>>,
    pub priority: Option<i32>,
    pub combinable: Option<bool>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub usage_limit: Option<i32>,
    #[validate(range(min = 1))]
    pub usage_limit_per_customer: Option<i32>,
    pub article_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub article_family: Option<String>,
    pub customer_groups: Option<Vec<String>>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl UpdatePriceRuleRequest {
    /// The rule as it would look after the update
    fn merge_into(self, mut rule: price_rule::Model) -> price_rule::Model {
        if let Some(v) = self.rule_name {
            rule.rule_name = v.trim().to_string();
        }
        if let Some(v) = self.description {
            rule.description = Some(v);
        }
        if let Some(v) = self.is_active {
            rule.is_active = v;
        }
        if let Some(v) = self.channel {
            rule.channel = v;
        }
        if let Some(v) = self.adjustment_type {
            rule.adjustment_type = v;
        }
        if let Some(v) = self.adjustment_value {
            rule.adjustment_value = v;
        }
        if let Some(v) = self.adjustment_unit {
            rule.adjustment_unit = normalize_unit(Some(&v));
        }
        if let Some(v) = self.formula {
            rule.formula = Some(v);
        }
        if let Some(v) = self.conditions {
            rule.conditions = json!(v);
        }
        if let Some(v) = self.priority {
            rule.priority = v;
        }
        if let Some(v) = self.combinable {
            rule.combinable = v;
        }
        if let Some(v) = self.valid_from {
            rule.valid_from = Some(v);
        }
        if let Some(v) = self.valid_until {
            rule.valid_until = Some(v);
        }
        if let Some(v) = self.usage_limit {
            rule.usage_limit = Some(v);
        }
        if let Some(v) = self.usage_limit_per_customer {
            rule.usage_limit_per_customer = Some(v);
        }
        if let Some(v) = self.article_id {
            rule.article_id = Some(v);
        }
        if let Some(v) = self.article_family {
            rule.article_family = Some(v);
        }
        if let Some(v) = self.customer_groups {
            rule.customer_groups = json!(v);
        }
        if let Some(v) = self.metadata {
            rule.metadata = Some(v);
        }
        rule
    }
}

fn normalize_unit(unit: Option<&str>) -> Option<String> {
    unit.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_uppercase)
}

/// Cross-field checks the derive cannot express
pub fn check_definition(rule: &price_rule::Model) -> Result<(), ServiceError> {
    if let (Some(from), Some(until)) = (rule.valid_from, rule.valid_until) {
        if until < from {
            return Err(ServiceError::ValidationError(
                "valid_until must not be before valid_from".to_string(),
            ));
        }
    }

    if rule.adjustment_type == AdjustmentType::Formula {
        let source = rule.formula.as_deref().unwrap_or_default();
        Formula::parse(source)
            .and_then(|formula| formula.check_variables())
            .map_err(|e| ServiceError::ValidationError(format!("Invalid formula: {}", e)))?;
    }

    PriceCondition::parse_list(&rule.conditions)
        .map_err(|e| ServiceError::ValidationError(format!("Invalid conditions: {}", e)))?;
    Ok(())
}

/// Filters of a rule listing
#[derive(Debug, Clone, Default)]
pub struct PriceRuleFilter {
    pub active: Option<bool>,
    pub channel: Option<PriceChannel>,
    pub article_id: Option<Uuid>,
}

/// Price rule repository with a read-through cache.
///
/// Writes invalidate the rule key and every `active_rules:{societe}` key.
/// Cache failures are logged and never fail a request.
#[derive(Clone)]
pub struct PriceRuleService {
    db: Arc<DatabaseConnection>,
    cache: Arc<dyn CacheBackend>,
}

impl PriceRuleService {
    pub fn new(db: Arc<DatabaseConnection>, cache: Arc<dyn CacheBackend>) -> Self {
        Self { db, cache }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        societe_id: Uuid,
        request: CreatePriceRuleRequest,
        actor: Option<Uuid>,
    ) -> Result<price_rule::Model, ServiceError> {
        request.validate()?;
        let draft = request.to_model(societe_id);
        check_definition(&draft)?;

        let mut active = draft.into_active_model().reset_all();
        active.created_by_id = Set(actor);
        active.updated_by_id = Set(actor);

        let rule = active
            .insert(&*self.db)
            .await
            .map_err(|e| map_write_error(e, "Price rule"))?;
        self.invalidate(societe_id, rule.id).await;
        info!(rule_id = %rule.id, societe_id = %societe_id, "price rule created");
        Ok(rule)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, societe_id: Uuid, id: Uuid) -> Result<price_rule::Model, ServiceError> {
        let key = rule_key(id);
        let cached = cache::get_json::<price_rule::Model>(self.cache.as_ref(), &key)
            .await
            .unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "price rule cache read failed");
                None
            });

        let rule = match cached {
            Some(rule) => rule,
            None => {
                let rule = PriceRuleEntity::find_by_id(id)
                    .filter(price_rule::Column::DeletedAt.is_null())
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| not_found(id))?;
                if let Err(e) = cache::set_json(self.cache.as_ref(), &key, &rule, Some(RULE_TTL)).await {
                    warn!(key = %key, error = %e, "price rule cache write failed");
                }
                rule
            }
        };

        if rule.societe_id != societe_id || rule.deleted_at.is_some() {
            return Err(not_found(id));
        }
        Ok(rule)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        societe_id: Uuid,
        filter: &PriceRuleFilter,
        page: PageRequest,
    ) -> Result<Page<price_rule::Model>, ServiceError> {
        let mut query = PriceRuleEntity::find()
            .filter(price_rule::Column::SocieteId.eq(societe_id))
            .filter(price_rule::Column::DeletedAt.is_null());
        if let Some(active) = filter.active {
            query = query.filter(price_rule::Column::IsActive.eq(active));
        }
        if let Some(channel) = filter.channel {
            query = query.filter(price_rule::Column::Channel.is_in([channel, PriceChannel::All]));
        }
        if let Some(article_id) = filter.article_id {
            query = query.filter(price_rule::Column::ArticleId.eq(article_id));
        }

        let paginator = query
            .order_by_desc(price_rule::Column::Priority)
            .order_by_asc(price_rule::Column::CreatedAt)
            .paginate(&*self.db, page.per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;
        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    /// Active rules of the société, priority DESC then created_at ASC
    #[instrument(skip(self))]
    pub async fn list_active(&self, societe_id: Uuid) -> Result<Vec<price_rule::Model>, ServiceError> {
        let key = active_rules_key(societe_id);
        match cache::get_json::<Vec<price_rule::Model>>(self.cache.as_ref(), &key).await {
            Ok(Some(rules)) => return Ok(rules),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "active rules cache read failed"),
        }

        let rules = PriceRuleEntity::find()
            .filter(price_rule::Column::SocieteId.eq(societe_id))
            .filter(price_rule::Column::IsActive.eq(true))
            .filter(price_rule::Column::DeletedAt.is_null())
            .order_by_desc(price_rule::Column::Priority)
            .order_by_asc(price_rule::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        if let Err(e) = cache::set_json(self.cache.as_ref(), &key, &rules, Some(ACTIVE_RULES_TTL)).await {
            warn!(key = %key, error = %e, "active rules cache write failed");
        }
        Ok(rules)
    }

    /// Active rules that target the channel, `ALL` rules included
    pub async fn list_by_channel(
        &self,
        societe_id: Uuid,
        channel: PriceChannel,
    ) -> Result<Vec<price_rule::Model>, ServiceError> {
        let rules = self.list_active(societe_id).await?;
        Ok(rules
            .into_iter()
            .filter(|rule| rule.channel.matches(channel))
            .collect())
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        societe_id: Uuid,
        id: Uuid,
        request: UpdatePriceRuleRequest,
        actor: Option<Uuid>,
    ) -> Result<price_rule::Model, ServiceError> {
        request.validate()?;
        let existing = self.load(societe_id, id).await?;
        let merged = request.merge_into(existing.clone());
        check_definition(&merged)?;

        let mut active: price_rule::ActiveModel = existing.into_active_model();
        active.rule_name = Set(merged.rule_name);
        active.description = Set(merged.description);
        active.is_active = Set(merged.is_active);
        active.channel = Set(merged.channel);
        active.adjustment_type = Set(merged.adjustment_type);
        active.adjustment_value = Set(merged.adjustment_value);
        active.adjustment_unit = Set(merged.adjustment_unit);
        active.formula = Set(merged.formula);
        active.conditions = Set(merged.conditions);
        active.priority = Set(merged.priority);
        active.combinable = Set(merged.combinable);
        active.valid_from = Set(merged.valid_from);
        active.valid_until = Set(merged.valid_until);
        active.usage_limit = Set(merged.usage_limit);
        active.usage_limit_per_customer = Set(merged.usage_limit_per_customer);
        active.article_id = Set(merged.article_id);
        active.article_family = Set(merged.article_family);
        active.customer_groups = Set(merged.customer_groups);
        active.metadata = Set(merged.metadata);
        active.updated_by_id = Set(actor);

        let rule = active
            .update(&*self.db)
            .await
            .map_err(|e| map_write_error(e, "Price rule"))?;
        self.invalidate(societe_id, id).await;
        Ok(rule)
    }

    /// Flips `is_active`
    #[instrument(skip(self))]
    pub async fn toggle(
        &self,
        societe_id: Uuid,
        id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<price_rule::Model, ServiceError> {
        let existing = self.load(societe_id, id).await?;
        let enabled = !existing.is_active;

        let mut active: price_rule::ActiveModel = existing.into_active_model();
        active.is_active = Set(enabled);
        active.updated_by_id = Set(actor);
        let rule = active.update(&*self.db).await?;

        self.invalidate(societe_id, id).await;
        info!(rule_id = %id, enabled, "price rule toggled");
        Ok(rule)
    }

    #[instrument(skip(self))]
    pub async fn soft_delete(
        &self,
        societe_id: Uuid,
        id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let existing = self.load(societe_id, id).await?;
        let mut active: price_rule::ActiveModel = existing.into_active_model();
        active.deleted_at = Set(Some(Utc::now()));
        active.is_active = Set(false);
        active.updated_by_id = Set(actor);
        active.update(&*self.db).await?;

        self.invalidate(societe_id, id).await;
        info!(rule_id = %id, "price rule soft deleted");
        Ok(())
    }

    /// Counts one use of the rule, and one for the customer when known.
    ///
    /// `metadata.usageByCustomer` is rewritten whole, so the write only lands
    /// if `usage_count` and `version` still hold the values it was computed
    /// from; a concurrent increment or edit makes it re-read and try again.
    /// Usage bookkeeping does not bump `version`.
    #[instrument(skip(self))]
    pub async fn increment_usage(
        &self,
        id: Uuid,
        customer_id: Option<&str>,
    ) -> Result<(), ServiceError> {
        let customer = customer_id.filter(|c| !c.is_empty());

        for attempt in 1..=MAX_USAGE_ATTEMPTS {
            let rule = PriceRuleEntity::find_by_id(id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| not_found(id))?;

            let mut update = PriceRuleEntity::update_many()
                .col_expr(
                    price_rule::Column::UsageCount,
                    Expr::col(price_rule::Column::UsageCount).add(1),
                )
                .filter(price_rule::Column::Id.eq(id));

            if let Some(customer) = customer {
                let metadata = with_customer_use(rule.metadata.clone(), customer);
                update = update
                    .col_expr(price_rule::Column::Metadata, Expr::value(metadata))
                    .filter(price_rule::Column::UsageCount.eq(rule.usage_count))
                    .filter(price_rule::Column::Version.eq(rule.version));
            }

            let result = update.exec(&*self.db).await?;
            if result.rows_affected > 0 {
                self.invalidate(rule.societe_id, id).await;
                return Ok(());
            }
            debug!(rule_id = %id, attempt, "rule changed while recording usage, retrying");
        }

        Err(ServiceError::Conflict(format!(
            "Price rule {} kept changing while recording usage",
            id
        )))
    }

    async fn load(&self, societe_id: Uuid, id: Uuid) -> Result<price_rule::Model, ServiceError> {
        PriceRuleEntity::find_by_id(id)
            .filter(price_rule::Column::SocieteId.eq(societe_id))
            .filter(price_rule::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn invalidate(&self, societe_id: Uuid, id: Uuid) {
        if let Err(e) = self.cache.delete(&rule_key(id)).await {
            warn!(rule_id = %id, error = %e, "price rule cache invalidation failed");
        }
        if let Err(e) = self.cache.delete_prefix(&active_rules_key(societe_id)).await {
            warn!(societe_id = %societe_id, error = %e, "active rules cache invalidation failed");
        }
    }
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Price rule {} not found", id))
}

/// Metadata with `usageByCustomer[customer]` incremented
fn with_customer_use(metadata: Option<Value>, customer: &str) -> Value {
    let mut metadata = match metadata {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    let usage = metadata
        .entry("usageByCustomer")
        .or_insert_with(|| json!({}));
    if !usage.is_object() {
        *usage = json!({});
    }
    if let Some(usage) = usage.as_object_mut() {
        let count = usage.get(customer).and_then(Value::as_i64).unwrap_or(0);
        usage.insert(customer.to_string(), json!(count + 1));
    }
    Value::Object(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::test_support::{rule, SOCIETE};
    use crate::pricing::ConditionOperator;
    use assert_matches::assert_matches;
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;

    #[test]
    fn customer_usage_is_counted_per_customer() {
        let first = with_customer_use(None, "C-1");
        assert_eq!(first, json!({ "usageByCustomer": { "C-1": 1 } }));

        let second = with_customer_use(Some(json!({ "source": "import", "usageByCustomer": { "C-1": 1 } })), "C-1");
        assert_eq!(second["usageByCustomer"]["C-1"], json!(2));
        assert_eq!(second["source"], json!("import"));
    }

    #[test]
    fn formula_rules_need_a_parsable_formula() {
        let mut formula_rule = rule(AdjustmentType::Formula, Decimal::ZERO);
        assert_matches!(check_definition(&formula_rule), Err(ServiceError::ValidationError(_)));

        formula_rule.formula = Some("basePrice * 0.9 + unknownThing".into());
        assert_matches!(check_definition(&formula_rule), Err(ServiceError::ValidationError(_)));

        formula_rule.formula = Some("max(basePrice * 0.9, 10)".into());
        assert!(check_definition(&formula_rule).is_ok());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let mut windowed = rule(AdjustmentType::Percentage, dec!(-5));
        let now = Utc::now();
        windowed.valid_from = Some(now);
        windowed.valid_until = Some(now - ChronoDuration::days(1));
        assert_matches!(check_definition(&windowed), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn draft_normalizes_unit_and_serializes_conditions() {
        let request = CreatePriceRuleRequest {
            rule_name: "  Remise tubes  ".into(),
            description: None,
            is_active: true,
            channel: PriceChannel::Erp,
            adjustment_type: AdjustmentType::PricePerWeight,
            adjustment_value: dec!(1.2),
            adjustment_unit: Some(" t ".into()),
            formula: None,
            conditions: vec![PriceCondition::new(
                "quantity",
                ConditionOperator::GreaterThan,
                json!(10),
            )],
            priority: 5,
            combinable: false,
            valid_from: None,
            valid_until: None,
            usage_limit: None,
            usage_limit_per_customer: None,
            article_id: None,
            article_family: Some("TUBES".into()),
            customer_groups: vec!["VIP".into()],
            metadata: None,
        };

        let model = request.to_model(SOCIETE);
        assert_eq!(model.rule_name, "Remise tubes");
        assert_eq!(model.adjustment_unit.as_deref(), Some("T"));
        assert_eq!(model.customer_groups, json!(["VIP"]));
        assert_eq!(PriceCondition::parse_list(&model.conditions).unwrap().len(), 1);
        assert!(check_definition(&model).is_ok());
    }

    #[test]
    fn update_only_touches_present_fields() {
        let original = rule(AdjustmentType::Percentage, dec!(-10));
        let merged = UpdatePriceRuleRequest {
            priority: Some(9),
            adjustment_unit: Some("kg".into()),
            ..Default::default()
        }
        .merge_into(original.clone());

        assert_eq!(merged.priority, 9);
        assert_eq!(merged.adjustment_unit.as_deref(), Some("KG"));
        assert_eq!(merged.adjustment_value, original.adjustment_value);
        assert_eq!(merged.rule_name, original.rule_name);
    }
}

//! Price rule evaluation.
//!
//! Everything here is pure: callers load the article and the société's
//! rules, [`engine::calculate`] walks the rules and returns a
//! [`PriceCalculation`]. Persisting usage counts is the caller's job.

pub mod adjustments;
pub mod conditions;
pub mod engine;
pub mod formula;

pub use conditions::{ConditionContext, ConditionOperator, PriceCondition};
pub use engine::{applies, calculate, is_valid, preview, validity};

use crate::entities::{article, price_rule::AdjustmentType, price_rule::PriceChannel};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// Who is buying, how much and through which channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PricingContext {
    /// Defaults to 1
    pub quantity: Option<Decimal>,
    pub customer_id: Option<String>,
    pub customer_group: Option<String>,
    pub customer_email: Option<String>,
    pub customer_code: Option<String>,
    /// Defaults to `ERP`
    pub channel: Option<PriceChannel>,
    pub order_total: Option<Decimal>,
    pub order_date: Option<DateTime<Utc>>,
    /// Extra attributes for `custom` conditions
    #[serde(default)]
    #[schema(value_type = Object)]
    pub attributes: BTreeMap<String, Value>,
}

impl PricingContext {
    pub fn quantity(&self) -> Decimal {
        self.quantity
            .filter(|q| q.is_sign_positive() && !q.is_zero())
            .unwrap_or(Decimal::ONE)
    }

    pub fn channel(&self) -> PriceChannel {
        self.channel.unwrap_or(PriceChannel::Erp)
    }

    /// Attribute bag seen by rule conditions, enriched with article data
    pub fn condition_context(&self, article: &article::Model, now: DateTime<Utc>) -> ConditionContext {
        let mut ctx: ConditionContext = self
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        ctx.insert("article_reference", article.reference.clone());
        ctx.insert_opt("article_family", article.famille.clone());
        ctx.insert_opt("article_sub_family", article.sous_famille.clone());
        ctx.insert("quantity", self.quantity().to_string());
        ctx.insert("channel", self.channel().to_string());
        ctx.insert_opt("customer_id", self.customer_id.clone());
        ctx.insert_opt("customer_group", self.customer_group.clone());
        ctx.insert_opt("customer_email", self.customer_email.clone());
        ctx.insert_opt("customer_code", self.customer_code.clone());
        ctx.insert_opt("order_total", self.order_total.map(|t| t.to_string()));
        ctx.insert("date_range", self.order_date.unwrap_or(now).to_rfc3339());
        ctx
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculationOptions {
    /// Include steps, skipped rules, context and timing
    #[serde(default)]
    pub detailed: bool,
    #[serde(default)]
    pub include_margins: bool,
}

/// Why a rule did not take part in a calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    NotYetValid,
    Expired,
    UsageLimitReached,
    CustomerUsageLimitReached,
    Inactive,
    CustomerGroupMismatch,
    ConditionsNotMet,
}

impl SkipReason {
    pub fn message(self) -> &'static str {
        match self {
            SkipReason::NotYetValid => "Rule not yet valid",
            SkipReason::Expired => "Rule expired",
            SkipReason::UsageLimitReached => "Usage limit reached",
            SkipReason::CustomerUsageLimitReached => "Usage limit reached for this customer",
            SkipReason::Inactive => "Rule inactive",
            SkipReason::CustomerGroupMismatch => "Customer group mismatch",
            SkipReason::ConditionsNotMet => "Conditions not met",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRule {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub rule_type: AdjustmentType,
    pub adjustment: Decimal,
    pub adjustment_unit: Option<String>,
    pub price_before: Decimal,
    pub price_after: Decimal,
    /// Positive when the rule lowered the price
    pub discount_amount: Decimal,
    pub discount_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRule {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub reason: SkipReason,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownStep {
    pub step_number: u32,
    pub rule_id: Option<Uuid>,
    pub rule_name: String,
    /// `COEFFICIENT` or the rule's adjustment type
    pub adjustment_type: String,
    pub adjustment: Decimal,
    pub price_before: Decimal,
    pub price_after: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownContext {
    pub article_reference: String,
    pub article_family: Option<String>,
    pub weight: Option<Decimal>,
    pub length: Option<Decimal>,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub sales_unit: Option<String>,
    pub stock_unit: String,
    pub customer_id: Option<String>,
    pub customer_group: Option<String>,
    pub quantity: Decimal,
    pub channel: PriceChannel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculationMetadata {
    pub calculation_time_ms: u64,
    pub rules_evaluated: usize,
    pub rules_applied: usize,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub steps: Vec<BreakdownStep>,
    pub skipped_rules: Vec<SkippedRule>,
    pub context: BreakdownContext,
    pub metadata: CalculationMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Margins {
    pub cost_price: Decimal,
    pub margin: Decimal,
    /// Margin relative to the cost price
    pub margin_percentage: Decimal,
    /// Margin relative to the final price
    pub markup_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UnitPrice {
    pub value: Decimal,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceCalculation {
    pub article_id: Uuid,
    pub article_reference: Option<String>,
    pub base_price: Decimal,
    pub final_price: Decimal,
    pub currency: String,
    pub quantity: Decimal,
    pub unit_price: Option<UnitPrice>,
    /// `final_price × quantity`
    pub line_total: Decimal,
    pub total_discount: Decimal,
    pub total_discount_percentage: Decimal,
    pub applied_rules: Vec<AppliedRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<PriceBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margins: Option<Margins>,
    pub warnings: Vec<String>,
}

impl PriceCalculation {
    /// Result for an article that could not be priced
    pub fn unavailable(article_id: Uuid, currency: &str, warning: impl Into<String>) -> Self {
        Self {
            article_id,
            article_reference: None,
            base_price: Decimal::ZERO,
            final_price: Decimal::ZERO,
            currency: currency.to_string(),
            quantity: Decimal::ONE,
            unit_price: None,
            line_total: Decimal::ZERO,
            total_discount: Decimal::ZERO,
            total_discount_percentage: Decimal::ZERO,
            applied_rules: Vec::new(),
            breakdown: None,
            margins: None,
            warnings: vec![warning.into()],
        }
    }
}

/// Outcome of trying a single rule against an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RulePreview {
    pub base_price: Decimal,
    pub adjusted_price: Decimal,
    pub difference: Decimal,
    pub difference_percentage: Decimal,
    pub warnings: Vec<String>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::entities::{
        article::{self, ArticleStatus, ArticleType},
        price_rule::{self, AdjustmentType, PriceChannel},
    };
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use uuid::Uuid;

    pub const SOCIETE: Uuid = Uuid::from_u128(0x5e);

    pub fn article() -> article::Model {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        article::Model {
            id: Uuid::from_u128(0xa1),
            societe_id: SOCIETE,
            reference: "TUB-40X40-2".into(),
            designation: "Tube carré 40x40 ép. 2".into(),
            description: None,
            article_type: ArticleType::MatierePremiere,
            status: ArticleStatus::Actif,
            famille: Some("TUBES".into()),
            sous_famille: None,
            unite_stock: "ML".into(),
            unite_achat: None,
            unite_vente: Some("ML".into()),
            coefficient_achat: Decimal::ONE,
            coefficient_vente: Decimal::ONE,
            prix_achat_standard: Some(dec!(60)),
            prix_vente_ht: Some(dec!(100)),
            taux_tva: Some(dec!(20)),
            poids: None,
            volume: None,
            longueur: None,
            largeur: None,
            hauteur: None,
            created_at: created,
            updated_at: created,
            deleted_at: None,
            version: 1,
            created_by_id: None,
            updated_by_id: None,
        }
    }

    pub fn rule(kind: AdjustmentType, value: Decimal) -> price_rule::Model {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        price_rule::Model {
            id: Uuid::new_v4(),
            societe_id: SOCIETE,
            rule_name: format!("{} {}", kind, value),
            description: None,
            is_active: true,
            channel: PriceChannel::All,
            adjustment_type: kind,
            adjustment_value: value,
            adjustment_unit: None,
            formula: None,
            conditions: json!([]),
            priority: 0,
            combinable: true,
            valid_from: None,
            valid_until: None,
            usage_limit: None,
            usage_limit_per_customer: None,
            usage_count: 0,
            article_id: None,
            article_family: None,
            customer_groups: json!([]),
            metadata: None,
            created_at: created,
            updated_at: created,
            deleted_at: None,
            version: 1,
            created_by_id: None,
            updated_by_id: None,
        }
    }
}

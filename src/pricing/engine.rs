use super::{
    adjustments::{self, AdjustmentInput},
    AppliedRule, BreakdownContext, BreakdownStep, CalculationMetadata, CalculationOptions,
    ConditionContext, Margins, PriceBreakdown, PriceCalculation, PriceCondition, PricingContext,
    RulePreview, SkipReason, SkippedRule, UnitPrice,
};
use crate::entities::{
    article,
    json_string_list,
    price_rule::{self, PriceChannel},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::time::Instant;
use tracing::{debug, warn};

const MONEY_DP: u32 = 4;
const PERCENT_DP: u32 = 2;

/// Whether the rule is active, inside its date window and under its usage limits.
///
/// Reasons are checked in this order: window, usage, per-customer usage, activity.
pub fn validity(
    rule: &price_rule::Model,
    now: DateTime<Utc>,
    customer_id: Option<&str>,
) -> Result<(), SkipReason> {
    if rule.valid_from.is_some_and(|from| from > now) {
        return Err(SkipReason::NotYetValid);
    }
    if rule.valid_until.is_some_and(|until| until < now) {
        return Err(SkipReason::Expired);
    }
    if rule
        .usage_limit
        .is_some_and(|limit| rule.usage_count >= limit)
    {
        return Err(SkipReason::UsageLimitReached);
    }
    if let (Some(limit), Some(customer)) = (rule.usage_limit_per_customer, customer_id) {
        if customer_usage(rule, customer) >= i64::from(limit) {
            return Err(SkipReason::CustomerUsageLimitReached);
        }
    }
    if !rule.is_active {
        return Err(SkipReason::Inactive);
    }
    Ok(())
}

pub fn is_valid(rule: &price_rule::Model, now: DateTime<Utc>) -> bool {
    validity(rule, now, None).is_ok()
}

/// Whether the rule targets the channel and all its conditions hold.
///
/// A `conditions` column that does not parse never applies.
pub fn applies(rule: &price_rule::Model, channel: PriceChannel, context: &ConditionContext) -> bool {
    if !rule.channel.matches(channel) {
        return false;
    }
    match PriceCondition::parse_list(&rule.conditions) {
        Ok(conditions) => conditions.iter().all(|c| c.matches(context)),
        Err(e) => {
            warn!(rule_id = %rule.id, error = %e, "ignoring rule with malformed conditions");
            false
        }
    }
}

/// Uses recorded for one customer in `metadata.usageByCustomer`
pub fn customer_usage(rule: &price_rule::Model, customer_id: &str) -> i64 {
    rule.metadata
        .as_ref()
        .and_then(|meta| meta.get("usageByCustomer"))
        .and_then(|usage| usage.get(customer_id))
        .and_then(|count| count.as_i64())
        .unwrap_or(0)
}

/// Rules of the société that may price this article on this channel,
/// ordered by priority (highest first) then age (oldest first).
pub fn candidate_rules<'a>(
    rules: &'a [price_rule::Model],
    article: &article::Model,
    channel: PriceChannel,
) -> Vec<&'a price_rule::Model> {
    let mut selected: Vec<&price_rule::Model> = rules
        .iter()
        .filter(|rule| rule.deleted_at.is_none() && rule.societe_id == article.societe_id)
        .filter(|rule| rule.channel.matches(channel))
        .filter(|rule| rule.article_id.map_or(true, |id| id == article.id))
        .filter(|rule| {
            rule.article_family
                .as_deref()
                .map_or(true, |family| article.famille.as_deref() == Some(family))
        })
        .collect();
    selected.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    selected
}

/// Prices an article against the société's rules.
///
/// `rules` may contain rules for other articles or channels; they are
/// filtered out here. The caller persists usage of `applied_rules`.
pub fn calculate(
    article: &article::Model,
    rules: &[price_rule::Model],
    context: &PricingContext,
    options: CalculationOptions,
    currency: &str,
    now: DateTime<Utc>,
) -> PriceCalculation {
    let started = Instant::now();
    let mut warnings = Vec::new();
    let mut steps = Vec::new();
    let mut skipped = Vec::new();
    let mut applied = Vec::new();

    let list_price = article.prix_vente_ht.unwrap_or_else(|| {
        warnings.push(format!("Article {} has no sales price", article.reference));
        Decimal::ZERO
    });
    let base_price = list_price
        .checked_mul(article.coefficient_vente)
        .unwrap_or(list_price);
    if article.coefficient_vente != Decimal::ONE {
        steps.push(BreakdownStep {
            step_number: 1,
            rule_id: None,
            rule_name: "Sales coefficient".to_string(),
            adjustment_type: "COEFFICIENT".to_string(),
            adjustment: article.coefficient_vente,
            price_before: list_price,
            price_after: base_price,
            description: format!("List price × {}", article.coefficient_vente.normalize()),
        });
    }

    let channel = context.channel();
    let quantity = context.quantity();
    let condition_ctx = context.condition_context(article, now);
    let customer_groups_requested = context.customer_group.as_deref();
    let candidates = candidate_rules(rules, article, channel);

    let mut price = base_price;
    for rule in &candidates {
        if let Err(reason) = validity(rule, now, context.customer_id.as_deref())
            .and_then(|()| customer_group_check(rule, customer_groups_requested))
            .and_then(|()| {
                if applies(rule, channel, &condition_ctx) {
                    Ok(())
                } else {
                    Err(SkipReason::ConditionsNotMet)
                }
            })
        {
            debug!(rule_id = %rule.id, reason = ?reason, "rule skipped");
            skipped.push(SkippedRule {
                rule_id: rule.id,
                rule_name: rule.rule_name.clone(),
                reason,
                message: reason.message().to_string(),
            });
            continue;
        }

        let new_price = match adjustments::apply(
            rule,
            AdjustmentInput {
                article,
                base_price,
                current_price: price,
                quantity,
            },
        ) {
            Ok(new_price) => new_price,
            Err(e) => {
                warn!(rule_id = %rule.id, error = %e, "price rule could not be applied");
                warnings.push(format!("Rule '{}' ignored: {}", rule.rule_name, e));
                continue;
            }
        };

        if new_price == price {
            continue;
        }

        let discount = price - new_price;
        applied.push(AppliedRule {
            rule_id: rule.id,
            rule_name: rule.rule_name.clone(),
            rule_type: rule.adjustment_type,
            adjustment: rule.adjustment_value,
            adjustment_unit: rule.adjustment_unit.clone(),
            price_before: money(price),
            price_after: money(new_price),
            discount_amount: money(discount),
            discount_percentage: percent_of(discount, price),
        });
        steps.push(BreakdownStep {
            step_number: steps.len() as u32 + 1,
            rule_id: Some(rule.id),
            rule_name: rule.rule_name.clone(),
            adjustment_type: rule.adjustment_type.to_string(),
            adjustment: rule.adjustment_value,
            price_before: money(price),
            price_after: money(new_price),
            description: describe(rule),
        });
        price = new_price;

        if !rule.combinable {
            debug!(rule_id = %rule.id, "non combinable rule applied, stopping");
            break;
        }
    }

    let final_price = money(price.max(Decimal::ZERO));
    let total_discount = money(base_price - final_price);

    let margins = options
        .include_margins
        .then(|| compute_margins(article, final_price))
        .flatten();

    let breakdown = options.detailed.then(|| PriceBreakdown {
        steps,
        context: BreakdownContext {
            article_reference: article.reference.clone(),
            article_family: article.famille.clone(),
            weight: article.poids,
            length: article.longueur,
            width: article.largeur,
            height: article.hauteur,
            sales_unit: article.unite_vente.clone(),
            stock_unit: article.unite_stock.clone(),
            customer_id: context.customer_id.clone(),
            customer_group: context.customer_group.clone(),
            quantity,
            channel,
        },
        metadata: CalculationMetadata {
            calculation_time_ms: started.elapsed().as_millis() as u64,
            rules_evaluated: candidates.len(),
            rules_applied: applied.len(),
            cache_hit: false,
        },
        skipped_rules: skipped,
    });

    if options.include_margins && margins.is_none() {
        warnings.push("Margins unavailable: article has no purchase price".to_string());
    }

    PriceCalculation {
        article_id: article.id,
        article_reference: Some(article.reference.clone()),
        base_price: money(base_price),
        final_price,
        currency: currency.to_string(),
        quantity,
        unit_price: Some(UnitPrice {
            value: final_price,
            unit: article
                .unite_vente
                .clone()
                .unwrap_or_else(|| article.unite_stock.clone()),
        }),
        line_total: money(final_price.checked_mul(quantity).unwrap_or(final_price)),
        total_discount,
        total_discount_percentage: percent_of(total_discount, base_price),
        applied_rules: applied,
        breakdown,
        margins,
        warnings,
    }
}

/// Applies a single rule to the article's list price, ignoring validity and conditions
pub fn preview(rule: &price_rule::Model, article: &article::Model) -> RulePreview {
    let base_price = article.prix_vente_ht.unwrap_or(Decimal::ZERO);
    let mut warnings = Vec::new();
    if article.prix_vente_ht.is_none() {
        warnings.push(format!("Article {} has no sales price", article.reference));
    }

    let adjusted = match adjustments::apply(
        rule,
        AdjustmentInput {
            article,
            base_price,
            current_price: base_price,
            quantity: Decimal::ONE,
        },
    ) {
        Ok(price) => price.max(Decimal::ZERO),
        Err(e) => {
            warnings.push(e.to_string());
            base_price
        }
    };
    let difference = adjusted - base_price;

    RulePreview {
        base_price: money(base_price),
        adjusted_price: money(adjusted),
        difference: money(difference),
        difference_percentage: percent_of(difference, base_price),
        warnings,
    }
}

fn customer_group_check(
    rule: &price_rule::Model,
    customer_group: Option<&str>,
) -> Result<(), SkipReason> {
    let groups = json_string_list(&rule.customer_groups);
    if groups.is_empty() {
        return Ok(());
    }
    match customer_group {
        Some(group) if groups.iter().any(|g| g.eq_ignore_ascii_case(group)) => Ok(()),
        _ => Err(SkipReason::CustomerGroupMismatch),
    }
}

fn compute_margins(article: &article::Model, final_price: Decimal) -> Option<Margins> {
    let cost_price = article
        .prix_achat_standard?
        .checked_mul(article.coefficient_achat)?;
    let margin = final_price - cost_price;
    Some(Margins {
        cost_price: money(cost_price),
        margin: money(margin),
        margin_percentage: percent_of(margin, cost_price),
        markup_percentage: percent_of(margin, final_price),
    })
}

fn describe(rule: &price_rule::Model) -> String {
    let value = rule.adjustment_value.normalize();
    let unit = rule.adjustment_unit.as_deref().unwrap_or("");
    match rule.adjustment_type {
        price_rule::AdjustmentType::Percentage => format!("{}%", value),
        price_rule::AdjustmentType::FixedAmount => format!("{:+}", value),
        price_rule::AdjustmentType::FixedPrice => format!("Fixed price {}", value),
        price_rule::AdjustmentType::Formula => {
            format!("Formula {}", rule.formula.as_deref().unwrap_or_default())
        }
        _ => format!("{} per {}", value, unit).trim_end().to_string(),
    }
}

fn money(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// `part / whole × 100`, or 0 for a zero whole
fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .map(|p| p.round_dp_with_strategy(PERCENT_DP, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::ZERO)
        .normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::price_rule::AdjustmentType;
    use crate::pricing::test_support::{article, rule};
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn detailed() -> CalculationOptions {
        CalculationOptions {
            detailed: true,
            include_margins: true,
        }
    }

    #[test]
    fn validity_reasons_follow_the_documented_order() {
        let mut r = rule(AdjustmentType::Percentage, dec!(-5));
        assert_eq!(validity(&r, now(), None), Ok(()));

        r.is_active = false;
        assert_eq!(validity(&r, now(), None), Err(SkipReason::Inactive));

        r.usage_limit = Some(3);
        r.usage_count = 3;
        assert_eq!(validity(&r, now(), None), Err(SkipReason::UsageLimitReached));

        r.valid_until = Some(now() - Duration::days(1));
        assert_eq!(validity(&r, now(), None), Err(SkipReason::Expired));

        r.valid_from = Some(now() + Duration::days(1));
        assert_eq!(validity(&r, now(), None), Err(SkipReason::NotYetValid));
        assert!(!is_valid(&r, now()));
    }

    #[test]
    fn per_customer_usage_is_read_from_metadata() {
        let mut r = rule(AdjustmentType::Percentage, dec!(-5));
        r.usage_limit_per_customer = Some(2);
        r.metadata = Some(json!({"usageByCustomer": {"C-42": 2, "C-7": 1}}));

        assert_eq!(
            validity(&r, now(), Some("C-42")),
            Err(SkipReason::CustomerUsageLimitReached)
        );
        assert_eq!(validity(&r, now(), Some("C-7")), Ok(()));
        assert_eq!(validity(&r, now(), None), Ok(()));
    }

    #[test]
    fn channel_all_matches_everything() {
        let ctx = ConditionContext::new();
        let mut r = rule(AdjustmentType::Percentage, dec!(-5));
        assert!(applies(&r, PriceChannel::Marketplace, &ctx));

        r.channel = PriceChannel::B2b;
        assert!(applies(&r, PriceChannel::B2b, &ctx));
        assert!(!applies(&r, PriceChannel::Erp, &ctx));

        r.channel = PriceChannel::All;
        r.conditions = json!("not a list");
        assert!(!applies(&r, PriceChannel::Erp, &ctx));
    }

    #[test]
    fn candidates_are_filtered_and_ordered() {
        let art = article();
        let mut low = rule(AdjustmentType::Percentage, dec!(-1));
        low.priority = 1;
        let mut high_old = rule(AdjustmentType::Percentage, dec!(-2));
        high_old.priority = 10;
        let mut high_new = rule(AdjustmentType::Percentage, dec!(-3));
        high_new.priority = 10;
        high_new.created_at = high_old.created_at + Duration::hours(1);
        let mut other_article = rule(AdjustmentType::Percentage, dec!(-4));
        other_article.article_id = Some(Uuid::new_v4());
        let mut other_family = rule(AdjustmentType::Percentage, dec!(-5));
        other_family.article_family = Some("TOLES".into());
        let mut same_family = rule(AdjustmentType::Percentage, dec!(-6));
        same_family.article_family = Some("TUBES".into());
        let mut marketplace = rule(AdjustmentType::Percentage, dec!(-7));
        marketplace.channel = PriceChannel::Marketplace;

        let rules = vec![
            low.clone(),
            high_new.clone(),
            other_article,
            high_old.clone(),
            other_family,
            same_family.clone(),
            marketplace,
        ];
        let ids: Vec<Uuid> = candidate_rules(&rules, &art, PriceChannel::Erp)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![high_old.id, high_new.id, low.id, same_family.id]);
    }

    #[test]
    fn rules_chain_until_a_non_combinable_one() {
        let art = article();
        let mut first = rule(AdjustmentType::Percentage, dec!(-10));
        first.priority = 3;
        let mut second = rule(AdjustmentType::FixedAmount, dec!(-5));
        second.priority = 2;
        second.combinable = false;
        let mut third = rule(AdjustmentType::FixedPrice, dec!(1));
        third.priority = 1;

        let result = calculate(
            &art,
            &[third, second.clone(), first.clone()],
            &PricingContext::default(),
            detailed(),
            "EUR",
            now(),
        );

        assert_eq!(result.base_price, dec!(100));
        assert_eq!(result.final_price, dec!(85));
        assert_eq!(result.total_discount, dec!(15));
        assert_eq!(result.total_discount_percentage, dec!(15));
        assert_eq!(result.applied_rules.len(), 2);
        assert_eq!(result.applied_rules[0].rule_id, first.id);
        assert_eq!(result.applied_rules[0].discount_amount, dec!(10));
        assert_eq!(result.applied_rules[1].rule_id, second.id);
        assert_eq!(result.applied_rules[1].discount_percentage, dec!(5.56));

        let breakdown = result.breakdown.unwrap();
        assert_eq!(breakdown.steps.len(), 2);
        assert_eq!(breakdown.metadata.rules_evaluated, 3);
        assert_eq!(breakdown.metadata.rules_applied, 2);
        assert_eq!(result.unit_price.unwrap().unit, "ML");
    }

    #[test]
    fn coefficient_step_and_margins() {
        let mut art = article();
        art.coefficient_vente = dec!(1.2);
        art.coefficient_achat = dec!(1.05);

        let result = calculate(
            &art,
            &[],
            &PricingContext {
                quantity: Some(dec!(3)),
                ..Default::default()
            },
            detailed(),
            "EUR",
            now(),
        );

        assert_eq!(result.base_price, dec!(120));
        assert_eq!(result.final_price, dec!(120));
        assert_eq!(result.line_total, dec!(360));
        let steps = result.breakdown.unwrap().steps;
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].adjustment_type, "COEFFICIENT");

        let margins = result.margins.unwrap();
        assert_eq!(margins.cost_price, dec!(63));
        assert_eq!(margins.margin, dec!(57));
        assert_eq!(margins.margin_percentage, dec!(90.48));
        assert_eq!(margins.markup_percentage, dec!(47.5));
    }

    #[test]
    fn skipped_rules_carry_their_reason() {
        let art = article();
        let mut expired = rule(AdjustmentType::Percentage, dec!(-50));
        expired.valid_until = Some(now() - Duration::days(2));
        let mut wholesale = rule(AdjustmentType::Percentage, dec!(-20));
        wholesale.customer_groups = json!(["GROSSISTE"]);
        let mut bulk = rule(AdjustmentType::Percentage, dec!(-10));
        bulk.conditions = json!([{"type": "quantity", "operator": "greater_than", "value": 100}]);
        let neutral = rule(AdjustmentType::FixedAmount, Decimal::ZERO);

        let result = calculate(
            &art,
            &[expired, wholesale, bulk, neutral],
            &PricingContext {
                customer_group: Some("DETAIL".into()),
                quantity: Some(dec!(10)),
                ..Default::default()
            },
            detailed(),
            "EUR",
            now(),
        );

        assert_eq!(result.final_price, dec!(100));
        assert!(result.applied_rules.is_empty());
        let reasons: Vec<SkipReason> = result
            .breakdown
            .unwrap()
            .skipped_rules
            .into_iter()
            .map(|s| s.reason)
            .collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::Expired,
                SkipReason::CustomerGroupMismatch,
                SkipReason::ConditionsNotMet
            ]
        );
    }

    #[test]
    fn broken_formula_leaves_price_unchanged() {
        let art = article();
        let mut r = rule(AdjustmentType::Formula, Decimal::ZERO);
        r.formula = Some("price / 0".into());

        let result = calculate(
            &art,
            &[r],
            &PricingContext::default(),
            CalculationOptions::default(),
            "EUR",
            now(),
        );

        assert_eq!(result.final_price, dec!(100));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.breakdown.is_none());
        assert!(result.margins.is_none());
    }

    #[test]
    fn final_price_never_goes_negative() {
        let art = article();
        let result = calculate(
            &art,
            &[rule(AdjustmentType::FixedAmount, dec!(-250))],
            &PricingContext::default(),
            CalculationOptions::default(),
            "EUR",
            now(),
        );
        assert_eq!(result.final_price, Decimal::ZERO);
        assert_eq!(result.total_discount, dec!(100));
        assert_eq!(result.total_discount_percentage, dec!(100));
    }

    #[test]
    fn preview_uses_list_price() {
        let mut art = article();
        art.coefficient_vente = dec!(2);
        let p = preview(&rule(AdjustmentType::Percentage, dec!(-25)), &art);
        assert_eq!(p.base_price, dec!(100));
        assert_eq!(p.adjusted_price, dec!(75));
        assert_eq!(p.difference, dec!(-25));
        assert_eq!(p.difference_percentage, dec!(-25));
        assert!(p.warnings.is_empty());
    }
}

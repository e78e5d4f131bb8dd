use super::{
    articles::ArticleService,
    price_rules::{check_definition, CreatePriceRuleRequest, PriceRuleService},
};
use crate::{
    errors::ServiceError,
    pricing::{self, CalculationOptions, PriceCalculation, PricingContext, RulePreview},
};
use chrono::Utc;
use metrics::counter;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    pub article_id: Uuid,
    #[serde(default)]
    pub context: PricingContext,
    #[serde(default)]
    pub options: CalculationOptions,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkPriceRequest {
    #[validate(length(min = 1, max = 500))]
    pub article_ids: Vec<Uuid>,
    #[serde(default)]
    pub context: PricingContext,
    #[serde(default)]
    pub options: CalculationOptions,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub article_id: Uuid,
    pub rule: CreatePriceRuleRequest,
}

/// Prices articles of a société with its active rules
#[derive(Clone)]
pub struct PricingService {
    articles: ArticleService,
    rules: PriceRuleService,
    currency: String,
}

impl PricingService {
    pub fn new(articles: ArticleService, rules: PriceRuleService, currency: impl Into<String>) -> Self {
        Self {
            articles,
            rules,
            currency: currency.into(),
        }
    }

    /// Prices one article. An unknown article yields an empty result with a warning.
    #[instrument(skip(self, request), fields(article_id = %request.article_id))]
    pub async fn calculate_price(
        &self,
        societe_id: Uuid,
        request: &PriceRequest,
    ) -> Result<PriceCalculation, ServiceError> {
        let started = Instant::now();
        let Some(article) = self.articles.find(societe_id, request.article_id).await? else {
            counter!("steel_erp_pricing.article_not_found", 1);
            return Ok(PriceCalculation::unavailable(
                request.article_id,
                &self.currency,
                format!("Article {} not found", request.article_id),
            ));
        };

        let rules = self
            .rules
            .list_by_channel(societe_id, request.context.channel())
            .await?;
        let calculation = pricing::calculate(
            &article,
            &rules,
            &request.context,
            request.options,
            &self.currency,
            Utc::now(),
        );

        for applied in &calculation.applied_rules {
            if let Err(e) = self
                .rules
                .increment_usage(applied.rule_id, request.context.customer_id.as_deref())
                .await
            {
                warn!(rule_id = %applied.rule_id, error = %e, "failed to record rule usage");
            }
        }

        counter!("steel_erp_pricing.calculations", 1);
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            rules = rules.len(),
            applied = calculation.applied_rules.len(),
            "price calculated"
        );
        Ok(calculation)
    }

    /// One result per requested article, in request order
    #[instrument(skip(self, request), fields(count = request.article_ids.len()))]
    pub async fn calculate_bulk_prices(
        &self,
        societe_id: Uuid,
        request: &BulkPriceRequest,
    ) -> Result<Vec<PriceCalculation>, ServiceError> {
        request.validate()?;
        let mut results = Vec::with_capacity(request.article_ids.len());
        for article_id in &request.article_ids {
            let single = PriceRequest {
                article_id: *article_id,
                context: request.context.clone(),
                options: request.options,
            };
            results.push(self.calculate_price(societe_id, &single).await?);
        }
        Ok(results)
    }

    /// Applies a draft rule to an article without persisting anything
    #[instrument(skip(self, request), fields(article_id = %request.article_id))]
    pub async fn preview_rule(
        &self,
        societe_id: Uuid,
        request: &PreviewRequest,
    ) -> Result<RulePreview, ServiceError> {
        request.rule.validate()?;
        let draft = request.rule.to_model(societe_id);
        check_definition(&draft)?;

        let article = self.articles.get(societe_id, request.article_id).await?;
        Ok(pricing::preview(&draft, &article))
    }
}

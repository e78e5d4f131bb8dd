use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Between,
    GreaterThan,
    LessThan,
    Contains,
    StartsWith,
    EndsWith,
}

/// A single predicate of a price rule.
///
/// `condition_type` names the context attribute (`quantity`, `customer_group`,
/// `article_family`, ...). For `custom` conditions the attribute is `field`.
/// `between` takes `{ "from": a, "to": b }` (or `[a, b]`); `in` and `not_in`
/// take an array or a comma separated string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub operator: ConditionOperator,
    #[schema(value_type = Object)]
    pub value: Value,
}

impl PriceCondition {
    pub fn new(condition_type: &str, operator: ConditionOperator, value: Value) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            field: None,
            operator,
            value,
        }
    }

    /// Parses the `conditions` JSON column of a rule
    pub fn parse_list(raw: &Value) -> Result<Vec<Self>, serde_json::Error> {
        match raw {
            Value::Null => Ok(Vec::new()),
            other => serde_json::from_value(other.clone()),
        }
    }

    /// Whether the condition holds. A missing attribute never matches.
    pub fn matches(&self, context: &ConditionContext) -> bool {
        let Some(actual) = context
            .get(&self.condition_type)
            .or_else(|| self.field.as_deref().and_then(|f| context.get(f)))
        else {
            return false;
        };
        if actual.is_null() {
            return false;
        }

        match self.operator {
            ConditionOperator::Equals => loosely_equal(actual, &self.value),
            ConditionOperator::NotEquals => !loosely_equal(actual, &self.value),
            ConditionOperator::In => candidates(&self.value)
                .iter()
                .any(|candidate| loosely_equal(actual, candidate)),
            ConditionOperator::NotIn => !candidates(&self.value)
                .iter()
                .any(|candidate| loosely_equal(actual, candidate)),
            ConditionOperator::Between => match bounds(&self.value) {
                Some((from, to)) => {
                    let actual = Scalar::from_json(actual);
                    matches!(
                        actual.compare(&Scalar::from_json(from)),
                        Some(Ordering::Greater | Ordering::Equal)
                    ) && matches!(
                        actual.compare(&Scalar::from_json(to)),
                        Some(Ordering::Less | Ordering::Equal)
                    )
                }
                None => false,
            },
            ConditionOperator::GreaterThan => {
                Scalar::from_json(actual).compare(&Scalar::from_json(&self.value))
                    == Some(Ordering::Greater)
            }
            ConditionOperator::LessThan => {
                Scalar::from_json(actual).compare(&Scalar::from_json(&self.value))
                    == Some(Ordering::Less)
            }
            ConditionOperator::Contains => match actual {
                Value::Array(items) => items.iter().any(|item| loosely_equal(item, &self.value)),
                _ => text(actual).contains(&text(&self.value)),
            },
            ConditionOperator::StartsWith => text(actual).starts_with(&text(&self.value)),
            ConditionOperator::EndsWith => text(actual).ends_with(&text(&self.value)),
        }
    }
}

/// Attribute bag a rule's conditions are evaluated against
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConditionContext(BTreeMap<String, Value>);

impl ConditionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Inserts only when the value is present
    pub fn insert_opt<V: Into<Value>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ConditionContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Number(Decimal),
    Date(DateTime<Utc>),
    Text(String),
}

impl Scalar {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .map(Scalar::Number)
                .unwrap_or_else(|_| Scalar::Text(n.to_string())),
            Value::String(s) => Self::from_text(s),
            other => Scalar::Text(text(other)),
        }
    }

    fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(number) = Decimal::from_str(trimmed) {
            return Scalar::Number(number);
        }
        if let Ok(date) = DateTime::parse_from_rfc3339(trimmed) {
            return Scalar::Date(date.with_timezone(&Utc));
        }
        if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Scalar::Date(midnight.and_utc());
        }
        Scalar::Text(trimmed.to_lowercase())
    }

    fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Number(a), Scalar::Number(b)) => Some(a.cmp(b)),
            (Scalar::Date(a), Scalar::Date(b)) => Some(a.cmp(b)),
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Lowercased textual form used by the string operators
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_lowercase(),
        Value::Null => String::new(),
        other => other.to_string().to_lowercase(),
    }
}

fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    Scalar::from_json(actual).compare(&Scalar::from_json(expected)) == Some(Ordering::Equal)
}

fn candidates(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(item.to_string()))
            .collect(),
        other => vec![other.clone()],
    }
}

fn bounds(value: &Value) -> Option<(&Value, &Value)> {
    match value {
        Value::Object(map) => Some((map.get("from")?, map.get("to")?)),
        Value::Array(items) if items.len() == 2 => Some((&items[0], &items[1])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn context() -> ConditionContext {
        [
            ("quantity", json!(25)),
            ("customer_group", json!("GROSSISTE")),
            ("customer_email", json!("achat@acier-lyon.fr")),
            ("article_reference", json!("TUB-40X40-2")),
            ("article_family", json!("TUBES")),
            ("order_total", json!("1250.50")),
            ("date_range", json!("2026-03-15T10:00:00Z")),
            ("certifications", json!(["ISO9001", "EN1090"])),
        ]
        .into_iter()
        .collect()
    }

    #[rstest]
    #[case("quantity", ConditionOperator::Equals, json!(25), true)]
    #[case("quantity", ConditionOperator::Equals, json!("25.0"), true)]
    #[case("customer_group", ConditionOperator::Equals, json!("grossiste"), true)]
    #[case("customer_group", ConditionOperator::NotEquals, json!("DETAIL"), true)]
    #[case("customer_group", ConditionOperator::In, json!(["DETAIL", "GROSSISTE"]), true)]
    #[case("customer_group", ConditionOperator::In, json!("DETAIL, GROSSISTE"), true)]
    #[case("customer_group", ConditionOperator::NotIn, json!("DETAIL,PARTICULIER"), true)]
    #[case("quantity", ConditionOperator::Between, json!({"from": 10, "to": 50}), true)]
    #[case("quantity", ConditionOperator::Between, json!([25, 25]), true)]
    #[case("quantity", ConditionOperator::Between, json!({"from": 30, "to": 50}), false)]
    #[case("quantity", ConditionOperator::Between, json!(10), false)]
    #[case("order_total", ConditionOperator::GreaterThan, json!(1000), true)]
    #[case("order_total", ConditionOperator::LessThan, json!(1000), false)]
    #[case("customer_email", ConditionOperator::EndsWith, json!("@acier-lyon.fr"), true)]
    #[case("article_reference", ConditionOperator::StartsWith, json!("tub-"), true)]
    #[case("article_reference", ConditionOperator::Contains, json!("40X40"), true)]
    #[case("certifications", ConditionOperator::Contains, json!("EN1090"), true)]
    #[case("date_range", ConditionOperator::Between, json!({"from": "2026-01-01", "to": "2026-06-30"}), true)]
    #[case("date_range", ConditionOperator::GreaterThan, json!("2026-04-01"), false)]
    fn operator_table(
        #[case] attribute: &str,
        #[case] operator: ConditionOperator,
        #[case] value: Value,
        #[case] expected: bool,
    ) {
        let condition = PriceCondition::new(attribute, operator, value);
        assert_eq!(condition.matches(&context()), expected);
    }

    #[rstest]
    #[case(ConditionOperator::Equals)]
    #[case(ConditionOperator::NotEquals)]
    #[case(ConditionOperator::NotIn)]
    fn unknown_attribute_never_matches(#[case] operator: ConditionOperator) {
        let condition = PriceCondition::new("customer_code", operator, json!("C001"));
        assert!(!condition.matches(&context()));
    }

    #[test]
    fn custom_conditions_use_the_field_name() {
        let mut condition =
            PriceCondition::new("custom", ConditionOperator::Equals, json!("galvanise"));
        condition.field = Some("finition".to_string());

        let mut ctx = context();
        assert!(!condition.matches(&ctx));
        ctx.insert("finition", "GALVANISE");
        assert!(condition.matches(&ctx));
    }

    #[test]
    fn mixed_kinds_do_not_compare() {
        let condition =
            PriceCondition::new("customer_group", ConditionOperator::GreaterThan, json!(3));
        assert!(!condition.matches(&context()));
    }

    #[test]
    fn condition_lists_parse_from_json_columns() {
        let raw = json!([
            {"type": "quantity", "operator": "greater_than", "value": 10},
            {"type": "custom", "field": "finition", "operator": "in", "value": "brut,peint"}
        ]);
        let parsed = PriceCondition::parse_list(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].field.as_deref(), Some("finition"));
        assert!(PriceCondition::parse_list(&Value::Null).unwrap().is_empty());
        assert!(PriceCondition::parse_list(&json!({"type": 1})).is_err());
    }
}

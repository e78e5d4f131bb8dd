use super::formula::{Formula, FormulaError};
use crate::entities::{
    article,
    price_rule::{self, AdjustmentType},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdjustmentError {
    #[error("unsupported unit '{unit}' for {adjustment}")]
    UnsupportedUnit {
        unit: String,
        adjustment: AdjustmentType,
    },
    #[error("formula rule has no formula")]
    MissingFormula,
    #[error("formula error: {0}")]
    Formula(#[from] FormulaError),
    #[error("arithmetic overflow")]
    Overflow,
}

/// Inputs of a single adjustment step
#[derive(Debug, Clone, Copy)]
pub struct AdjustmentInput<'a> {
    pub article: &'a article::Model,
    /// Price before any rule, after the sales coefficient
    pub base_price: Decimal,
    /// Price after the rules applied so far
    pub current_price: Decimal,
    pub quantity: Decimal,
}

/// Article measures in pricing units: kg, m, m² and m³
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measures {
    pub weight_kg: Option<Decimal>,
    pub length_m: Option<Decimal>,
    pub width_m: Option<Decimal>,
    pub height_m: Option<Decimal>,
    pub surface_m2: Option<Decimal>,
    pub volume_m3: Option<Decimal>,
}

impl Measures {
    /// Stored dimensions are in mm. Zero is treated as unknown.
    pub fn of(article: &article::Model) -> Self {
        let positive = |value: Option<Decimal>| value.filter(|v| v.is_sign_positive() && !v.is_zero());
        let length_m = positive(article.longueur).map(|mm| mm / dec!(1000));
        let width_m = positive(article.largeur).map(|mm| mm / dec!(1000));
        let height_m = positive(article.hauteur).map(|mm| mm / dec!(1000));

        let surface_m2 = match (length_m, width_m) {
            (Some(l), Some(w)) => l.checked_mul(w),
            _ => None,
        };
        let volume_m3 = positive(article.volume).or_else(|| match (surface_m2, height_m) {
            (Some(s), Some(h)) => s.checked_mul(h),
            _ => None,
        });

        Self {
            weight_kg: positive(article.poids),
            length_m,
            width_m,
            height_m,
            surface_m2,
            volume_m3,
        }
    }
}

/// Applies one rule to the current price.
///
/// Per-unit rules price the article measure expressed in the rule's unit
/// (`adjustment_unit`, defaulting to kg, m, m² or m³). A missing measure yields 0.
pub fn apply(rule: &price_rule::Model, input: AdjustmentInput<'_>) -> Result<Decimal, AdjustmentError> {
    let value = rule.adjustment_value;
    let price = input.current_price;

    match rule.adjustment_type {
        AdjustmentType::Percentage => {
            let factor = Decimal::ONE
                .checked_add(value / dec!(100))
                .ok_or(AdjustmentError::Overflow)?;
            price.checked_mul(factor).ok_or(AdjustmentError::Overflow)
        }
        AdjustmentType::FixedAmount => price.checked_add(value).ok_or(AdjustmentError::Overflow),
        AdjustmentType::FixedPrice => Ok(value),
        AdjustmentType::PricePerWeight
        | AdjustmentType::PricePerLength
        | AdjustmentType::PricePerSurface
        | AdjustmentType::PricePerVolume => per_unit(rule, &Measures::of(input.article)),
        AdjustmentType::Formula => {
            let source = rule
                .formula
                .as_deref()
                .filter(|f| !f.trim().is_empty())
                .ok_or(AdjustmentError::MissingFormula)?;
            let formula = Formula::parse(source)?;
            let result = formula.evaluate(&formula_variables(&input))?;
            Ok(result.max(Decimal::ZERO))
        }
    }
}

/// `adjustment_value` per unit of the article's measure. A rule without
/// `adjustment_unit` is priced per base unit (kg, m, m², m³) rather than
/// yielding zero; a missing measure on the article still yields zero.
fn per_unit(rule: &price_rule::Model, measures: &Measures) -> Result<Decimal, AdjustmentError> {
    let kind = rule.adjustment_type;
    let unit = rule
        .adjustment_unit
        .as_deref()
        .map(|u| u.trim().to_uppercase())
        .filter(|u| !u.is_empty());

    // (measure in base unit, base units per rule unit)
    let (measure, per_rule_unit) = match kind {
        AdjustmentType::PricePerWeight => (
            measures.weight_kg,
            match unit.as_deref().unwrap_or("KG") {
                "KG" => dec!(1),
                "G" => dec!(0.001),
                "T" => dec!(1000),
                other => return Err(unsupported(other, kind)),
            },
        ),
        AdjustmentType::PricePerLength => (
            measures.length_m,
            match unit.as_deref().unwrap_or("M") {
                "M" | "ML" => dec!(1),
                "CM" => dec!(0.01),
                "MM" => dec!(0.001),
                other => return Err(unsupported(other, kind)),
            },
        ),
        AdjustmentType::PricePerSurface => (
            measures.surface_m2,
            match unit.as_deref().unwrap_or("M2") {
                "M2" => dec!(1),
                "CM2" => dec!(0.0001),
                "MM2" => dec!(0.000001),
                other => return Err(unsupported(other, kind)),
            },
        ),
        AdjustmentType::PricePerVolume => (
            measures.volume_m3,
            match unit.as_deref().unwrap_or("M3") {
                "M3" => dec!(1),
                "L" | "DM3" => dec!(0.001),
                "CM3" => dec!(0.000001),
                other => return Err(unsupported(other, kind)),
            },
        ),
        _ => return Ok(Decimal::ZERO),
    };

    let Some(measure) = measure else {
        return Ok(Decimal::ZERO);
    };
    measure
        .checked_div(per_rule_unit)
        .and_then(|quantity| quantity.checked_mul(rule.adjustment_value))
        .ok_or(AdjustmentError::Overflow)
}

fn unsupported(unit: &str, adjustment: AdjustmentType) -> AdjustmentError {
    AdjustmentError::UnsupportedUnit {
        unit: unit.to_string(),
        adjustment,
    }
}

fn formula_variables(input: &AdjustmentInput<'_>) -> HashMap<&'static str, Decimal> {
    let measures = Measures::of(input.article);
    let or_zero = |value: Option<Decimal>| value.unwrap_or(Decimal::ZERO);
    HashMap::from([
        ("basePrice", input.base_price),
        ("price", input.current_price),
        ("quantity", input.quantity),
        ("weight", or_zero(measures.weight_kg)),
        ("length", or_zero(measures.length_m)),
        ("width", or_zero(measures.width_m)),
        ("height", or_zero(measures.height_m)),
        ("surface", or_zero(measures.surface_m2)),
        ("volume", or_zero(measures.volume_m3)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::test_support::{article, rule};
    use assert_matches::assert_matches;

    fn input(article: &article::Model, price: Decimal) -> AdjustmentInput<'_> {
        AdjustmentInput {
            article,
            base_price: dec!(100),
            current_price: price,
            quantity: dec!(4),
        }
    }

    #[test]
    fn price_level_adjustments() {
        let art = article();
        let cases = [
            (AdjustmentType::Percentage, dec!(-10), dec!(90)),
            (AdjustmentType::Percentage, dec!(15), dec!(115)),
            (AdjustmentType::FixedAmount, dec!(-12.5), dec!(87.5)),
            (AdjustmentType::FixedPrice, dec!(42), dec!(42)),
        ];
        for (kind, value, expected) in cases {
            let r = rule(kind, value);
            assert_eq!(apply(&r, input(&art, dec!(100))).unwrap(), expected, "{kind}");
        }
    }

    #[test]
    fn per_weight_converts_units() {
        let mut art = article();
        art.poids = Some(dec!(250));

        let mut r = rule(AdjustmentType::PricePerWeight, dec!(2));
        assert_eq!(apply(&r, input(&art, dec!(100))).unwrap(), dec!(500));

        r.adjustment_unit = Some("t".into());
        r.adjustment_value = dec!(800);
        assert_eq!(apply(&r, input(&art, dec!(100))).unwrap(), dec!(200));

        r.adjustment_unit = Some("G".into());
        r.adjustment_value = dec!(0.002);
        assert_eq!(apply(&r, input(&art, dec!(100))).unwrap(), dec!(500));
    }

    #[test]
    fn per_dimension_adjustments() {
        let mut art = article();
        art.longueur = Some(dec!(6000));
        art.largeur = Some(dec!(1500));
        art.hauteur = Some(dec!(10));

        let r = rule(AdjustmentType::PricePerLength, dec!(3));
        assert_eq!(apply(&r, input(&art, dec!(0))).unwrap(), dec!(18));

        let r = rule(AdjustmentType::PricePerSurface, dec!(10));
        assert_eq!(apply(&r, input(&art, dec!(0))).unwrap(), dec!(90));

        let r = rule(AdjustmentType::PricePerVolume, dec!(1000));
        assert_eq!(apply(&r, input(&art, dec!(0))).unwrap(), dec!(90));

        art.volume = Some(dec!(0.5));
        assert_eq!(apply(&r, input(&art, dec!(0))).unwrap(), dec!(500));
    }

    #[test]
    fn missing_measures_yield_zero() {
        let art = article();
        for kind in [
            AdjustmentType::PricePerWeight,
            AdjustmentType::PricePerLength,
            AdjustmentType::PricePerSurface,
            AdjustmentType::PricePerVolume,
        ] {
            assert_eq!(
                apply(&rule(kind, dec!(5)), input(&art, dec!(100))).unwrap(),
                Decimal::ZERO
            );
        }
    }

    #[test]
    fn missing_unit_means_base_unit() {
        let mut art = article();
        art.poids = Some(dec!(12));
        art.longueur = Some(dec!(2500));

        let mut r = rule(AdjustmentType::PricePerWeight, dec!(3));
        r.adjustment_unit = None;
        assert_eq!(apply(&r, input(&art, dec!(0))).unwrap(), dec!(36));
        r.adjustment_unit = Some("  ".into());
        assert_eq!(apply(&r, input(&art, dec!(0))).unwrap(), dec!(36));

        let mut r = rule(AdjustmentType::PricePerLength, dec!(4));
        r.adjustment_unit = None;
        assert_eq!(apply(&r, input(&art, dec!(0))).unwrap(), dec!(10));
    }

    #[test]
    fn unknown_units_are_rejected() {
        let mut art = article();
        art.poids = Some(dec!(1));
        let mut r = rule(AdjustmentType::PricePerWeight, dec!(1));
        r.adjustment_unit = Some("LB".into());
        assert_matches!(
            apply(&r, input(&art, dec!(1))),
            Err(AdjustmentError::UnsupportedUnit { .. })
        );
    }

    #[test]
    fn formulas_see_prices_and_measures() {
        let mut art = article();
        art.poids = Some(dec!(20));

        let mut r = rule(AdjustmentType::Formula, Decimal::ZERO);
        r.formula = Some("price * 0.95 + weight * 0.5".into());
        assert_eq!(apply(&r, input(&art, dec!(80))).unwrap(), dec!(86));

        r.formula = Some("basePrice - quantity * 50".into());
        assert_eq!(apply(&r, input(&art, dec!(80))).unwrap(), Decimal::ZERO);

        r.formula = Some("price / (quantity - 4)".into());
        assert_matches!(
            apply(&r, input(&art, dec!(80))),
            Err(AdjustmentError::Formula(FormulaError::DivisionByZero))
        );

        r.formula = None;
        assert_matches!(apply(&r, input(&art, dec!(80))), Err(AdjustmentError::MissingFormula));
    }
}

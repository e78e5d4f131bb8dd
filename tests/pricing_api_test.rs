mod common;

use axum::http::{Method, StatusCode};
use common::{data_of, TestApp};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use uuid::Uuid;

/// Decimals come back as JSON strings; integers in tests may also be plain numbers.
fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {}", other),
    }
}

async fn create_article(app: &TestApp, reference: &str, price: &str) -> String {
    let article = data_of(
        app.admin(
            Method::POST,
            "/api/articles",
            Some(json!({
                "reference": reference,
                "designation": format!("Article {}", reference),
                "type": "PRODUIT_FINI",
                "unite_stock": "U",
                "famille": "TUBES",
                "prix_achat_standard": "60",
                "prix_vente_ht": price
            })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    article["id"].as_str().unwrap().to_string()
}

async fn create_rule(app: &TestApp, body: Value) -> Value {
    data_of(
        app.admin(Method::POST, "/api/price-rules", Some(body)).await,
        StatusCode::CREATED,
    )
    .await
}

#[tokio::test]
async fn percentage_rule_discounts_the_sales_price() {
    let app = TestApp::new().await;
    let article_id = create_article(&app, "tub-40x40", "100").await;
    let rule = create_rule(
        &app,
        json!({
            "rule_name": "Remise tubes",
            "adjustment_type": "PERCENTAGE",
            "adjustment_value": "-10",
            "article_family": "TUBES"
        }),
    )
    .await;

    let result = data_of(
        app.admin(
            Method::POST,
            "/api/pricing/calculate",
            Some(json!({
                "articleId": article_id,
                "context": { "quantity": 3 },
                "options": { "detailed": true, "includeMargins": true }
            })),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(result["articleReference"], "TUB-40X40");
    assert_eq!(dec(&result["basePrice"]), Decimal::from(100));
    assert_eq!(dec(&result["finalPrice"]), Decimal::from(90));
    assert_eq!(dec(&result["lineTotal"]), Decimal::from(270));
    assert_eq!(dec(&result["totalDiscount"]), Decimal::from(10));

    let applied = result["appliedRules"].as_array().unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0]["ruleId"], rule["id"]);
    assert!(result["breakdown"].is_object());
    assert!(result["margins"].is_object());
}

#[tokio::test]
async fn quantity_condition_gates_the_rule() {
    let app = TestApp::new().await;
    let article_id = create_article(&app, "CORN-50", "80").await;
    create_rule(
        &app,
        json!({
            "rule_name": "Gros volume",
            "adjustment_type": "FIXED_AMOUNT",
            "adjustment_value": "-5",
            "conditions": [
                { "type": "quantity", "operator": "greater_than", "value": 10 }
            ]
        }),
    )
    .await;

    for (quantity, expected) in [(5, 80), (20, 75)] {
        let result = data_of(
            app.admin(
                Method::POST,
                "/api/pricing/calculate",
                Some(json!({ "articleId": article_id, "context": { "quantity": quantity } })),
            )
            .await,
            StatusCode::OK,
        )
        .await;
        assert_eq!(
            dec(&result["finalPrice"]),
            Decimal::from(expected),
            "quantity {}",
            quantity
        );
    }
}

#[tokio::test]
async fn unknown_article_yields_a_warning_not_an_error() {
    let app = TestApp::new().await;
    let missing = Uuid::new_v4();

    let result = data_of(
        app.admin(
            Method::POST,
            "/api/pricing/calculate",
            Some(json!({ "articleId": missing })),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(result["articleId"], missing.to_string());
    assert!(result["appliedRules"].as_array().unwrap().is_empty());
    assert!(!result["warnings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn bulk_prices_keep_request_order() {
    let app = TestApp::new().await;
    let first = create_article(&app, "PL-1", "10").await;
    let second = create_article(&app, "PL-2", "20").await;

    let results = data_of(
        app.admin(
            Method::POST,
            "/api/pricing/bulk",
            Some(json!({ "articleIds": [second, first] })),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["articleId"], second.as_str());
    assert_eq!(dec(&results[1]["finalPrice"]), Decimal::from(10));

    let response = app
        .admin(Method::POST, "/api/pricing/bulk", Some(json!({ "articleIds": [] })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn preview_does_not_persist_the_rule() {
    let app = TestApp::new().await;
    let article_id = create_article(&app, "IPE-100", "200").await;

    let preview = data_of(
        app.admin(
            Method::POST,
            "/api/pricing/preview",
            Some(json!({
                "articleId": article_id,
                "rule": {
                    "rule_name": "Essai",
                    "adjustment_type": "PERCENTAGE",
                    "adjustment_value": "15"
                }
            })),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(dec(&preview["adjustedPrice"]), Decimal::from(230));
    assert_eq!(dec(&preview["difference"]), Decimal::from(30));

    let rules = data_of(
        app.admin(Method::GET, "/api/price-rules", None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(rules["total"], 0);
}

#[tokio::test]
async fn toggled_rule_leaves_the_active_list() {
    let app = TestApp::new().await;
    let article_id = create_article(&app, "UPN-80", "50").await;
    let rule = create_rule(
        &app,
        json!({
            "rule_name": "Prix fixe",
            "adjustment_type": "FIXED_PRICE",
            "adjustment_value": "42"
        }),
    )
    .await;
    let rule_id = rule["id"].as_str().unwrap();

    let active = data_of(
        app.admin(Method::GET, "/api/price-rules/active", None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(active.as_array().unwrap().len(), 1);

    let toggled = data_of(
        app.admin(
            Method::POST,
            &format!("/api/price-rules/{}/toggle", rule_id),
            None,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(toggled["is_active"], false);

    let active = data_of(
        app.admin(Method::GET, "/api/price-rules/active", None).await,
        StatusCode::OK,
    )
    .await;
    assert!(active.as_array().unwrap().is_empty());

    let result = data_of(
        app.admin(
            Method::POST,
            "/api/pricing/calculate",
            Some(json!({ "articleId": article_id })),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(dec(&result["finalPrice"]), Decimal::from(50));
}

#[tokio::test]
async fn formula_rules_are_validated_on_create() {
    let app = TestApp::new().await;
    let response = app
        .admin(
            Method::POST,
            "/api/price-rules",
            Some(json!({
                "rule_name": "Formule cassée",
                "adjustment_type": "FORMULA",
                "adjustment_value": "0",
                "formula": "base_price * ("
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_uses_are_all_counted_per_customer() {
    let app = TestApp::new().await;
    let rule = create_rule(
        &app,
        json!({
            "rule_name": "Fidélité",
            "adjustment_type": "PERCENTAGE",
            "adjustment_value": "-2",
            "usage_limit_per_customer": 100
        }),
    )
    .await;
    let rule_id = Uuid::parse_str(rule["id"].as_str().unwrap()).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let rules = app.state.services.price_rules.clone();
            tokio::spawn(async move { rules.increment_usage(rule_id, Some("C-1")).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = app
        .state
        .services
        .price_rules
        .get(app.societe.id, rule_id)
        .await
        .unwrap();
    assert_eq!(stored.usage_count, 8);
    assert_eq!(
        stored.metadata.unwrap()["usageByCustomer"]["C-1"],
        json!(8)
    );
    assert_eq!(stored.version, 1);
}

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, data_of, TestApp};
use serde_json::json;
use steel_erp_api::auth::consts as perm;

fn material(code: &str, kind: &str) -> serde_json::Value {
    json!({
        "code": code,
        "nom": format!("Material {}", code),
        "type": kind,
        "forme": "PLAQUE",
        "nuance": "S235JR",
        "caracteristiques": { "densite": 7.85 }
    })
}

#[tokio::test]
async fn material_lifecycle() {
    let app = TestApp::new().await;

    let created = data_of(
        app.admin(Method::POST, "/api/shared/materials", Some(material(" s235-pl ", "ACIER")))
            .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(created["code"], "S235-PL");
    assert_eq!(created["version"], 1);
    let id = created["id"].as_str().unwrap().to_string();

    let by_code = data_of(
        app.admin(Method::GET, "/api/shared/materials/code/s235-pl", None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(by_code["id"], id.as_str());

    let updated = data_of(
        app.admin(
            Method::PUT,
            &format!("/api/shared/materials/{}", id),
            Some(json!({ "nom": "Tôle S235" })),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["nom"], "Tôle S235");
    assert_eq!(updated["version"], 2);

    let response = app
        .admin(Method::DELETE, &format!("/api/shared/materials/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .admin(Method::GET, &format!("/api/shared/materials/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_codes_conflict_even_after_delete() {
    let app = TestApp::new().await;

    let created = data_of(
        app.admin(Method::POST, "/api/shared/materials", Some(material("INOX-304", "INOX")))
            .await,
        StatusCode::CREATED,
    )
    .await;

    let response = app
        .admin(Method::POST, "/api/shared/materials", Some(material("inox-304", "INOX")))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let id = created["id"].as_str().unwrap();
    app.admin(Method::DELETE, &format!("/api/shared/materials/{}", id), None)
        .await;
    let response = app
        .admin(Method::POST, "/api/shared/materials", Some(material("INOX-304", "INOX")))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_filters_and_stats() {
    let app = TestApp::new().await;
    for (code, kind) in [("A-1", "ACIER"), ("A-2", "ACIER"), ("AL-1", "ALUMINIUM")] {
        let response = app
            .admin(Method::POST, "/api/shared/materials", Some(material(code, kind)))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let page = data_of(
        app.admin(Method::GET, "/api/shared/materials?type=acier&per_page=1", None)
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["total_pages"], 2);

    let stats = data_of(
        app.admin(Method::GET, "/api/shared/materials/stats", None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["by_type"]["ACIER"], 2);
    assert_eq!(stats["by_type"]["ALUMINIUM"], 1);
}

#[tokio::test]
async fn supplier_siret_is_validated() {
    let app = TestApp::new().await;
    let response = app
        .admin(
            Method::POST,
            "/api/shared/suppliers",
            Some(json!({
                "code": "FOURN-1",
                "raison_sociale": "Fournisseur Un",
                "siret": "123",
                "type": "FABRICANT"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn catalog_permissions_split_read_and_write() {
    let app = TestApp::new().await;
    let reader = app.user_token(&["USER"], &[perm::CATALOG_READ]);

    let response = app
        .send(Method::GET, "/api/shared/processes", None, Some(&reader))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(
            Method::POST,
            "/api/shared/processes",
            Some(json!({ "code": "DECOUPE", "nom": "Découpe", "type": "DECOUPE" })),
            Some(&reader),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.raw(Method::GET, "/api/shared/processes", None, &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"].is_object());
}

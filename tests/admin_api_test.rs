mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, data_of, TestApp};
use serde_json::json;

#[tokio::test]
async fn societe_lifecycle() {
    let app = TestApp::new().await;

    let created = data_of(
        app.admin(
            Method::POST,
            "/api/admin/societes",
            Some(json!({ "code": "METAL-SUD", "nom": "Métal Sud", "siret": "98765432109876" })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(created["status"], "ACTIVE");
    let id = created["id"].as_str().unwrap().to_string();

    let updated = data_of(
        app.admin(
            Method::PUT,
            &format!("/api/admin/societes/{}", id),
            Some(json!({ "nom": "Métal Sud SAS" })),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["nom"], "Métal Sud SAS");

    let suspended = data_of(
        app.admin(
            Method::PATCH,
            &format!("/api/admin/societes/{}/status", id),
            Some(json!({ "status": "SUSPENDED" })),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(suspended["status"], "SUSPENDED");

    let page = data_of(
        app.admin(Method::GET, "/api/admin/societes?status=SUSPENDED", None)
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["code"], "METAL-SUD");

    let response = app
        .admin(Method::DELETE, &format!("/api/admin/societes/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .admin(Method::GET, &format!("/api/admin/societes/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn societe_codes_are_unique_and_well_formed() {
    let app = TestApp::new().await;

    let response = app
        .admin(
            Method::POST,
            "/api/admin/societes",
            Some(json!({ "code": "ACIER", "nom": "Doublon" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .admin(
            Method::POST,
            "/api/admin/societes",
            Some(json!({ "code": "minuscules", "nom": "Code invalide" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn administration_is_reserved_to_admins() {
    let app = TestApp::new().await;
    let user = app.user_token(&["USER"], &["*"]);

    for uri in ["/api/admin/societes", "/api/admin/database/connection"] {
        let response = app.send(Method::GET, uri, None, Some(&user)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
    }

    let super_admin = app.user_token(&["SUPER_ADMIN"], &[]);
    let response = app
        .send(Method::GET, "/api/admin/societes", None, Some(&super_admin))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn database_reports_a_healthy_schema() {
    let app = TestApp::new().await;

    let connection = data_of(
        app.admin(Method::GET, "/api/admin/database/connection", None)
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(connection["connected"], true);
    assert_eq!(connection["backend"], "sqlite");

    let integrity = data_of(
        app.admin(Method::GET, "/api/admin/database/integrity", None)
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(integrity["summary"]["missing"], 0);
    assert!(integrity["summary"]["present"].as_u64().unwrap() > 0);

    let migrations = data_of(
        app.admin(Method::GET, "/api/admin/database/migrations", None)
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(migrations["status"], "up-to-date");
    assert!(migrations["pending"].as_array().unwrap().is_empty());

    let run = data_of(
        app.admin(Method::POST, "/api/admin/database/migrations/run", None)
            .await,
        StatusCode::OK,
    )
    .await;
    assert!(run["executed"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_the_database() {
    let app = TestApp::new().await;
    let response = app.raw(Method::GET, "/health", None, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

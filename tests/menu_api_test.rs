mod common;

use axum::http::{Method, StatusCode};
use common::{data_of, TestApp};
use serde_json::{json, Value};
use steel_erp_api::auth::consts as perm;

const CONFIGS: &str = "/api/admin/menus/configurations";

fn titles(nodes: &Value) -> Vec<String> {
    nodes
        .as_array()
        .unwrap()
        .iter()
        .map(|node| node["title"].as_str().unwrap().to_string())
        .collect()
}

async fn default_configuration(app: &TestApp) -> String {
    let config = data_of(
        app.admin(Method::POST, &format!("{}/default", CONFIGS), None)
            .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(config["is_system"], true);
    assert_eq!(config["is_active"], false);
    config["id"].as_str().unwrap().to_string()
}

async fn activate(app: &TestApp, id: &str) {
    let config = data_of(
        app.admin(Method::POST, &format!("{}/{}/activate", CONFIGS, id), None)
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(config["is_active"], true);
}

#[tokio::test]
async fn user_menu_is_empty_without_an_active_configuration() {
    let app = TestApp::new().await;
    let token = app.user_token(&["USER"], &[]);

    let menu = data_of(
        app.send(Method::GET, "/api/menu", None, Some(&token)).await,
        StatusCode::OK,
    )
    .await;
    assert!(menu.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn user_menu_follows_roles_and_permissions() {
    let app = TestApp::new().await;
    let id = default_configuration(&app).await;
    activate(&app, &id).await;

    let plain = app.user_token(&["USER"], &[]);
    let menu = data_of(
        app.send(Method::GET, "/api/menu", None, Some(&plain)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(titles(&menu), ["Tableau de bord", "Query Builder"]);

    let menu_admin = app.user_token(&["ADMIN"], &["MENU_MANAGEMENT_VIEW"]);
    let menu = data_of(
        app.send(Method::GET, "/api/menu", None, Some(&menu_admin)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(
        titles(&menu),
        ["Tableau de bord", "Query Builder", "Administration"]
    );
    assert_eq!(titles(&menu[2]["children"]), ["Gestion des menus"]);
}

#[tokio::test]
async fn only_one_configuration_is_active() {
    let app = TestApp::new().await;
    let first = default_configuration(&app).await;
    let second = data_of(
        app.admin(Method::POST, CONFIGS, Some(json!({ "name": "Atelier" })))
            .await,
        StatusCode::CREATED,
    )
    .await;
    let second = second["id"].as_str().unwrap().to_string();

    activate(&app, &first).await;
    activate(&app, &second).await;

    let active = data_of(
        app.admin(Method::GET, &format!("{}/active", CONFIGS), None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(active["id"], second.as_str());

    let first_config = data_of(
        app.admin(Method::GET, &format!("{}/{}", CONFIGS, first), None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(first_config["is_active"], false);
}

#[tokio::test]
async fn system_and_active_configurations_cannot_be_deleted() {
    let app = TestApp::new().await;
    let system = default_configuration(&app).await;
    let response = app
        .admin(Method::DELETE, &format!("{}/{}", CONFIGS, system), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let custom = data_of(
        app.admin(Method::POST, CONFIGS, Some(json!({ "name": "Bureau" })))
            .await,
        StatusCode::CREATED,
    )
    .await;
    let custom = custom["id"].as_str().unwrap().to_string();
    activate(&app, &custom).await;
    let response = app
        .admin(Method::DELETE, &format!("{}/{}", CONFIGS, custom), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    activate(&app, &system).await;
    let response = app
        .admin(Method::DELETE, &format!("{}/{}", CONFIGS, custom), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn items_are_added_moved_and_deleted() {
    let app = TestApp::new().await;
    let config = data_of(
        app.admin(
            Method::POST,
            CONFIGS,
            Some(json!({
                "name": "Production",
                "items": [
                    { "title": "Stocks", "type": "FOLDER" },
                    { "title": "Planning", "type": "PROGRAM", "program_id": "/planning" }
                ]
            })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let config_id = config["id"].as_str().unwrap().to_string();
    let items_uri = format!("{}/{}/items", CONFIGS, config_id);

    let tree = data_of(
        app.admin(Method::GET, &format!("{}/{}/tree", CONFIGS, config_id), None)
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(titles(&tree), ["Stocks", "Planning"]);
    let folder_id = tree[0]["id"].as_str().unwrap().to_string();
    let planning_id = tree[1]["id"].as_str().unwrap().to_string();

    let response = app
        .admin(
            Method::POST,
            &items_uri,
            Some(json!({ "title": "Sans cible", "type": "LINK" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let added = data_of(
        app.admin(
            Method::POST,
            &items_uri,
            Some(json!({
                "parent_id": folder_id,
                "title": "Inventaire",
                "type": "PROGRAM",
                "program_id": "/stocks/inventaire"
            })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(added["parent_id"], folder_id.as_str());

    // dropping onto a program is refused
    let response = app
        .admin(
            Method::POST,
            &format!("{}/move", items_uri),
            Some(json!({
                "dragged_id": folder_id,
                "target_id": planning_id,
                "position": "inside"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let tree = data_of(
        app.admin(
            Method::POST,
            &format!("{}/move", items_uri),
            Some(json!({
                "dragged_id": planning_id,
                "target_id": folder_id,
                "position": "inside"
            })),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(titles(&tree), ["Stocks"]);
    assert_eq!(tree[0]["children"].as_array().unwrap().len(), 2);

    let tree = data_of(
        app.admin(
            Method::POST,
            &format!("{}/move", items_uri),
            Some(json!({
                "dragged_id": planning_id,
                "target_id": folder_id,
                "offset_y": 2.0,
                "height": 40.0
            })),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(titles(&tree), ["Planning", "Stocks"]);

    let response = app
        .admin(Method::DELETE, &format!("{}/{}", items_uri, folder_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let tree = data_of(
        app.admin(Method::GET, &format!("{}/{}/tree", CONFIGS, config_id), None)
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(titles(&tree), ["Planning"]);
}

#[tokio::test]
async fn export_can_be_imported_as_a_new_configuration() {
    let app = TestApp::new().await;
    let id = default_configuration(&app).await;

    let mut export = data_of(
        app.admin(Method::GET, &format!("{}/{}/export", CONFIGS, id), None)
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(export["version"], "1.0");
    export["name"] = json!("Copie du menu");

    let imported = data_of(
        app.admin(Method::POST, &format!("{}/import", CONFIGS), Some(export))
            .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(imported["is_system"], false);

    let tree = data_of(
        app.admin(
            Method::GET,
            &format!("{}/{}/tree", CONFIGS, imported["id"].as_str().unwrap()),
            None,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    // roots follow order_index, not insertion order
    assert_eq!(
        titles(&tree),
        ["Tableau de bord", "Query Builder", "Administration"]
    );
    assert_eq!(tree[2]["children"].as_array().unwrap().len(), 4);

    let response = app
        .admin(
            Method::POST,
            CONFIGS,
            Some(json!({ "name": "Copie du menu" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn menu_administration_needs_menu_permissions() {
    let app = TestApp::new().await;
    let reader = app.user_token(&["USER"], &[perm::MENU_READ]);

    let response = app.send(Method::GET, CONFIGS, None, Some(&reader)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(
            Method::POST,
            CONFIGS,
            Some(json!({ "name": "Interdit" })),
            Some(&reader),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

fn nested_folders(prefix: &str, levels: usize) -> Value {
    (0..levels).rev().fold(json!([]), |children, level| {
        json!([{
            "title": format!("{} {}", prefix, level + 1),
            "type": "FOLDER",
            "children": children
        }])
    })[0]
        .clone()
}

#[tokio::test]
async fn menus_stop_at_five_levels() {
    let app = TestApp::new().await;

    let response = app
        .admin(
            Method::POST,
            CONFIGS,
            Some(json!({ "name": "Trop profond", "items": [nested_folders("Niveau", 6)] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let config = data_of(
        app.admin(
            Method::POST,
            CONFIGS,
            Some(json!({
                "name": "Profond",
                "items": [nested_folders("Niveau", 5), nested_folders("Annexe", 2)]
            })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let config_id = config["id"].as_str().unwrap().to_string();
    let items_uri = format!("{}/{}/items", CONFIGS, config_id);

    let tree = data_of(
        app.admin(Method::GET, &format!("{}/{}/tree", CONFIGS, config_id), None)
            .await,
        StatusCode::OK,
    )
    .await;
    let level4 = &tree[0]["children"][0]["children"][0]["children"][0];
    assert_eq!(level4["title"], "Niveau 4");
    let level4_id = level4["id"].as_str().unwrap().to_string();
    let level5_id = level4["children"][0]["id"].as_str().unwrap().to_string();
    let annexe_id = tree[1]["id"].as_str().unwrap().to_string();
    let sub_annexe_id = tree[1]["children"][0]["id"].as_str().unwrap().to_string();

    // a two-level folder under level 4 would reach level 6
    let response = app
        .admin(
            Method::POST,
            &format!("{}/move", items_uri),
            Some(json!({
                "dragged_id": annexe_id,
                "target_id": level4_id,
                "position": "inside"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .admin(
            Method::POST,
            &format!("{}/move", items_uri),
            Some(json!({
                "dragged_id": sub_annexe_id,
                "target_id": level4_id,
                "position": "inside"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .admin(
            Method::POST,
            &items_uri,
            Some(json!({ "parent_id": level5_id, "title": "Niveau 6", "type": "FOLDER" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

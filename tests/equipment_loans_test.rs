mod common;

use axum::http::{Method, StatusCode};
use common::{id_of, response_json, TestApp, VALID_CPF};
use distribuidora_api::entities::product;
use sea_orm::EntityTrait;
use serde_json::json;
use uuid::Uuid;

async fn stock_of(app: &TestApp, product_id: &str) -> i32 {
    let id: Uuid = product_id.parse().unwrap();
    product::Entity::find_by_id(id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity
}

async fn lend(app: &TestApp, customer_id: &str, product_id: &str, quantity: i32) -> serde_json::Value {
    app.admin_ok(
        Method::POST,
        "/api/equipment/loans",
        Some(json!({
            "customer_id": customer_id,
            "product_id": product_id,
            "quantity": quantity,
            "notes": "Chopeira para evento",
        })),
    )
    .await
}

#[tokio::test]
async fn partial_then_full_return_settles_the_loan() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Choperia Central", Some(VALID_CPF), None).await;
    let keg = app.create_product("BARRIL-50L", "0.00", 10, true).await;
    let keg_id = id_of(&keg);

    let loan = lend(&app, &id_of(&customer), &keg_id, 4).await;
    assert_eq!(loan["status"], "active");
    assert_eq!(loan["remaining_quantity"], 4);
    assert_eq!(stock_of(&app, &keg_id).await, 6);
    let loan_id = id_of(&loan);

    let partial = app
        .request(
            Method::POST,
            &format!("/api/equipment/loans/{}/returns", loan_id),
            Some(json!({ "quantity": 1, "condition": "amassado" })),
            Some(&app.operator_token),
        )
        .await;
    assert_eq!(partial.status(), StatusCode::CREATED);
    let partial = response_json(partial).await;
    assert_eq!(partial["data"]["loan"]["status"], "partially_returned");
    assert_eq!(partial["data"]["loan"]["remaining_quantity"], 3);
    assert_eq!(partial["data"]["return"]["condition"], "amassado");
    assert_eq!(stock_of(&app, &keg_id).await, 7);

    let full = app
        .admin_ok(
            Method::POST,
            &format!("/api/equipment/loans/{}/returns", loan_id),
            Some(json!({ "quantity": 3 })),
        )
        .await;
    assert_eq!(full["loan"]["status"], "returned");
    assert_eq!(full["loan"]["returned_quantity"], 4);
    assert_eq!(stock_of(&app, &keg_id).await, 10);

    let returns = app
        .admin_ok(
            Method::GET,
            &format!("/api/equipment/loans/{}/returns", loan_id),
            None,
        )
        .await;
    assert_eq!(returns.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn returning_more_than_lent_is_a_conflict() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Choperia Central", Some(VALID_CPF), None).await;
    let cylinder = app.create_product("CILINDRO-CO2", "0.00", 5, true).await;
    let loan = lend(&app, &id_of(&customer), &id_of(&cylinder), 2).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/equipment/loans/{}/returns", id_of(&loan)),
            Some(json!({ "quantity": 3 })),
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let unchanged = app
        .admin_ok(
            Method::GET,
            &format!("/api/equipment/loans/{}", id_of(&loan)),
            None,
        )
        .await;
    assert_eq!(unchanged["returned_quantity"], 0);
    assert_eq!(stock_of(&app, &id_of(&cylinder)).await, 3);
}

#[tokio::test]
async fn only_equipment_products_can_be_lent() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Choperia Central", Some(VALID_CPF), None).await;
    let beer = app.create_product("CERV-600", "9.50", 100, false).await;

    let response = app
        .request(
            Method::POST,
            "/api/equipment/loans",
            Some(json!({
                "customer_id": id_of(&customer),
                "product_id": id_of(&beer),
                "quantity": 1,
            })),
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&app, &id_of(&beer)).await, 100);
}

#[tokio::test]
async fn lending_beyond_stock_is_rejected() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Choperia Central", Some(VALID_CPF), None).await;
    let cooler = app.create_product("FREEZER-01", "0.00", 1, true).await;

    let response = app
        .request(
            Method::POST,
            "/api/equipment/loans",
            Some(json!({
                "customer_id": id_of(&customer),
                "product_id": id_of(&cooler),
                "quantity": 2,
            })),
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

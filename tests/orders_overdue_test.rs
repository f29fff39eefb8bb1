mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{id_of, response_json, TestApp, VALID_CPF};
use distribuidora_api::entities::{financial_record, order, product};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

async fn overdue_boleto(app: &TestApp, customer_id: &str, amount: &str) -> String {
    let past_due = (Utc::now() - Duration::days(3)).date_naive();
    let record = app
        .admin_ok(
            Method::POST,
            "/api/financial",
            Some(json!({
                "record_type": "receivable",
                "customer_id": customer_id,
                "description": "Boleto vencido",
                "amount": amount,
                "due_date": past_due,
                "payment_method": "boleto",
            })),
        )
        .await;
    id_of(&record)
}

fn order_body(customer_id: &str, product_id: &str, quantity: i32) -> serde_json::Value {
    json!({
        "customer_id": customer_id,
        "items": [{ "product_id": product_id, "quantity": quantity }],
        "payment_method": "boleto",
    })
}

#[tokio::test]
async fn order_creates_receivable_and_takes_stock() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Bar do Zé", Some(VALID_CPF), None).await;
    let product = app.create_product("CERV-600", "9.50", 100, false).await;

    let response = app
        .request(
            Method::POST,
            "/api/orders",
            Some(json!({
                "customer_id": id_of(&customer),
                "items": [{ "product_id": id_of(&product), "quantity": 24 }],
                "discount": "8.00",
                "payment_method": "pix",
            })),
            Some(&app.operator_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let order_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let stored = order::Entity::find_by_id(order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.subtotal, dec!(228.00));
    assert_eq!(stored.total_amount, dec!(220.00));

    let receivable = financial_record::Entity::find()
        .filter(financial_record::Column::OrderId.eq(order_id))
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("receivable for the order");
    assert_eq!(receivable.amount, dec!(220.00));
    assert_eq!(receivable.status, "Pending");
    assert_eq!(receivable.payment_method.as_deref(), Some("pix"));

    let product_id: Uuid = id_of(&product).parse().unwrap();
    let stock = product::Entity::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity;
    assert_eq!(stock, 76);
}

#[tokio::test]
async fn insufficient_stock_rolls_back_the_order() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Mercadinho", Some(VALID_CPF), None).await;
    let product = app.create_product("REFRI-2L", "7.00", 5, false).await;

    let response = app
        .request(
            Method::POST,
            "/api/orders",
            Some(order_body(&id_of(&customer), &id_of(&product), 6)),
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn order_items_are_validated_one_by_one() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Adega Central", Some(VALID_CPF), None).await;
    let product = app.create_product("AGUA-500", "2.50", 50, false).await;

    let response = app
        .request(
            Method::POST,
            "/api/orders",
            Some(json!({
                "customer_id": id_of(&customer),
                "items": [
                    { "product_id": id_of(&product), "quantity": 2 },
                    { "product_id": id_of(&product), "quantity": 0 },
                ],
            })),
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn overdue_boleto_blocks_new_orders() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Adega Atrasada", Some(VALID_CPF), None).await;
    let product = app.create_product("AGUA-500", "2.00", 50, false).await;
    overdue_boleto(&app, &id_of(&customer), "150.00").await;
    overdue_boleto(&app, &id_of(&customer), "50.00").await;

    let response = app
        .request(
            Method::POST,
            "/api/orders",
            Some(order_body(&id_of(&customer), &id_of(&product), 1)),
            Some(&app.operator_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["details"]["code"], "customer_overdue");
    assert_eq!(body["details"]["overdue_count"], 2);
    let total: Decimal = body["details"]["overdue_total"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, dec!(200));

    let summary = app
        .admin_ok(
            Method::GET,
            &format!("/api/customers/{}/overdue", id_of(&customer)),
            None,
        )
        .await;
    assert_eq!(summary["overdue_count"], 2);
}

#[tokio::test]
async fn only_admins_may_override_the_overdue_block() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Adega Atrasada", Some(VALID_CPF), None).await;
    let product = app.create_product("AGUA-500", "2.00", 50, false).await;
    overdue_boleto(&app, &id_of(&customer), "80.00").await;

    let mut body = order_body(&id_of(&customer), &id_of(&product), 3);
    body["override_overdue"] = json!(true);

    let denied = app
        .request(
            Method::POST,
            "/api/orders",
            Some(body.clone()),
            Some(&app.manager_token),
        )
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let allowed = app
        .request(Method::POST, "/api/orders", Some(body), Some(&app.admin_token))
        .await;
    assert_eq!(allowed.status(), StatusCode::CREATED);
    let created = response_json(allowed).await;
    assert!(created["data"]["overdue_override_by"].is_string());
}

#[tokio::test]
async fn paying_the_boleto_lifts_the_block() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Adega Atrasada", Some(VALID_CPF), None).await;
    let product = app.create_product("AGUA-500", "2.00", 50, false).await;
    let record_id = overdue_boleto(&app, &id_of(&customer), "80.00").await;

    let paid = app
        .admin_ok(Method::POST, &format!("/api/financial/{}/pay", record_id), None)
        .await;
    assert_eq!(paid["status"], "Paid");

    let response = app
        .request(
            Method::POST,
            "/api/orders",
            Some(order_body(&id_of(&customer), &id_of(&product), 1)),
            Some(&app.operator_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn refresh_overdue_flips_past_due_pending_records() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Quiosque", Some(VALID_CPF), None).await;
    overdue_boleto(&app, &id_of(&customer), "10.00").await;

    let result = app
        .admin_ok(Method::POST, "/api/financial/refresh-overdue", None)
        .await;
    assert_eq!(result["updated"], 1);

    let again = app
        .admin_ok(Method::POST, "/api/financial/refresh-overdue", None)
        .await;
    assert_eq!(again["updated"], 0);
}

#[tokio::test]
async fn cancelling_an_order_restocks_and_cancels_its_receivable() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Bar do Zé", Some(VALID_CPF), None).await;
    let product = app.create_product("CERV-LATA", "4.00", 30, false).await;

    let created = app
        .admin_ok(
            Method::POST,
            "/api/orders",
            Some(order_body(&id_of(&customer), &id_of(&product), 10)),
        )
        .await;
    let order_id = id_of(&created);

    let cancelled = app
        .admin_ok(
            Method::PUT,
            &format!("/api/orders/{}/status", order_id),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(cancelled["status"], "cancelled");

    let product_id: Uuid = id_of(&product).parse().unwrap();
    let stock = product::Entity::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity;
    assert_eq!(stock, 30);

    let receivable = financial_record::Entity::find()
        .filter(financial_record::Column::OrderId.eq(order_id.parse::<Uuid>().unwrap()))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(receivable.status, "Cancelled");

    let reopen = app
        .request(
            Method::PUT,
            &format!("/api/orders/{}/status", order_id),
            Some(json!({ "status": "confirmed" })),
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(reopen.status(), StatusCode::BAD_REQUEST);
}

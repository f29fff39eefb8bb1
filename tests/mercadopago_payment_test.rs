mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{id_of, TestApp, VALID_CPF};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn receivable(app: &TestApp, customer_id: &str) -> String {
    let due = (Utc::now() + Duration::days(5)).date_naive();
    let record = app
        .admin_ok(
            Method::POST,
            "/api/financial",
            Some(json!({
                "record_type": "receivable",
                "customer_id": customer_id,
                "description": "Pedido 42",
                "amount": "57.90",
                "due_date": due,
            })),
        )
        .await;
    id_of(&record)
}

#[tokio::test]
async fn pix_charge_returns_the_qr_code_and_links_the_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payments"))
        .and(header("authorization", "Bearer mp-token"))
        .and(header_exists("x-idempotency-key"))
        .and(body_partial_json(json!({
            "payment_method_id": "pix",
            "payer": { "email": "bar@ze.com.br", "identification": { "type": "CPF", "number": VALID_CPF } },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 987654321,
            "status": "pending",
            "status_detail": "pending_waiting_transfer",
            "point_of_interaction": {
                "transaction_data": {
                    "qr_code": "00020126580014br.gov.bcb.pix",
                    "qr_code_base64": "iVBORw0KGgo=",
                    "ticket_url": "https://www.mercadopago.com.br/payments/987654321/ticket",
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::with_providers(&server.uri()).await;
    let customer = app
        .create_customer("Bar do Zé", Some(VALID_CPF), Some("bar@ze.com.br"))
        .await;
    let record_id = receivable(&app, &id_of(&customer)).await;

    let payment = app
        .admin_ok(
            Method::POST,
            "/api/create-payment",
            Some(json!({ "financial_record_id": record_id })),
        )
        .await;
    assert_eq!(payment["id"], 987654321);
    assert_eq!(payment["qr_code"], "00020126580014br.gov.bcb.pix");

    let record = app
        .admin_ok(Method::GET, &format!("/api/financial/{}", record_id), None)
        .await;
    assert_eq!(record["mercadopago_payment_id"], "987654321");
    assert_eq!(record["payment_method"], "pix");
}

#[tokio::test]
async fn charge_without_payer_email_is_rejected() {
    let server = MockServer::start().await;
    let app = TestApp::with_providers(&server.uri()).await;
    let customer = app.create_customer("Sem Email", Some(VALID_CPF), None).await;
    let record_id = receivable(&app, &id_of(&customer)).await;

    let response = app
        .request(
            Method::POST,
            "/api/create-payment",
            Some(json!({ "financial_record_id": record_id })),
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn provider_rejection_surfaces_as_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payments"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "payer.email must be a valid email",
            "status": 400,
        })))
        .mount(&server)
        .await;
    let app = TestApp::with_providers(&server.uri()).await;
    let customer = app
        .create_customer("Bar do Zé", Some(VALID_CPF), Some("bar@ze.com.br"))
        .await;
    let record_id = receivable(&app, &id_of(&customer)).await;

    let response = app
        .request(
            Method::POST,
            "/api/create-payment",
            Some(json!({ "financial_record_id": record_id })),
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{id_of, response_json, TestApp, GLOBAL_WEBHOOK_TOKEN, VALID_CPF};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_customer_lookup_and_create(server: &MockServer, asaas_id: &str) {
    Mock::given(method("GET"))
        .and(path("/customers"))
        .and(query_param("cpfCnpj", VALID_CPF))
        .and(header("access_token", "asaas-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers"))
        .and(body_partial_json(json!({ "cpfCnpj": VALID_CPF })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": asaas_id,
            "name": "Bar do Zé",
            "cpfCnpj": VALID_CPF,
            "deleted": false,
        })))
        .mount(server)
        .await;
}

async fn receivable(app: &TestApp, customer_id: &str, amount: &str) -> serde_json::Value {
    let due = (Utc::now() + Duration::days(10)).date_naive();
    app.admin_ok(
        Method::POST,
        "/api/financial",
        Some(json!({
            "record_type": "receivable",
            "customer_id": customer_id,
            "description": "Pedido balcão",
            "amount": amount,
            "due_date": due,
        })),
    )
    .await
}

#[tokio::test]
async fn sync_creates_the_remote_customer_and_stores_its_id() {
    let server = MockServer::start().await;
    mock_customer_lookup_and_create(&server, "cus_000001").await;
    let app = TestApp::with_providers(&server.uri()).await;
    let customer = app.create_customer("Bar do Zé", Some(VALID_CPF), None).await;

    let result = app
        .admin_ok(
            Method::POST,
            "/api/asaas/customers/sync",
            Some(json!({ "customer_id": id_of(&customer) })),
        )
        .await;
    assert_eq!(result["action"], "created");
    assert_eq!(result["asaas_customer_id"], "cus_000001");

    let stored = app
        .admin_ok(Method::GET, &format!("/api/customers/{}", id_of(&customer)), None)
        .await;
    assert_eq!(stored["asaas_customer_id"], "cus_000001");
}

#[tokio::test]
async fn sync_recreates_a_customer_missing_at_asaas() {
    let server = MockServer::start().await;
    mock_customer_lookup_and_create(&server, "cus_000001").await;
    let app = TestApp::with_providers(&server.uri()).await;
    let customer = app.create_customer("Bar do Zé", Some(VALID_CPF), None).await;
    let body = json!({ "customer_id": id_of(&customer) });
    app.admin_ok(Method::POST, "/api/asaas/customers/sync", Some(body.clone()))
        .await;

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/customers/cus_000001"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cus_000002" })))
        .expect(1)
        .mount(&server)
        .await;

    let result = app
        .admin_ok(Method::POST, "/api/asaas/customers/sync", Some(body))
        .await;
    assert_eq!(result["action"], "recreated");
    assert_eq!(result["asaas_customer_id"], "cus_000002");
}

#[tokio::test]
async fn sync_without_document_or_email_is_rejected() {
    let server = MockServer::start().await;
    let app = TestApp::with_providers(&server.uri()).await;
    let customer = app.create_customer("Sem Cadastro", None, None).await;

    let response = app
        .request(
            Method::POST,
            "/api/asaas/customers/sync",
            Some(json!({ "customer_id": id_of(&customer) })),
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn boleto_is_issued_and_confirmed_by_webhook() {
    let server = MockServer::start().await;
    mock_customer_lookup_and_create(&server, "cus_000001").await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .and(body_partial_json(json!({ "customer": "cus_000001", "billingType": "BOLETO" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pay_123",
            "customer": "cus_000001",
            "status": "PENDING",
            "value": 150.0,
            "bankSlipUrl": "https://sandbox.asaas.com/b/pdf/pay_123",
            "invoiceUrl": "https://sandbox.asaas.com/i/pay_123",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/payments/pay_123"))
        .and(header("access_token", "asaas-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pay_123",
            "status": "CONFIRMED",
            "value": 150.0,
            "netValue": 148.01,
            "paymentDate": "2026-10-19",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::with_providers(&server.uri()).await;
    let customer = app.create_customer("Bar do Zé", Some(VALID_CPF), None).await;
    let record = receivable(&app, &id_of(&customer), "150.00").await;

    let billed = app
        .admin_ok(
            Method::POST,
            "/api/asaas/payments",
            Some(json!({ "financial_record_id": id_of(&record) })),
        )
        .await;
    assert_eq!(billed["asaas_payment_id"], "pay_123");
    assert_eq!(billed["boleto_url"], "https://sandbox.asaas.com/b/pdf/pay_123");
    assert_eq!(billed["payment_method"], "boleto");

    let again = app
        .admin_ok(
            Method::POST,
            "/api/asaas/payments",
            Some(json!({ "financial_record_id": id_of(&record) })),
        )
        .await;
    assert_eq!(again["asaas_payment_id"], "pay_123");

    let webhook = app
        .request_with_headers(
            Method::POST,
            "/api/asaas/webhook",
            Some(json!({
                "event": "PAYMENT_CONFIRMED",
                "payment": {
                    "id": "pay_123",
                    "status": "CONFIRMED",
                    "value": 150.0,
                    "netValue": 150.0,
                    "paymentDate": "2026-10-19",
                },
            })),
            None,
            &[("asaas-access-token", GLOBAL_WEBHOOK_TOKEN)],
        )
        .await;
    assert_eq!(webhook.status(), StatusCode::OK);
    let ack = response_json(webhook).await;
    assert_eq!(ack["matched"], true);

    let paid = app
        .admin_ok(Method::GET, &format!("/api/financial/{}", id_of(&record)), None)
        .await;
    assert_eq!(paid["status"], "Paid");
    let total: Decimal = paid["total_payed"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, dec!(148.01));

    let notifications = app.admin_ok(Method::GET, "/api/notifications", None).await;
    assert!(notifications
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["title"] == "Pagamento confirmado"));
}

#[tokio::test]
async fn webhook_is_not_trusted_over_asaas() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments/pay_777"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pay_777",
            "status": "PENDING",
            "value": 80.0,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/payments/pay_404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let app = TestApp::with_providers(&server.uri()).await;
    let customer = app.create_customer("Bar do Zé", Some(VALID_CPF), None).await;
    let record = receivable(&app, &id_of(&customer), "80.00").await;

    let claim = |payment_id: &str| {
        json!({
            "event": "PAYMENT_RECEIVED",
            "payment": {
                "id": payment_id,
                "status": "RECEIVED",
                "value": 80.0,
                "externalReference": id_of(&record),
            },
        })
    };

    let still_pending = app
        .request_with_headers(
            Method::POST,
            "/api/asaas/webhook",
            Some(claim("pay_777")),
            None,
            &[("asaas-access-token", GLOBAL_WEBHOOK_TOKEN)],
        )
        .await;
    assert_eq!(still_pending.status(), StatusCode::OK);
    assert_eq!(response_json(still_pending).await["matched"], true);

    let unknown = app
        .request_with_headers(
            Method::POST,
            "/api/asaas/webhook",
            Some(claim("pay_404")),
            None,
            &[("asaas-access-token", GLOBAL_WEBHOOK_TOKEN)],
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::OK);
    assert_eq!(response_json(unknown).await["matched"], false);

    let stored = app
        .admin_ok(Method::GET, &format!("/api/financial/{}", id_of(&record)), None)
        .await;
    assert_eq!(stored["status"], "Pending");
    assert!(stored["payment_date"].is_null());
}

#[tokio::test]
async fn webhook_with_unknown_token_is_unauthorized() {
    let app = TestApp::new().await;
    let event = json!({ "event": "PAYMENT_CONFIRMED", "payment": { "id": "pay_x", "status": "CONFIRMED" } });

    let wrong = app
        .request_with_headers(
            Method::POST,
            "/api/asaas/webhook",
            Some(event.clone()),
            None,
            &[("asaas-access-token", "forged")],
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let missing = app
        .request(Method::POST, "/api/asaas/webhook", Some(event), None)
        .await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unmatched_payment_is_acknowledged() {
    let app = TestApp::new().await;
    let response = app
        .request_with_headers(
            Method::POST,
            "/api/asaas/webhook",
            Some(json!({
                "event": "PAYMENT_RECEIVED",
                "payment": { "id": "pay_unknown", "status": "RECEIVED" },
            })),
            None,
            &[("asaas-access-token", GLOBAL_WEBHOOK_TOKEN)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let ack = response_json(response).await;
    assert_eq!(ack["received"], true);
    assert_eq!(ack["matched"], false);
}

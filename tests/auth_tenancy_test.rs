mod common;

use axum::http::{Method, StatusCode};
use common::{id_of, response_json, TestApp, VALID_CPF};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn created_user_can_log_in_and_reach_the_api() {
    let app = TestApp::new().await;
    let created = app
        .admin_ok(
            Method::POST,
            "/api/users",
            Some(json!({
                "name": "Vendedora",
                "email": "Vendas@Gelada.com.br",
                "password": "cerveja-gelada-123",
                "role": "operator",
            })),
        )
        .await;
    assert_eq!(created["email"], "vendas@gelada.com.br");
    assert!(created.get("password_hash").is_none());

    let login = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "vendas@gelada.com.br", "password": "cerveja-gelada-123" })),
            None,
        )
        .await;
    assert_eq!(login.status(), StatusCode::OK);
    let token = response_json(login).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let customers = app
        .request(Method::GET, "/api/customers", None, Some(&token))
        .await;
    assert_eq!(customers.status(), StatusCode::OK);

    let wrong = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "vendas@gelada.com.br", "password": "errada-errada" })),
            None,
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/orders", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let garbage = app
        .request(Method::GET, "/api/orders", None, Some("not-a-jwt"))
        .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn roles_gate_administrative_routes() {
    let app = TestApp::new().await;

    let users = app
        .request(Method::GET, "/api/users", None, Some(&app.operator_token))
        .await;
    assert_eq!(users.status(), StatusCode::FORBIDDEN);

    let integrations = app
        .request(Method::GET, "/api/integrations", None, Some(&app.manager_token))
        .await;
    assert_eq!(integrations.status(), StatusCode::FORBIDDEN);

    let company_update = app
        .request(
            Method::PUT,
            "/api/company",
            Some(json!({ "name": "Outro Nome" })),
            Some(&app.operator_token),
        )
        .await;
    assert_eq!(company_update.status(), StatusCode::FORBIDDEN);

    let company = app
        .request(Method::GET, "/api/company", None, Some(&app.operator_token))
        .await;
    assert_eq!(company.status(), StatusCode::OK);
}

#[tokio::test]
async fn deactivated_user_is_locked_out_with_a_live_token() {
    let app = TestApp::new().await;
    let before = app
        .request(Method::GET, "/api/customers", None, Some(&app.manager_token))
        .await;
    assert_eq!(before.status(), StatusCode::OK);

    let updated = app
        .admin_ok(
            Method::PUT,
            &format!("/api/users/{}", app.manager_id),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(updated["active"], false);

    let after = app
        .request(Method::GET, "/api/customers", None, Some(&app.manager_token))
        .await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(after).await;
    assert_eq!(body["error"]["code"], "AUTH_TOKEN_REVOKED");
}

#[tokio::test]
async fn demotion_applies_to_tokens_already_issued() {
    let app = TestApp::new().await;
    let email = json!({ "to": "cliente@bar.com.br", "subject": "Olá", "text": "Teste" });

    let as_manager = app
        .request(
            Method::POST,
            "/api/email/send",
            Some(email.clone()),
            Some(&app.manager_token),
        )
        .await;
    assert_ne!(as_manager.status(), StatusCode::FORBIDDEN);

    app.admin_ok(
        Method::PUT,
        &format!("/api/users/{}", app.manager_id),
        Some(json!({ "role": "operator" })),
    )
    .await;

    let as_operator = app
        .request(
            Method::POST,
            "/api/email/send",
            Some(email),
            Some(&app.manager_token),
        )
        .await;
    assert_eq!(as_operator.status(), StatusCode::FORBIDDEN);

    let still_operator = app
        .request(Method::GET, "/api/orders", None, Some(&app.manager_token))
        .await;
    assert_eq!(still_operator.status(), StatusCode::OK);
}

#[tokio::test]
async fn tenants_never_see_each_others_records() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Bar do Zé", Some(VALID_CPF), None).await;

    let foreign = app
        .request(
            Method::GET,
            &format!("/api/customers/{}", id_of(&customer)),
            None,
            Some(&app.other_admin_token),
        )
        .await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

    let listing = app
        .request(Method::GET, "/api/customers", None, Some(&app.other_admin_token))
        .await;
    let body = response_json(listing).await;
    assert_eq!(body["data"]["total"], 0);

    let deletion = app
        .request(
            Method::DELETE,
            &format!("/api/customers/{}", id_of(&customer)),
            None,
            Some(&app.other_admin_token),
        )
        .await;
    assert_eq!(deletion.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn financial_records_cannot_reference_another_tenants_order() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Bar do Zé", Some(VALID_CPF), None).await;
    let product = app.create_product("CERV-350", "4.20", 40, false).await;
    let order = app
        .admin_ok(
            Method::POST,
            "/api/orders",
            Some(json!({
                "customer_id": id_of(&customer),
                "items": [{ "product_id": id_of(&product), "quantity": 6 }],
            })),
        )
        .await;

    let foreign = app
        .request(
            Method::POST,
            "/api/financial",
            Some(json!({
                "record_type": "payable",
                "order_id": id_of(&order),
                "description": "Frete",
                "amount": "35.00",
                "due_date": "2026-11-30",
            })),
            Some(&app.other_admin_token),
        )
        .await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

    let listing = app
        .request(Method::GET, "/api/financial", None, Some(&app.other_admin_token))
        .await;
    assert_eq!(response_json(listing).await["data"]["total"], 0);
}

#[tokio::test]
async fn invalid_customer_document_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/customers",
            Some(json!({ "name": "Documento Errado", "document": "12345678900" })),
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn email_without_sendgrid_is_not_configured() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/email/send",
            Some(json!({ "to": "cliente@bar.com.br", "subject": "Olá", "text": "Teste" })),
            Some(&app.manager_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn email_is_relayed_to_sendgrid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("authorization", "Bearer sg-key"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::with_providers(&server.uri()).await;
    let sent = app
        .admin_ok(
            Method::POST,
            "/api/email/send",
            Some(json!({ "to": "cliente@bar.com.br", "subject": "Olá", "html": "<p>Teste</p>" })),
        )
        .await;
    assert_eq!(sent["sent"], true);
}

#[tokio::test]
async fn health_reports_database_status() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "up");
}

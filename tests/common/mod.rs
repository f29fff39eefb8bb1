#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use distribuidora_api::{
    config::AppConfig,
    db,
    entities::{company, user},
    AppState,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "t3stS3cr3t_f0r_d1str1bu1d0ra_1ntegrat10n_suite_Qw9Er8Ty7Ui6Op5As4Df";
pub const GLOBAL_WEBHOOK_TOKEN: &str = "asaas-global-token";
pub const COMPANY_CNPJ: &str = "11222333000181";
pub const VALID_CPF: &str = "52998224725";

/// Application over a fresh in-memory SQLite database with two tenants.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub company_id: Uuid,
    pub other_company_id: Uuid,
    pub manager_id: Uuid,
    pub admin_token: String,
    pub manager_token: String,
    pub operator_token: String,
    pub other_admin_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Points every provider at `provider_url` (a wiremock server) with global keys set.
    pub async fn with_providers(provider_url: &str) -> Self {
        Self::build(Some(provider_url)).await
    }

    async fn build(provider_url: Option<&str>) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.integrations.asaas_webhook_token = Some(GLOBAL_WEBHOOK_TOKEN.to_string());
        cfg.integrations.nfe_poll_attempts = 3;
        cfg.integrations.nfe_poll_interval_ms = 1;
        cfg.integrations.http_timeout_secs = 5;
        if let Some(url) = provider_url {
            cfg.integrations.asaas_base_url = url.to_string();
            cfg.integrations.asaas_api_key = Some("asaas-key".to_string());
            cfg.integrations.mercadopago_base_url = url.to_string();
            cfg.integrations.mercadopago_access_token = Some("mp-token".to_string());
            cfg.integrations.focus_nfe_base_url = url.to_string();
            cfg.integrations.focus_nfe_token = Some("focus-token".to_string());
            cfg.integrations.sendgrid_base_url = url.to_string();
            cfg.integrations.sendgrid_api_key = Some("sg-key".to_string());
        }

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let pool = Arc::new(pool);

        let state = AppState::new(pool.clone(), cfg).expect("app state");

        let company = seed_company(&state, "Distribuidora Gelada", Some(COMPANY_CNPJ)).await;
        let other = seed_company(&state, "Bebidas Concorrente", None).await;

        let admin = seed_user(&state, company.id, "admin@gelada.com.br", "admin").await;
        let manager = seed_user(&state, company.id, "gerente@gelada.com.br", "manager").await;
        let operator = seed_user(&state, company.id, "balcao@gelada.com.br", "operator").await;
        let other_admin = seed_user(&state, other.id, "admin@concorrente.com.br", "admin").await;

        let token = |u: &user::Model| {
            state
                .auth
                .generate_token(u)
                .expect("token for seeded user")
                .access_token
        };

        Self {
            router: distribuidora_api::app(state.clone()),
            admin_token: token(&admin),
            manager_token: token(&manager),
            operator_token: token(&operator),
            other_admin_token: token(&other_admin),
            company_id: company.id,
            other_company_id: other.id,
            manager_id: manager.id,
            state,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        self.request_with_headers(method, uri, body, token, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Admin request that must succeed; returns the `data` field.
    pub async fn admin_ok(&self, method: Method, uri: &str, body: Option<Value>) -> Value {
        let response = self.request(method, uri, body, Some(&self.admin_token)).await;
        let status = response.status();
        let json = response_json(response).await;
        assert!(status.is_success(), "{} failed with {}: {}", uri, status, json);
        json["data"].clone()
    }

    pub async fn create_customer(&self, name: &str, document: Option<&str>, email: Option<&str>) -> Value {
        self.admin_ok(
            Method::POST,
            "/api/customers",
            Some(json!({
                "name": name,
                "document": document,
                "email": email,
                "city": "Campinas",
                "state": "SP",
            })),
        )
        .await
    }

    pub async fn create_product(&self, sku: &str, price: &str, stock: i32, is_equipment: bool) -> Value {
        self.admin_ok(
            Method::POST,
            "/api/products",
            Some(json!({
                "sku": sku,
                "name": format!("Produto {}", sku),
                "unit": "UN",
                "ncm": "22030000",
                "price": price,
                "stock_quantity": stock,
                "min_stock": 2,
                "is_equipment": is_equipment,
            })),
        )
        .await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("id field").to_string()
}

async fn seed_company(state: &AppState, name: &str, cnpj: Option<&str>) -> company::Model {
    company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        trade_name: Set(None),
        cnpj: Set(cnpj.map(str::to_string)),
        email: Set(Some("contato@distribuidora.com.br".to_string())),
        phone: Set(None),
        address: Set(Some("Rua das Bebidas".to_string())),
        address_number: Set(Some("100".to_string())),
        neighborhood: Set(Some("Centro".to_string())),
        city: Set(Some("Campinas".to_string())),
        state: Set(Some("SP".to_string())),
        postal_code: Set(Some("13010000".to_string())),
        state_registration: Set(None),
        ..Default::default()
    }
    .insert(&*state.db)
    .await
    .expect("seed company")
}

async fn seed_user(state: &AppState, company_id: Uuid, email: &str, role: &str) -> user::Model {
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(company_id),
        name: Set(email.split('@').next().unwrap_or("user").to_string()),
        email: Set(email.to_string()),
        password_hash: Set(String::new()),
        role: Set(role.to_string()),
        active: Set(true),
        ..Default::default()
    }
    .insert(&*state.db)
    .await
    .expect("seed user")
}

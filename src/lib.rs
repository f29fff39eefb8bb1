//! Distribuidora API library
//!
//! Multi-tenant back office for beverage distributors. Every `/api` route
//! is authenticated and scoped to the company carried by the access token.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod documents;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod integrations;
pub mod middleware_helpers;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::Extension, response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthConfig, AuthRouterExt, AuthService};
use crate::db::DbPool;
use crate::entities::user::Role;
use crate::errors::ServiceError;
use crate::handlers::AppServices;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: config::AppConfig) -> Result<Self, ServiceError> {
        let auth = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&config),
            db.clone(),
        ));
        let services = AppServices::new(db.clone(), &config)?;
        Ok(Self {
            db,
            config,
            auth,
            services,
        })
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            message: Some(message),
            ..Self::success(data)
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn message_is_kept_alongside_data() {
        let response = ApiResponse::success_with_message(3, "Empresa atualizada".into());
        assert!(response.success);
        assert_eq!(response.data, Some(3));
        assert_eq!(response.message.as_deref(), Some("Empresa atualizada"));
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ServiceError>;

/// Everything under `/api`.
pub fn api_routes() -> Router<AppState> {
    use handlers::{
        asaas, company, customers, dashboard, email, equipment, financial, integrations,
        mercadopago, nfe, notifications, orders, payment_methods, products, suppliers, users,
    };

    let operator = Router::new()
        .nest("/customers", customers::customer_routes())
        .nest("/suppliers", suppliers::supplier_routes())
        .nest("/products", products::product_routes())
        .nest("/payment-methods", payment_methods::payment_method_routes())
        .nest("/orders", orders::order_routes())
        .nest("/financial", financial::financial_routes())
        .nest("/equipment", equipment::equipment_routes())
        .nest("/notifications", notifications::notification_routes())
        .nest("/dashboard", dashboard::dashboard_routes())
        .nest("/nfe", nfe::nfe_routes())
        .merge(mercadopago::mercadopago_routes())
        .with_auth();

    let manager = Router::new()
        .nest("/email", email::email_routes())
        .with_role(Role::Manager);

    let admin = Router::new()
        .nest("/users", users::user_routes())
        .nest("/integrations", integrations::integration_routes())
        .with_role(Role::Admin);

    Router::new()
        .route("/status", get(api_status))
        .merge(operator)
        .merge(manager)
        .merge(admin)
        // These two gate their own routes; the Asaas webhook is public.
        .nest("/company", company::company_routes())
        .nest("/asaas", asaas::asaas_routes())
}

/// The whole HTTP application: API, login, health and Swagger UI.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .nest("/health", handlers::health::health_routes())
        .nest("/auth", auth::auth_routes().with_state(state.auth.clone()))
        .merge(openapi::swagger_ui())
        .layer(Extension(state.auth.clone()))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status() -> Json<ApiResponse<Value>> {
    Json(ApiResponse::success(json!({
        "status": "ok",
        "service": "distribuidora-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::financial_record,
    errors::ServiceError,
    handlers::AppState,
    services::{
        asaas_sync::{SyncCustomerRequest, SyncResult},
        payments::{AsaasWebhookEvent, CreateBoletoRequest, WebhookAck},
    },
    ApiResponse, ApiResult,
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};

/// Header Asaas sends with the webhook token configured in its panel.
pub const ASAAS_TOKEN_HEADER: &str = "asaas-access-token";

/// Authenticated Asaas routes plus the public webhook.
pub fn asaas_routes() -> Router<AppState> {
    let authenticated = Router::new()
        .route("/customers/sync", post(sync_customer))
        .route("/payments", post(create_boleto))
        .with_auth();

    Router::new()
        .route("/webhook", post(asaas_webhook))
        .merge(authenticated)
}

/// Find-or-create the customer at Asaas and store its id
#[utoipa::path(
    post,
    path = "/api/asaas/customers/sync",
    request_body = SyncCustomerRequest,
    responses(
        (status = 200, description = "Customer synchronized", body = ApiResponse<SyncResult>),
        (status = 400, description = "Customer has no document nor e-mail", body = crate::errors::ErrorResponse),
        (status = 502, description = "Asaas rejected the request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asaas"
)]
pub async fn sync_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SyncCustomerRequest>,
) -> ApiResult<SyncResult> {
    let result = state
        .services
        .asaas_sync
        .sync_customer(user.company_id, request.customer_id)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Issue a boleto for a receivable
#[utoipa::path(
    post,
    path = "/api/asaas/payments",
    request_body = CreateBoletoRequest,
    responses(
        (status = 200, description = "Boleto issued or already existing", body = ApiResponse<financial_record::Model>),
        (status = 400, description = "Record cannot be billed", body = crate::errors::ErrorResponse),
        (status = 502, description = "Asaas rejected the request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asaas"
)]
pub async fn create_boleto(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateBoletoRequest>,
) -> ApiResult<financial_record::Model> {
    let record = state
        .services
        .payments
        .create_boleto(user.company_id, request.financial_record_id)
        .await?;
    Ok(Json(ApiResponse::success(record)))
}

/// Payment status notifications from Asaas
#[utoipa::path(
    post,
    path = "/api/asaas/webhook",
    params(("asaas-access-token" = String, Header, description = "Webhook token")),
    responses(
        (status = 200, description = "Event received", body = WebhookAck),
        (status = 401, description = "Unknown webhook token", body = crate::errors::ErrorResponse)
    ),
    tag = "asaas"
)]
pub async fn asaas_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<AsaasWebhookEvent>,
) -> Result<Json<WebhookAck>, ServiceError> {
    let token = headers
        .get(ASAAS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    let ack = state
        .services
        .payments
        .handle_asaas_webhook(token, event)
        .await?;
    Ok(Json(ack))
}

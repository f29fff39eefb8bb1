use super::common::{created_response, no_content_response};
use crate::{
    auth::AuthUser,
    entities::payment_method,
    errors::ServiceError,
    handlers::AppState,
    services::payment_methods::PaymentMethodInput,
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PaymentMethodQuery {
    #[serde(default)]
    pub active_only: bool,
}

pub fn payment_method_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payment_methods).post(create_payment_method))
        .route("/:id", put(update_payment_method).delete(delete_payment_method))
}

#[utoipa::path(
    get,
    path = "/api/payment-methods",
    params(PaymentMethodQuery),
    responses(
        (status = 200, description = "Payment methods listed", body = ApiResponse<Vec<payment_method::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "payment-methods"
)]
pub async fn list_payment_methods(
    State(state): State<AppState>,
    Query(query): Query<PaymentMethodQuery>,
    user: AuthUser,
) -> ApiResult<Vec<payment_method::Model>> {
    let methods = state
        .services
        .payment_methods
        .list(user.company_id, query.active_only)
        .await?;
    Ok(Json(ApiResponse::success(methods)))
}

#[utoipa::path(
    post,
    path = "/api/payment-methods",
    request_body = PaymentMethodInput,
    responses(
        (status = 201, description = "Payment method created", body = ApiResponse<payment_method::Model>)
    ),
    security(("bearer_auth" = [])),
    tag = "payment-methods"
)]
pub async fn create_payment_method(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<PaymentMethodInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let method = state
        .services
        .payment_methods
        .create(user.company_id, input)
        .await?;
    Ok(created_response(method))
}

#[utoipa::path(
    put,
    path = "/api/payment-methods/{id}",
    params(("id" = Uuid, Path, description = "Payment method ID")),
    request_body = PaymentMethodInput,
    responses(
        (status = 200, description = "Payment method updated", body = ApiResponse<payment_method::Model>),
        (status = 404, description = "Payment method not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "payment-methods"
)]
pub async fn update_payment_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(input): Json<PaymentMethodInput>,
) -> ApiResult<payment_method::Model> {
    let method = state
        .services
        .payment_methods
        .update(user.company_id, id, input)
        .await?;
    Ok(Json(ApiResponse::success(method)))
}

#[utoipa::path(
    delete,
    path = "/api/payment-methods/{id}",
    params(("id" = Uuid, Path, description = "Payment method ID")),
    responses(
        (status = 204, description = "Payment method deleted"),
        (status = 404, description = "Payment method not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "payment-methods"
)]
pub async fn delete_payment_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .payment_methods
        .delete(user.company_id, id)
        .await?;
    Ok(no_content_response())
}

use crate::{
    auth::AuthUser,
    handlers::AppState,
    services::payments::{CreatePixPaymentRequest, PixPaymentResponse},
    ApiResponse, ApiResult,
};
use axum::{extract::State, routing::post, Json, Router};

pub fn mercadopago_routes() -> Router<AppState> {
    Router::new().route("/create-payment", post(create_payment))
}

/// Create a PIX (or other method) charge at Mercado Pago for a receivable
#[utoipa::path(
    post,
    path = "/api/create-payment",
    request_body = CreatePixPaymentRequest,
    responses(
        (status = 200, description = "Payment created", body = ApiResponse<PixPaymentResponse>),
        (status = 400, description = "Record cannot be billed", body = crate::errors::ErrorResponse),
        (status = 502, description = "Mercado Pago rejected the request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "mercadopago"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreatePixPaymentRequest>,
) -> ApiResult<PixPaymentResponse> {
    let payment = state
        .services
        .payments
        .create_mercadopago_payment(user.company_id, request)
        .await?;
    Ok(Json(ApiResponse::success(payment)))
}

use crate::{
    auth::AuthUser,
    handlers::AppState,
    services::email::{EmailReceipt, SendEmailRequest},
    ApiResponse, ApiResult,
};
use axum::{extract::State, routing::post, Json, Router};

pub fn email_routes() -> Router<AppState> {
    Router::new().route("/send", post(send_email))
}

#[utoipa::path(
    post,
    path = "/api/email/send",
    request_body = SendEmailRequest,
    responses(
        (status = 200, description = "E-mail accepted by SendGrid", body = ApiResponse<EmailReceipt>),
        (status = 403, description = "Requires manager or admin", body = crate::errors::ErrorResponse),
        (status = 502, description = "SendGrid rejected the message", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "email"
)]
pub async fn send_email(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SendEmailRequest>,
) -> ApiResult<EmailReceipt> {
    let receipt = state.services.email.send(user.company_id, request).await?;
    Ok(Json(ApiResponse::success(receipt)))
}

use super::common::{created_response, no_content_response, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::financial_record,
    errors::ServiceError,
    handlers::AppState,
    services::{
        email::EmailReceipt,
        financial::{
            CreateFinancialRecordRequest, FinancialFilter, PayRequest,
            UpdateFinancialRecordRequest,
        },
        Page,
    },
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshOverdueResponse {
    pub updated: u64,
}

pub fn financial_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .route("/refresh-overdue", post(refresh_overdue))
        .route(
            "/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/:id/pay", post(pay_record))
        .route("/:id/send-boleto", post(send_boleto))
}

#[utoipa::path(
    get,
    path = "/api/financial",
    params(PaginationParams),
    responses(
        (status = 200, description = "Financial records listed", body = ApiResponse<Page<financial_record::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "financial"
)]
pub async fn list_records(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<FinancialFilter>,
    user: AuthUser,
) -> ApiResult<Page<financial_record::Model>> {
    let page = pagination.to_page_request(&state.config);
    let records = state
        .services
        .financial
        .list(user.company_id, filter, page)
        .await?;
    Ok(Json(ApiResponse::success(records)))
}

#[utoipa::path(
    post,
    path = "/api/financial",
    request_body = CreateFinancialRecordRequest,
    responses(
        (status = 201, description = "Record created", body = ApiResponse<financial_record::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "financial"
)]
pub async fn create_record(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateFinancialRecordRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .services
        .financial
        .create(user.company_id, request)
        .await?;
    Ok(created_response(record))
}

#[utoipa::path(
    get,
    path = "/api/financial/{id}",
    params(("id" = Uuid, Path, description = "Financial record ID")),
    responses(
        (status = 200, description = "Record fetched", body = ApiResponse<financial_record::Model>),
        (status = 404, description = "Record not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "financial"
)]
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<financial_record::Model> {
    let record = state.services.financial.get(user.company_id, id).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    put,
    path = "/api/financial/{id}",
    params(("id" = Uuid, Path, description = "Financial record ID")),
    request_body = UpdateFinancialRecordRequest,
    responses(
        (status = 200, description = "Record updated", body = ApiResponse<financial_record::Model>),
        (status = 400, description = "Record is not open", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "financial"
)]
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<UpdateFinancialRecordRequest>,
) -> ApiResult<financial_record::Model> {
    let record = state
        .services
        .financial
        .update(user.company_id, id, request)
        .await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    delete,
    path = "/api/financial/{id}",
    params(("id" = Uuid, Path, description = "Financial record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 400, description = "Paid records cannot be deleted", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "financial"
)]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.financial.delete(user.company_id, id).await?;
    Ok(no_content_response())
}

/// Mark a record as paid; the amount defaults to the record amount
#[utoipa::path(
    post,
    path = "/api/financial/{id}/pay",
    params(("id" = Uuid, Path, description = "Financial record ID")),
    request_body = PayRequest,
    responses(
        (status = 200, description = "Record paid", body = ApiResponse<financial_record::Model>),
        (status = 400, description = "Record is not open", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "financial"
)]
pub async fn pay_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    request: Option<Json<PayRequest>>,
) -> ApiResult<financial_record::Model> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let record = state
        .services
        .financial
        .pay(user.company_id, id, request)
        .await?;
    Ok(Json(ApiResponse::success(record)))
}

/// Flip pending records past their due date to `Overdue`
#[utoipa::path(
    post,
    path = "/api/financial/refresh-overdue",
    responses(
        (status = 200, description = "Records updated", body = ApiResponse<RefreshOverdueResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "financial"
)]
pub async fn refresh_overdue(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<RefreshOverdueResponse> {
    let updated = state
        .services
        .financial
        .refresh_overdue(user.company_id)
        .await?;
    Ok(Json(ApiResponse::success(RefreshOverdueResponse { updated })))
}

/// E-mail the boleto link to the record's customer
#[utoipa::path(
    post,
    path = "/api/financial/{id}/send-boleto",
    params(("id" = Uuid, Path, description = "Financial record ID")),
    responses(
        (status = 200, description = "Boleto e-mailed", body = ApiResponse<EmailReceipt>),
        (status = 400, description = "No boleto or customer e-mail", body = crate::errors::ErrorResponse),
        (status = 502, description = "SendGrid rejected the message", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "financial"
)]
pub async fn send_boleto(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<EmailReceipt> {
    let receipt = state.services.email.send_boleto(user.company_id, id).await?;
    Ok(Json(ApiResponse::success(receipt)))
}

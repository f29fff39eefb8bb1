use super::common::{created_response, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::invoice,
    errors::ServiceError,
    handlers::AppState,
    services::{
        invoices::{CancelInvoiceRequest, EmitInvoiceRequest, InvoiceFiles, InvoiceFilter},
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
use uuid::Uuid;

pub fn nfe_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices))
        .route("/emit", post(emit_invoice))
        .route("/:id", get(get_invoice))
        .route("/:id/cancel", post(cancel_invoice))
        .route("/:id/files", get(invoice_files))
}

#[utoipa::path(
    get,
    path = "/api/nfe",
    params(PaginationParams),
    responses(
        (status = 200, description = "Invoices listed", body = ApiResponse<Page<invoice::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "nfe"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<InvoiceFilter>,
    user: AuthUser,
) -> ApiResult<Page<invoice::Model>> {
    let page = pagination.to_page_request(&state.config);
    let invoices = state
        .services
        .invoices
        .list(user.company_id, filter, page)
        .await?;
    Ok(Json(ApiResponse::success(invoices)))
}

/// Emit the NF-e of an order and poll until the provider settles it
#[utoipa::path(
    post,
    path = "/api/nfe/emit",
    request_body = EmitInvoiceRequest,
    responses(
        (status = 201, description = "Invoice submitted", body = ApiResponse<invoice::Model>),
        (status = 409, description = "Order already has an active invoice", body = crate::errors::ErrorResponse),
        (status = 502, description = "Focus NFe rejected the request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "nfe"
)]
pub async fn emit_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<EmitInvoiceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state
        .services
        .invoices
        .emit(user.company_id, request.order_id)
        .await?;
    Ok(created_response(invoice))
}

#[utoipa::path(
    get,
    path = "/api/nfe/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice fetched", body = ApiResponse<invoice::Model>),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "nfe"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<invoice::Model> {
    let invoice = state.services.invoices.get(user.company_id, id).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

#[utoipa::path(
    post,
    path = "/api/nfe/{id}/cancel",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    request_body = CancelInvoiceRequest,
    responses(
        (status = 200, description = "Invoice cancelled", body = ApiResponse<invoice::Model>),
        (status = 400, description = "Invalid justification or status", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "nfe"
)]
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<CancelInvoiceRequest>,
) -> ApiResult<invoice::Model> {
    let invoice = state
        .services
        .invoices
        .cancel(user.company_id, id, &request.justification)
        .await?;
    Ok(Json(ApiResponse::success(invoice)))
}

#[utoipa::path(
    get,
    path = "/api/nfe/{id}/files",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "XML and DANFE URLs", body = ApiResponse<InvoiceFiles>),
        (status = 400, description = "Invoice has no files yet", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "nfe"
)]
pub async fn invoice_files(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<InvoiceFiles> {
    let files = state.services.invoices.files(user.company_id, id).await?;
    Ok(Json(ApiResponse::success(files)))
}

use super::common::{created_response, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::equipment_return,
    errors::ServiceError,
    handlers::AppState,
    services::{
        equipment::{CreateLoanRequest, LoanFilter, LoanView, RegisterReturnRequest, ReturnReceipt},
        Page,
    },
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

pub fn equipment_routes() -> Router<AppState> {
    Router::new()
        .route("/loans", get(list_loans).post(create_loan))
        .route("/loans/:id", get(get_loan))
        .route("/loans/:id/returns", get(list_returns).post(register_return))
}

#[utoipa::path(
    get,
    path = "/api/equipment/loans",
    params(PaginationParams),
    responses(
        (status = 200, description = "Loans listed", body = ApiResponse<Page<LoanView>>)
    ),
    security(("bearer_auth" = [])),
    tag = "equipment"
)]
pub async fn list_loans(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<LoanFilter>,
    user: AuthUser,
) -> ApiResult<Page<LoanView>> {
    let page = pagination.to_page_request(&state.config);
    let loans = state
        .services
        .equipment
        .list_loans(user.company_id, filter, page)
        .await?;
    Ok(Json(ApiResponse::success(loans)))
}

/// Lend equipment (kegs, cylinders, coolers) to a customer
#[utoipa::path(
    post,
    path = "/api/equipment/loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = ApiResponse<LoanView>),
        (status = 400, description = "Product is not equipment", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "equipment"
)]
pub async fn create_loan(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateLoanRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let loan = state
        .services
        .equipment
        .create_loan(user.company_id, request)
        .await?;
    Ok(created_response(loan))
}

#[utoipa::path(
    get,
    path = "/api/equipment/loans/{id}",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan fetched", body = ApiResponse<LoanView>),
        (status = 404, description = "Loan not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "equipment"
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<LoanView> {
    let loan = state.services.equipment.get_loan(user.company_id, id).await?;
    Ok(Json(ApiResponse::success(loan)))
}

/// Register a full or partial return
#[utoipa::path(
    post,
    path = "/api/equipment/loans/{id}/returns",
    params(("id" = Uuid, Path, description = "Loan ID")),
    request_body = RegisterReturnRequest,
    responses(
        (status = 201, description = "Return registered", body = ApiResponse<ReturnReceipt>),
        (status = 409, description = "Quantity exceeds the outstanding balance", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "equipment"
)]
pub async fn register_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<RegisterReturnRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let receipt = state
        .services
        .equipment
        .register_return(&user, id, request)
        .await?;
    Ok(created_response(receipt))
}

#[utoipa::path(
    get,
    path = "/api/equipment/loans/{id}/returns",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Returns of the loan", body = ApiResponse<Vec<equipment_return::Model>>),
        (status = 404, description = "Loan not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "equipment"
)]
pub async fn list_returns(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<Vec<equipment_return::Model>> {
    let returns = state
        .services
        .equipment
        .list_returns(user.company_id, id)
        .await?;
    Ok(Json(ApiResponse::success(returns)))
}

use super::common::{created_response, no_content_response, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::customer,
    errors::ServiceError,
    handlers::AppState,
    services::{
        customers::{CustomerFilter, CustomerInput},
        financial::OverdueSummary,
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

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/:id/overdue", get(get_customer_overdue))
}

/// List customers of the caller's company
#[utoipa::path(
    get,
    path = "/api/customers",
    params(PaginationParams),
    responses(
        (status = 200, description = "Customers listed", body = ApiResponse<Page<customer::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<CustomerFilter>,
    user: AuthUser,
) -> ApiResult<Page<customer::Model>> {
    let page = pagination.to_page_request(&state.config);
    let customers = state
        .services
        .customers
        .list(user.company_id, filter, page)
        .await?;
    Ok(Json(ApiResponse::success(customers)))
}

/// Create a customer
#[utoipa::path(
    post,
    path = "/api/customers",
    request_body = CustomerInput,
    responses(
        (status = 201, description = "Customer created", body = ApiResponse<customer::Model>),
        (status = 400, description = "Invalid document or e-mail", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CustomerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.create(user.company_id, input).await?;
    Ok(created_response(customer))
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer fetched", body = ApiResponse<customer::Model>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<customer::Model> {
    let customer = state.services.customers.get(user.company_id, id).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    request_body = CustomerInput,
    responses(
        (status = 200, description = "Customer updated", body = ApiResponse<customer::Model>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(input): Json<CustomerInput>,
) -> ApiResult<customer::Model> {
    let customer = state
        .services
        .customers
        .update(user.company_id, id, input)
        .await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 409, description = "Customer has orders or loans", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.customers.delete(user.company_id, id).await?;
    Ok(no_content_response())
}

/// Overdue boletos that block new orders for this customer
#[utoipa::path(
    get,
    path = "/api/customers/{id}/overdue",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Overdue summary", body = ApiResponse<OverdueSummary>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "customers"
)]
pub async fn get_customer_overdue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<OverdueSummary> {
    let summary = state
        .services
        .financial
        .overdue_summary(user.company_id, id)
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}

use super::common::{created_response, no_content_response, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::supplier,
    errors::ServiceError,
    handlers::AppState,
    services::{
        suppliers::{SupplierFilter, SupplierInput},
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

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
}

#[utoipa::path(
    get,
    path = "/api/suppliers",
    params(PaginationParams),
    responses(
        (status = 200, description = "Suppliers listed", body = ApiResponse<Page<supplier::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<SupplierFilter>,
    user: AuthUser,
) -> ApiResult<Page<supplier::Model>> {
    let page = pagination.to_page_request(&state.config);
    let suppliers = state
        .services
        .suppliers
        .list(user.company_id, filter, page)
        .await?;
    Ok(Json(ApiResponse::success(suppliers)))
}

#[utoipa::path(
    post,
    path = "/api/suppliers",
    request_body = SupplierInput,
    responses(
        (status = 201, description = "Supplier created", body = ApiResponse<supplier::Model>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<SupplierInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let supplier = state.services.suppliers.create(user.company_id, input).await?;
    Ok(created_response(supplier))
}

#[utoipa::path(
    get,
    path = "/api/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier fetched", body = ApiResponse<supplier::Model>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<supplier::Model> {
    let supplier = state.services.suppliers.get(user.company_id, id).await?;
    Ok(Json(ApiResponse::success(supplier)))
}

#[utoipa::path(
    put,
    path = "/api/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    request_body = SupplierInput,
    responses(
        (status = 200, description = "Supplier updated", body = ApiResponse<supplier::Model>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(input): Json<SupplierInput>,
) -> ApiResult<supplier::Model> {
    let supplier = state
        .services
        .suppliers
        .update(user.company_id, id, input)
        .await?;
    Ok(Json(ApiResponse::success(supplier)))
}

#[utoipa::path(
    delete,
    path = "/api/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 204, description = "Supplier deleted"),
        (status = 409, description = "Supplier still has products", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.suppliers.delete(user.company_id, id).await?;
    Ok(no_content_response())
}

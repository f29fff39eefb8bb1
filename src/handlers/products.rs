use super::common::{created_response, no_content_response, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::product,
    errors::ServiceError,
    handlers::AppState,
    services::{
        products::{ProductFilter, ProductInput},
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

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/low-stock", get(low_stock_products))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(PaginationParams),
    responses(
        (status = 200, description = "Products listed", body = ApiResponse<Page<product::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ProductFilter>,
    user: AuthUser,
) -> ApiResult<Page<product::Model>> {
    let page = pagination.to_page_request(&state.config);
    let products = state
        .services
        .products
        .list(user.company_id, filter, page)
        .await?;
    Ok(Json(ApiResponse::success(products)))
}

/// Products at or below their minimum stock
#[utoipa::path(
    get,
    path = "/api/products/low-stock",
    responses(
        (status = 200, description = "Low-stock products", body = ApiResponse<Vec<product::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn low_stock_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<product::Model>> {
    let products = state.services.products.low_stock(user.company_id).await?;
    Ok(Json(ApiResponse::success(products)))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = ProductInput,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<product::Model>),
        (status = 409, description = "SKU already in use", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.create(user.company_id, input).await?;
    Ok(created_response(product))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product fetched", body = ApiResponse<product::Model>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<product::Model> {
    let product = state.services.products.get(user.company_id, id).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<product::Model>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(input): Json<ProductInput>,
) -> ApiResult<product::Model> {
    let product = state
        .services
        .products
        .update(user.company_id, id, input)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 409, description = "Product used in orders", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.products.delete(user.company_id, id).await?;
    Ok(no_content_response())
}

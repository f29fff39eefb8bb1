use super::common::created_response;
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::users::{CreateUserRequest, UpdateUserRequest, UserView},
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

/// Mounted behind `with_role(Role::Admin)`.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", put(update_user))
}

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Users of the company", body = ApiResponse<Vec<UserView>>),
        (status = 403, description = "Requires admin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<UserView>> {
    let users = state.services.users.list(user.company_id).await?;
    Ok(Json(ApiResponse::success(users)))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserView>),
        (status = 409, description = "E-mail already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.users.create(user.company_id, request).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserView>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<UserView> {
    let updated = state
        .services
        .users
        .update(user.company_id, id, request)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

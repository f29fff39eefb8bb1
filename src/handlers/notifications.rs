use crate::{
    auth::AuthUser,
    entities::notification,
    handlers::AppState,
    services::notifications::NotificationFilter,
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
}

/// Company-wide notifications plus the ones addressed to the caller
#[utoipa::path(
    get,
    path = "/api/notifications",
    params(("unread_only" = Option<bool>, Query, description = "Only unread notifications")),
    responses(
        (status = 200, description = "Notifications listed", body = ApiResponse<Vec<notification::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(filter): Query<NotificationFilter>,
    user: AuthUser,
) -> ApiResult<Vec<notification::Model>> {
    let notifications = state
        .services
        .notifications
        .list(user.company_id, user.user_id, filter)
        .await?;
    Ok(Json(ApiResponse::success(notifications)))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked as read", body = ApiResponse<notification::Model>),
        (status = 404, description = "Notification not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<notification::Model> {
    let notification = state
        .services
        .notifications
        .mark_read(user.company_id, user.user_id, id)
        .await?;
    Ok(Json(ApiResponse::success(notification)))
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, description = "Notifications marked as read", body = ApiResponse<MarkAllReadResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<MarkAllReadResponse> {
    let updated = state
        .services
        .notifications
        .mark_all_read(user.company_id, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(MarkAllReadResponse { updated })))
}

use crate::{
    auth::AuthUser,
    handlers::AppState,
    services::dashboard::DashboardSummary,
    ApiResponse, ApiResult,
};
use axum::{extract::State, routing::get, Json, Router};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/", get(summary))
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Headline numbers for the company", body = ApiResponse<DashboardSummary>)
    ),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub async fn summary(State(state): State<AppState>, user: AuthUser) -> ApiResult<DashboardSummary> {
    let summary = state.services.dashboard.summary(user.company_id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

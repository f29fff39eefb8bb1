use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::{company, user::Role},
    handlers::AppState,
    services::companies::CompanyInput,
    ApiResponse, ApiResult,
};
use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};

/// Reading is open to every role; updates require an admin.
pub fn company_routes() -> Router<AppState> {
    let read = Router::new().route("/", get(get_company)).with_auth();
    let admin = Router::new()
        .route("/", put(update_company))
        .with_role(Role::Admin);

    read.merge(admin)
}

#[utoipa::path(
    get,
    path = "/api/company",
    responses(
        (status = 200, description = "Company of the authenticated user", body = ApiResponse<company::Model>)
    ),
    security(("bearer_auth" = [])),
    tag = "company"
)]
pub async fn get_company(State(state): State<AppState>, user: AuthUser) -> ApiResult<company::Model> {
    let company = state.services.companies.get(user.company_id).await?;
    Ok(Json(ApiResponse::success(company)))
}

#[utoipa::path(
    put,
    path = "/api/company",
    request_body = CompanyInput,
    responses(
        (status = 200, description = "Company updated", body = ApiResponse<company::Model>),
        (status = 400, description = "Invalid data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Requires admin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "company"
)]
pub async fn update_company(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CompanyInput>,
) -> ApiResult<company::Model> {
    let company = state
        .services
        .companies
        .update(user.company_id, input)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        company,
        "Empresa atualizada".to_string(),
    )))
}

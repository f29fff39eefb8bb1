use crate::{
    auth::AuthUser,
    entities::company_integration::Provider,
    errors::ServiceError,
    handlers::AppState,
    services::integrations::{IntegrationView, UpsertIntegrationRequest},
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};

/// Mounted behind `with_role(Role::Admin)`.
pub fn integration_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_integrations))
        .route("/:provider", put(upsert_integration))
}

#[utoipa::path(
    get,
    path = "/api/integrations",
    responses(
        (status = 200, description = "Configured providers with masked keys", body = ApiResponse<Vec<IntegrationView>>)
    ),
    security(("bearer_auth" = [])),
    tag = "integrations"
)]
pub async fn list_integrations(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<IntegrationView>> {
    let integrations = state.services.integrations.list(user.company_id).await?;
    Ok(Json(ApiResponse::success(integrations)))
}

/// Store the company's credentials for a provider
#[utoipa::path(
    put,
    path = "/api/integrations/{provider}",
    params(("provider" = String, Path, description = "asaas, mercadopago, focus_nfe or sendgrid")),
    request_body = UpsertIntegrationRequest,
    responses(
        (status = 200, description = "Integration saved", body = ApiResponse<IntegrationView>),
        (status = 400, description = "Unknown provider", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "integrations"
)]
pub async fn upsert_integration(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    user: AuthUser,
    Json(request): Json<UpsertIntegrationRequest>,
) -> ApiResult<IntegrationView> {
    let provider: Provider = provider
        .parse()
        .map_err(|_| ServiceError::BadRequest(format!("Integração desconhecida: {}", provider)))?;
    let saved = state
        .services
        .integrations
        .upsert(user.company_id, provider, request)
        .await?;
    Ok(Json(ApiResponse::success(saved)))
}

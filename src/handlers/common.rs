use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::config::AppConfig;
use crate::services::PageRequest;
use crate::ApiResponse;

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Applies the configured default and upper bound.
    pub fn to_page_request(&self, config: &AppConfig) -> PageRequest {
        let max = config.api_max_page_size.max(1);
        PageRequest {
            page: self.page.unwrap_or(1).max(1),
            per_page: self
                .per_page
                .unwrap_or(config.api_default_page_size)
                .clamp(1, max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped_to_config() {
        let config = AppConfig::new(
            "sqlite::memory:".into(),
            "k3J9vQ2mX7pL4sD8fG1hZ6wE5yU0iO3aR9tB2nC7xV4qM8lK1jH6gF5dS0aP3oI2".into(),
            900,
            "127.0.0.1".into(),
            8080,
            "test".into(),
        );
        let request = PaginationParams {
            page: Some(0),
            per_page: Some(10_000),
        }
        .to_page_request(&config);
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, config.api_max_page_size);

        let request = PaginationParams::default().to_page_request(&config);
        assert_eq!(request.per_page, config.api_default_page_size);
    }
}

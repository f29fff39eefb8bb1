//! Outbound REST clients for the payment, invoicing and e-mail providers.
//!
//! Each client owns its own error enum; services convert those into
//! [`ServiceError::ExternalApiError`] so upstream failures surface as 502.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::errors::ServiceError;

pub mod asaas;
pub mod focus_nfe;
pub mod mercadopago;
pub mod sendgrid;

pub use asaas::{AsaasClient, AsaasError};
pub use focus_nfe::{FocusNfeClient, FocusNfeError};
pub use mercadopago::{MercadoPagoClient, MercadoPagoError};
pub use sendgrid::{SendGridClient, SendGridError};

const USER_AGENT: &str = concat!("distribuidora-api/", env!("CARGO_PKG_VERSION"));

/// Builds the single HTTP client shared by every provider.
pub fn build_http_client(timeout: Duration) -> Result<Client, ServiceError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ServiceError::InternalError(format!("failed to build HTTP client: {}", e)))
}

/// Joins a base URL and a path without doubling or dropping the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Reads a successful body as JSON, or hands back status and raw text.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
) -> Result<Result<T, serde_json::Error>, (u16, String)> {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    if !status.is_success() {
        return Err((status.as_u16(), String::from_utf8_lossy(&body).into_owned()));
    }
    Ok(serde_json::from_slice(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://sandbox.asaas.com/api/v3/", "/customers"),
            "https://sandbox.asaas.com/api/v3/customers"
        );
        assert_eq!(join_url("http://127.0.0.1:9000", "v2/nfe"), "http://127.0.0.1:9000/v2/nfe");
    }
}

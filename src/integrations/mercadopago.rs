//! Mercado Pago payments client (PIX and card charges).

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, warn};

use super::{join_url, read_json};
use crate::errors::ServiceError;

#[derive(Debug, Error)]
pub enum MercadoPagoError {
    #[error("Mercado Pago request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mercado Pago returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected Mercado Pago response: {0}")]
    Decode(String),
}

impl From<MercadoPagoError> for ServiceError {
    fn from(err: MercadoPagoError) -> Self {
        match err {
            MercadoPagoError::Api { message, .. } => {
                ServiceError::ExternalApiError(format!("Mercado Pago: {}", message))
            }
            other => ServiceError::ExternalApiError(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MercadoPagoErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub transaction_amount: Decimal,
    pub description: String,
    pub payment_method_id: String,
    pub external_reference: String,
    pub payer: Payer,
}

#[derive(Debug, Clone, Serialize)]
pub struct Payer {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identification: Option<Identification>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Identification {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub point_of_interaction: Option<PointOfInteraction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointOfInteraction {
    #[serde(default)]
    pub transaction_data: Option<TransactionData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionData {
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub qr_code_base64: Option<String>,
    #[serde(default)]
    pub ticket_url: Option<String>,
}

impl Payment {
    pub fn transaction_data(&self) -> TransactionData {
        self.point_of_interaction
            .as_ref()
            .and_then(|p| p.transaction_data.clone())
            .unwrap_or_default()
    }
}

pub struct MercadoPagoClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl MercadoPagoClient {
    pub fn new(http: Client, base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    /// `POST /v1/payments`. Replays with the same key return the original payment.
    #[instrument(skip(self, request), fields(external_reference = %request.external_reference))]
    pub async fn create_payment(
        &self,
        request: &PaymentRequest,
        idempotency_key: &str,
    ) -> Result<Payment, MercadoPagoError> {
        let response = self
            .http
            .post(join_url(&self.base_url, "v1/payments"))
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", idempotency_key)
            .json(request)
            .send()
            .await?;

        match read_json::<Payment>(response).await {
            Ok(Ok(payment)) => Ok(payment),
            Ok(Err(e)) => Err(MercadoPagoError::Decode(e.to_string())),
            Err((status, body)) => {
                let message = serde_json::from_str::<MercadoPagoErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.message.or(b.error))
                    .unwrap_or(body);
                warn!(status, %message, "Mercado Pago rejected payment");
                Err(MercadoPagoError::Api { status, message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> PaymentRequest {
        PaymentRequest {
            transaction_amount: Decimal::new(9990, 2),
            description: "Pedido PED-0001".into(),
            payment_method_id: "pix".into(),
            external_reference: "rec-1".into(),
            payer: Payer {
                email: "ze@bar.com.br".into(),
                first_name: Some("Zé".into()),
                identification: None,
            },
        }
    }

    #[tokio::test]
    async fn pix_payment_exposes_qr_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payments"))
            .and(header("authorization", "Bearer mp-token"))
            .and(header("x-idempotency-key", "rec-1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 123456,
                "status": "pending",
                "point_of_interaction": {"transaction_data": {
                    "qr_code": "00020126...",
                    "qr_code_base64": "iVBORw0KGgo=",
                    "ticket_url": "https://mp/ticket/123456"
                }}
            })))
            .mount(&server)
            .await;

        let client = MercadoPagoClient::new(Client::new(), server.uri(), "mp-token");
        let payment = client.create_payment(&request(), "rec-1").await.unwrap();
        assert_eq!(payment.id, 123456);
        assert_eq!(payment.transaction_data().qr_code.as_deref(), Some("00020126..."));
    }

    #[tokio::test]
    async fn rejected_payment_carries_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payments"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"message": "invalid payer email"})),
            )
            .mount(&server)
            .await;

        let client = MercadoPagoClient::new(Client::new(), server.uri(), "t");
        let err = client.create_payment(&request(), "rec-1").await.unwrap_err();
        assert!(matches!(err, MercadoPagoError::Api { status: 400, ref message } if message == "invalid payer email"));
    }
}

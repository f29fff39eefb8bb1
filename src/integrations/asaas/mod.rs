//! Asaas (boleto/PIX billing) REST client.

use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{join_url, read_json};
use crate::errors::ServiceError;

pub mod mapping;

pub use mapping::{diff_customer, map_to_asaas_customer, AsaasCustomerPayload, AsaasCustomerUpdate};

/// Production endpoint; sandbox is the configured default.
pub const PRODUCTION_BASE_URL: &str = "https://api.asaas.com/v3";

#[derive(Debug, Error)]
pub enum AsaasError {
    #[error("Asaas request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Asaas returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected Asaas response: {0}")]
    Decode(String),
}

impl AsaasError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AsaasError::Api { status: 404, .. })
    }

    /// Message suitable to forward to the caller.
    pub fn upstream_message(&self) -> String {
        match self {
            AsaasError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<AsaasError> for ServiceError {
    fn from(err: AsaasError) -> Self {
        ServiceError::ExternalApiError(format!("Asaas: {}", err.upstream_message()))
    }
}

#[derive(Debug, Deserialize)]
struct AsaasErrorBody {
    #[serde(default)]
    errors: Vec<AsaasErrorItem>,
}

#[derive(Debug, Deserialize)]
struct AsaasErrorItem {
    #[serde(default)]
    description: String,
}

/// Pulls `errors[].description` out of an error body, falling back to the raw text.
fn upstream_error(status: u16, body: &str) -> AsaasError {
    let message = serde_json::from_str::<AsaasErrorBody>(body)
        .ok()
        .map(|parsed| {
            parsed
                .errors
                .into_iter()
                .map(|e| e.description)
                .filter(|d| !d.is_empty())
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body.trim().to_string()
            }
        });
    AsaasError::Api { status, message }
}

/// Customer as returned by `GET /customers/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AsaasCustomer {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub cpf_cnpj: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub address_number: Option<String>,
    #[serde(default)]
    pub complement: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
struct AsaasList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasPaymentRequest {
    pub customer: String,
    pub billing_type: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub due_date: NaiveDate,
    pub description: String,
    pub external_reference: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AsaasPayment {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub value: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub net_value: Option<Decimal>,
    #[serde(default)]
    pub bank_slip_url: Option<String>,
    #[serde(default)]
    pub invoice_url: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub client_payment_date: Option<NaiveDate>,
}

pub struct AsaasClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl AsaasClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, join_url(&self.base_url, path))
            .header("access_token", &self.api_key)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, AsaasError> {
        let response = builder.send().await?;
        match read_json::<T>(response).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AsaasError::Decode(e.to_string())),
            Err((status, body)) => {
                let err = upstream_error(status, &body);
                if status != 404 {
                    warn!(status, error = %err, "Asaas request rejected");
                }
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_customer(&self, id: &str) -> Result<AsaasCustomer, AsaasError> {
        self.send(self.request(reqwest::Method::GET, &format!("customers/{}", id)))
            .await
    }

    async fn find_customer_by(&self, key: &str, value: &str) -> Result<Option<AsaasCustomer>, AsaasError> {
        let list: AsaasList<AsaasCustomer> = self
            .send(
                self.request(reqwest::Method::GET, "customers")
                    .query(&[(key, value)]),
            )
            .await?;
        Ok(list.data.into_iter().find(|c| !c.deleted))
    }

    #[instrument(skip(self))]
    pub async fn find_customer_by_document(
        &self,
        cpf_cnpj: &str,
    ) -> Result<Option<AsaasCustomer>, AsaasError> {
        self.find_customer_by("cpfCnpj", cpf_cnpj).await
    }

    #[instrument(skip(self))]
    pub async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AsaasCustomer>, AsaasError> {
        self.find_customer_by("email", email).await
    }

    #[instrument(skip(self, payload), fields(external_reference = ?payload.external_reference))]
    pub async fn create_customer(
        &self,
        payload: &AsaasCustomerPayload,
    ) -> Result<AsaasCustomer, AsaasError> {
        let created: AsaasCustomer = self
            .send(self.request(reqwest::Method::POST, "customers").json(payload))
            .await?;
        debug!(asaas_customer_id = %created.id, "Asaas customer created");
        Ok(created)
    }

    #[instrument(skip(self, update))]
    pub async fn update_customer(
        &self,
        id: &str,
        update: &AsaasCustomerUpdate,
    ) -> Result<AsaasCustomer, AsaasError> {
        self.send(
            self.request(reqwest::Method::POST, &format!("customers/{}", id))
                .json(update),
        )
        .await
    }

    #[instrument(skip(self, payment), fields(customer = %payment.customer))]
    pub async fn create_payment(
        &self,
        payment: &AsaasPaymentRequest,
    ) -> Result<AsaasPayment, AsaasError> {
        self.send(self.request(reqwest::Method::POST, "payments").json(payment))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_payment(&self, id: &str) -> Result<AsaasPayment, AsaasError> {
        self.send(self.request(reqwest::Method::GET, &format!("payments/{}", id)))
            .await
    }
}

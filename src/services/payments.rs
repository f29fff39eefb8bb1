//! Charging receivables through Asaas (boleto) and Mercado Pago (PIX), and
//! applying Asaas payment webhooks.

use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::asaas_sync::AsaasSyncService;
use super::customers::find_customer;
use super::financial::{find_record, outstanding, today};
use super::integrations::IntegrationService;
use super::notifications::{notify, NewNotification};
use crate::db::DbPool;
use crate::documents::{document_kind, only_digits, DocumentKind};
use crate::entities::company_integration::Provider;
use crate::entities::financial_record::{self, FinancialStatus};
use crate::entities::notification::NotificationKind;
use crate::entities::payment_method::PaymentKind;
use crate::errors::ServiceError;
use crate::integrations::asaas::{AsaasPayment, AsaasPaymentRequest};
use crate::integrations::mercadopago::{Identification, MercadoPagoClient, Payer, PaymentRequest};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBoletoRequest {
    pub financial_record_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePixPaymentRequest {
    pub financial_record_id: Uuid,
    /// Mercado Pago `payment_method_id`; defaults to `pix`
    #[validate(length(min = 1, max = 50))]
    pub payment_method_id: Option<String>,
    /// Falls back to the customer's e-mail
    #[validate(email)]
    pub payer_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PixPaymentResponse {
    pub id: i64,
    pub status: String,
    pub status_detail: Option<String>,
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    pub ticket_url: Option<String>,
}

/// Asaas webhook body; only the payment events are acted upon.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AsaasWebhookEvent {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub payment: Option<AsaasPayment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    pub matched: bool,
}

/// Local status an Asaas payment status translates to.
pub fn map_asaas_status(status: &str) -> Option<FinancialStatus> {
    match status {
        "CONFIRMED" | "RECEIVED" | "RECEIVED_IN_CASH" => Some(FinancialStatus::Paid),
        "OVERDUE" => Some(FinancialStatus::Overdue),
        "REFUNDED" => Some(FinancialStatus::Refunded),
        "DELETED" => Some(FinancialStatus::Cancelled),
        _ => None,
    }
}

fn ensure_billable(record: &financial_record::Model) -> Result<Uuid, ServiceError> {
    if !record.is_receivable() {
        return Err(ServiceError::InvalidOperation(
            "Apenas contas a receber podem ser cobradas".into(),
        ));
    }
    if !record.is_open() {
        return Err(ServiceError::InvalidOperation(format!(
            "Lançamento com status {} não pode ser cobrado",
            record.status
        )));
    }
    if outstanding(record) <= Decimal::ZERO {
        return Err(ServiceError::InvalidOperation("Lançamento sem saldo a cobrar".into()));
    }
    record.customer_id.ok_or_else(|| {
        ServiceError::InvalidOperation("Lançamento sem cliente vinculado".into())
    })
}

#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DbPool>,
    http: Client,
    integrations: IntegrationService,
    asaas_sync: AsaasSyncService,
}

impl PaymentService {
    pub fn new(
        db: Arc<DbPool>,
        http: Client,
        integrations: IntegrationService,
        asaas_sync: AsaasSyncService,
    ) -> Self {
        Self {
            db,
            http,
            integrations,
            asaas_sync,
        }
    }

    /// Issues an Asaas boleto for a receivable. Records already billed at
    /// Asaas are returned unchanged.
    #[instrument(skip(self))]
    pub async fn create_boleto(
        &self,
        company_id: Uuid,
        financial_record_id: Uuid,
    ) -> Result<financial_record::Model, ServiceError> {
        let record = find_record(&*self.db, company_id, financial_record_id).await?;
        if record.asaas_payment_id.is_some() {
            debug!(record_id = %record.id, "record already billed at Asaas");
            return Ok(record);
        }
        let customer_id = ensure_billable(&record)?;
        let customer = find_customer(&*self.db, company_id, customer_id).await?;

        let client = self.asaas_sync.client_for(company_id).await?;
        let synced = self.asaas_sync.sync_with(&client, customer).await?;

        let request = AsaasPaymentRequest {
            customer: synced.asaas_customer_id,
            billing_type: "BOLETO".to_string(),
            value: outstanding(&record),
            due_date: record.due_date.max(today()),
            description: record.description.clone(),
            external_reference: record.id.to_string(),
        };
        let payment = client.create_payment(&request).await?;

        let mut model: financial_record::ActiveModel = record.into();
        model.asaas_payment_id = Set(Some(payment.id.clone()));
        model.boleto_url = Set(payment.bank_slip_url.clone());
        model.invoice_url = Set(payment.invoice_url.clone());
        model.payment_method = Set(Some(PaymentKind::Boleto.to_string()));
        let updated = model.update(&*self.db).await?;

        info!(record_id = %updated.id, asaas_payment_id = %payment.id, "boleto issued");
        Ok(updated)
    }

    /// Creates a Mercado Pago payment (PIX by default) for a receivable.
    #[instrument(skip(self, request), fields(record_id = %request.financial_record_id))]
    pub async fn create_mercadopago_payment(
        &self,
        company_id: Uuid,
        request: CreatePixPaymentRequest,
    ) -> Result<PixPaymentResponse, ServiceError> {
        request.validate()?;
        let record = find_record(&*self.db, company_id, request.financial_record_id).await?;
        let customer_id = ensure_billable(&record)?;
        let customer = find_customer(&*self.db, company_id, customer_id).await?;

        let email = request
            .payer_email
            .clone()
            .or_else(|| customer.email.clone())
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                ServiceError::BadRequest("E-mail do pagador é obrigatório para o Mercado Pago".into())
            })?;
        let identification = customer.document.as_deref().and_then(|doc| {
            document_kind(doc).map(|kind| Identification {
                kind: match kind {
                    DocumentKind::Cpf => "CPF".to_string(),
                    DocumentKind::Cnpj => "CNPJ".to_string(),
                },
                number: only_digits(doc),
            })
        });
        let payment_method_id = request
            .payment_method_id
            .unwrap_or_else(|| PaymentKind::Pix.to_string());

        let payment_request = PaymentRequest {
            transaction_amount: outstanding(&record),
            description: record.description.clone(),
            payment_method_id: payment_method_id.clone(),
            external_reference: record.id.to_string(),
            payer: Payer {
                email,
                first_name: customer.name.split_whitespace().next().map(str::to_string),
                identification,
            },
        };

        let credentials = self
            .integrations
            .resolve(company_id, Provider::Mercadopago)
            .await?;
        let client = MercadoPagoClient::new(self.http.clone(), credentials.base_url, credentials.api_key);
        let payment = client
            .create_payment(&payment_request, &record.id.to_string())
            .await?;

        let mut model: financial_record::ActiveModel = record.into();
        model.mercadopago_payment_id = Set(Some(payment.id.to_string()));
        if payment_method_id == PaymentKind::Pix.to_string() {
            model.payment_method = Set(Some(PaymentKind::Pix.to_string()));
        }
        let updated = model.update(&*self.db).await?;
        info!(record_id = %updated.id, mercadopago_payment_id = payment.id, status = %payment.status, "Mercado Pago payment created");

        let data = payment.transaction_data();
        Ok(PixPaymentResponse {
            id: payment.id,
            status: payment.status,
            status_detail: payment.status_detail,
            qr_code: data.qr_code,
            qr_code_base64: data.qr_code_base64,
            ticket_url: data.ticket_url,
        })
    }

    /// Applies an Asaas webhook. `token` is the `asaas-access-token` header.
    /// The payment is re-read from Asaas before anything is settled.
    #[instrument(skip(self, token, event), fields(event = event.event.as_deref().unwrap_or("")))]
    pub async fn handle_asaas_webhook(
        &self,
        token: Option<&str>,
        event: AsaasWebhookEvent,
    ) -> Result<WebhookAck, ServiceError> {
        let scope = self.authenticate_webhook(token).await?;

        let Some(reported) = event.payment else {
            return Ok(WebhookAck { received: true, matched: false });
        };
        if reported.status.as_deref().and_then(map_asaas_status).is_none() {
            debug!(status = ?reported.status, "ignoring Asaas payment status");
            return Ok(WebhookAck { received: true, matched: false });
        }

        let Some(record) = self.match_record(&*self.db, scope, &reported).await? else {
            warn!(asaas_payment_id = %reported.id, "webhook did not match any financial record");
            return Ok(WebhookAck { received: true, matched: false });
        };

        let Some(payment) = self.confirm_with_asaas(record.company_id, reported).await else {
            return Ok(WebhookAck { received: true, matched: false });
        };
        let Some(target) = payment.status.as_deref().and_then(map_asaas_status) else {
            info!(record_id = %record.id, status = ?payment.status, "Asaas reports no settled state yet");
            return Ok(WebhookAck { received: true, matched: true });
        };

        let txn = self.db.begin().await?;
        let previous = record.status();
        let company_id = record.company_id;
        let description = record.description.clone();
        let mut model: financial_record::ActiveModel = record.clone().into();
        if record.asaas_payment_id.is_none() {
            model.asaas_payment_id = Set(Some(payment.id.clone()));
        }

        match target {
            FinancialStatus::Paid => {
                let amount = payment.net_value.or(payment.value).unwrap_or(record.amount);
                let paid_on: NaiveDate = payment
                    .payment_date
                    .or(payment.client_payment_date)
                    .unwrap_or_else(today);
                model.status = Set(FinancialStatus::Paid.to_string());
                model.total_payed = Set(amount);
                model.payment_date = Set(Some(paid_on));
            }
            // A late OVERDUE event must not reopen a settled record.
            FinancialStatus::Overdue if !record.is_open() => {}
            other => model.status = Set(other.to_string()),
        }
        let updated = model.update(&txn).await?;

        if target == FinancialStatus::Paid && previous != Some(FinancialStatus::Paid) {
            notify(
                &txn,
                NewNotification::company_wide(
                    company_id,
                    NotificationKind::Success,
                    "Pagamento confirmado",
                    format!("{} recebido: R$ {}", description, updated.total_payed.round_dp(2)),
                ),
            )
            .await?;
        }
        txn.commit().await?;

        info!(record_id = %updated.id, status = %updated.status, "Asaas webhook applied");
        Ok(WebhookAck { received: true, matched: true })
    }

    /// The payment as Asaas has it now, or `None` when Asaas does not know it.
    /// Falls back to the webhook copy when the company has no Asaas
    /// credentials or Asaas cannot be reached.
    async fn confirm_with_asaas(
        &self,
        company_id: Uuid,
        reported: AsaasPayment,
    ) -> Option<AsaasPayment> {
        let client = match self.asaas_sync.client_for(company_id).await {
            Ok(client) => client,
            Err(e) => {
                warn!(%company_id, error = %e, "cannot confirm Asaas payment, using webhook data");
                return Some(reported);
            }
        };
        match client.get_payment(&reported.id).await {
            Ok(remote) => {
                if remote.status != reported.status {
                    warn!(
                        asaas_payment_id = %reported.id,
                        reported = ?reported.status,
                        remote = ?remote.status,
                        "webhook status differs from Asaas"
                    );
                }
                Some(remote)
            }
            Err(e) if e.is_not_found() => {
                warn!(asaas_payment_id = %reported.id, "webhook names a payment unknown to Asaas");
                None
            }
            Err(e) => {
                warn!(asaas_payment_id = %reported.id, error = %e, "Asaas payment lookup failed, using webhook data");
                Some(reported)
            }
        }
    }

    /// `Some(company)` for a company token, `None` for the global token.
    async fn authenticate_webhook(&self, token: Option<&str>) -> Result<Option<Uuid>, ServiceError> {
        let token = token.map(str::trim).filter(|t| !t.is_empty()).ok_or_else(|| {
            ServiceError::Unauthorized("Token do webhook ausente".into())
        })?;
        if let Some(company_id) = self.integrations.company_for_asaas_token(token).await? {
            return Ok(Some(company_id));
        }
        match self.integrations.config().asaas_webhook_token.as_deref() {
            Some(global) if !global.is_empty() && global == token => Ok(None),
            _ => {
                warn!("rejected Asaas webhook with unknown token");
                Err(ServiceError::Unauthorized("Token do webhook inválido".into()))
            }
        }
    }

    async fn match_record<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        scope: Option<Uuid>,
        payment: &AsaasPayment,
    ) -> Result<Option<financial_record::Model>, ServiceError> {
        let scoped = |query: sea_orm::Select<financial_record::Entity>| match scope {
            Some(company_id) => query.filter(financial_record::Column::CompanyId.eq(company_id)),
            None => query,
        };

        let by_payment = scoped(financial_record::Entity::find())
            .filter(financial_record::Column::AsaasPaymentId.eq(payment.id.as_str()))
            .one(conn)
            .await?;
        if by_payment.is_some() {
            return Ok(by_payment);
        }

        let Some(reference) = payment
            .external_reference
            .as_deref()
            .and_then(|r| Uuid::parse_str(r.trim()).ok())
        else {
            return Ok(None);
        };
        Ok(scoped(financial_record::Entity::find_by_id(reference))
            .one(conn)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CONFIRMED", Some(FinancialStatus::Paid))]
    #[case("RECEIVED", Some(FinancialStatus::Paid))]
    #[case("RECEIVED_IN_CASH", Some(FinancialStatus::Paid))]
    #[case("OVERDUE", Some(FinancialStatus::Overdue))]
    #[case("REFUNDED", Some(FinancialStatus::Refunded))]
    #[case("DELETED", Some(FinancialStatus::Cancelled))]
    #[case("PENDING", None)]
    #[case("AWAITING_RISK_ANALYSIS", None)]
    fn asaas_statuses_map_to_local_ones(#[case] status: &str, #[case] expected: Option<FinancialStatus>) {
        assert_eq!(map_asaas_status(status), expected);
    }

    #[test]
    fn webhook_body_tolerates_missing_payment() {
        let event: AsaasWebhookEvent =
            serde_json::from_str(r#"{"event":"PAYMENT_CREATED"}"#).unwrap();
        assert!(event.payment.is_none());

        let event: AsaasWebhookEvent = serde_json::from_str(
            r#"{"event":"PAYMENT_CONFIRMED","payment":{"id":"pay_1","status":"CONFIRMED","value":100.0,"netValue":97.01}}"#,
        )
        .unwrap();
        let payment = event.payment.unwrap();
        assert_eq!(payment.net_value, Some(rust_decimal_macros::dec!(97.01)));
    }
}

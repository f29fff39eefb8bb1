//! Outbound e-mail through SendGrid.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::companies::CompanyService;
use super::customers::find_customer;
use super::financial::{find_record, outstanding};
use super::integrations::IntegrationService;
use crate::db::DbPool;
use crate::entities::{company, financial_record};
use crate::errors::ServiceError;
use crate::integrations::sendgrid::{EmailMessage, SendGridClient};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendEmailRequest {
    #[validate(email)]
    pub to: String,
    #[validate(length(max = 255))]
    pub to_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmailReceipt {
    pub sent: bool,
    pub to: String,
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// pt-BR boleto notice. The HTML and text bodies carry the same link.
fn boleto_message(
    customer_name: &str,
    company_name: &str,
    record: &financial_record::Model,
    boleto_url: &str,
) -> (String, String, String) {
    let amount = outstanding(record).round_dp(2);
    let due = record.due_date.format("%d/%m/%Y");
    let subject = format!("Boleto disponível: {}", record.description);
    let html = format!(
        "<p>Olá, {name}!</p>\
         <p>Seu boleto referente a <strong>{description}</strong> no valor de \
         <strong>R$ {amount}</strong>, com vencimento em {due}, está disponível.</p>\
         <p><a href=\"{url}\">Clique aqui para visualizar o boleto</a></p>\
         <p>Atenciosamente,<br>{company}</p>",
        name = escape_html(customer_name),
        description = escape_html(&record.description),
        amount = amount,
        due = due,
        url = escape_html(boleto_url),
        company = escape_html(company_name),
    );
    let text = format!(
        "Olá, {}!\n\nSeu boleto referente a {} no valor de R$ {}, com vencimento em {}, está disponível:\n{}\n\nAtenciosamente,\n{}",
        customer_name, record.description, amount, due, boleto_url, company_name
    );
    (subject, html, text)
}

#[derive(Clone)]
pub struct EmailService {
    db: Arc<DbPool>,
    http: Client,
    integrations: IntegrationService,
    companies: CompanyService,
}

impl EmailService {
    pub fn new(
        db: Arc<DbPool>,
        http: Client,
        integrations: IntegrationService,
        companies: CompanyService,
    ) -> Self {
        Self {
            db,
            http,
            integrations,
            companies,
        }
    }

    fn sender_name(&self, company: &company::Model) -> String {
        company
            .trade_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| company.name.trim())
            .to_string()
    }

    async fn client_for(&self, company: &company::Model) -> Result<SendGridClient, ServiceError> {
        let credentials = self
            .integrations
            .resolve(company.id, crate::entities::company_integration::Provider::Sendgrid)
            .await?;
        let config = self.integrations.config();
        let mut from_name = self.sender_name(company);
        if from_name.is_empty() {
            from_name = config.sendgrid_from_name.clone();
        }
        Ok(SendGridClient::new(
            self.http.clone(),
            credentials.base_url,
            credentials.api_key,
            config.sendgrid_from_email.clone(),
            from_name,
        ))
    }

    #[instrument(skip(self, request), fields(to = %request.to))]
    pub async fn send(
        &self,
        company_id: Uuid,
        request: SendEmailRequest,
    ) -> Result<EmailReceipt, ServiceError> {
        request.validate()?;
        let html = request.html.filter(|h| !h.trim().is_empty());
        let text = request.text.filter(|t| !t.trim().is_empty());
        if html.is_none() && text.is_none() {
            return Err(ServiceError::ValidationError(
                "Informe o conteúdo do e-mail (html ou text)".into(),
            ));
        }

        let company = self.companies.get(company_id).await?;
        let client = self.client_for(&company).await?;
        let to = request.to.trim().to_lowercase();
        client
            .send(&EmailMessage {
                to_email: to.clone(),
                to_name: request.to_name,
                subject: request.subject,
                html,
                text,
            })
            .await?;
        info!(%to, "e-mail sent");
        Ok(EmailReceipt { sent: true, to })
    }

    /// E-mails the boleto link of a receivable to its customer.
    #[instrument(skip(self))]
    pub async fn send_boleto(
        &self,
        company_id: Uuid,
        financial_record_id: Uuid,
    ) -> Result<EmailReceipt, ServiceError> {
        let record = find_record(&*self.db, company_id, financial_record_id).await?;
        let boleto_url = record.boleto_url.clone().ok_or_else(|| {
            ServiceError::InvalidOperation("Lançamento ainda não possui boleto emitido".into())
        })?;
        let customer_id = record.customer_id.ok_or_else(|| {
            ServiceError::InvalidOperation("Lançamento sem cliente vinculado".into())
        })?;
        let customer = find_customer(&*self.db, company_id, customer_id).await?;
        let to = customer
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ServiceError::BadRequest("Cliente não possui e-mail cadastrado".into()))?;

        let company = self.companies.get(company_id).await?;
        let client = self.client_for(&company).await?;
        let (subject, html, text) =
            boleto_message(&customer.name, &self.sender_name(&company), &record, &boleto_url);
        client
            .send(&EmailMessage {
                to_email: to.clone(),
                to_name: Some(customer.name.clone()),
                subject,
                html: Some(html),
                text: Some(text),
            })
            .await?;
        info!(record_id = %record.id, %to, "boleto e-mailed");
        Ok(EmailReceipt { sent: true, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn record() -> financial_record::Model {
        financial_record::Model {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            record_type: "receivable".into(),
            customer_id: Some(Uuid::new_v4()),
            supplier_id: None,
            order_id: None,
            description: "Pedido <PED-1>".into(),
            amount: dec!(150.00),
            total_payed: dec!(50.00),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            payment_date: None,
            status: "Pending".into(),
            payment_method: Some("boleto".into()),
            asaas_payment_id: Some("pay_1".into()),
            boleto_url: Some("https://asaas.test/b/1".into()),
            invoice_url: None,
            mercadopago_payment_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn boleto_message_escapes_and_formats_in_pt_br() {
        let (subject, html, text) =
            boleto_message("Bar do Zé", "Distribuidora Sul", &record(), "https://asaas.test/b/1");
        assert_eq!(subject, "Boleto disponível: Pedido <PED-1>");
        assert!(html.contains("Pedido &lt;PED-1&gt;"));
        assert!(html.contains("R$ 100.00"));
        assert!(html.contains("10/03/2025"));
        assert!(text.contains("https://asaas.test/b/1"));
    }
}

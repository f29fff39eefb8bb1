//! NF-e emission through Focus NFe.

use chrono::Utc;
use reqwest::Client;
use sea_orm::{ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::companies::CompanyService;
use super::customers::find_customer;
use super::integrations::IntegrationService;
use super::notifications::{notify, NewNotification};
use super::orders::OrderService;
use super::{paginate, Page, PageRequest};
use crate::db::DbPool;
use crate::entities::company_integration::Provider;
use crate::entities::invoice::{self, InvoiceStatus};
use crate::entities::notification::NotificationKind;
use crate::entities::order::OrderStatus;
use crate::entities::product;
use crate::errors::ServiceError;
use crate::integrations::focus_nfe::{build_payload, map_status, FocusNfeClient, NfeOutcome};

const JUSTIFICATION_MIN: usize = 15;
const JUSTIFICATION_MAX: usize = 255;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EmitInvoiceRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CancelInvoiceRequest {
    /// Between 15 and 255 characters
    pub justification: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilter {
    pub order_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvoiceFiles {
    pub xml_url: Option<String>,
    pub danfe_url: Option<String>,
}

fn check_justification(justification: &str) -> Result<&str, ServiceError> {
    let trimmed = justification.trim();
    let len = trimmed.chars().count();
    if !(JUSTIFICATION_MIN..=JUSTIFICATION_MAX).contains(&len) {
        return Err(ServiceError::ValidationError(format!(
            "Justificativa deve ter entre {} e {} caracteres",
            JUSTIFICATION_MIN, JUSTIFICATION_MAX
        )));
    }
    Ok(trimmed)
}

/// A concurrent emission for the same order lost the race on the
/// `ux_invoices_active_order` index.
fn active_invoice_conflict(err: DbErr, order_number: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(format!(
            "Pedido {} já possui NF-e em processamento ou autorizada",
            order_number
        )),
        _ => err.into(),
    }
}

#[derive(Clone)]
pub struct InvoiceService {
    db: Arc<DbPool>,
    http: Client,
    integrations: IntegrationService,
    companies: CompanyService,
    orders: OrderService,
}

impl InvoiceService {
    pub fn new(
        db: Arc<DbPool>,
        http: Client,
        integrations: IntegrationService,
        companies: CompanyService,
        orders: OrderService,
    ) -> Self {
        Self {
            db,
            http,
            integrations,
            companies,
            orders,
        }
    }

    async fn client_for(&self, company_id: Uuid) -> Result<FocusNfeClient, ServiceError> {
        let credentials = self.integrations.resolve(company_id, Provider::FocusNfe).await?;
        Ok(FocusNfeClient::new(
            self.http.clone(),
            credentials.base_url,
            credentials.api_key,
        ))
    }

    async fn find(&self, company_id: Uuid, id: Uuid) -> Result<invoice::Model, ServiceError> {
        invoice::Entity::find_by_id(id)
            .filter(invoice::Column::CompanyId.eq(company_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("NF-e {} não encontrada", id)))
    }

    /// Builds, submits and polls the NF-e of an order.
    #[instrument(skip(self))]
    pub async fn emit(&self, company_id: Uuid, order_id: Uuid) -> Result<invoice::Model, ServiceError> {
        let details = self.orders.get(company_id, order_id).await?;
        if details.order.status == OrderStatus::Cancelled.to_string() {
            return Err(ServiceError::InvalidOperation(
                "Pedido cancelado não pode gerar NF-e".into(),
            ));
        }

        let active = invoice::Entity::find()
            .filter(invoice::Column::CompanyId.eq(company_id))
            .filter(invoice::Column::OrderId.eq(order_id))
            .filter(invoice::Column::Status.is_in([
                InvoiceStatus::Processing.to_string(),
                InvoiceStatus::Authorized.to_string(),
            ]))
            .one(&*self.db)
            .await?;
        if let Some(existing) = active {
            return Err(ServiceError::Conflict(format!(
                "Pedido {} já possui NF-e {} ({})",
                details.order.order_number, existing.reference, existing.status
            )));
        }
        let order_number = details.order.order_number.clone();

        let company = self.companies.get(company_id).await?;
        let customer = find_customer(&*self.db, company_id, details.order.customer_id).await?;
        let product_ids: Vec<Uuid> = details.items.iter().map(|i| i.product_id).collect();
        let mut products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::CompanyId.eq(company_id))
            .filter(product::Column::Id.is_in(product_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let mut lines = Vec::with_capacity(details.items.len());
        for item in details.items {
            let product = products.remove(&item.product_id).ok_or_else(|| {
                ServiceError::NotFound(format!("Produto {} não encontrado", item.product_id))
            })?;
            lines.push((item, product));
        }
        let payload = build_payload(&company, &customer, &details.order, &lines)?;
        let client = self.client_for(company_id).await?;

        let reference = format!("nfe-{}", Uuid::new_v4().simple());
        let pending = invoice::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            order_id: Set(details.order.id),
            customer_id: Set(customer.id),
            reference: Set(reference.clone()),
            status: Set(InvoiceStatus::Processing.to_string()),
            total_amount: Set(details.order.total_amount),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| active_invoice_conflict(e, &order_number))?;

        let submitted = match client.submit(&reference, &payload).await {
            Ok(status) => status,
            Err(e) => {
                error!(%reference, error = %e, "NF-e submission failed");
                let err: ServiceError = e.into();
                let failed = self
                    .apply_outcome(
                        &client,
                        pending,
                        NfeOutcome {
                            status: InvoiceStatus::Error,
                            number: None,
                            series: None,
                            access_key: None,
                            xml_path: None,
                            danfe_path: None,
                            error_message: Some(err.response_message()),
                        },
                    )
                    .await?;
                self.notify_outcome(&failed, &details.order.order_number).await?;
                return Err(err);
            }
        };

        let config = self.integrations.config();
        let settled = if submitted.is_processing() && config.nfe_poll_attempts > 0 {
            match client
                .poll(&reference, config.nfe_poll_attempts, config.nfe_poll_interval())
                .await
            {
                Ok(status) => status,
                Err(e) => {
                    warn!(%reference, error = %e, "NF-e polling failed, keeping it as processing");
                    submitted
                }
            }
        } else {
            submitted
        };

        let invoice = self.apply_outcome(&client, pending, map_status(&settled)).await?;
        self.notify_outcome(&invoice, &details.order.order_number).await?;
        info!(invoice_id = %invoice.id, %reference, status = %invoice.status, "NF-e emitted");
        Ok(invoice)
    }

    async fn apply_outcome(
        &self,
        client: &FocusNfeClient,
        current: invoice::Model,
        outcome: NfeOutcome,
    ) -> Result<invoice::Model, ServiceError> {
        let was_authorized = current.issued_at.is_some();
        let mut model: invoice::ActiveModel = current.into();
        model.status = Set(outcome.status.to_string());
        match outcome.status {
            InvoiceStatus::Authorized => {
                model.number = Set(outcome.number);
                model.series = Set(outcome.series);
                model.access_key = Set(outcome.access_key);
                model.xml_url = Set(outcome.xml_path.map(|p| client.absolute_url(&p)));
                model.danfe_url = Set(outcome.danfe_path.map(|p| client.absolute_url(&p)));
                model.error_message = Set(None);
                if !was_authorized {
                    model.issued_at = Set(Some(Utc::now()));
                }
            }
            InvoiceStatus::Error => model.error_message = Set(outcome.error_message),
            InvoiceStatus::Processing | InvoiceStatus::Cancelled => {}
        }
        Ok(model.update(&*self.db).await?)
    }

    async fn notify_outcome(&self, invoice: &invoice::Model, order_number: &str) -> Result<(), ServiceError> {
        let notification = match invoice.status() {
            Some(InvoiceStatus::Authorized) => NewNotification::company_wide(
                invoice.company_id,
                NotificationKind::Success,
                "NF-e autorizada",
                format!(
                    "NF-e {} do pedido {} autorizada",
                    invoice.number.as_deref().unwrap_or("-"),
                    order_number
                ),
            ),
            Some(InvoiceStatus::Error) => NewNotification::company_wide(
                invoice.company_id,
                NotificationKind::Error,
                "Erro na emissão de NF-e",
                format!(
                    "Pedido {}: {}",
                    order_number,
                    invoice.error_message.as_deref().unwrap_or("erro desconhecido")
                ),
            ),
            _ => return Ok(()),
        };
        notify(&*self.db, notification).await?;
        Ok(())
    }

    /// Returns the invoice, refreshing it from the provider while processing.
    #[instrument(skip(self))]
    pub async fn get(&self, company_id: Uuid, id: Uuid) -> Result<invoice::Model, ServiceError> {
        let invoice = self.find(company_id, id).await?;
        if invoice.status() != Some(InvoiceStatus::Processing) {
            return Ok(invoice);
        }

        let client = self.client_for(company_id).await?;
        let status = match client.status(&invoice.reference).await {
            Ok(status) => status,
            Err(e) => {
                warn!(reference = %invoice.reference, error = %e, "could not refresh NF-e status");
                return Ok(invoice);
            }
        };
        let outcome = map_status(&status);
        if outcome.status == InvoiceStatus::Processing {
            return Ok(invoice);
        }

        let order_number = self
            .orders
            .get(company_id, invoice.order_id)
            .await
            .map(|d| d.order.order_number)
            .unwrap_or_default();
        let refreshed = self.apply_outcome(&client, invoice, outcome).await?;
        self.notify_outcome(&refreshed, &order_number).await?;
        Ok(refreshed)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company_id: Uuid,
        filter: InvoiceFilter,
        page: PageRequest,
    ) -> Result<Page<invoice::Model>, ServiceError> {
        let mut query = invoice::Entity::find()
            .filter(invoice::Column::CompanyId.eq(company_id))
            .order_by_desc(invoice::Column::CreatedAt);
        if let Some(order_id) = filter.order_id {
            query = query.filter(invoice::Column::OrderId.eq(order_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(invoice::Column::Status.eq(status.to_string()));
        }
        Ok(paginate(&*self.db, query, page).await?)
    }

    /// Cancels an authorized NF-e at the provider.
    #[instrument(skip(self, justification))]
    pub async fn cancel(
        &self,
        company_id: Uuid,
        id: Uuid,
        justification: &str,
    ) -> Result<invoice::Model, ServiceError> {
        let justification = check_justification(justification)?;
        let invoice = self.find(company_id, id).await?;
        if invoice.status() != Some(InvoiceStatus::Authorized) {
            return Err(ServiceError::InvalidOperation(format!(
                "Apenas NF-e autorizada pode ser cancelada (status atual: {})",
                invoice.status
            )));
        }

        let client = self.client_for(company_id).await?;
        let response = client.cancel(&invoice.reference, justification).await?;
        let outcome = map_status(&response);
        if outcome.status != InvoiceStatus::Cancelled {
            let message = response
                .mensagem_sefaz
                .or(response.mensagem)
                .unwrap_or_else(|| format!("status {}", response.status));
            return Err(ServiceError::ExternalApiError(format!("Focus NFe: {}", message)));
        }

        let mut model: invoice::ActiveModel = invoice.into();
        model.status = Set(InvoiceStatus::Cancelled.to_string());
        let cancelled = model.update(&*self.db).await?;
        info!(invoice_id = %cancelled.id, "NF-e cancelled");
        Ok(cancelled)
    }

    #[instrument(skip(self))]
    pub async fn files(&self, company_id: Uuid, id: Uuid) -> Result<InvoiceFiles, ServiceError> {
        let invoice = self.find(company_id, id).await?;
        if invoice.xml_url.is_none() && invoice.danfe_url.is_none() {
            return Err(ServiceError::InvalidOperation(
                "NF-e ainda não possui arquivos disponíveis".into(),
            ));
        }
        Ok(InvoiceFiles {
            xml_url: invoice.xml_url,
            danfe_url: invoice.danfe_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn justification_length_is_checked_on_trimmed_characters() {
        assert!(check_justification("curta").is_err());
        assert!(check_justification("   cliente desistiu   ").is_ok());
        assert!(check_justification(&"ç".repeat(255)).is_ok());
        assert!(check_justification(&"a".repeat(256)).is_err());
    }
}

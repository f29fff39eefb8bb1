use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{clean, customers::find_customer, orders::find_order, paginate, Page, PageRequest};
use crate::db::DbPool;
use crate::entities::financial_record::{self, FinancialStatus, RecordType};
use crate::entities::payment_method::PaymentKind;
use crate::entities::supplier;
use crate::errors::ServiceError;

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Receivable boletos of a customer that are overdue as of `today`: flagged
/// `Overdue`, or still `Pending` with a due date in the past.
pub(crate) async fn overdue_boletos<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    customer_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<financial_record::Model>, ServiceError> {
    Ok(financial_record::Entity::find()
        .filter(financial_record::Column::CompanyId.eq(company_id))
        .filter(financial_record::Column::CustomerId.eq(customer_id))
        .filter(financial_record::Column::RecordType.eq(RecordType::Receivable.to_string()))
        .filter(financial_record::Column::PaymentMethod.eq(PaymentKind::Boleto.to_string()))
        .filter(
            Condition::any()
                .add(financial_record::Column::Status.eq(FinancialStatus::Overdue.to_string()))
                .add(
                    Condition::all()
                        .add(financial_record::Column::Status.eq(FinancialStatus::Pending.to_string()))
                        .add(financial_record::Column::DueDate.lt(today)),
                ),
        )
        .order_by_asc(financial_record::Column::DueDate)
        .all(conn)
        .await?)
}

/// Amount still owed on a record.
pub fn outstanding(record: &financial_record::Model) -> Decimal {
    (record.amount - record.total_payed).max(Decimal::ZERO)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverdueSummary {
    pub customer_id: Uuid,
    pub overdue_count: u64,
    pub overdue_total: Decimal,
    pub records: Vec<financial_record::Model>,
}

impl OverdueSummary {
    pub fn from_records(customer_id: Uuid, records: Vec<financial_record::Model>) -> Self {
        Self {
            customer_id,
            overdue_count: records.len() as u64,
            overdue_total: records.iter().map(outstanding).sum(),
            records,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.overdue_count > 0
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFinancialRecordRequest {
    pub record_type: RecordType,
    pub customer_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub payment_method: Option<PaymentKind>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFinancialRecordRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentKind>,
    /// Only `Cancelled` may be set directly; payment goes through `/pay`
    pub status: Option<FinancialStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PayRequest {
    /// Defaults to the record amount
    pub amount: Option<Decimal>,
    /// Defaults to today
    pub payment_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentKind>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinancialFilter {
    pub record_type: Option<RecordType>,
    pub status: Option<FinancialStatus>,
    pub customer_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

fn ensure_positive(amount: Decimal) -> Result<(), ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError("Valor deve ser maior que zero".into()));
    }
    Ok(())
}

pub(crate) async fn find_record<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    id: Uuid,
) -> Result<financial_record::Model, ServiceError> {
    financial_record::Entity::find_by_id(id)
        .filter(financial_record::Column::CompanyId.eq(company_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Lançamento {} não encontrado", id)))
}

#[derive(Clone)]
pub struct FinancialService {
    db: Arc<DbPool>,
}

impl FinancialService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        company_id: Uuid,
        request: CreateFinancialRecordRequest,
    ) -> Result<financial_record::Model, ServiceError> {
        request.validate()?;
        ensure_positive(request.amount)?;

        if let Some(customer_id) = request.customer_id {
            find_customer(&*self.db, company_id, customer_id).await?;
        }
        if let Some(supplier_id) = request.supplier_id {
            supplier::Entity::find_by_id(supplier_id)
                .filter(supplier::Column::CompanyId.eq(company_id))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Fornecedor {} não encontrado", supplier_id))
                })?;
        }
        if let Some(order_id) = request.order_id {
            find_order(&*self.db, company_id, order_id).await?;
        }

        let created = financial_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            record_type: Set(request.record_type.to_string()),
            customer_id: Set(request.customer_id),
            supplier_id: Set(request.supplier_id),
            order_id: Set(request.order_id),
            description: Set(request.description.trim().to_string()),
            amount: Set(request.amount),
            total_payed: Set(Decimal::ZERO),
            due_date: Set(request.due_date),
            payment_date: Set(None),
            status: Set(FinancialStatus::Pending.to_string()),
            payment_method: Set(request.payment_method.map(|m| m.to_string())),
            asaas_payment_id: Set(None),
            boleto_url: Set(None),
            invoice_url: Set(None),
            mercadopago_payment_id: Set(None),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(record_id = %created.id, record_type = %created.record_type, "financial record created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, company_id: Uuid, id: Uuid) -> Result<financial_record::Model, ServiceError> {
        find_record(&*self.db, company_id, id).await
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company_id: Uuid,
        filter: FinancialFilter,
        page: PageRequest,
    ) -> Result<Page<financial_record::Model>, ServiceError> {
        let mut query = financial_record::Entity::find()
            .filter(financial_record::Column::CompanyId.eq(company_id))
            .order_by_asc(financial_record::Column::DueDate);

        if let Some(record_type) = filter.record_type {
            query = query.filter(financial_record::Column::RecordType.eq(record_type.to_string()));
        }
        if let Some(status) = filter.status {
            query = query.filter(financial_record::Column::Status.eq(status.to_string()));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(financial_record::Column::CustomerId.eq(customer_id));
        }
        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(financial_record::Column::SupplierId.eq(supplier_id));
        }
        if let Some(from) = filter.due_from {
            query = query.filter(financial_record::Column::DueDate.gte(from));
        }
        if let Some(to) = filter.due_to {
            query = query.filter(financial_record::Column::DueDate.lte(to));
        }

        Ok(paginate(&*self.db, query, page).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        company_id: Uuid,
        id: Uuid,
        request: UpdateFinancialRecordRequest,
    ) -> Result<financial_record::Model, ServiceError> {
        request.validate()?;
        let existing = find_record(&*self.db, company_id, id).await?;
        if !existing.is_open() {
            return Err(ServiceError::InvalidOperation(format!(
                "Lançamento com status {} não pode ser alterado",
                existing.status
            )));
        }

        let mut model: financial_record::ActiveModel = existing.into();
        if let Some(description) = clean(request.description) {
            model.description = Set(description);
        }
        if let Some(amount) = request.amount {
            ensure_positive(amount)?;
            model.amount = Set(amount);
        }
        if let Some(due_date) = request.due_date {
            model.due_date = Set(due_date);
            // a new due date reopens an overdue record
            if due_date >= today() {
                model.status = Set(FinancialStatus::Pending.to_string());
            }
        }
        if let Some(method) = request.payment_method {
            model.payment_method = Set(Some(method.to_string()));
        }
        match request.status {
            None => {}
            Some(FinancialStatus::Cancelled) => {
                model.status = Set(FinancialStatus::Cancelled.to_string());
            }
            Some(other) => {
                return Err(ServiceError::InvalidOperation(format!(
                    "Status {} não pode ser definido manualmente",
                    other
                )))
            }
        }
        Ok(model.update(&*self.db).await?)
    }

    /// Paid records are kept for the ledger.
    #[instrument(skip(self))]
    pub async fn delete(&self, company_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let existing = find_record(&*self.db, company_id, id).await?;
        if existing.status() == Some(FinancialStatus::Paid) {
            return Err(ServiceError::InvalidOperation(
                "Lançamentos pagos não podem ser excluídos".into(),
            ));
        }
        financial_record::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, request))]
    pub async fn pay(
        &self,
        company_id: Uuid,
        id: Uuid,
        request: PayRequest,
    ) -> Result<financial_record::Model, ServiceError> {
        let existing = find_record(&*self.db, company_id, id).await?;
        if !existing.is_open() {
            return Err(ServiceError::InvalidOperation(format!(
                "Lançamento com status {} não pode ser baixado",
                existing.status
            )));
        }
        let amount = request.amount.unwrap_or(existing.amount);
        ensure_positive(amount)?;

        let mut model: financial_record::ActiveModel = existing.into();
        model.status = Set(FinancialStatus::Paid.to_string());
        model.total_payed = Set(amount);
        model.payment_date = Set(Some(request.payment_date.unwrap_or_else(today)));
        if let Some(method) = request.payment_method {
            model.payment_method = Set(Some(method.to_string()));
        }
        let updated = model.update(&*self.db).await?;
        info!(record_id = %updated.id, amount = %amount, "financial record paid");
        Ok(updated)
    }

    /// Flips the tenant's `Pending` records past due to `Overdue`.
    #[instrument(skip(self))]
    pub async fn refresh_overdue(&self, company_id: Uuid) -> Result<u64, ServiceError> {
        let result = financial_record::Entity::update_many()
            .col_expr(
                financial_record::Column::Status,
                Expr::value(FinancialStatus::Overdue.to_string()),
            )
            .col_expr(financial_record::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(financial_record::Column::CompanyId.eq(company_id))
            .filter(financial_record::Column::Status.eq(FinancialStatus::Pending.to_string()))
            .filter(financial_record::Column::DueDate.lt(today()))
            .exec(&*self.db)
            .await?;
        info!(updated = result.rows_affected, "overdue records refreshed");
        Ok(result.rows_affected)
    }

    /// Overdue boletos that would block a new order for the customer.
    #[instrument(skip(self))]
    pub async fn overdue_summary(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<OverdueSummary, ServiceError> {
        find_customer(&*self.db, company_id, customer_id).await?;
        let records = overdue_boletos(&*self.db, company_id, customer_id, today()).await?;
        Ok(OverdueSummary::from_records(customer_id, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(amount: Decimal, payed: Decimal) -> financial_record::Model {
        financial_record::Model {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            record_type: "receivable".into(),
            customer_id: None,
            supplier_id: None,
            order_id: None,
            description: "Pedido".into(),
            amount,
            total_payed: payed,
            due_date: today(),
            payment_date: None,
            status: "Overdue".into(),
            payment_method: Some("boleto".into()),
            asaas_payment_id: None,
            boleto_url: None,
            invoice_url: None,
            mercadopago_payment_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn summary_totals_outstanding_amounts() {
        let customer_id = Uuid::new_v4();
        let summary = OverdueSummary::from_records(
            customer_id,
            vec![record(dec!(100), dec!(40)), record(dec!(50.25), dec!(0))],
        );
        assert_eq!(summary.overdue_count, 2);
        assert_eq!(summary.overdue_total, dec!(110.25));
        assert!(summary.is_blocking());
        assert!(!OverdueSummary::from_records(customer_id, vec![]).is_blocking());
    }
}

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::financial::{outstanding, today};
use crate::db::DbPool;
use crate::entities::equipment_loan::LoanStatus;
use crate::entities::financial_record::{FinancialStatus, RecordType};
use crate::entities::order::OrderStatus;
use crate::entities::{customer, equipment_loan, financial_record, order, product};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub customers: u64,
    pub open_receivables_total: Decimal,
    pub overdue_total: Decimal,
    pub orders_this_month: u64,
    pub active_loans: u64,
    pub low_stock_products: u64,
}

fn month_start(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DbPool>,
}

impl DashboardService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn summary(&self, company_id: Uuid) -> Result<DashboardSummary, ServiceError> {
        let db = &*self.db;
        let today = today();

        let customers = customer::Entity::find()
            .filter(customer::Column::CompanyId.eq(company_id))
            .filter(customer::Column::Active.eq(true))
            .count(db)
            .await?;

        let open = financial_record::Entity::find()
            .filter(financial_record::Column::CompanyId.eq(company_id))
            .filter(financial_record::Column::RecordType.eq(RecordType::Receivable.to_string()))
            .filter(financial_record::Column::Status.is_in([
                FinancialStatus::Pending.to_string(),
                FinancialStatus::Overdue.to_string(),
            ]))
            .all(db)
            .await?;
        let open_receivables_total: Decimal = open.iter().map(outstanding).sum();
        let overdue_total: Decimal = open
            .iter()
            .filter(|r| r.status == FinancialStatus::Overdue.to_string() || r.due_date < today)
            .map(outstanding)
            .sum();

        let since = Utc.from_utc_datetime(&month_start(today).and_time(chrono::NaiveTime::MIN));
        let orders_this_month = order::Entity::find()
            .filter(order::Column::CompanyId.eq(company_id))
            .filter(order::Column::CreatedAt.gte(since))
            .filter(order::Column::Status.ne(OrderStatus::Cancelled.to_string()))
            .count(db)
            .await?;

        let active_loans = equipment_loan::Entity::find()
            .filter(equipment_loan::Column::CompanyId.eq(company_id))
            .filter(equipment_loan::Column::Status.ne(LoanStatus::Returned.to_string()))
            .count(db)
            .await?;

        let low_stock_products = product::Entity::find()
            .filter(product::Column::CompanyId.eq(company_id))
            .filter(product::Column::Active.eq(true))
            .filter(Expr::col(product::Column::StockQuantity).lte(Expr::col(product::Column::MinStock)))
            .count(db)
            .await?;

        Ok(DashboardSummary {
            customers,
            open_receivables_total,
            overdue_total,
            orders_this_month,
            active_loans,
            low_stock_products,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_start_is_the_first_day() {
        let day = NaiveDate::from_ymd_opt(2025, 2, 17).unwrap();
        assert_eq!(month_start(day), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    }
}

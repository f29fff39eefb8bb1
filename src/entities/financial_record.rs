use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// A receivable or payable. Receivables carry the boleto/PIX references.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "financial_records")]
#[schema(as = FinancialRecord)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub record_type: String,
    pub customer_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub description: String,
    pub amount: Decimal,
    pub total_payed: Decimal,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub status: String,
    pub payment_method: Option<String>,
    pub asaas_payment_id: Option<String>,
    pub boleto_url: Option<String>,
    pub invoice_url: Option<String>,
    pub mercadopago_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn status(&self) -> Option<FinancialStatus> {
        self.status.parse().ok()
    }

    pub fn is_receivable(&self) -> bool {
        self.record_type == RecordType::Receivable.to_string()
    }

    /// Open and billable: still pending or already overdue.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status(),
            Some(FinancialStatus::Pending | FinancialStatus::Overdue)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Receivable,
    Payable,
}

/// Stored capitalized, as the payment webhooks and reports expect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
pub enum FinancialStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
    Refunded,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();
        if insert && matches!(active_model.created_at, ActiveValue::NotSet) {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_keep_their_capitalized_form() {
        assert_eq!(FinancialStatus::Paid.to_string(), "Paid");
        assert_eq!("Overdue".parse::<FinancialStatus>().unwrap(), FinancialStatus::Overdue);
        assert_eq!(RecordType::Receivable.to_string(), "receivable");
    }
}

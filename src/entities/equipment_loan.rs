use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Equipment lent to a customer under comodato.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "equipment_loans")]
#[schema(as = EquipmentLoan)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub returned_quantity: i32,
    pub loan_date: NaiveDate,
    pub expected_return_date: Option<NaiveDate>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn remaining_quantity(&self) -> i32 {
        self.quantity - self.returned_quantity
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    PartiallyReturned,
    Returned,
}

impl LoanStatus {
    pub fn for_quantities(quantity: i32, returned: i32) -> Self {
        if returned <= 0 {
            LoanStatus::Active
        } else if returned >= quantity {
            LoanStatus::Returned
        } else {
            LoanStatus::PartiallyReturned
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::equipment_return::Entity")]
    EquipmentReturn,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
}

impl Related<super::equipment_return::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EquipmentReturn.def()
    }
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
    fn status_follows_returned_quantity() {
        assert_eq!(LoanStatus::for_quantities(5, 0), LoanStatus::Active);
        assert_eq!(LoanStatus::for_quantities(5, 2), LoanStatus::PartiallyReturned);
        assert_eq!(LoanStatus::for_quantities(5, 5), LoanStatus::Returned);
        assert_eq!(LoanStatus::PartiallyReturned.to_string(), "partially_returned");
    }
}

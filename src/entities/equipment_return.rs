use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "equipment_returns")]
#[schema(as = EquipmentReturn)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub loan_id: Uuid,
    pub quantity: i32,
    pub return_date: NaiveDate,
    pub condition: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::equipment_loan::Entity",
        from = "Column::LoanId",
        to = "super::equipment_loan::Column::Id"
    )]
    EquipmentLoan,
}

impl Related<super::equipment_loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EquipmentLoan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

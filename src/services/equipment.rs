//! Comodato: equipment lent to customers and its (partial) returns.

use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::customers::find_customer;
use super::financial::today;
use super::products::{find_product, return_stock, take_stock};
use super::{clean, paginate, Page, PageRequest};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::equipment_loan::{self, LoanStatus};
use crate::entities::equipment_return;
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLoanRequest {
    pub customer_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Defaults to today
    pub loan_date: Option<NaiveDate>,
    pub expected_return_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterReturnRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Defaults to today
    pub return_date: Option<NaiveDate>,
    /// Free text, e.g. "ok", "amassado", "sem válvula"
    pub condition: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanFilter {
    pub customer_id: Option<Uuid>,
    pub status: Option<LoanStatus>,
}

/// Loan with its outstanding quantity.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanView {
    #[serde(flatten)]
    pub loan: equipment_loan::Model,
    pub remaining_quantity: i32,
}

impl From<equipment_loan::Model> for LoanView {
    fn from(loan: equipment_loan::Model) -> Self {
        Self {
            remaining_quantity: loan.remaining_quantity(),
            loan,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnReceipt {
    pub loan: LoanView,
    #[serde(rename = "return")]
    pub equipment_return: equipment_return::Model,
}

async fn find_loan<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    loan_id: Uuid,
) -> Result<equipment_loan::Model, ServiceError> {
    equipment_loan::Entity::find_by_id(loan_id)
        .filter(equipment_loan::Column::CompanyId.eq(company_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Comodato {} não encontrado", loan_id)))
}

#[derive(Clone)]
pub struct EquipmentService {
    db: Arc<DbPool>,
}

impl EquipmentService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, product_id = %request.product_id))]
    pub async fn create_loan(
        &self,
        company_id: Uuid,
        request: CreateLoanRequest,
    ) -> Result<LoanView, ServiceError> {
        request.validate()?;
        let loan_date = request.loan_date.unwrap_or_else(today);
        if request.expected_return_date.is_some_and(|d| d < loan_date) {
            return Err(ServiceError::ValidationError(
                "Data prevista de devolução anterior à data do comodato".into(),
            ));
        }

        let txn = self.db.begin().await?;
        find_customer(&txn, company_id, request.customer_id).await?;
        let product = find_product(&txn, company_id, request.product_id).await?;
        if !product.is_equipment {
            return Err(ServiceError::ValidationError(format!(
                "Produto {} não é um equipamento de comodato",
                product.sku
            )));
        }
        take_stock(&txn, &product, request.quantity).await?;

        let loan = equipment_loan::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            customer_id: Set(request.customer_id),
            product_id: Set(product.id),
            quantity: Set(request.quantity),
            returned_quantity: Set(0),
            loan_date: Set(loan_date),
            expected_return_date: Set(request.expected_return_date),
            status: Set(LoanStatus::Active.to_string()),
            notes: Set(clean(request.notes)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(loan_id = %loan.id, quantity = loan.quantity, "equipment loan created");
        Ok(loan.into())
    }

    #[instrument(skip(self))]
    pub async fn get_loan(&self, company_id: Uuid, loan_id: Uuid) -> Result<LoanView, ServiceError> {
        Ok(find_loan(&*self.db, company_id, loan_id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn list_loans(
        &self,
        company_id: Uuid,
        filter: LoanFilter,
        page: PageRequest,
    ) -> Result<Page<LoanView>, ServiceError> {
        let mut query = equipment_loan::Entity::find()
            .filter(equipment_loan::Column::CompanyId.eq(company_id))
            .order_by_desc(equipment_loan::Column::LoanDate);
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(equipment_loan::Column::CustomerId.eq(customer_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(equipment_loan::Column::Status.eq(status.to_string()));
        }
        Ok(paginate(&*self.db, query, page).await?.map(LoanView::from))
    }

    /// Books a (partial) return. The increment is a single conditional update
    /// so concurrent returns can never push `returned_quantity` past `quantity`.
    #[instrument(skip(self, user, request), fields(company_id = %user.company_id))]
    pub async fn register_return(
        &self,
        user: &AuthUser,
        loan_id: Uuid,
        request: RegisterReturnRequest,
    ) -> Result<ReturnReceipt, ServiceError> {
        request.validate()?;
        let company_id = user.company_id;
        let quantity = request.quantity;

        let txn = self.db.begin().await?;
        let loan = find_loan(&txn, company_id, loan_id).await?;
        if quantity > loan.remaining_quantity() {
            return Err(ServiceError::Conflict(format!(
                "Quantidade devolvida ({}) excede o saldo do comodato ({})",
                quantity,
                loan.remaining_quantity()
            )));
        }

        let updated = equipment_loan::Entity::update_many()
            .col_expr(
                equipment_loan::Column::ReturnedQuantity,
                Expr::col(equipment_loan::Column::ReturnedQuantity).add(quantity),
            )
            .filter(equipment_loan::Column::Id.eq(loan.id))
            .filter(equipment_loan::Column::CompanyId.eq(company_id))
            .filter(
                Expr::col(equipment_loan::Column::ReturnedQuantity)
                    .lte(Expr::col(equipment_loan::Column::Quantity).sub(quantity)),
            )
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            warn!(loan_id = %loan.id, quantity, "concurrent return exceeded loan balance");
            return Err(ServiceError::Conflict(
                "Saldo do comodato alterado por outra devolução; tente novamente".into(),
            ));
        }

        let refreshed = find_loan(&txn, company_id, loan.id).await?;
        let status = LoanStatus::for_quantities(refreshed.quantity, refreshed.returned_quantity);
        let mut model: equipment_loan::ActiveModel = refreshed.into();
        model.status = Set(status.to_string());
        let refreshed = model.update(&txn).await?;

        return_stock(&txn, company_id, refreshed.product_id, quantity).await?;

        let equipment_return = equipment_return::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            loan_id: Set(refreshed.id),
            quantity: Set(quantity),
            return_date: Set(request.return_date.unwrap_or_else(today)),
            condition: Set(clean(request.condition)),
            notes: Set(clean(request.notes)),
            created_by: Set(user.user_id),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(
            loan_id = %refreshed.id,
            returned = quantity,
            remaining = refreshed.remaining_quantity(),
            status = %status,
            "equipment return registered"
        );

        Ok(ReturnReceipt {
            loan: refreshed.into(),
            equipment_return,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_returns(
        &self,
        company_id: Uuid,
        loan_id: Uuid,
    ) -> Result<Vec<equipment_return::Model>, ServiceError> {
        find_loan(&*self.db, company_id, loan_id).await?;
        Ok(equipment_return::Entity::find()
            .filter(equipment_return::Column::CompanyId.eq(company_id))
            .filter(equipment_return::Column::LoanId.eq(loan_id))
            .order_by_asc(equipment_return::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}

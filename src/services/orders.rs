use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
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
use super::financial::{overdue_boletos, today, OverdueSummary};
use super::products::{find_product, return_stock, take_stock};
use super::{clean, paginate, Page, PageRequest};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::financial_record::{self, FinancialStatus, RecordType};
use crate::entities::order::{self, OrderStatus};
use crate::entities::order_item;
use crate::entities::payment_method::PaymentKind;
use crate::errors::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Defaults to the product's current price
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 1))]
    #[validate]
    pub items: Vec<OrderItemInput>,
    pub discount: Option<Decimal>,
    pub payment_method: Option<PaymentKind>,
    /// Due date of the generated receivable; defaults to today
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Admins may place orders for customers with overdue boletos
    #[serde(default)]
    pub override_overdue: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
}

/// Order header with its items.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

fn order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("PED-{}-{}", Utc::now().format("%Y%m%d"), &suffix[..6].to_uppercase())
}

pub(crate) async fn find_order<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    order_id: Uuid,
) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id)
        .filter(order::Column::CompanyId.eq(company_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Pedido {} não encontrado", order_id)))
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn find(&self, company_id: Uuid, id: Uuid) -> Result<order::Model, ServiceError> {
        find_order(&*self.db, company_id, id).await
    }

    async fn items_of(&self, order_id: Uuid) -> Result<Vec<order_item::Model>, ServiceError> {
        Ok(order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?)
    }

    /// Creates an order, its items, the stock movements and the receivable
    /// in one transaction. Customers with overdue boletos are blocked unless
    /// an admin overrides.
    #[instrument(skip(self, user, request), fields(company_id = %user.company_id, customer_id = %request.customer_id))]
    pub async fn create(
        &self,
        user: &AuthUser,
        request: CreateOrderRequest,
    ) -> Result<OrderDetails, ServiceError> {
        request.validate()?;
        let company_id = user.company_id;
        let discount = request.discount.unwrap_or(Decimal::ZERO);
        if discount.is_sign_negative() {
            return Err(ServiceError::ValidationError("Desconto não pode ser negativo".into()));
        }

        let txn = self.db.begin().await?;

        let customer = find_customer(&txn, company_id, request.customer_id).await?;
        if !customer.active {
            return Err(ServiceError::InvalidOperation(format!(
                "Cliente {} está inativo",
                customer.name
            )));
        }

        let today = today();
        let summary = OverdueSummary::from_records(
            customer.id,
            overdue_boletos(&txn, company_id, customer.id, today).await?,
        );
        let mut overdue_override_by = None;
        if summary.is_blocking() {
            if !request.override_overdue {
                info!(
                    overdue_count = summary.overdue_count,
                    overdue_total = %summary.overdue_total,
                    "order blocked by overdue boletos"
                );
                return Err(ServiceError::OverdueBlocked {
                    count: summary.overdue_count,
                    total: summary.overdue_total,
                });
            }
            if !user.is_admin() {
                return Err(ServiceError::Forbidden(
                    "Somente administradores podem liberar pedidos de clientes inadimplentes".into(),
                ));
            }
            warn!(user_id = %user.user_id, overdue_count = summary.overdue_count, "overdue block overridden");
            overdue_override_by = Some(user.user_id);
        }

        let order_id = Uuid::new_v4();
        let mut items = Vec::with_capacity(request.items.len());
        let mut subtotal = Decimal::ZERO;
        for input in &request.items {
            let product = find_product(&txn, company_id, input.product_id).await?;
            if !product.active {
                return Err(ServiceError::InvalidOperation(format!(
                    "Produto {} está inativo",
                    product.sku
                )));
            }
            let unit_price = input.unit_price.unwrap_or(product.price);
            if unit_price.is_sign_negative() {
                return Err(ServiceError::ValidationError("Preço unitário negativo".into()));
            }
            take_stock(&txn, &product, input.quantity).await?;

            let total_price = unit_price * Decimal::from(input.quantity);
            subtotal += total_price;
            items.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                company_id: Set(company_id),
                product_id: Set(product.id),
                quantity: Set(input.quantity),
                unit_price: Set(unit_price),
                total_price: Set(total_price),
            });
        }

        let total_amount = subtotal - discount;
        if total_amount.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "Desconto maior que o subtotal do pedido".into(),
            ));
        }

        let payment_method = request.payment_method.map(|m| m.to_string());
        let created = order::ActiveModel {
            id: Set(order_id),
            company_id: Set(company_id),
            customer_id: Set(customer.id),
            order_number: Set(order_number()),
            status: Set(OrderStatus::Pending.to_string()),
            subtotal: Set(subtotal),
            discount: Set(discount),
            total_amount: Set(total_amount),
            payment_method: Set(payment_method.clone()),
            notes: Set(clean(request.notes)),
            overdue_override_by: Set(overdue_override_by),
            created_by: Set(user.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut saved_items = Vec::with_capacity(items.len());
        for item in items {
            saved_items.push(item.insert(&txn).await?);
        }

        if total_amount > Decimal::ZERO {
            financial_record::ActiveModel {
                id: Set(Uuid::new_v4()),
                company_id: Set(company_id),
                record_type: Set(RecordType::Receivable.to_string()),
                customer_id: Set(Some(customer.id)),
                supplier_id: Set(None),
                order_id: Set(Some(order_id)),
                description: Set(format!("Pedido {}", created.order_number)),
                amount: Set(total_amount),
                total_payed: Set(Decimal::ZERO),
                due_date: Set(request.due_date.unwrap_or(today)),
                payment_date: Set(None),
                status: Set(FinancialStatus::Pending.to_string()),
                payment_method: Set(payment_method),
                asaas_payment_id: Set(None),
                boleto_url: Set(None),
                invoice_url: Set(None),
                mercadopago_payment_id: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(
            order_id = %created.id,
            order_number = %created.order_number,
            total = %created.total_amount,
            "order created"
        );
        Ok(OrderDetails {
            order: created,
            items: saved_items,
        })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, company_id: Uuid, id: Uuid) -> Result<OrderDetails, ServiceError> {
        let order = self.find(company_id, id).await?;
        let items = self.items_of(order.id).await?;
        Ok(OrderDetails { order, items })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company_id: Uuid,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<Page<order::Model>, ServiceError> {
        let mut query = order::Entity::find()
            .filter(order::Column::CompanyId.eq(company_id))
            .order_by_desc(order::Column::CreatedAt);
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer_id));
        }
        Ok(paginate(&*self.db, query, page).await?)
    }

    /// Moves an order along `pending -> confirmed -> delivered`; cancelling
    /// restocks the items and cancels the open receivables.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        company_id: Uuid,
        id: Uuid,
        next: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = order::Entity::find_by_id(id)
            .filter(order::Column::CompanyId.eq(company_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Pedido {} não encontrado", id)))?;
        let current: OrderStatus = existing.status.parse().map_err(|_| {
            ServiceError::InternalError(format!("unknown order status {}", existing.status))
        })?;

        if !current.can_transition_to(next) {
            return Err(ServiceError::InvalidOperation(format!(
                "Transição de {} para {} não permitida",
                current, next
            )));
        }

        if next == OrderStatus::Cancelled {
            let items = order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(existing.id))
                .all(&txn)
                .await?;
            for item in &items {
                return_stock(&txn, company_id, item.product_id, item.quantity).await?;
            }
            let cancelled = financial_record::Entity::update_many()
                .col_expr(
                    financial_record::Column::Status,
                    Expr::value(FinancialStatus::Cancelled.to_string()),
                )
                .col_expr(financial_record::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(financial_record::Column::CompanyId.eq(company_id))
                .filter(financial_record::Column::OrderId.eq(existing.id))
                .filter(financial_record::Column::Status.is_in([
                    FinancialStatus::Pending.to_string(),
                    FinancialStatus::Overdue.to_string(),
                ]))
                .exec(&txn)
                .await?;
            info!(
                order_id = %existing.id,
                restocked_items = items.len(),
                cancelled_receivables = cancelled.rows_affected,
                "order cancelled"
            );
        }

        let mut model: order::ActiveModel = existing.into();
        model.status = Set(next.to_string());
        let updated = model.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Removes a pending order, restocking its items and dropping its open receivable.
    #[instrument(skip(self))]
    pub async fn delete(&self, company_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let existing = order::Entity::find_by_id(id)
            .filter(order::Column::CompanyId.eq(company_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Pedido {} não encontrado", id)))?;

        if existing.status != OrderStatus::Pending.to_string() {
            return Err(ServiceError::InvalidOperation(
                "Somente pedidos pendentes podem ser excluídos".into(),
            ));
        }

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(existing.id))
            .all(&txn)
            .await?;
        for item in &items {
            return_stock(&txn, company_id, item.product_id, item.quantity).await?;
        }

        financial_record::Entity::delete_many()
            .filter(financial_record::Column::CompanyId.eq(company_id))
            .filter(financial_record::Column::OrderId.eq(existing.id))
            .filter(financial_record::Column::Status.is_in([
                FinancialStatus::Pending.to_string(),
                FinancialStatus::Overdue.to_string(),
            ]))
            .exec(&txn)
            .await?;
        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(existing.id))
            .exec(&txn)
            .await?;
        order::Entity::delete_by_id(existing.id).exec(&txn).await?;

        txn.commit().await?;
        info!(order_id = %id, "pending order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_are_prefixed_and_dated() {
        let number = order_number();
        assert!(number.starts_with("PED-"));
        assert_eq!(number.len(), "PED-20250101-ABCDEF".len());
    }

    #[test]
    fn empty_item_list_is_invalid() {
        let request = CreateOrderRequest {
            customer_id: Uuid::new_v4(),
            items: vec![],
            discount: None,
            payment_method: None,
            due_date: None,
            notes: None,
            override_overdue: false,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn zero_quantity_item_is_invalid() {
        let request = CreateOrderRequest {
            customer_id: Uuid::new_v4(),
            items: vec![OrderItemInput {
                product_id: Uuid::new_v4(),
                quantity: 0,
                unit_price: None,
            }],
            discount: None,
            payment_method: Some(PaymentKind::Boleto),
            due_date: None,
            notes: None,
            override_overdue: false,
        };
        assert!(request.validate().is_err());
    }
}

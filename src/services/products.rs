use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{clean, clean_digits, like_pattern, paginate, Page, PageRequest};
use crate::db::DbPool;
use crate::entities::{order_item, product, supplier};
use crate::errors::ServiceError;

fn validate_ncm(value: &str) -> Result<(), ValidationError> {
    let digits = crate::documents::only_digits(value);
    if value.trim().is_empty() || digits.len() == 8 {
        Ok(())
    } else {
        Err(ValidationError::new("ncm"))
    }
}

fn validate_cfop(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || crate::documents::only_digits(value).len() == 4 {
        Ok(())
    } else {
        Err(ValidationError::new("cfop"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Commercial unit (UN, CX, FD, L)
    pub unit: Option<String>,
    #[validate(custom = "validate_ncm")]
    pub ncm: Option<String>,
    #[validate(custom = "validate_cfop")]
    pub cfop: Option<String>,
    pub price: Decimal,
    pub cost_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i32>,
    pub supplier_id: Option<Uuid>,
    pub is_equipment: Option<bool>,
    pub active: Option<bool>,
}

impl ProductInput {
    fn check_prices(&self) -> Result<(), ServiceError> {
        if self.price.is_sign_negative() || self.cost_price.is_some_and(|c| c.is_sign_negative()) {
            return Err(ServiceError::ValidationError(
                "Preços não podem ser negativos".into(),
            ));
        }
        Ok(())
    }

    fn apply(self, model: &mut product::ActiveModel) {
        model.sku = Set(self.sku.trim().to_uppercase());
        model.name = Set(self.name.trim().to_string());
        model.description = Set(clean(self.description));
        model.category = Set(clean(self.category));
        model.unit = Set(clean(self.unit)
            .map(|u| u.to_uppercase())
            .unwrap_or_else(|| "UN".to_string()));
        model.ncm = Set(clean_digits(self.ncm));
        model.cfop = Set(clean_digits(self.cfop));
        model.price = Set(self.price);
        model.cost_price = Set(self.cost_price);
        model.supplier_id = Set(self.supplier_id);
        if let Some(stock) = self.stock_quantity {
            model.stock_quantity = Set(stock);
        }
        if let Some(min) = self.min_stock {
            model.min_stock = Set(min);
        }
        if let Some(is_equipment) = self.is_equipment {
            model.is_equipment = Set(is_equipment);
        }
        if let Some(active) = self.active {
            model.active = Set(active);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub is_equipment: Option<bool>,
    pub active: Option<bool>,
}

pub(crate) async fn find_product<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    product_id: Uuid,
) -> Result<product::Model, ServiceError> {
    product::Entity::find_by_id(product_id)
        .filter(product::Column::CompanyId.eq(company_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Produto {} não encontrado", product_id)))
}

/// Takes `quantity` units out of stock only when enough are on hand.
pub(crate) async fn take_stock<C: ConnectionTrait>(
    conn: &C,
    product: &product::Model,
    quantity: i32,
) -> Result<(), ServiceError> {
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::StockQuantity,
            Expr::col(product::Column::StockQuantity).sub(quantity),
        )
        .filter(product::Column::Id.eq(product.id))
        .filter(product::Column::CompanyId.eq(product.company_id))
        .filter(product::Column::StockQuantity.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        warn!(product_id = %product.id, requested = quantity, "insufficient stock");
        return Err(ServiceError::InsufficientStock(format!(
            "{} ({}): solicitado {}, disponível {}",
            product.name, product.sku, quantity, product.stock_quantity
        )));
    }
    Ok(())
}

/// Puts `quantity` units back into stock.
pub(crate) async fn return_stock<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    product::Entity::update_many()
        .col_expr(
            product::Column::StockQuantity,
            Expr::col(product::Column::StockQuantity).add(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::CompanyId.eq(company_id))
        .exec(conn)
        .await?;
    Ok(())
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn ensure_sku_free(
        &self,
        company_id: Uuid,
        sku: &str,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = product::Entity::find()
            .filter(product::Column::CompanyId.eq(company_id))
            .filter(product::Column::Sku.eq(sku.trim().to_uppercase()));
        if let Some(id) = except {
            query = query.filter(product::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::Conflict(format!("SKU {} já cadastrado", sku.trim())));
        }
        Ok(())
    }

    async fn ensure_supplier(&self, company_id: Uuid, supplier_id: Option<Uuid>) -> Result<(), ServiceError> {
        if let Some(id) = supplier_id {
            supplier::Entity::find_by_id(id)
                .filter(supplier::Column::CompanyId.eq(company_id))
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Fornecedor {} não encontrado", id)))?;
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create(
        &self,
        company_id: Uuid,
        input: ProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        input.check_prices()?;
        self.ensure_sku_free(company_id, &input.sku, None).await?;
        self.ensure_supplier(company_id, input.supplier_id).await?;

        let mut model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            stock_quantity: Set(0),
            min_stock: Set(0),
            is_equipment: Set(false),
            active: Set(true),
            ..Default::default()
        };
        input.apply(&mut model);
        let created = model.insert(&*self.db).await?;
        info!(product_id = %created.id, "product created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, company_id: Uuid, id: Uuid) -> Result<product::Model, ServiceError> {
        find_product(&*self.db, company_id, id).await
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company_id: Uuid,
        filter: ProductFilter,
        page: PageRequest,
    ) -> Result<Page<product::Model>, ServiceError> {
        let mut query = product::Entity::find()
            .filter(product::Column::CompanyId.eq(company_id))
            .order_by_asc(product::Column::Name);
        if let Some(term) = clean(filter.search) {
            let pattern = like_pattern(&term);
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.like(pattern.clone()))
                    .add(product::Column::Sku.like(pattern.to_uppercase())),
            );
        }
        if let Some(category) = clean(filter.category) {
            query = query.filter(product::Column::Category.eq(category));
        }
        if let Some(is_equipment) = filter.is_equipment {
            query = query.filter(product::Column::IsEquipment.eq(is_equipment));
        }
        if let Some(active) = filter.active {
            query = query.filter(product::Column::Active.eq(active));
        }
        Ok(paginate(&*self.db, query, page).await?)
    }

    /// Active products at or below their minimum stock.
    #[instrument(skip(self))]
    pub async fn low_stock(&self, company_id: Uuid) -> Result<Vec<product::Model>, ServiceError> {
        Ok(product::Entity::find()
            .filter(product::Column::CompanyId.eq(company_id))
            .filter(product::Column::Active.eq(true))
            .filter(Expr::col(product::Column::StockQuantity).lte(Expr::col(product::Column::MinStock)))
            .order_by_asc(product::Column::StockQuantity)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        company_id: Uuid,
        id: Uuid,
        input: ProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        input.check_prices()?;
        let existing = find_product(&*self.db, company_id, id).await?;
        self.ensure_sku_free(company_id, &input.sku, Some(id)).await?;
        self.ensure_supplier(company_id, input.supplier_id).await?;

        let mut model: product::ActiveModel = existing.into();
        input.apply(&mut model);
        Ok(model.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, company_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let existing = find_product(&*self.db, company_id, id).await?;
        let sold = order_item::Entity::find()
            .filter(order_item::Column::CompanyId.eq(company_id))
            .filter(order_item::Column::ProductId.eq(id))
            .count(&*self.db)
            .await?;
        if sold > 0 {
            return Err(ServiceError::Conflict(
                "Produto já utilizado em pedidos; desative-o em vez de excluir".into(),
            ));
        }
        product::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fiscal_codes_are_checked_by_length() {
        let mut input = ProductInput {
            sku: "HEIN-600".into(),
            name: "Heineken 600ml".into(),
            price: dec!(12.90),
            ncm: Some("2203.00.00".into()),
            cfop: Some("5102".into()),
            ..Default::default()
        };
        assert!(input.validate().is_ok());

        input.ncm = Some("2203".into());
        input.cfop = Some("51020".into());
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("ncm"));
        assert!(errors.field_errors().contains_key("cfop"));
    }

    #[test]
    fn negative_price_is_rejected() {
        let input = ProductInput {
            sku: "X".into(),
            name: "X".into(),
            price: dec!(-1),
            ..Default::default()
        };
        assert!(input.check_prices().is_err());
    }
}

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{clean, clean_digits, clean_email, like_pattern, paginate, Page, PageRequest};
use crate::db::DbPool;
use crate::documents::validate_document_field;
use crate::entities::{customer, equipment_loan, order};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub trade_name: Option<String>,
    /// CPF or CNPJ, formatted or digits only
    #[validate(custom = "validate_document_field")]
    pub document: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub address_number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    #[validate(length(equal = 2))]
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub credit_limit: Option<Decimal>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

impl CustomerInput {
    fn apply(self, model: &mut customer::ActiveModel) {
        model.name = Set(self.name.trim().to_string());
        model.trade_name = Set(clean(self.trade_name));
        model.document = Set(clean_digits(self.document));
        model.email = Set(clean_email(self.email));
        model.phone = Set(clean(self.phone));
        model.address = Set(clean(self.address));
        model.address_number = Set(clean(self.address_number));
        model.complement = Set(clean(self.complement));
        model.neighborhood = Set(clean(self.neighborhood));
        model.city = Set(clean(self.city));
        model.state = Set(clean(self.state).map(|s| s.to_uppercase()));
        model.postal_code = Set(clean_digits(self.postal_code));
        model.credit_limit = Set(self.credit_limit);
        model.notes = Set(clean(self.notes));
        if let Some(active) = self.active {
            model.active = Set(active);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerFilter {
    /// Matches name, trade name, document or e-mail
    pub search: Option<String>,
    pub active: Option<bool>,
}

/// Loads a customer inside the tenant; other tenants' rows are "not found".
pub(crate) async fn find_customer<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    customer_id: Uuid,
) -> Result<customer::Model, ServiceError> {
    customer::Entity::find_by_id(customer_id)
        .filter(customer::Column::CompanyId.eq(company_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Cliente {} não encontrado", customer_id)))
}

#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        company_id: Uuid,
        input: CustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        input.validate()?;
        let mut model = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            active: Set(true),
            asaas_customer_id: Set(None),
            ..Default::default()
        };
        input.apply(&mut model);
        let created = model.insert(&*self.db).await?;
        info!(customer_id = %created.id, "customer created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, company_id: Uuid, id: Uuid) -> Result<customer::Model, ServiceError> {
        find_customer(&*self.db, company_id, id).await
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company_id: Uuid,
        filter: CustomerFilter,
        page: PageRequest,
    ) -> Result<Page<customer::Model>, ServiceError> {
        let mut query = customer::Entity::find()
            .filter(customer::Column::CompanyId.eq(company_id))
            .order_by_asc(customer::Column::Name);

        if let Some(term) = clean(filter.search) {
            let pattern = like_pattern(&term);
            let digits = crate::documents::only_digits(&term);
            let mut any = Condition::any()
                .add(customer::Column::Name.like(pattern.clone()))
                .add(customer::Column::TradeName.like(pattern.clone()))
                .add(customer::Column::Email.like(pattern.to_lowercase()));
            if !digits.is_empty() {
                any = any.add(customer::Column::Document.like(like_pattern(&digits)));
            }
            query = query.filter(any);
        }
        if let Some(active) = filter.active {
            query = query.filter(customer::Column::Active.eq(active));
        }

        Ok(paginate(&*self.db, query, page).await?)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        company_id: Uuid,
        id: Uuid,
        input: CustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        input.validate()?;
        let mut model: customer::ActiveModel = find_customer(&*self.db, company_id, id).await?.into();
        input.apply(&mut model);
        Ok(model.update(&*self.db).await?)
    }

    /// Deletes a customer without history; customers with orders or loans
    /// must be deactivated instead.
    #[instrument(skip(self))]
    pub async fn delete(&self, company_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let existing = find_customer(&*self.db, company_id, id).await?;

        let orders = order::Entity::find()
            .filter(order::Column::CompanyId.eq(company_id))
            .filter(order::Column::CustomerId.eq(id))
            .count(&*self.db)
            .await?;
        let loans = equipment_loan::Entity::find()
            .filter(equipment_loan::Column::CompanyId.eq(company_id))
            .filter(equipment_loan::Column::CustomerId.eq(id))
            .count(&*self.db)
            .await?;
        if orders > 0 || loans > 0 {
            return Err(ServiceError::Conflict(
                "Cliente possui pedidos ou comodatos; desative-o em vez de excluir".into(),
            ));
        }

        customer::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        info!(customer_id = %id, "customer deleted");
        Ok(())
    }

    /// Stores the Asaas customer id after a sync.
    pub(crate) async fn set_asaas_id(
        &self,
        existing: customer::Model,
        asaas_customer_id: &str,
    ) -> Result<customer::Model, ServiceError> {
        if existing.asaas_customer_id.as_deref() == Some(asaas_customer_id) {
            return Ok(existing);
        }
        let mut model: customer::ActiveModel = existing.into();
        model.asaas_customer_id = Set(Some(asaas_customer_id.to_string()));
        Ok(model.update(&*self.db).await?)
    }
}

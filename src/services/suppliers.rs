use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
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
use crate::entities::{product, supplier};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct SupplierInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(custom = "validate_document_field")]
    pub document: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub contact_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    #[validate(length(equal = 2))]
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

impl SupplierInput {
    fn apply(self, model: &mut supplier::ActiveModel) {
        model.name = Set(self.name.trim().to_string());
        model.document = Set(clean_digits(self.document));
        model.email = Set(clean_email(self.email));
        model.phone = Set(clean(self.phone));
        model.contact_name = Set(clean(self.contact_name));
        model.address = Set(clean(self.address));
        model.city = Set(clean(self.city));
        model.state = Set(clean(self.state).map(|s| s.to_uppercase()));
        model.postal_code = Set(clean_digits(self.postal_code));
        model.notes = Set(clean(self.notes));
        if let Some(active) = self.active {
            model.active = Set(active);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierFilter {
    pub search: Option<String>,
    pub active: Option<bool>,
}

#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DbPool>,
}

impl SupplierService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn find(&self, company_id: Uuid, id: Uuid) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(id)
            .filter(supplier::Column::CompanyId.eq(company_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Fornecedor {} não encontrado", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        company_id: Uuid,
        input: SupplierInput,
    ) -> Result<supplier::Model, ServiceError> {
        input.validate()?;
        let mut model = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            active: Set(true),
            ..Default::default()
        };
        input.apply(&mut model);
        let created = model.insert(&*self.db).await?;
        info!(supplier_id = %created.id, "supplier created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, company_id: Uuid, id: Uuid) -> Result<supplier::Model, ServiceError> {
        self.find(company_id, id).await
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company_id: Uuid,
        filter: SupplierFilter,
        page: PageRequest,
    ) -> Result<Page<supplier::Model>, ServiceError> {
        let mut query = supplier::Entity::find()
            .filter(supplier::Column::CompanyId.eq(company_id))
            .order_by_asc(supplier::Column::Name);
        if let Some(term) = clean(filter.search) {
            let pattern = like_pattern(&term);
            query = query.filter(
                Condition::any()
                    .add(supplier::Column::Name.like(pattern.clone()))
                    .add(supplier::Column::ContactName.like(pattern.clone()))
                    .add(supplier::Column::Email.like(pattern.to_lowercase())),
            );
        }
        if let Some(active) = filter.active {
            query = query.filter(supplier::Column::Active.eq(active));
        }
        Ok(paginate(&*self.db, query, page).await?)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        company_id: Uuid,
        id: Uuid,
        input: SupplierInput,
    ) -> Result<supplier::Model, ServiceError> {
        input.validate()?;
        let mut model: supplier::ActiveModel = self.find(company_id, id).await?.into();
        input.apply(&mut model);
        Ok(model.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, company_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find(company_id, id).await?;
        let linked = product::Entity::find()
            .filter(product::Column::CompanyId.eq(company_id))
            .filter(product::Column::SupplierId.eq(id))
            .count(&*self.db)
            .await?;
        if linked > 0 {
            return Err(ServiceError::Conflict(format!(
                "Fornecedor possui {} produto(s) vinculado(s)",
                linked
            )));
        }
        supplier::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}

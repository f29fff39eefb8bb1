use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::payment_method::{self, PaymentKind};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PaymentMethodInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub kind: PaymentKind,
    pub active: Option<bool>,
}

#[derive(Clone)]
pub struct PaymentMethodService {
    db: Arc<DbPool>,
}

impl PaymentMethodService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn find(&self, company_id: Uuid, id: Uuid) -> Result<payment_method::Model, ServiceError> {
        payment_method::Entity::find_by_id(id)
            .filter(payment_method::Column::CompanyId.eq(company_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Forma de pagamento {} não encontrada", id)))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<payment_method::Model>, ServiceError> {
        let mut query = payment_method::Entity::find()
            .filter(payment_method::Column::CompanyId.eq(company_id))
            .order_by_asc(payment_method::Column::Name);
        if active_only {
            query = query.filter(payment_method::Column::Active.eq(true));
        }
        Ok(query.all(&*self.db).await?)
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        company_id: Uuid,
        input: PaymentMethodInput,
    ) -> Result<payment_method::Model, ServiceError> {
        input.validate()?;
        Ok(payment_method::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            name: Set(input.name.trim().to_string()),
            kind: Set(input.kind.to_string()),
            active: Set(input.active.unwrap_or(true)),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&*self.db)
        .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        company_id: Uuid,
        id: Uuid,
        input: PaymentMethodInput,
    ) -> Result<payment_method::Model, ServiceError> {
        input.validate()?;
        let mut model: payment_method::ActiveModel = self.find(company_id, id).await?.into();
        model.name = Set(input.name.trim().to_string());
        model.kind = Set(input.kind.to_string());
        if let Some(active) = input.active {
            model.active = Set(active);
        }
        Ok(model.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, company_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find(company_id, id).await?;
        payment_method::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}

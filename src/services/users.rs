use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::hash_password;
use crate::db::DbPool;
use crate::entities::user::{self, Role};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

/// User without the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserView {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}

impl From<user::Model> for UserView {
    fn from(model: user::Model) -> Self {
        let role = model.role();
        Self {
            id: model.id,
            company_id: model.company_id,
            name: model.name,
            email: model.email,
            role,
            active: model.active,
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, company_id: Uuid) -> Result<Vec<UserView>, ServiceError> {
        let users = user::Entity::find()
            .filter(user::Column::CompanyId.eq(company_id))
            .order_by_asc(user::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create(
        &self,
        company_id: Uuid,
        request: CreateUserRequest,
    ) -> Result<UserView, ServiceError> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();

        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?
            .is_some();
        if taken {
            return Err(ServiceError::Conflict(format!("E-mail {} já cadastrado", email)));
        }

        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            name: Set(request.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(hash_password(&request.password)?),
            role: Set(request.role.to_string()),
            active: Set(true),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(user_id = %created.id, role = %request.role, "user created");
        Ok(created.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserView, ServiceError> {
        request.validate()?;
        let existing = user::Entity::find_by_id(user_id)
            .filter(user::Column::CompanyId.eq(company_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Usuário {} não encontrado", user_id)))?;

        let mut model: user::ActiveModel = existing.into();
        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(role) = request.role {
            model.role = Set(role.to_string());
        }
        if let Some(active) = request.active {
            model.active = Set(active);
        }
        Ok(model.update(&*self.db).await?.into())
    }
}

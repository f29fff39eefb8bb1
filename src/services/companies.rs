use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{clean, clean_digits, clean_email};
use crate::db::DbPool;
use crate::documents::is_valid_cnpj;
use crate::entities::company;
use crate::errors::ServiceError;

fn validate_cnpj_field(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() || is_valid_cnpj(value) {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("cnpj");
        err.message = Some("CNPJ inválido".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CompanyInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub trade_name: Option<String>,
    #[validate(custom = "validate_cnpj_field")]
    pub cnpj: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub address_number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    #[validate(length(equal = 2))]
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub state_registration: Option<String>,
}

impl CompanyInput {
    fn apply(self, model: &mut company::ActiveModel) {
        model.name = Set(self.name.trim().to_string());
        model.trade_name = Set(clean(self.trade_name));
        model.cnpj = Set(clean_digits(self.cnpj));
        model.email = Set(clean_email(self.email));
        model.phone = Set(clean(self.phone));
        model.address = Set(clean(self.address));
        model.address_number = Set(clean(self.address_number));
        model.neighborhood = Set(clean(self.neighborhood));
        model.city = Set(clean(self.city));
        model.state = Set(clean(self.state).map(|s| s.to_uppercase()));
        model.postal_code = Set(clean_digits(self.postal_code));
        model.state_registration = Set(clean(self.state_registration));
    }
}

#[derive(Clone)]
pub struct CompanyService {
    db: Arc<DbPool>,
}

impl CompanyService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Registers a new tenant. Used by the CLI bootstrap.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CompanyInput) -> Result<company::Model, ServiceError> {
        input.validate()?;
        let mut model = company::ActiveModel {
            id: Set(Uuid::new_v4()),
            ..Default::default()
        };
        input.apply(&mut model);
        let created = model.insert(&*self.db).await?;
        info!(company_id = %created.id, "company created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, company_id: Uuid) -> Result<company::Model, ServiceError> {
        company::Entity::find_by_id(company_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Empresa {} não encontrada", company_id)))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        company_id: Uuid,
        input: CompanyInput,
    ) -> Result<company::Model, ServiceError> {
        input.validate()?;
        let mut model: company::ActiveModel = self.get(company_id).await?.into();
        input.apply(&mut model);
        Ok(model.update(&*self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_cnpj_and_state() {
        let input = CompanyInput {
            name: "Distribuidora".into(),
            cnpj: Some("11.222.333/0001-80".into()),
            state: Some("SaoPaulo".into()),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("cnpj"));
        assert!(fields.contains_key("state"));
    }
}

//! Per-company provider credentials and their resolution against the
//! globally configured keys.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::clean;
use crate::config::IntegrationsConfig;
use crate::db::DbPool;
use crate::entities::company_integration::{self, IntegrationEnvironment, Provider};
use crate::errors::ServiceError;
use crate::integrations::{asaas, focus_nfe};

/// Masks all but the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

/// Integration as exposed over the API; secrets are masked.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IntegrationView {
    pub id: Uuid,
    pub provider: String,
    pub environment: String,
    pub api_key: String,
    pub has_webhook_token: bool,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<company_integration::Model> for IntegrationView {
    fn from(model: company_integration::Model) -> Self {
        Self {
            id: model.id,
            provider: model.provider,
            environment: model.environment,
            api_key: mask_secret(&model.api_key),
            has_webhook_token: model.webhook_token.is_some(),
            active: model.active,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpsertIntegrationRequest {
    pub environment: Option<IntegrationEnvironment>,
    #[validate(length(min = 1, max = 512))]
    pub api_key: String,
    #[validate(length(min = 1, max = 255))]
    pub webhook_token: Option<String>,
    pub active: Option<bool>,
}

/// Credentials ready for a provider client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Clone)]
pub struct IntegrationService {
    db: Arc<DbPool>,
    config: Arc<IntegrationsConfig>,
}

impl IntegrationService {
    pub fn new(db: Arc<DbPool>, config: Arc<IntegrationsConfig>) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &IntegrationsConfig {
        &self.config
    }

    #[instrument(skip(self))]
    pub async fn list(&self, company_id: Uuid) -> Result<Vec<IntegrationView>, ServiceError> {
        let rows = company_integration::Entity::find()
            .filter(company_integration::Column::CompanyId.eq(company_id))
            .order_by_asc(company_integration::Column::Provider)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(IntegrationView::from).collect())
    }

    async fn find(
        &self,
        company_id: Uuid,
        provider: Provider,
    ) -> Result<Option<company_integration::Model>, ServiceError> {
        Ok(company_integration::Entity::find()
            .filter(company_integration::Column::CompanyId.eq(company_id))
            .filter(company_integration::Column::Provider.eq(provider.to_string()))
            .one(&*self.db)
            .await?)
    }

    #[instrument(skip(self, request))]
    pub async fn upsert(
        &self,
        company_id: Uuid,
        provider: Provider,
        request: UpsertIntegrationRequest,
    ) -> Result<IntegrationView, ServiceError> {
        request.validate()?;
        let environment = request.environment.unwrap_or(IntegrationEnvironment::Sandbox);
        let webhook_token = clean(request.webhook_token);

        let saved = match self.find(company_id, provider).await? {
            Some(existing) => {
                let mut model: company_integration::ActiveModel = existing.into();
                model.environment = Set(environment.to_string());
                model.api_key = Set(request.api_key.trim().to_string());
                if webhook_token.is_some() {
                    model.webhook_token = Set(webhook_token);
                }
                if let Some(active) = request.active {
                    model.active = Set(active);
                }
                model.update(&*self.db).await?
            }
            None => {
                company_integration::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    company_id: Set(company_id),
                    provider: Set(provider.to_string()),
                    environment: Set(environment.to_string()),
                    api_key: Set(request.api_key.trim().to_string()),
                    webhook_token: Set(webhook_token),
                    active: Set(request.active.unwrap_or(true)),
                    ..Default::default()
                }
                .insert(&*self.db)
                .await?
            }
        };

        info!(%provider, environment = %saved.environment, "integration saved");
        Ok(saved.into())
    }

    fn base_url_for(&self, provider: Provider, environment: IntegrationEnvironment) -> String {
        match (provider, environment) {
            (Provider::Asaas, IntegrationEnvironment::Production) => {
                asaas::PRODUCTION_BASE_URL.to_string()
            }
            (Provider::Asaas, IntegrationEnvironment::Sandbox) => self.config.asaas_base_url.clone(),
            (Provider::FocusNfe, IntegrationEnvironment::Production) => {
                focus_nfe::PRODUCTION_BASE_URL.to_string()
            }
            (Provider::FocusNfe, IntegrationEnvironment::Sandbox) => {
                self.config.focus_nfe_base_url.clone()
            }
            (Provider::Mercadopago, _) => self.config.mercadopago_base_url.clone(),
            (Provider::Sendgrid, _) => self.config.sendgrid_base_url.clone(),
        }
    }

    fn global_key(&self, provider: Provider) -> Option<String> {
        let key = match provider {
            Provider::Asaas => self.config.asaas_api_key.as_ref(),
            Provider::Mercadopago => self.config.mercadopago_access_token.as_ref(),
            Provider::FocusNfe => self.config.focus_nfe_token.as_ref(),
            Provider::Sendgrid => self.config.sendgrid_api_key.as_ref(),
        };
        key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
    }

    /// The company's active integration wins; otherwise the configured key.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        company_id: Uuid,
        provider: Provider,
    ) -> Result<ProviderCredentials, ServiceError> {
        if let Some(integration) = self
            .find(company_id, provider)
            .await?
            .filter(|i| i.active && !i.api_key.trim().is_empty())
        {
            let environment = integration
                .environment
                .parse()
                .unwrap_or(IntegrationEnvironment::Sandbox);
            debug!(%provider, %environment, "using company credentials");
            return Ok(ProviderCredentials {
                api_key: integration.api_key,
                base_url: self.base_url_for(provider, environment),
            });
        }

        let api_key = self.global_key(provider).ok_or_else(|| {
            ServiceError::IntegrationNotConfigured(format!(
                "Integração {} não configurada para esta empresa",
                provider
            ))
        })?;
        Ok(ProviderCredentials {
            api_key,
            base_url: self.base_url_for(provider, IntegrationEnvironment::Sandbox),
        })
    }

    /// Company owning an active Asaas integration with this webhook token.
    pub async fn company_for_asaas_token(&self, token: &str) -> Result<Option<Uuid>, ServiceError> {
        Ok(company_integration::Entity::find()
            .filter(company_integration::Column::Provider.eq(Provider::Asaas.to_string()))
            .filter(company_integration::Column::Active.eq(true))
            .filter(company_integration::Column::WebhookToken.eq(token))
            .one(&*self.db)
            .await?
            .map(|i| i.company_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_keep_only_the_last_four_characters() {
        assert_eq!(mask_secret("$aact_abcdef123456"), "**************3456");
        assert_eq!(mask_secret("short"), "*****");
        assert_eq!(mask_secret(""), "");
    }
}

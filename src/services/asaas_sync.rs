//! Find-or-create of local customers at Asaas.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::customers::CustomerService;
use super::integrations::IntegrationService;
use crate::entities::company_integration::Provider;
use crate::entities::customer;
use crate::errors::ServiceError;
use crate::integrations::asaas::{
    diff_customer, map_to_asaas_customer, AsaasClient, AsaasCustomer, AsaasCustomerPayload,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
    Unchanged,
    Linked,
    Recreated,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SyncResult {
    pub customer_id: Uuid,
    pub asaas_customer_id: String,
    pub action: SyncAction,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SyncCustomerRequest {
    pub customer_id: Uuid,
}

#[derive(Clone)]
pub struct AsaasSyncService {
    http: Client,
    customers: CustomerService,
    integrations: IntegrationService,
}

impl AsaasSyncService {
    pub fn new(http: Client, customers: CustomerService, integrations: IntegrationService) -> Self {
        Self {
            http,
            customers,
            integrations,
        }
    }

    pub async fn client_for(&self, company_id: Uuid) -> Result<AsaasClient, ServiceError> {
        let credentials = self.integrations.resolve(company_id, Provider::Asaas).await?;
        Ok(AsaasClient::new(
            self.http.clone(),
            credentials.base_url,
            credentials.api_key,
        ))
    }

    #[instrument(skip(self))]
    pub async fn sync_customer(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<SyncResult, ServiceError> {
        let customer = self.customers.get(company_id, customer_id).await?;
        let client = self.client_for(company_id).await?;
        self.sync_with(&client, customer).await
    }

    /// Links `customer` to an Asaas customer, creating or updating it as needed.
    pub(crate) async fn sync_with(
        &self,
        client: &AsaasClient,
        customer: customer::Model,
    ) -> Result<SyncResult, ServiceError> {
        let payload = map_to_asaas_customer(&customer);
        if payload.cpf_cnpj.is_none() && payload.email.is_none() {
            return Err(ServiceError::BadRequest(
                "Cliente precisa de CPF/CNPJ ou e-mail para ser sincronizado com o Asaas".into(),
            ));
        }

        let (remote_id, action) = match customer.asaas_customer_id.clone() {
            Some(stored) => self.sync_stored(client, &stored, &payload).await?,
            None => self.sync_unlinked(client, &payload).await?,
        };

        let customer_id = customer.id;
        self.customers.set_asaas_id(customer, &remote_id).await?;
        info!(%customer_id, asaas_customer_id = %remote_id, %action, "customer synced with Asaas");

        Ok(SyncResult {
            customer_id,
            asaas_customer_id: remote_id,
            action,
        })
    }

    async fn sync_stored(
        &self,
        client: &AsaasClient,
        stored: &str,
        payload: &AsaasCustomerPayload,
    ) -> Result<(String, SyncAction), ServiceError> {
        match client.get_customer(stored).await {
            Ok(remote) if !remote.deleted => {
                let action = self.push_changes(client, &remote, payload).await?;
                Ok((remote.id, action))
            }
            Ok(_) => {
                warn!(asaas_customer_id = stored, "stored Asaas customer was deleted, recreating");
                let created = client.create_customer(payload).await?;
                Ok((created.id, SyncAction::Recreated))
            }
            Err(e) if e.is_not_found() => {
                warn!(asaas_customer_id = stored, "stored Asaas customer not found, recreating");
                let created = client.create_customer(payload).await?;
                Ok((created.id, SyncAction::Recreated))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn sync_unlinked(
        &self,
        client: &AsaasClient,
        payload: &AsaasCustomerPayload,
    ) -> Result<(String, SyncAction), ServiceError> {
        let mut existing = None;
        if let Some(document) = &payload.cpf_cnpj {
            existing = client.find_customer_by_document(document).await?;
        }
        if existing.is_none() {
            if let Some(email) = &payload.email {
                existing = client.find_customer_by_email(email).await?;
            }
        }

        match existing {
            Some(remote) => {
                self.push_changes(client, &remote, payload).await?;
                Ok((remote.id, SyncAction::Linked))
            }
            None => {
                let created = client.create_customer(payload).await?;
                Ok((created.id, SyncAction::Created))
            }
        }
    }

    async fn push_changes(
        &self,
        client: &AsaasClient,
        remote: &AsaasCustomer,
        payload: &AsaasCustomerPayload,
    ) -> Result<SyncAction, ServiceError> {
        let update = diff_customer(remote, payload);
        if update.is_empty() {
            return Ok(SyncAction::Unchanged);
        }
        client.update_customer(&remote.id, &update).await?;
        Ok(SyncAction::Updated)
    }
}

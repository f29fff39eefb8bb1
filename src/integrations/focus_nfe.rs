//! Focus NFe client: submission, status polling and cancellation of NF-e.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::{join_url, read_json};
use crate::documents::{document_kind, only_digits, DocumentKind};
use crate::entities::invoice::InvoiceStatus;
use crate::entities::{company, customer, order, order_item, product};
use crate::errors::ServiceError;

pub const PRODUCTION_BASE_URL: &str = "https://api.focusnfe.com.br";

const STATUS_PROCESSING: &str = "processando_autorizacao";
const DEFAULT_CFOP: &str = "5102";

#[derive(Debug, Error)]
pub enum FocusNfeError {
    #[error("Focus NFe request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Focus NFe returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected Focus NFe response: {0}")]
    Decode(String),
}

impl From<FocusNfeError> for ServiceError {
    fn from(err: FocusNfeError) -> Self {
        match err {
            FocusNfeError::Api { message, .. } => {
                ServiceError::ExternalApiError(format!("Focus NFe: {}", message))
            }
            other => ServiceError::ExternalApiError(other.to_string()),
        }
    }
}

/// Status document returned by every `/v2/nfe` endpoint.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct NfeStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_sefaz: Option<String>,
    #[serde(default)]
    pub mensagem_sefaz: Option<String>,
    #[serde(default)]
    pub numero: Option<String>,
    #[serde(default)]
    pub serie: Option<String>,
    #[serde(default)]
    pub chave_nfe: Option<String>,
    #[serde(default)]
    pub caminho_xml_nota_fiscal: Option<String>,
    #[serde(default)]
    pub caminho_danfe: Option<String>,
    #[serde(default)]
    pub codigo: Option<String>,
    #[serde(default)]
    pub mensagem: Option<String>,
}

impl NfeStatus {
    pub fn is_processing(&self) -> bool {
        self.status == STATUS_PROCESSING
    }
}

/// Local view of a provider status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfeOutcome {
    pub status: InvoiceStatus,
    pub number: Option<String>,
    pub series: Option<String>,
    pub access_key: Option<String>,
    pub xml_path: Option<String>,
    pub danfe_path: Option<String>,
    pub error_message: Option<String>,
}

pub fn map_status(status: &NfeStatus) -> NfeOutcome {
    let mut outcome = NfeOutcome {
        status: InvoiceStatus::Processing,
        number: None,
        series: None,
        access_key: None,
        xml_path: None,
        danfe_path: None,
        error_message: None,
    };

    match status.status.as_str() {
        "autorizado" => {
            outcome.status = InvoiceStatus::Authorized;
            outcome.number = status.numero.clone();
            outcome.series = status.serie.clone();
            outcome.access_key = status.chave_nfe.clone();
            outcome.xml_path = status.caminho_xml_nota_fiscal.clone();
            outcome.danfe_path = status.caminho_danfe.clone();
        }
        "erro_autorizacao" | "denegado" => {
            outcome.status = InvoiceStatus::Error;
            outcome.error_message = status
                .mensagem_sefaz
                .clone()
                .or_else(|| status.mensagem.clone())
                .or_else(|| Some(format!("NF-e {}", status.status)));
        }
        "cancelado" => {
            outcome.status = InvoiceStatus::Cancelled;
        }
        _ => {}
    }

    outcome
}

#[derive(Debug, Clone, Serialize)]
pub struct NfePayload {
    pub natureza_operacao: String,
    pub data_emissao: DateTime<Utc>,
    pub tipo_documento: u8,
    pub finalidade_emissao: u8,
    pub presenca_comprador: u8,
    pub modalidade_frete: u8,
    pub cnpj_emitente: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inscricao_estadual_emitente: Option<String>,
    pub nome_destinatario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj_destinatario: Option<String>,
    pub indicador_inscricao_estadual_destinatario: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefone_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logradouro_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bairro_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipio_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uf_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cep_destinatario: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub valor_produtos: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub valor_desconto: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub valor_total: Decimal,
    pub items: Vec<NfeItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NfeItem {
    pub numero_item: u32,
    pub codigo_produto: String,
    pub descricao: String,
    pub cfop: String,
    pub codigo_ncm: String,
    pub unidade_comercial: String,
    pub quantidade_comercial: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub valor_unitario_comercial: Decimal,
    pub unidade_tributavel: String,
    pub quantidade_tributavel: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub valor_unitario_tributavel: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub valor_bruto: Decimal,
    pub icms_origem: u8,
    pub icms_situacao_tributaria: String,
    pub pis_situacao_tributaria: String,
    pub cofins_situacao_tributaria: String,
}

/// Composes the NF-e for an order. Fails when the emitter has no valid CNPJ,
/// the recipient has no document, or a product lacks its NCM code.
pub fn build_payload(
    company: &company::Model,
    customer: &customer::Model,
    order: &order::Model,
    items: &[(order_item::Model, product::Model)],
) -> Result<NfePayload, ServiceError> {
    let cnpj_emitente = company
        .cnpj
        .as_deref()
        .map(only_digits)
        .filter(|c| c.len() == 14)
        .ok_or_else(|| {
            ServiceError::ValidationError("Empresa sem CNPJ cadastrado para emitir NF-e".into())
        })?;

    let document = customer.document.as_deref().map(only_digits).unwrap_or_default();
    let (cpf_destinatario, cnpj_destinatario) = match document_kind(&document) {
        Some(DocumentKind::Cpf) => (Some(document), None),
        Some(DocumentKind::Cnpj) => (None, Some(document)),
        None => {
            return Err(ServiceError::ValidationError(
                "Cliente sem CPF/CNPJ válido para emitir NF-e".into(),
            ))
        }
    };

    if items.is_empty() {
        return Err(ServiceError::ValidationError("Pedido sem itens".into()));
    }

    let missing_ncm: Vec<&str> = items
        .iter()
        .filter(|(_, p)| p.ncm.as_deref().map(str::trim).unwrap_or_default().is_empty())
        .map(|(_, p)| p.sku.as_str())
        .collect();
    if !missing_ncm.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "Produtos sem NCM: {}",
            missing_ncm.join(", ")
        )));
    }

    let nfe_items = items
        .iter()
        .enumerate()
        .map(|(idx, (item, product))| NfeItem {
            numero_item: idx as u32 + 1,
            codigo_produto: product.sku.clone(),
            descricao: product.name.clone(),
            cfop: product
                .cfop
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CFOP.to_string()),
            codigo_ncm: product.ncm.clone().unwrap_or_default(),
            unidade_comercial: product.unit.clone(),
            quantidade_comercial: item.quantity,
            valor_unitario_comercial: item.unit_price,
            unidade_tributavel: product.unit.clone(),
            quantidade_tributavel: item.quantity,
            valor_unitario_tributavel: item.unit_price,
            valor_bruto: item.total_price,
            icms_origem: 0,
            icms_situacao_tributaria: "102".into(),
            pis_situacao_tributaria: "07".into(),
            cofins_situacao_tributaria: "07".into(),
        })
        .collect();

    let indicador_ie = if cnpj_destinatario.is_some() { 2 } else { 9 };

    Ok(NfePayload {
        natureza_operacao: "Venda de mercadoria".into(),
        data_emissao: Utc::now(),
        tipo_documento: 1,
        finalidade_emissao: 1,
        presenca_comprador: 1,
        modalidade_frete: 9,
        cnpj_emitente,
        inscricao_estadual_emitente: company.state_registration.clone(),
        nome_destinatario: customer.name.clone(),
        cpf_destinatario,
        cnpj_destinatario,
        indicador_inscricao_estadual_destinatario: indicador_ie,
        email_destinatario: customer.email.clone(),
        telefone_destinatario: customer.phone.as_deref().map(only_digits),
        logradouro_destinatario: customer.address.clone(),
        numero_destinatario: customer.address_number.clone(),
        bairro_destinatario: customer.neighborhood.clone(),
        municipio_destinatario: customer.city.clone(),
        uf_destinatario: customer.state.clone(),
        cep_destinatario: customer.postal_code.as_deref().map(only_digits),
        valor_produtos: order.subtotal,
        valor_desconto: order.discount,
        valor_total: order.total_amount,
        items: nfe_items,
    })
}

#[derive(Debug, Serialize)]
struct CancelRequest<'a> {
    justificativa: &'a str,
}

pub struct FocusNfeClient {
    http: Client,
    base_url: String,
    token: String,
}

impl FocusNfeClient {
    pub fn new(http: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Turns a provider-relative file path into an absolute URL.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            join_url(&self.base_url, path)
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        // token as user, empty password
        let credentials = STANDARD.encode(format!("{}:", self.token));
        self.http
            .request(method, join_url(&self.base_url, path))
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", credentials))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<NfeStatus, FocusNfeError> {
        let response = builder.send().await?;
        match read_json::<NfeStatus>(response).await {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(e)) => Err(FocusNfeError::Decode(e.to_string())),
            Err((status, body)) => {
                let message = serde_json::from_str::<NfeStatus>(&body)
                    .ok()
                    .and_then(|s| s.mensagem)
                    .unwrap_or(body);
                warn!(status, %message, "Focus NFe request rejected");
                Err(FocusNfeError::Api { status, message })
            }
        }
    }

    #[instrument(skip(self, payload))]
    pub async fn submit(&self, reference: &str, payload: &NfePayload) -> Result<NfeStatus, FocusNfeError> {
        self.send(
            self.request(reqwest::Method::POST, "v2/nfe")
                .query(&[("ref", reference)])
                .json(payload),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn status(&self, reference: &str) -> Result<NfeStatus, FocusNfeError> {
        self.send(self.request(reqwest::Method::GET, &format!("v2/nfe/{}", reference)))
            .await
    }

    #[instrument(skip(self, justification))]
    pub async fn cancel(&self, reference: &str, justification: &str) -> Result<NfeStatus, FocusNfeError> {
        self.send(
            self.request(reqwest::Method::DELETE, &format!("v2/nfe/{}", reference))
                .json(&CancelRequest {
                    justificativa: justification,
                }),
        )
        .await
    }

    /// Polls a fixed number of times while the provider is still authorizing.
    #[instrument(skip(self))]
    pub async fn poll(
        &self,
        reference: &str,
        attempts: u32,
        interval: Duration,
    ) -> Result<NfeStatus, FocusNfeError> {
        let mut current = self.status(reference).await?;
        let mut remaining = attempts.saturating_sub(1);
        while current.is_processing() && remaining > 0 {
            tokio::time::sleep(interval).await;
            current = self.status(reference).await?;
            remaining -= 1;
        }
        if current.is_processing() {
            info!(reference, "NF-e still processing after polling");
        } else {
            debug!(reference, status = %current.status, "NF-e settled");
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn authorized_status_carries_fiscal_data() {
        let outcome = map_status(&NfeStatus {
            status: "autorizado".into(),
            numero: Some("42".into()),
            serie: Some("1".into()),
            chave_nfe: Some("NFe3525".into()),
            caminho_xml_nota_fiscal: Some("/arquivos/nfe.xml".into()),
            caminho_danfe: Some("/arquivos/danfe.pdf".into()),
            ..Default::default()
        });
        assert_eq!(outcome.status, InvoiceStatus::Authorized);
        assert_eq!(outcome.number.as_deref(), Some("42"));
        assert_eq!(outcome.danfe_path.as_deref(), Some("/arquivos/danfe.pdf"));
    }

    #[test]
    fn rejection_and_denial_map_to_error() {
        for status in ["erro_autorizacao", "denegado"] {
            let outcome = map_status(&NfeStatus {
                status: status.into(),
                mensagem_sefaz: Some("Rejeicao: CNPJ do destinatario invalido".into()),
                ..Default::default()
            });
            assert_eq!(outcome.status, InvoiceStatus::Error);
            assert!(outcome.error_message.unwrap().contains("Rejeicao"));
        }
        assert_eq!(
            map_status(&NfeStatus { status: "cancelado".into(), ..Default::default() }).status,
            InvoiceStatus::Cancelled
        );
        assert_eq!(
            map_status(&NfeStatus { status: STATUS_PROCESSING.into(), ..Default::default() }).status,
            InvoiceStatus::Processing
        );
    }

    #[test]
    fn relative_paths_become_absolute() {
        let client = FocusNfeClient::new(Client::new(), "https://homologacao.focusnfe.com.br/", "t");
        assert_eq!(
            client.absolute_url("/arquivos/danfe.pdf"),
            "https://homologacao.focusnfe.com.br/arquivos/danfe.pdf"
        );
        assert_eq!(client.absolute_url("https://cdn/x.xml"), "https://cdn/x.xml");
    }

    #[tokio::test]
    async fn submit_uses_basic_auth_and_reference() {
        let server = MockServer::start().await;
        let expected = format!("Basic {}", STANDARD.encode("tok:"));
        Mock::given(method("POST"))
            .and(path("/v2/nfe"))
            .and(query_param("ref", "ref-1"))
            .and(header("authorization", expected.as_str()))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_json(serde_json::json!({"status": STATUS_PROCESSING})),
            )
            .mount(&server)
            .await;

        let client = FocusNfeClient::new(Client::new(), server.uri(), "tok");
        let payload = NfePayload {
            natureza_operacao: "Venda de mercadoria".into(),
            data_emissao: Utc::now(),
            tipo_documento: 1,
            finalidade_emissao: 1,
            presenca_comprador: 1,
            modalidade_frete: 9,
            cnpj_emitente: "11222333000181".into(),
            inscricao_estadual_emitente: None,
            nome_destinatario: "Bar".into(),
            cpf_destinatario: Some("52998224725".into()),
            cnpj_destinatario: None,
            indicador_inscricao_estadual_destinatario: 9,
            email_destinatario: None,
            telefone_destinatario: None,
            logradouro_destinatario: None,
            numero_destinatario: None,
            bairro_destinatario: None,
            municipio_destinatario: None,
            uf_destinatario: None,
            cep_destinatario: None,
            valor_produtos: Decimal::ONE,
            valor_desconto: Decimal::ZERO,
            valor_total: Decimal::ONE,
            items: vec![],
        };
        let status = client.submit("ref-1", &payload).await.unwrap();
        assert!(status.is_processing());
    }

    #[tokio::test]
    async fn poll_stops_after_fixed_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/nfe/ref-2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": STATUS_PROCESSING})),
            )
            .expect(3)
            .mount(&server)
            .await;

        let client = FocusNfeClient::new(Client::new(), server.uri(), "tok");
        let status = client
            .poll("ref-2", 3, Duration::from_millis(1))
            .await
            .unwrap();
        assert!(status.is_processing());
        server.verify().await;
    }
}

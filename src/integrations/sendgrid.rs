//! SendGrid mail client.

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::join_url;
use crate::errors::ServiceError;

#[derive(Debug, Error)]
pub enum SendGridError {
    #[error("SendGrid request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SendGrid returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl From<SendGridError> for ServiceError {
    fn from(err: SendGridError) -> Self {
        match err {
            SendGridError::Api { message, .. } => {
                ServiceError::ExternalApiError(format!("SendGrid: {}", message))
            }
            other => ServiceError::ExternalApiError(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
struct MailSend<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

pub struct SendGridClient {
    http: Client,
    base_url: String,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl SendGridClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        from_email: impl Into<String>,
        from_name: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            from_email: from_email.into(),
            from_name: from_name.into(),
        }
    }

    /// `POST /v3/mail/send`; SendGrid answers 202 when the message is queued.
    #[instrument(skip(self, message), fields(to = %message.to_email))]
    pub async fn send(&self, message: &EmailMessage) -> Result<(), SendGridError> {
        // text/plain must precede text/html
        let mut content = Vec::new();
        if let Some(text) = &message.text {
            content.push(Content {
                kind: "text/plain",
                value: text,
            });
        }
        if let Some(html) = &message.html {
            content.push(Content {
                kind: "text/html",
                value: html,
            });
        }

        let body = MailSend {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &message.to_email,
                    name: message.to_name.as_deref(),
                }],
            }],
            from: Address {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            subject: &message.subject,
            content,
        };

        let response = self
            .http
            .post(join_url(&self.base_url, "v3/mail/send"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("email accepted by SendGrid");
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), %message, "SendGrid rejected email");
        Err(SendGridError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn accepted_mail_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .and(header("authorization", "Bearer sg-key"))
            .and(body_partial_json(serde_json::json!({
                "subject": "Seu boleto",
                "from": {"email": "financeiro@distribuidora.com.br"}
            })))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let client = SendGridClient::new(
            Client::new(),
            server.uri(),
            "sg-key",
            "financeiro@distribuidora.com.br",
            "Financeiro",
        );
        client
            .send(&EmailMessage {
                to_email: "ze@bar.com.br".into(),
                to_name: None,
                subject: "Seu boleto".into(),
                html: Some("<p>Olá</p>".into()),
                text: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_mail_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = SendGridClient::new(Client::new(), server.uri(), "x", "a@b.c", "A");
        let err = client
            .send(&EmailMessage {
                to_email: "ze@bar.com.br".into(),
                to_name: None,
                subject: "s".into(),
                html: None,
                text: Some("t".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SendGridError::Api { status: 401, .. }));
    }
}

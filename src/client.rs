//! HTTP client for the infraction record endpoints.
//!
//! The form submits through `RecordApi::create` and the viewer reads through
//! `RecordApi::fetch`. Both are single attempts; retrying is the caller's call.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::api::types::CreateInfractionResponse;
use crate::domain::{CreateInfractionRequest, InfractionId, InfractionRecord};

/// Errors raised by the record client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with `success: false`
    #[error("server rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Server-provided message, when the server produced one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// Access to stored infraction records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordApi: Send + Sync {
    /// Submit one creation request and return the assigned id.
    async fn create(&self, request: CreateInfractionRequest) -> Result<InfractionId, ClientError>;

    /// Fetch a record. `None` when the server reports it does not exist.
    async fn fetch(&self, id: InfractionId) -> Result<Option<InfractionRecord>, ClientError>;
}

/// Subset of the error envelope the client needs
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: String,
}

/// `RecordApi` over HTTP
pub struct HttpRecordClient {
    client: Client,
    base_url: String,
}

impl HttpRecordClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn rejection(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.message)
            .unwrap_or_default();
        ClientError::Rejected { status, message }
    }
}

#[async_trait]
impl RecordApi for HttpRecordClient {
    async fn create(&self, request: CreateInfractionRequest) -> Result<InfractionId, ClientError> {
        let url = format!("{}/api/auto", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: CreateInfractionResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if !body.success {
            return Err(ClientError::Rejected {
                status: StatusCode::OK.as_u16(),
                message: body.message,
            });
        }

        let id = body
            .id
            .ok_or_else(|| ClientError::Decode("missing id in success response".to_string()))?;
        debug!(%id, "infraction submitted");
        Ok(id)
    }

    async fn fetch(&self, id: InfractionId) -> Result<Option<InfractionRecord>, ClientError> {
        let url = format!("{}/api/auto/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<InfractionRecord>()
                .await
                .map(Some)
                .map_err(|e| ClientError::Decode(e.to_string())),
            _ => Err(Self::rejection(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signature_image::test_support::tiny_png;
    use crate::domain::{Classificacao, NewInfraction, SignatureImage};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpRecordClient {
        HttpRecordClient::new(server.uri(), Duration::from_secs(2)).unwrap()
    }

    fn sample() -> NewInfraction {
        NewInfraction::new(
            "Ana Silva",
            "12345678901",
            "Despejo de resíduos",
            Classificacao::Verde,
            SignatureImage::from_png("assinatura", tiny_png(4, 4)).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_create_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auto"))
            .and(body_partial_json(serde_json::json!({"nome": "Ana Silva"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "Dados salvos com sucesso!",
                "id": 12
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client_for(&server)
            .create(CreateInfractionRequest::from(&sample()))
            .await
            .unwrap();
        assert_eq!(id, InfractionId(12));
    }

    #[tokio::test]
    async fn test_create_surfaces_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "success": false,
                "message": "Erro ao salvar os dados",
                "error": {"code": "DATABASE_ERROR", "numeric_code": 8001}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create(CreateInfractionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected { status: 500, .. }));
        assert_eq!(err.server_message(), Some("Erro ao salvar os dados"));
    }

    #[tokio::test]
    async fn test_create_without_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create(CreateInfractionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected { status: 502, .. }));
        assert_eq!(err.server_message(), None);
    }

    #[tokio::test]
    async fn test_fetch_found_and_missing() {
        let server = MockServer::start().await;
        let record = InfractionRecord {
            id: InfractionId(5),
            created_at: chrono::Utc::now(),
            infraction: sample(),
        };
        Mock::given(method("GET"))
            .and(path("/api/auto/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&record))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auto/6"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "success": false,
                "message": "Auto de infração não encontrado: 6"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let fetched = client.fetch(InfractionId(5)).await.unwrap().unwrap();
        assert_eq!(fetched, record);
        assert!(client.fetch(InfractionId(6)).await.unwrap().is_none());
    }
}

//! Postal-code (CEP) address lookup.
//!
//! The contract is binary: a lookup either yields the full address tuple or
//! the caller falls back to manual entry. `LookupError` exists so failures can
//! be logged; callers are expected to treat it exactly like `NotFound`.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{digits_only, CEP_DIGITS};

/// Default ViaCEP endpoint
pub const DEFAULT_VIACEP_URL: &str = "https://viacep.com.br/ws";

/// Address fields resolved from a postal code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub logradouro: String,
    pub bairro: String,
    pub cidade: String,
    pub estado: String,
}

/// Result of a successful round trip to the lookup service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressLookupOutcome {
    Found(Address),
    /// The service answered with its "not found" marker
    NotFound,
}

/// Lookup failures
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("CEP must have exactly 8 digits, got '{0}'")]
    InvalidCep(String),

    #[error("lookup request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("lookup service returned HTTP {0}")]
    Status(u16),

    #[error("lookup response could not be parsed: {0}")]
    Parse(String),
}

/// Resolves postal codes into addresses
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Issue exactly one lookup for `cep`. No retry.
    async fn lookup(&self, cep: &str) -> Result<AddressLookupOutcome, LookupError>;
}

/// Normalize a postal code, requiring exactly eight digits
pub fn normalize_cep(cep: &str) -> Result<String, LookupError> {
    let digits = digits_only(cep);
    if digits.len() != CEP_DIGITS {
        return Err(LookupError::InvalidCep(cep.to_string()));
    }
    Ok(digits)
}

/// ViaCEP wire response
#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

impl ViaCepResponse {
    fn is_not_found(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(flag)) => flag == "true",
            Some(serde_json::Value::Null) | None => false,
            Some(_) => true,
        }
    }
}

/// HTTP client for the ViaCEP service
pub struct ViaCepClient {
    client: Client,
    base_url: String,
}

impl ViaCepClient {
    /// Create a client for `base_url` (e.g. `https://viacep.com.br/ws`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AddressLookup for ViaCepClient {
    async fn lookup(&self, cep: &str) -> Result<AddressLookupOutcome, LookupError> {
        let cep = normalize_cep(cep)?;
        let url = format!("{}/{}/json/", self.base_url, cep);
        debug!(%url, "looking up CEP");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: ViaCepResponse =
            serde_json::from_str(&body).map_err(|e| LookupError::Parse(e.to_string()))?;

        if parsed.is_not_found() {
            return Ok(AddressLookupOutcome::NotFound);
        }

        Ok(AddressLookupOutcome::Found(Address {
            logradouro: parsed.logradouro,
            bairro: parsed.bairro,
            cidade: parsed.localidade,
            estado: parsed.uf,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ViaCepClient {
        ViaCepClient::new(format!("{}/ws/", server.uri()), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_normalize_cep() {
        assert_eq!(normalize_cep("12460-000").unwrap(), "12460000");
        assert!(matches!(normalize_cep("1246"), Err(LookupError::InvalidCep(_))));
        assert!(matches!(normalize_cep("124600001"), Err(LookupError::InvalidCep(_))));
    }

    #[tokio::test]
    async fn test_lookup_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/12460000/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cep": "12460-000",
                "logradouro": "Avenida Frei Orestes Girardi",
                "complemento": "",
                "bairro": "Capivari",
                "localidade": "Campos do Jordão",
                "uf": "SP"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client_for(&server).lookup("12460-000").await.unwrap();
        assert_eq!(
            outcome,
            AddressLookupOutcome::Found(Address {
                logradouro: "Avenida Frei Orestes Girardi".into(),
                bairro: "Capivari".into(),
                cidade: "Campos do Jordão".into(),
                estado: "SP".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_lookup_not_found_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/99999999/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"erro": true})))
            .mount(&server)
            .await;

        let outcome = client_for(&server).lookup("99999999").await.unwrap();
        assert_eq!(outcome, AddressLookupOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_lookup_not_found_string_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/00000000/json/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"erro": "true"})),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server).lookup("00000000").await.unwrap();
        assert_eq!(outcome, AddressLookupOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_lookup_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let err = client_for(&server).lookup("12345678").await.unwrap_err();
        assert!(matches!(err, LookupError::Status(400)));
    }

    #[tokio::test]
    async fn test_lookup_unparsable_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).lookup("12345678").await.unwrap_err();
        assert!(matches!(err, LookupError::Parse(_)));
    }

    #[tokio::test]
    async fn test_invalid_cep_issues_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server).lookup("123").await.unwrap_err();
        assert!(matches!(err, LookupError::InvalidCep(_)));
    }
}

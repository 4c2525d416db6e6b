//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tiny_skia::{Color, Pixmap};
use tower::ServiceExt;

use auto_infracao::address::{Address, AddressLookup, AddressLookupOutcome, LookupError};
use auto_infracao::domain::{InfractionId, InfractionRecord, NewInfraction};
use auto_infracao::infra::{InfractionError, RecordStore, SqliteRecordStore};
use auto_infracao::server::{build_router, AppState};

/// CEP the stub lookup resolves
pub const KNOWN_CEP: &str = "12460000";
/// CEP the stub lookup fails on
pub const FAILING_CEP: &str = "00000000";

/// Encode a solid black PNG of the given size
pub fn signature_png(width: u32, height: u32) -> Vec<u8> {
    let mut pixmap = Pixmap::new(width, height).unwrap();
    pixmap.fill(Color::BLACK);
    pixmap.encode_png().unwrap()
}

/// PNG data URL as the signature pad exports it
pub fn signature_data_url(width: u32, height: u32) -> String {
    use base64::Engine;
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(signature_png(width, height))
    )
}

/// The minimal creation payload: every field the server requires
pub fn example_request() -> serde_json::Value {
    json!({
        "nome": "Ana Silva",
        "cpf": "12345678901",
        "descricao": "Despejo de resíduos",
        "classificacao": "Verde",
        "assinatura": signature_data_url(12, 5),
    })
}

/// A payload with every field filled in
pub fn full_request() -> serde_json::Value {
    json!({
        "data": "2024-05-17",
        "serie": "A",
        "numeroNotificacao": "0042/2024",
        "nome": "Ana Silva",
        "cpf": "123.456.789-01",
        "telefone": "12345678901",
        "cep": "12460-000",
        "logradouro": "Avenida Frei Orestes Girardi",
        "bairro": "Capivari",
        "cidade": "Campos do Jordão",
        "estado": "SP",
        "local": "Margem do córrego",
        "municipio": "Campos do Jordão",
        "classificacao": "Pública",
        "legislacao": "Lei 9.605/98, art. 54",
        "multa": "R$ 5.000,00",
        "descricao": "Despejo de resíduos",
        "assinatura": signature_data_url(20, 8),
        "assinaturaAgente": signature_data_url(16, 6),
        "testemunhas": [
            {"nome": "João", "cpf": "111.111.111-11"},
            {"nome": "", "cpf": ""},
            {"nome": "Maria", "cpf": "222.222.222-22"}
        ]
    })
}

/// Address lookup with fixed answers
pub struct StubAddressLookup;

#[async_trait]
impl AddressLookup for StubAddressLookup {
    async fn lookup(&self, cep: &str) -> Result<AddressLookupOutcome, LookupError> {
        let cep = auto_infracao::address::normalize_cep(cep)?;
        match cep.as_str() {
            KNOWN_CEP => Ok(AddressLookupOutcome::Found(Address {
                logradouro: "Avenida Frei Orestes Girardi".into(),
                bairro: "Capivari".into(),
                cidade: "Campos do Jordão".into(),
                estado: "SP".into(),
            })),
            FAILING_CEP => Err(LookupError::Status(503)),
            _ => Ok(AddressLookupOutcome::NotFound),
        }
    }
}

/// Store whose every operation fails like a lost database
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn create(&self, _record: NewInfraction) -> auto_infracao::Result<InfractionId> {
        Err(InfractionError::Database(sqlx::Error::PoolClosed))
    }

    async fn get(&self, _id: InfractionId) -> auto_infracao::Result<Option<InfractionRecord>> {
        Err(InfractionError::Database(sqlx::Error::PoolClosed))
    }

    async fn ping(&self) -> auto_infracao::Result<()> {
        Err(InfractionError::Database(sqlx::Error::PoolClosed))
    }
}

/// State over a fresh in-memory SQLite store
pub async fn sqlite_state() -> AppState {
    let store = SqliteRecordStore::in_memory().await.unwrap();
    AppState::new(Arc::new(store), Arc::new(StubAddressLookup))
}

pub fn app(state: AppState) -> axum::Router {
    build_router(None).unwrap().with_state(state)
}

/// Raw response parts
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

pub async fn send_raw(
    app: &axum::Router,
    method: Method,
    uri: &str,
    body: Option<Vec<u8>>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);

    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }

    let body = body.map(Body::from).unwrap_or_else(|| Body::from(Vec::new()));

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec();

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn send_request(
    app: &axum::Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let body = body.map(|v| serde_json::to_vec(&v).unwrap());
    let response = send_raw(app, method, uri, body).await;
    (response.status, response.json())
}

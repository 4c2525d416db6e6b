//! HTTP server bootstrap for the infraction service.
//!
//! This module wires together:
//! - configuration
//! - the record store (PostgreSQL or SQLite, chosen by `DATABASE_URL`)
//! - the postal-code lookup client
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::Notify;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::address::{AddressLookup, ViaCepClient, DEFAULT_VIACEP_URL};
use crate::api::{health_check, readiness_check};
use crate::export::PdfExporter;
use crate::infra::{shutdown_signal, PgRecordStore, RecordStore, SqliteRecordStore};
use crate::telemetry::{init_tracing, TelemetryConfig};

/// Default database when `DATABASE_URL` is unset
pub const DEFAULT_DATABASE_URL: &str = "sqlite://auto_infracao.db?mode=rwc";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL (`postgres://...` or `sqlite:...`).
    pub database_url: String,
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Maximum database connections.
    pub max_connections: u32,
    /// Apply embedded migrations before serving.
    pub migrate_on_startup: bool,
    /// Base URL of the ViaCEP-compatible lookup service.
    pub cep_lookup_url: String,
    /// Timeout for one postal-code lookup.
    pub cep_lookup_timeout: Duration,
    /// Comma-separated origins, or `*`.
    pub cors_allow_origins: Option<String>,
    /// How long in-flight requests may run after a shutdown signal.
    pub shutdown_drain: Duration,
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {name} {v:?}: {e}")),
        _ => Ok(default),
    }
}

fn env_flag(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    lookup(name)
        .map(|v| {
            !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off"
            )
        })
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any name-to-value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let port: u16 = env_parse(&lookup, "PORT", 8080)?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {host}:{port}: {e}"))?;

        let max_connections: u32 = env_parse(&lookup, "MAX_DB_CONNECTIONS", 10)?;
        if max_connections == 0 {
            anyhow::bail!("MAX_DB_CONNECTIONS must be at least 1");
        }

        let cep_lookup_url =
            lookup("CEP_LOOKUP_URL").unwrap_or_else(|| DEFAULT_VIACEP_URL.to_string());
        let cep_lookup_timeout =
            Duration::from_millis(env_parse(&lookup, "CEP_LOOKUP_TIMEOUT_MS", 5000)?);

        let cors_allow_origins = lookup("CORS_ALLOW_ORIGINS")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            listen_addr,
            max_connections,
            migrate_on_startup: env_flag(&lookup, "DB_MIGRATE_ON_STARTUP", true),
            cep_lookup_url,
            cep_lookup_timeout,
            cors_allow_origins,
            shutdown_drain: Duration::from_secs(env_parse(&lookup, "SHUTDOWN_DRAIN_SECS", 10)?),
        })
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub address_lookup: Arc<dyn AddressLookup>,
    pub exporter: PdfExporter,
}

impl AppState {
    pub fn new(records: Arc<dyn RecordStore>, address_lookup: Arc<dyn AddressLookup>) -> Self {
        Self {
            records,
            address_lookup,
            exporter: PdfExporter::new(),
        }
    }
}

/// Open the record store named by `database_url`, applying migrations when asked.
pub async fn connect_store(
    database_url: &str,
    max_connections: u32,
    migrate: bool,
) -> anyhow::Result<Arc<dyn RecordStore>> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let store = PgRecordStore::new(pool);
        if migrate {
            info!("Running database migrations...");
            store.initialize().await?;
            info!("Database migrations applied");
        }
        Ok(Arc::new(store))
    } else if database_url.starts_with("sqlite:") {
        info!("Opening SQLite database...");
        // every connection to :memory: opens its own empty database
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            max_connections
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let store = SqliteRecordStore::new(pool);
        if migrate {
            info!("Running database migrations...");
            store.initialize().await?;
            info!("Database migrations applied");
        }
        Ok(Arc::new(store))
    } else {
        anyhow::bail!("Unsupported DATABASE_URL scheme (expected postgres:// or sqlite:)")
    }
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_tracing(&telemetry)?;

    info!(
        "Starting {} v{}",
        telemetry.service_name, telemetry.service_version
    );

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Max connections: {}", config.max_connections);
    info!("  CEP lookup: {}", config.cep_lookup_url);

    let records = connect_store(
        &config.database_url,
        config.max_connections,
        config.migrate_on_startup,
    )
    .await?;
    if !config.migrate_on_startup {
        info!("DB migrations skipped (DB_MIGRATE_ON_STARTUP=0)");
    }

    let address_lookup = Arc::new(ViaCepClient::new(
        config.cep_lookup_url.clone(),
        config.cep_lookup_timeout,
    )?);

    let state = AppState::new(records, address_lookup);

    // Build router
    let app = build_router(config.cors_allow_origins.as_deref())?.with_state(state);

    // Start server
    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    let stopping = Arc::new(Notify::new());
    let server = axum::serve(listener, app).with_graceful_shutdown({
        let stopping = stopping.clone();
        async move {
            shutdown_signal().await;
            info!("Shutdown signal received, draining connections");
            stopping.notify_one();
        }
    });

    info!("Service is ready to accept connections");
    let drain = config.shutdown_drain;
    tokio::select! {
        result = async { server.await } => result?,
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(drain).await;
        } => {
            warn!(drain_secs = drain.as_secs(), "Drain timeout elapsed, exiting with requests in flight");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Build the full router: `/api`, health endpoints, tracing and optional CORS.
pub fn build_router(cors_allow_origins: Option<&str>) -> anyhow::Result<Router<AppState>> {
    let mut router = Router::new()
        .nest("/api", crate::api::router())
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer(cors_allow_origins)? {
        router = router.layer(cors_layer);
    }

    Ok(router)
}

fn cors_layer(origins: Option<&str>) -> anyhow::Result<Option<CorsLayer>> {
    let origins = match origins.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_parsing() {
        assert!(cors_layer(None).unwrap().is_none());
        assert!(cors_layer(Some("  ")).unwrap().is_none());
        assert!(cors_layer(Some("*")).unwrap().is_some());
        assert!(cors_layer(Some("https://a.example, https://b.example"))
            .unwrap()
            .is_some());
        assert!(cors_layer(Some("bad\norigin")).is_err());
    }

    #[tokio::test]
    async fn test_connect_store_rejects_unknown_scheme() {
        let err = connect_store("mysql://localhost/db", 1, false)
            .await
            .err()
            .expect("mysql is not supported");
        assert!(err.to_string().contains("Unsupported"));
    }

    #[tokio::test]
    async fn test_connect_store_sqlite_memory() {
        let store = connect_store("sqlite::memory:", 1, true).await.unwrap();
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_sqlite_memory_pool_shares_schema() {
        let store = connect_store("sqlite::memory:", 8, true).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.get(crate::domain::InfractionId(1)).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_none());
        }
    }

    fn lookup_from<'a>(
        vars: &'a [(&'a str, &'a str)],
    ) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.max_connections, 10);
        assert!(config.migrate_on_startup);
        assert_eq!(config.cep_lookup_url, DEFAULT_VIACEP_URL);
        assert_eq!(config.cep_lookup_timeout, Duration::from_millis(5000));
        assert!(config.cors_allow_origins.is_none());
        assert_eq!(config.shutdown_drain, Duration::from_secs(10));
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("DB_MIGRATE_ON_STARTUP", "off"),
            ("CORS_ALLOW_ORIGINS", " * "),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert!(!config.migrate_on_startup);
        assert_eq!(config.cors_allow_origins.as_deref(), Some("*"));
    }

    #[test]
    fn test_invalid_config_values_are_errors() {
        for vars in [
            [("PORT", "abc")],
            [("MAX_DB_CONNECTIONS", "0")],
            [("HOST", "not a host")],
            [("CEP_LOOKUP_TIMEOUT_MS", "-5")],
            [("SHUTDOWN_DRAIN_SECS", "soon")],
        ] {
            assert!(
                Config::from_lookup(lookup_from(&vars)).is_err(),
                "expected an error for {vars:?}"
            );
        }
    }
}

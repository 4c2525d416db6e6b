//! Environmental Infraction Notices ("Auto de Infração Ambiental")
//!
//! Captures an infraction notice (notified party, address, classification,
//! witnesses and two freehand signatures), persists it, renders it read-only
//! and exports it to PDF.
//!
//! ## Modules
//!
//! - [`domain`] - Record model, creation payload and validation
//! - [`address`] - Postal-code (CEP) lookup
//! - [`signature`] - Freehand signature capture
//! - [`form`] - Editable draft, witnesses and submission
//! - [`client`] - HTTP client for the record endpoints
//! - [`viewer`] - Read-only rendering of a stored record
//! - [`export`] - PDF export
//! - [`infra`] - Record stores (PostgreSQL, SQLite)
//! - [`api`] - REST API routes
//! - [`server`] - Configuration and HTTP bootstrap
//! - [`telemetry`] - Logging setup

pub mod address;
pub mod api;
pub mod client;
pub mod domain;
pub mod export;
pub mod form;
pub mod infra;
pub mod migrations;
pub mod server;
pub mod signature;
pub mod telemetry;
pub mod viewer;

// Re-export commonly used types
pub use domain::{
    Classificacao, CreateInfractionRequest, InfractionId, InfractionRecord, NewInfraction, Serie,
    SignatureImage, Witness,
};

pub use infra::{InfractionError, RecordStore, Result};

//! HTTP API for infraction records
//!
//! Routes mounted under `/api`:
//! - `POST /auto` - create a record
//! - `GET /auto/:id` - fetch a record
//! - `GET /auto/:id/pdf` - download a record as PDF
//! - `GET /cep/:cep` - postal-code lookup with manual-entry fallback

pub mod error;
pub mod handlers;
pub mod types;

use axum::routing::{get, post};
use axum::Router;

use crate::server::AppState;

pub use error::{ApiError, ErrorCode};
pub use handlers::{health_check, readiness_check};

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auto", post(handlers::create_infraction))
        .route("/auto/:id", get(handlers::get_infraction))
        .route("/auto/:id/pdf", get(handlers::export_infraction_pdf))
        .route("/cep/:cep", get(handlers::lookup_cep))
}

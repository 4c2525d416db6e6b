//! Postal-code lookup handler.

use axum::extract::{Path, State};
use axum::Json;
use tracing::{debug, warn};

use crate::address::AddressLookupOutcome;
use crate::api::types::CepLookupResponse;
use crate::server::AppState;

/// GET /api/cep/:cep - Resolve a postal code, or tell the form to fall back
/// to manual entry.
pub async fn lookup_cep(
    State(state): State<AppState>,
    Path(cep): Path<String>,
) -> Json<CepLookupResponse> {
    let response = match state.address_lookup.lookup(&cep).await {
        Ok(AddressLookupOutcome::Found(address)) => CepLookupResponse::found(address),
        Ok(AddressLookupOutcome::NotFound) => {
            debug!(%cep, "CEP not found");
            CepLookupResponse::manual()
        }
        Err(e) => {
            warn!(%cep, error = %e, "CEP lookup failed");
            CepLookupResponse::manual()
        }
    };
    Json(response)
}

//! Infraction record handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tracing::{error, info};

use crate::api::error::{internal_error, load_failed, record_not_found, ApiError, ErrorCode};
use crate::api::types::CreateInfractionResponse;
use crate::domain::{CreateInfractionRequest, InfractionId, InfractionRecord};
use crate::export::download_filename;
use crate::server::AppState;
use crate::viewer::RecordView;

fn parse_id(raw: &str) -> Result<InfractionId, ApiError> {
    raw.parse::<InfractionId>().map_err(|_| {
        ApiError::new(
            ErrorCode::InvalidFieldValue,
            format!("Identificador inválido: {}", raw),
        )
        .with_details(serde_json::json!({ "field": "id" }))
    })
}

async fn load(state: &AppState, id: InfractionId) -> Result<InfractionRecord, ApiError> {
    state
        .records
        .get(id)
        .await
        .map_err(load_failed)?
        .ok_or_else(|| record_not_found(id))
}

/// POST /api/auto - Validate and store a new infraction.
pub async fn create_infraction(
    State(state): State<AppState>,
    payload: Result<Json<CreateInfractionRequest>, JsonRejection>,
) -> Result<Json<CreateInfractionResponse>, ApiError> {
    let Json(request) = payload?;
    let record = request.validate()?;

    let id = state.records.create(record).await?;
    info!(%id, "infraction saved");

    Ok(Json(CreateInfractionResponse::saved(id)))
}

/// GET /api/auto/:id - Fetch a stored infraction.
pub async fn get_infraction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InfractionRecord>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(load(&state, id).await?))
}

/// GET /api/auto/:id/pdf - Download a stored infraction as PDF.
pub async fn export_infraction_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let record = load(&state, id).await?;
    let view = RecordView::from_record(&record);

    let pdf = state.exporter.export(&view).map_err(|e| {
        error!(%id, error = %e, "PDF export failed");
        internal_error("Erro ao gerar o PDF")
    })?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        download_filename(id)
    ))
    .map_err(|e| internal_error(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    ))
}

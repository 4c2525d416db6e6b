//! Decoding helpers shared by the SQL stores.
//!
//! Stored values were validated on the way in, so a decode failure here means
//! the table was edited out of band and is reported as an internal error.

use crate::domain::{Classificacao, Serie, SignatureImage};
use crate::infra::{InfractionError, Result};

pub(crate) fn parse_classificacao(value: &str) -> Result<Classificacao> {
    value
        .parse()
        .map_err(|e| InfractionError::Internal(format!("Invalid stored classificacao: {}", e)))
}

pub(crate) fn parse_serie(value: &str) -> Result<Serie> {
    value
        .parse()
        .map_err(|e| InfractionError::Internal(format!("Invalid stored serie: {}", e)))
}

pub(crate) fn parse_signature(field: &str, data_url: &str) -> Result<SignatureImage> {
    SignatureImage::from_data_url(field, data_url)
        .map_err(|e| InfractionError::Internal(format!("Invalid stored signature: {}", e)))
}

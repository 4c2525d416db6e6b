//! Shared request and response types for REST API handlers.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::domain::InfractionId;

/// Message returned when a record was stored
pub const SAVE_SUCCESS_MESSAGE: &str = "Dados salvos com sucesso!";

// ============================================================================
// Infraction types
// ============================================================================

/// Response for POST /api/auto
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInfractionResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<InfractionId>,
}

impl CreateInfractionResponse {
    pub fn saved(id: InfractionId) -> Self {
        Self {
            success: true,
            message: SAVE_SUCCESS_MESSAGE.to_string(),
            id: Some(id),
        }
    }
}

// ============================================================================
// Address lookup types
// ============================================================================

/// Response for GET /api/cep/:cep
///
/// Either `{found: true, endereco}` or `{found: false, manual: true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CepLookupResponse {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endereco: Option<Address>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub manual: bool,
}

impl CepLookupResponse {
    pub fn found(endereco: Address) -> Self {
        Self {
            found: true,
            endereco: Some(endereco),
            manual: false,
        }
    }

    pub fn manual() -> Self {
        Self {
            found: false,
            endereco: None,
            manual: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_response_shape() {
        let json = serde_json::to_value(CreateInfractionResponse::saved(InfractionId(3))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "message": "Dados salvos com sucesso!", "id": 3})
        );
    }

    #[test]
    fn test_cep_response_shapes() {
        let manual = serde_json::to_value(CepLookupResponse::manual()).unwrap();
        assert_eq!(manual, serde_json::json!({"found": false, "manual": true}));

        let found = serde_json::to_value(CepLookupResponse::found(Address {
            logradouro: "Rua A".into(),
            bairro: "Centro".into(),
            cidade: "Taubaté".into(),
            estado: "SP".into(),
        }))
        .unwrap();
        assert_eq!(found["found"], true);
        assert_eq!(found["endereco"]["cidade"], "Taubaté");
        assert!(found.get("manual").is_none());
    }
}

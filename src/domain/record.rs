//! Infraction record model and the creation payload.
//!
//! `CreateInfractionRequest` is the loosely typed wire shape submitted by the
//! form (every field optional, free text). `validate` turns it into the typed
//! `NewInfraction` the stores accept, normalizing digit-only fields and
//! rejecting anything a browser-side check could have let through.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{
    digits_only, mask_phone, Classificacao, InfractionId, Serie, SignatureImage, ValidationError,
    CEP_DIGITS,
};

/// A witness of the infraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Witness {
    pub nome: String,
    pub cpf: String,
}

impl Witness {
    pub fn new(nome: impl Into<String>, cpf: &str) -> Self {
        Self {
            nome: nome.into(),
            cpf: digits_only(cpf),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.nome.trim().is_empty() && self.cpf.is_empty()
    }
}

/// Validated fields of an infraction, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInfraction {
    pub nome: String,
    pub cpf: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logradouro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bairro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,

    pub descricao: String,
    pub classificacao: Classificacao,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legislacao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multa: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numero_notificacao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serie: Option<Serie>,

    pub assinatura: SignatureImage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assinatura_agente: Option<SignatureImage>,

    #[serde(default)]
    pub testemunhas: Vec<Witness>,
}

impl NewInfraction {
    /// Minimal valid infraction: the fields the creation endpoint requires.
    pub fn new(
        nome: impl Into<String>,
        cpf: &str,
        descricao: impl Into<String>,
        classificacao: Classificacao,
        assinatura: SignatureImage,
    ) -> Self {
        Self {
            nome: nome.into(),
            cpf: digits_only(cpf),
            telefone: None,
            cep: None,
            logradouro: None,
            bairro: None,
            cidade: None,
            estado: None,
            descricao: descricao.into(),
            classificacao,
            legislacao: None,
            multa: None,
            local: None,
            municipio: None,
            numero_notificacao: None,
            data: None,
            serie: None,
            assinatura,
            assinatura_agente: None,
            testemunhas: Vec::new(),
        }
    }
}

/// A persisted infraction record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfractionRecord {
    pub id: InfractionId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub infraction: NewInfraction,
}

/// Creation payload as submitted by the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInfractionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logradouro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bairro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descricao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classificacao: Option<String>,
    #[serde(default, alias = "legislação", skip_serializing_if = "Option::is_none")]
    pub legislacao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multa: Option<String>,
    #[serde(default, alias = "Local", skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numero_notificacao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assinatura: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assinatura_agente: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub testemunhas: Vec<Witness>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(field: &str, value: &Option<String>) -> Result<String, ValidationError> {
    non_blank(value).ok_or_else(|| ValidationError::missing(field))
}

impl CreateInfractionRequest {
    /// Check required fields and field formats, producing a typed record.
    pub fn validate(&self) -> Result<NewInfraction, ValidationError> {
        let nome = required("nome", &self.nome)?;

        let cpf = digits_only(&required("cpf", &self.cpf)?);
        if cpf.is_empty() {
            return Err(ValidationError::new("cpf", "documento deve conter dígitos"));
        }

        let descricao = required("descricao", &self.descricao)?;
        let classificacao: Classificacao = required("classificacao", &self.classificacao)?.parse()?;

        let assinatura = SignatureImage::from_data_url(
            "assinatura",
            &required("assinatura", &self.assinatura)?,
        )?;
        let assinatura_agente = non_blank(&self.assinatura_agente)
            .map(|url| SignatureImage::from_data_url("assinaturaAgente", &url))
            .transpose()?;

        let telefone = non_blank(&self.telefone)
            .map(|t| mask_phone(&t))
            .filter(|t| !t.is_empty());

        let cep = non_blank(&self.cep).map(|c| digits_only(&c));
        if let Some(cep) = &cep {
            if cep.len() != CEP_DIGITS {
                return Err(ValidationError::new("cep", "CEP deve ter 8 dígitos"));
            }
        }

        let data = non_blank(&self.data)
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                    .map_err(|_| ValidationError::new("data", format!("data inválida: '{d}'")))
            })
            .transpose()?;

        let serie = non_blank(&self.serie)
            .map(|s| s.parse::<Serie>())
            .transpose()?;

        let testemunhas = self
            .testemunhas
            .iter()
            .map(|w| Witness::new(w.nome.trim(), &w.cpf))
            .filter(|w| !w.is_blank())
            .collect();

        Ok(NewInfraction {
            nome,
            cpf,
            telefone,
            cep,
            logradouro: non_blank(&self.logradouro),
            bairro: non_blank(&self.bairro),
            cidade: non_blank(&self.cidade),
            estado: non_blank(&self.estado),
            descricao,
            classificacao,
            legislacao: non_blank(&self.legislacao),
            multa: non_blank(&self.multa),
            local: non_blank(&self.local),
            municipio: non_blank(&self.municipio),
            numero_notificacao: non_blank(&self.numero_notificacao),
            data,
            serie,
            assinatura,
            assinatura_agente,
            testemunhas,
        })
    }
}

impl From<&NewInfraction> for CreateInfractionRequest {
    fn from(record: &NewInfraction) -> Self {
        Self {
            nome: Some(record.nome.clone()),
            cpf: Some(record.cpf.clone()),
            telefone: record.telefone.clone(),
            cep: record.cep.clone(),
            logradouro: record.logradouro.clone(),
            bairro: record.bairro.clone(),
            cidade: record.cidade.clone(),
            estado: record.estado.clone(),
            descricao: Some(record.descricao.clone()),
            classificacao: Some(record.classificacao.as_str().to_string()),
            legislacao: record.legislacao.clone(),
            multa: record.multa.clone(),
            local: record.local.clone(),
            municipio: record.municipio.clone(),
            numero_notificacao: record.numero_notificacao.clone(),
            data: record.data.map(|d| d.format("%Y-%m-%d").to_string()),
            serie: record.serie.map(|s| s.as_str().to_string()),
            assinatura: Some(record.assinatura.data_url().to_string()),
            assinatura_agente: record
                .assinatura_agente
                .as_ref()
                .map(|s| s.data_url().to_string()),
            testemunhas: record.testemunhas.clone(),
        }
    }
}

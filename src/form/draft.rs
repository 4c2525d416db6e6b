//! The infraction form as an editable draft.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::address::{AddressLookup, AddressLookupOutcome, LookupError};
use crate::api::error::SAVE_FAILED_MESSAGE;
use crate::client::{ClientError, RecordApi};
use crate::domain::{
    digits_only, mask_phone, Classificacao, CreateInfractionRequest, InfractionId, Serie,
    ValidationError, CEP_DIGITS,
};
use crate::signature::{SignatureError, SignaturePad};

use super::sequence::{LookupTicket, RequestSequence};
use super::witnesses::Witnesses;

/// Free-text fields of the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Nome,
    Logradouro,
    Bairro,
    Cidade,
    Estado,
    Descricao,
    Legislacao,
    Multa,
    Local,
    Municipio,
    NumeroNotificacao,
}

impl Field {
    /// Wire name of the field
    pub fn name(&self) -> &'static str {
        match self {
            Field::Nome => "nome",
            Field::Logradouro => "logradouro",
            Field::Bairro => "bairro",
            Field::Cidade => "cidade",
            Field::Estado => "estado",
            Field::Descricao => "descricao",
            Field::Legislacao => "legislacao",
            Field::Multa => "multa",
            Field::Local => "local",
            Field::Municipio => "municipio",
            Field::NumeroNotificacao => "numeroNotificacao",
        }
    }
}

/// Form submission failures
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("notified party signature is required")]
    MissingSignature,

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Submit(#[from] ClientError),
}

impl FormError {
    /// Text to show the user
    pub fn user_message(&self) -> String {
        match self {
            FormError::Validation(e) => format!("Preencha corretamente o campo '{}'", e.field),
            FormError::MissingSignature => "A assinatura do notificado é obrigatória".to_string(),
            FormError::Signature(_) => "Não foi possível processar a assinatura".to_string(),
            FormError::Submit(e) => e
                .server_message()
                .unwrap_or(SAVE_FAILED_MESSAGE)
                .to_string(),
        }
    }
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub id: InfractionId,
    /// Where the viewer for the new record lives
    pub viewer_path: String,
}

impl SubmitOutcome {
    fn new(id: InfractionId) -> Self {
        Self {
            id,
            viewer_path: format!("/visualizar/{}", id),
        }
    }
}

/// Editable infraction form.
///
/// Holds exactly what the user has typed so far, normalized as they type.
/// Nothing is validated until `submit`.
#[derive(Debug, Clone, Default)]
pub struct InfractionDraft {
    nome: String,
    cpf: String,
    telefone: String,
    cep: String,
    logradouro: String,
    bairro: String,
    cidade: String,
    estado: String,
    descricao: String,
    legislacao: String,
    multa: String,
    local: String,
    municipio: String,
    numero_notificacao: String,
    classificacao: Option<Classificacao>,
    serie: Option<Serie>,
    data: Option<NaiveDate>,
    witnesses: Witnesses,
    manual_address: bool,
    lookups: RequestSequence,
    id: Option<InfractionId>,
}

impl InfractionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Nome => &mut self.nome,
            Field::Logradouro => &mut self.logradouro,
            Field::Bairro => &mut self.bairro,
            Field::Cidade => &mut self.cidade,
            Field::Estado => &mut self.estado,
            Field::Descricao => &mut self.descricao,
            Field::Legislacao => &mut self.legislacao,
            Field::Multa => &mut self.multa,
            Field::Local => &mut self.local,
            Field::Municipio => &mut self.municipio,
            Field::NumeroNotificacao => &mut self.numero_notificacao,
        }
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Nome => &self.nome,
            Field::Logradouro => &self.logradouro,
            Field::Bairro => &self.bairro,
            Field::Cidade => &self.cidade,
            Field::Estado => &self.estado,
            Field::Descricao => &self.descricao,
            Field::Legislacao => &self.legislacao,
            Field::Multa => &self.multa,
            Field::Local => &self.local,
            Field::Municipio => &self.municipio,
            Field::NumeroNotificacao => &self.numero_notificacao,
        }
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        *self.slot(field) = value.into();
    }

    pub fn set_cpf(&mut self, value: &str) {
        self.cpf = digits_only(value);
    }

    pub fn set_telefone(&mut self, value: &str) {
        self.telefone = mask_phone(value);
    }

    /// Store the postal code digits.
    ///
    /// Every edit supersedes any lookup still in flight. Returns a ticket
    /// whenever the code is complete; the caller should run the lookup and
    /// hand the result to `apply_lookup`.
    pub fn set_cep(&mut self, value: &str) -> Option<LookupTicket> {
        self.cep = digits_only(value);
        let ticket = self.lookups.next();
        (self.cep.len() == CEP_DIGITS).then_some(ticket)
    }

    /// Apply a lookup result. Returns `false` when the ticket is stale.
    pub fn apply_lookup(
        &mut self,
        ticket: LookupTicket,
        result: Result<AddressLookupOutcome, LookupError>,
    ) -> bool {
        if !self.lookups.is_latest(ticket) {
            debug!(?ticket, "discarding stale address lookup");
            return false;
        }

        match result {
            Ok(AddressLookupOutcome::Found(address)) => {
                self.logradouro = address.logradouro;
                self.bairro = address.bairro;
                self.cidade = address.cidade;
                self.estado = address.estado;
                self.manual_address = false;
            }
            Ok(AddressLookupOutcome::NotFound) => {
                info!(cep = %self.cep, "CEP not found, switching to manual entry");
                self.manual_address = true;
            }
            Err(e) => {
                warn!(cep = %self.cep, error = %e, "CEP lookup failed, switching to manual entry");
                self.manual_address = true;
            }
        }
        true
    }

    /// `set_cep` followed by the lookup it triggers, if any.
    pub async fn update_cep(&mut self, value: &str, lookup: &dyn AddressLookup) {
        if let Some(ticket) = self.set_cep(value) {
            let result = lookup.lookup(&self.cep).await;
            self.apply_lookup(ticket, result);
        }
    }

    pub fn set_classificacao(&mut self, value: Classificacao) {
        self.classificacao = Some(value);
    }

    pub fn set_serie(&mut self, value: Serie) {
        self.serie = Some(value);
    }

    pub fn set_data(&mut self, value: NaiveDate) {
        self.data = Some(value);
    }

    pub fn cpf(&self) -> &str {
        &self.cpf
    }

    pub fn telefone(&self) -> &str {
        &self.telefone
    }

    pub fn cep(&self) -> &str {
        &self.cep
    }

    pub fn classificacao(&self) -> Option<Classificacao> {
        self.classificacao
    }

    pub fn serie(&self) -> Option<Serie> {
        self.serie
    }

    pub fn data(&self) -> Option<NaiveDate> {
        self.data
    }

    /// Whether the address must be typed by hand
    pub fn is_manual_address(&self) -> bool {
        self.manual_address
    }

    pub fn witnesses(&self) -> &Witnesses {
        &self.witnesses
    }

    pub fn witnesses_mut(&mut self) -> &mut Witnesses {
        &mut self.witnesses
    }

    /// Identifier assigned by the last successful submission
    pub fn id(&self) -> Option<InfractionId> {
        self.id
    }

    /// First required field left empty, in form order.
    fn check_required(&self) -> Result<(), ValidationError> {
        let checks: [(&str, bool); 12] = [
            ("data", self.data.is_some()),
            ("serie", self.serie.is_some()),
            ("nome", !self.nome.trim().is_empty()),
            ("cpf", !self.cpf.is_empty()),
            ("telefone", !self.telefone.is_empty()),
            ("local", !self.local.trim().is_empty()),
            ("bairro", !self.bairro.trim().is_empty()),
            ("municipio", !self.municipio.trim().is_empty()),
            ("classificacao", self.classificacao.is_some()),
            ("legislacao", !self.legislacao.trim().is_empty()),
            ("multa", !self.multa.trim().is_empty()),
            ("descricao", !self.descricao.trim().is_empty()),
        ];

        match checks.iter().find(|(_, present)| !present) {
            Some((field, _)) => Err(ValidationError::missing(*field)),
            None => Ok(()),
        }
    }

    fn to_request(&self, assinatura: String, assinatura_agente: Option<String>) -> CreateInfractionRequest {
        fn text(value: &str) -> Option<String> {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }

        CreateInfractionRequest {
            nome: text(&self.nome),
            cpf: text(&self.cpf),
            telefone: text(&self.telefone),
            cep: text(&self.cep),
            logradouro: text(&self.logradouro),
            bairro: text(&self.bairro),
            cidade: text(&self.cidade),
            estado: text(&self.estado),
            descricao: text(&self.descricao),
            classificacao: self.classificacao.map(|c| c.as_str().to_string()),
            legislacao: text(&self.legislacao),
            multa: text(&self.multa),
            local: text(&self.local),
            municipio: text(&self.municipio),
            numero_notificacao: text(&self.numero_notificacao),
            data: self.data.map(|d| d.format("%Y-%m-%d").to_string()),
            serie: self.serie.map(|s| s.as_str().to_string()),
            assinatura: Some(assinatura),
            assinatura_agente,
            testemunhas: self.witnesses.filled(),
        }
    }

    /// Validate, capture both signatures and issue one creation request.
    ///
    /// On failure the draft is left untouched so the user can correct it and
    /// submit again.
    pub async fn submit(
        &mut self,
        client: &dyn RecordApi,
        notified: &SignaturePad,
        agent: &SignaturePad,
    ) -> Result<SubmitOutcome, FormError> {
        self.check_required()?;

        let assinatura = notified.export()?.ok_or(FormError::MissingSignature)?;
        let assinatura_agente = agent.export()?;

        let request = self.to_request(
            assinatura.data_url().to_string(),
            assinatura_agente.map(|s| s.data_url().to_string()),
        );

        let id = client.create(request).await.map_err(|e| {
            warn!(error = %e, "infraction submission failed");
            FormError::from(e)
        })?;

        info!(%id, "infraction submitted");
        self.id = Some(id);
        Ok(SubmitOutcome::new(id))
    }
}

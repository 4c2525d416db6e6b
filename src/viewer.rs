//! Read-only rendering of a stored infraction record.

use tracing::{debug, warn};

use crate::client::{ClientError, RecordApi};
use crate::domain::{InfractionId, InfractionRecord, SignatureImage};
use crate::form::{FetchTicket, RequestSequence};

/// Shown in place of an empty optional value
pub const EMPTY_VALUE: &str = "-";

/// Heading of the notice block
pub const OBSERVATIONS_HEADING: &str = "Observações";

/// Deadline notice printed on every record
pub const LEGAL_NOTICE: &str = "Fica o infrator ciente de que poderá reclamar contra o presente \
     Auto de Infração Ambiental num prazo máximo de 10 dias, após o qual lhe será imposta a \
     multa prevista em Lei.";

/// One labelled line of the rendered record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLine {
    pub label: String,
    pub value: String,
}

impl ViewLine {
    fn new(label: impl Into<String>, value: Option<&str>) -> Self {
        let value = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(EMPTY_VALUE);
        Self {
            label: label.into(),
            value: value.to_string(),
        }
    }

    pub fn text(&self) -> String {
        format!("{}: {}", self.label, self.value)
    }
}

/// A signature image with its caption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSignature {
    pub label: &'static str,
    pub image: SignatureImage,
}

/// Rendered record: title, field lines, witnesses and signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
    pub id: InfractionId,
    pub title: String,
    pub lines: Vec<ViewLine>,
    /// Paragraphs under `OBSERVATIONS_HEADING`
    pub observations: Vec<String>,
    /// Numbered from 1
    pub witnesses: Vec<ViewLine>,
    pub signatures: Vec<LabeledSignature>,
}

impl RecordView {
    pub fn from_record(record: &InfractionRecord) -> Self {
        let r = &record.infraction;
        let data = r.data.map(|d| d.format("%d/%m/%Y").to_string());
        let serie = r.serie.map(|s| s.as_str());
        let registered = record.created_at.format("%d/%m/%Y %H:%M UTC").to_string();

        let lines = vec![
            ViewLine::new("Data", data.as_deref()),
            ViewLine::new("Série", serie),
            ViewLine::new("Nº da Notificação", r.numero_notificacao.as_deref()),
            ViewLine::new("Nome", Some(r.nome.as_str())),
            ViewLine::new("CPF", Some(r.cpf.as_str())),
            ViewLine::new("Telefone", r.telefone.as_deref()),
            ViewLine::new("CEP", r.cep.as_deref()),
            ViewLine::new("Logradouro", r.logradouro.as_deref()),
            ViewLine::new("Bairro", r.bairro.as_deref()),
            ViewLine::new("Cidade", r.cidade.as_deref()),
            ViewLine::new("Estado", r.estado.as_deref()),
            ViewLine::new("Local da Infração", r.local.as_deref()),
            ViewLine::new("Município", r.municipio.as_deref()),
            ViewLine::new("Classificação", Some(r.classificacao.as_str())),
            ViewLine::new("Legislação", r.legislacao.as_deref()),
            ViewLine::new("Multa", r.multa.as_deref()),
            ViewLine::new("Descrição", Some(r.descricao.as_str())),
            ViewLine::new("Registrado em", Some(registered.as_str())),
        ];

        let notificacao = r
            .numero_notificacao
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(EMPTY_VALUE);
        let observations = vec![
            LEGAL_NOTICE.to_string(),
            format!(
                "Este Auto de Infração Ambiental foi gerado em decorrência da notificação nº {notificacao}."
            ),
        ];

        let witnesses = r
            .testemunhas
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let nome = if w.nome.trim().is_empty() { EMPTY_VALUE } else { w.nome.trim() };
                let cpf = if w.cpf.is_empty() { EMPTY_VALUE } else { w.cpf.as_str() };
                ViewLine {
                    label: format!("Testemunha {}", i + 1),
                    value: format!("{} (CPF: {})", nome, cpf),
                }
            })
            .collect();

        let mut signatures = vec![LabeledSignature {
            label: "Assinatura do Notificado",
            image: r.assinatura.clone(),
        }];
        if let Some(agent) = &r.assinatura_agente {
            signatures.push(LabeledSignature {
                label: "Assinatura do Agente",
                image: agent.clone(),
            });
        }

        Self {
            id: record.id,
            title: format!("Auto de Infração #{}", record.id),
            lines,
            observations,
            witnesses,
            signatures,
        }
    }

    /// Every text line in display order, title first
    pub fn text_lines(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(
            self.lines.len() + self.observations.len() + self.witnesses.len() + 3,
        );
        out.push(self.title.clone());
        out.extend(self.lines.iter().map(ViewLine::text));
        out.push(OBSERVATIONS_HEADING.to_string());
        out.extend(self.observations.iter().cloned());
        if !self.witnesses.is_empty() {
            out.push("Testemunhas".to_string());
            out.extend(self.witnesses.iter().map(ViewLine::text));
        }
        out
    }
}

/// Viewer state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
    Loading,
    Loaded(Box<InfractionRecord>),
    NotFound,
}

/// Loads one record and exposes it for rendering
#[derive(Debug)]
pub struct RecordViewer {
    state: ViewerState,
    fetches: RequestSequence,
}

impl Default for RecordViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordViewer {
    pub fn new() -> Self {
        Self {
            state: ViewerState::Loading,
            fetches: RequestSequence::new(),
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// Enter `Loading` and issue a ticket for the fetch about to start.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.state = ViewerState::Loading;
        self.fetches.next()
    }

    /// Apply a fetch result. Returns `false` when the ticket is stale.
    pub fn resolve(
        &mut self,
        ticket: FetchTicket,
        result: Result<Option<InfractionRecord>, ClientError>,
    ) -> bool {
        if !self.fetches.is_latest(ticket) {
            debug!(?ticket, "discarding stale record fetch");
            return false;
        }

        self.state = match result {
            Ok(Some(record)) => ViewerState::Loaded(Box::new(record)),
            Ok(None) => ViewerState::NotFound,
            Err(e) => {
                warn!(error = %e, "failed to fetch infraction record");
                ViewerState::NotFound
            }
        };
        true
    }

    /// Fetch `id` once and resolve.
    pub async fn load(&mut self, api: &dyn RecordApi, id: InfractionId) -> &ViewerState {
        let ticket = self.begin_fetch();
        let result = api.fetch(id).await;
        self.resolve(ticket, result);
        &self.state
    }

    pub fn record(&self) -> Option<&InfractionRecord> {
        match &self.state {
            ViewerState::Loaded(record) => Some(record.as_ref()),
            _ => None,
        }
    }

    pub fn view(&self) -> Option<RecordView> {
        self.record().map(RecordView::from_record)
    }
}

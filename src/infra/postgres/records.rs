//! PostgreSQL record store for production deployments

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::debug;

use crate::domain::{InfractionId, InfractionRecord, NewInfraction, Witness};
use crate::infra::decode::{parse_classificacao, parse_serie, parse_signature};
use crate::infra::{InfractionError, RecordStore, Result};

/// PostgreSQL-backed infraction record store
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a new PostgreSQL record store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded migrations
    pub async fn initialize(&self) -> Result<()> {
        crate::migrations::run_postgres(&self.pool)
            .await
            .map_err(|e| InfractionError::Configuration(e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create(&self, record: NewInfraction) -> Result<InfractionId> {
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO auto_infracoes (
                nome, cpf, telefone,
                cep, logradouro, bairro, cidade, estado,
                descricao, classificacao, legislacao, multa,
                local_infracao, municipio, numero_notificacao,
                data_infracao, serie,
                assinatura, assinatura_agente
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19
            )
            RETURNING id
            "#,
        )
        .bind(&record.nome)
        .bind(&record.cpf)
        .bind(&record.telefone)
        .bind(&record.cep)
        .bind(&record.logradouro)
        .bind(&record.bairro)
        .bind(&record.cidade)
        .bind(&record.estado)
        .bind(&record.descricao)
        .bind(record.classificacao.as_str())
        .bind(&record.legislacao)
        .bind(&record.multa)
        .bind(&record.local)
        .bind(&record.municipio)
        .bind(&record.numero_notificacao)
        .bind(record.data)
        .bind(record.serie.map(|s| s.as_str()))
        .bind(record.assinatura.data_url())
        .bind(record.assinatura_agente.as_ref().map(|s| s.data_url()))
        .fetch_one(&mut *tx)
        .await?;

        for (posicao, witness) in record.testemunhas.iter().enumerate() {
            sqlx::query(
                "INSERT INTO testemunhas (auto_id, posicao, nome, cpf) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(posicao as i32)
            .bind(&witness.nome)
            .bind(&witness.cpf)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(id, witnesses = record.testemunhas.len(), "infraction stored");

        Ok(InfractionId(id))
    }

    async fn get(&self, id: InfractionId) -> Result<Option<InfractionRecord>> {
        let row = sqlx::query_as::<_, PgRecordRow>(
            r#"
            SELECT id, nome, cpf, telefone,
                   cep, logradouro, bairro, cidade, estado,
                   descricao, classificacao, legislacao, multa,
                   local_infracao, municipio, numero_notificacao,
                   data_infracao, serie,
                   assinatura, assinatura_agente, created_at
            FROM auto_infracoes
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let witnesses = sqlx::query_as::<_, (String, String)>(
            "SELECT nome, cpf FROM testemunhas WHERE auto_id = $1 ORDER BY posicao ASC",
        )
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(nome, cpf)| Witness { nome, cpf })
        .collect();

        row.into_record(witnesses).map(Some)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct PgRecordRow {
    id: i64,
    nome: String,
    cpf: String,
    telefone: Option<String>,
    cep: Option<String>,
    logradouro: Option<String>,
    bairro: Option<String>,
    cidade: Option<String>,
    estado: Option<String>,
    descricao: String,
    classificacao: String,
    legislacao: Option<String>,
    multa: Option<String>,
    local_infracao: Option<String>,
    municipio: Option<String>,
    numero_notificacao: Option<String>,
    data_infracao: Option<NaiveDate>,
    serie: Option<String>,
    assinatura: String,
    assinatura_agente: Option<String>,
    created_at: DateTime<Utc>,
}

impl PgRecordRow {
    fn into_record(self, testemunhas: Vec<Witness>) -> Result<InfractionRecord> {
        Ok(InfractionRecord {
            id: InfractionId(self.id),
            created_at: self.created_at,
            infraction: NewInfraction {
                nome: self.nome,
                cpf: self.cpf,
                telefone: self.telefone,
                cep: self.cep,
                logradouro: self.logradouro,
                bairro: self.bairro,
                cidade: self.cidade,
                estado: self.estado,
                descricao: self.descricao,
                classificacao: parse_classificacao(&self.classificacao)?,
                legislacao: self.legislacao,
                multa: self.multa,
                local: self.local_infracao,
                municipio: self.municipio,
                numero_notificacao: self.numero_notificacao,
                data: self.data_infracao,
                serie: self.serie.as_deref().map(parse_serie).transpose()?,
                assinatura: parse_signature("assinatura", &self.assinatura)?,
                assinatura_agente: self
                    .assinatura_agente
                    .as_deref()
                    .map(|s| parse_signature("assinaturaAgente", s))
                    .transpose()?,
                testemunhas,
            },
        })
    }
}

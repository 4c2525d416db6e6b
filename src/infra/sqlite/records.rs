//! SQLite record store for local and development deployments
//!
//! Timestamps and dates are stored as text (RFC 3339 / ISO dates) and parsed
//! back on read.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::debug;

use crate::domain::{InfractionId, InfractionRecord, NewInfraction, Witness};
use crate::infra::decode::{parse_classificacao, parse_serie, parse_signature};
use crate::infra::{InfractionError, RecordStore, Result};

/// SQLite-backed infraction record store
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Create a new store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Single-connection in-memory store with the schema applied
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize the database schema
    pub async fn initialize(&self) -> Result<()> {
        crate::migrations::run_sqlite(&self.pool)
            .await
            .map_err(|e| InfractionError::Configuration(e.to_string()))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn create(&self, record: NewInfraction) -> Result<InfractionId> {
        let mut tx = self.pool.begin().await?;
        let created_at = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO auto_infracoes (
                nome, cpf, telefone,
                cep, logradouro, bairro, cidade, estado,
                descricao, classificacao, legislacao, multa,
                local_infracao, municipio, numero_notificacao,
                data_infracao, serie,
                assinatura, assinatura_agente, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
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
        .bind(record.data.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(record.serie.map(|s| s.as_str()))
        .bind(record.assinatura.data_url())
        .bind(record.assinatura_agente.as_ref().map(|s| s.data_url()))
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();

        for (posicao, witness) in record.testemunhas.iter().enumerate() {
            sqlx::query(
                "INSERT INTO testemunhas (auto_id, posicao, nome, cpf) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(posicao as i64)
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
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, nome, cpf, telefone,
                   cep, logradouro, bairro, cidade, estado,
                   descricao, classificacao, legislacao, multa,
                   local_infracao, municipio, numero_notificacao,
                   data_infracao, serie,
                   assinatura, assinatura_agente, created_at
            FROM auto_infracoes
            WHERE id = ?
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let witnesses = sqlx::query_as::<_, (String, String)>(
            "SELECT nome, cpf FROM testemunhas WHERE auto_id = ? ORDER BY posicao ASC",
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

/// Raw row from the auto_infracoes table
#[derive(Debug, FromRow)]
struct RecordRow {
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
    data_infracao: Option<String>,
    serie: Option<String>,
    assinatura: String,
    assinatura_agente: Option<String>,
    created_at: String,
}

impl RecordRow {
    fn into_record(self, testemunhas: Vec<Witness>) -> Result<InfractionRecord> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| InfractionError::Internal(format!("Invalid created_at: {}", e)))?
            .with_timezone(&Utc);

        let data = self
            .data_infracao
            .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
            .transpose()
            .map_err(|e| InfractionError::Internal(format!("Invalid data_infracao: {}", e)))?;

        Ok(InfractionRecord {
            id: InfractionId(self.id),
            created_at,
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
                data,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signature_image::test_support::tiny_png;
    use crate::domain::{Classificacao, Serie, SignatureImage};

    fn signature(w: u32, h: u32) -> SignatureImage {
        SignatureImage::from_png("assinatura", tiny_png(w, h)).unwrap()
    }

    fn sample() -> NewInfraction {
        NewInfraction::new(
            "Ana Silva",
            "12345678901",
            "Despejo de resíduos",
            Classificacao::Verde,
            signature(5, 4),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let store = SqliteRecordStore::in_memory().await.unwrap();

        let mut record = sample();
        record.telefone = Some("(12) 34567-8901".into());
        record.cep = Some("12460000".into());
        record.local = Some("Rua das Flores, 10".into());
        record.data = NaiveDate::from_ymd_opt(2024, 5, 17);
        record.serie = Some(Serie::A);
        record.assinatura_agente = Some(signature(7, 3));
        record.testemunhas = vec![
            Witness::new("João", "111"),
            Witness::new("Maria", "222"),
            Witness::new("Pedro", "333"),
        ];

        let id = store.create(record.clone()).await.unwrap();
        let loaded = store.get(id).await.unwrap().expect("record should exist");

        assert_eq!(loaded.id, id);
        assert_eq!(loaded.infraction, record);
    }

    #[tokio::test]
    async fn test_ids_are_distinct() {
        let store = SqliteRecordStore::in_memory().await.unwrap();

        let first = store.create(sample()).await.unwrap();
        let second = store.create(sample()).await.unwrap();

        assert_ne!(first, second);
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = SqliteRecordStore::in_memory().await.unwrap();
        assert!(store.get(InfractionId(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ping() {
        let store = SqliteRecordStore::in_memory().await.unwrap();
        store.ping().await.unwrap();
    }
}

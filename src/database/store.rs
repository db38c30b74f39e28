use crate::error::Result;
use crate::models::candidate::Candidate;
use sqlx::{Sqlite, SqlitePool, Transaction};

const CANDIDATE_COLUMNS: &str =
    "id, first_name, last_name, email, recruitment_status, consent_date, created_at";

/// Transactional persistence boundary for candidates and their job-offer
/// associations. Reads that gate the workflow run against the pool; writes go
/// through a [`CandidateTx`].
#[derive(Clone)]
pub struct CandidateStore {
    pool: SqlitePool,
}

impl CandidateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_candidate_by_email(&self, email: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM candidates WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// Returns the ids that exist, in no particular order. Callers compare
    /// counts, not contents.
    pub async fn find_job_offers_by_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT id FROM job_offers WHERE id IN ({})", placeholders);

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn count_candidates(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM candidates")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn find_candidates_paginated(&self, limit: i64, offset: i64) -> Result<Vec<Candidate>> {
        let candidates = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates ORDER BY id LIMIT ? OFFSET ?",
            CANDIDATE_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(candidates)
    }

    pub async fn begin(&self) -> Result<CandidateTx> {
        let tx = self.pool.begin().await?;
        Ok(CandidateTx { tx })
    }
}

/// A single open transaction. Dropping it without calling [`commit`] rolls
/// the transaction back.
///
/// [`commit`]: CandidateTx::commit
pub struct CandidateTx {
    tx: Transaction<'static, Sqlite>,
}

impl CandidateTx {
    /// Inserts the candidate row and returns the generated identifier.
    pub async fn insert_candidate(
        &mut self,
        first_name: &str,
        last_name: &str,
        email: &str,
        recruitment_status: &str,
        consent_date: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO candidates (first_name, last_name, email, recruitment_status, consent_date) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(recruitment_status)
        .bind(consent_date)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn insert_candidate_job_offer(
        &mut self,
        candidate_id: i64,
        job_offer_id: i64,
    ) -> Result<()> {
        sqlx::query("INSERT INTO candidate_job_offers (candidate_id, job_offer_id) VALUES (?, ?)")
            .bind(candidate_id)
            .bind(job_offer_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn find_candidate_by_id(&mut self, id: i64) -> Result<Option<Candidate>> {
        let candidate = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates WHERE id = ?",
            CANDIDATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(candidate)
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, warn};
use url::Url;

use crate::database::store::{CandidateStore, CandidateTx};
use crate::dto::candidate_dto::{
    CandidateListResponse, CandidateSummary, CreatedCandidate, PaginationMeta,
};
use crate::error::{Error, Result};
use crate::services::legacy_service::{LegacyCandidatePayload, LegacyError, LegacySync};

pub const INITIAL_RECRUITMENT_STATUS: &str = "new";
const LEGACY_CANDIDATES_PATH: &str = "/candidates";
const DEFAULT_LEGACY_API_URL: &str = "http://localhost:4040";

#[derive(Debug, Clone, Default)]
pub struct CandidateServiceConfig {
    pub expected_api_key: Option<String>,
    pub legacy_api_key: Option<String>,
    pub legacy_api_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CandidatePayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub job_offer_ids: Vec<i64>,
}

struct ResolvedLegacyApi {
    api_key: String,
    endpoint: String,
}

/// Drives candidate registration end to end: authorization, validation, the
/// store transaction, legacy synchronization, and commit or rollback. A
/// candidate exists in the store if and only if the legacy system accepted it.
#[derive(Clone)]
pub struct CandidateService {
    store: CandidateStore,
    legacy: Arc<dyn LegacySync>,
    config: CandidateServiceConfig,
}

impl CandidateService {
    pub fn new(
        store: CandidateStore,
        legacy: Arc<dyn LegacySync>,
        config: CandidateServiceConfig,
    ) -> Self {
        Self {
            store,
            legacy,
            config,
        }
    }

    /// Exact, case-sensitive match against the configured key. Absent or
    /// empty keys on either side never authorize.
    pub fn is_authorized(&self, api_key: Option<&str>) -> bool {
        match (api_key, self.config.expected_api_key.as_deref()) {
            (Some(provided), Some(expected)) => {
                !provided.is_empty() && !expected.is_empty() && provided == expected
            }
            _ => false,
        }
    }

    pub async fn create_candidate(
        &self,
        payload: &CandidatePayload,
        api_key: Option<&str>,
    ) -> Result<CreatedCandidate> {
        if !self.is_authorized(api_key) {
            return Err(Error::Forbidden);
        }

        let job_offer_ids = normalize_job_offer_ids(&payload.job_offer_ids);
        if job_offer_ids.is_empty() {
            return Err(Error::Validation(vec![
                "At least one valid job offer id must be provided".to_string(),
            ]));
        }

        if self
            .store
            .find_candidate_by_email(&payload.email)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateEmail);
        }

        let matched = self.store.find_job_offers_by_ids(&job_offer_ids).await?;
        if matched.len() != job_offer_ids.len() {
            return Err(Error::Validation(vec![
                "One or more job offers do not exist.".to_string(),
            ]));
        }

        let legacy = self.resolve_legacy_api()?;
        let consent_date = chrono::Utc::now().to_rfc3339();

        let mut tx = self.store.begin().await.map_err(unexpected_store_failure)?;
        let outcome = self
            .register_in_transaction(&mut tx, payload, &job_offer_ids, &legacy, &consent_date)
            .await;

        // Single exit point for the transaction: every path below closes it.
        match outcome {
            Ok(candidate) => {
                tx.commit().await.map_err(unexpected_store_failure)?;
                info!(candidate_id = candidate.id, "candidate created");
                Ok(candidate)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback after failed candidate creation also failed");
                }
                Err(err)
            }
        }
    }

    async fn register_in_transaction(
        &self,
        tx: &mut CandidateTx,
        payload: &CandidatePayload,
        job_offer_ids: &[i64],
        legacy: &ResolvedLegacyApi,
        consent_date: &str,
    ) -> Result<CreatedCandidate> {
        let candidate_id = tx
            .insert_candidate(
                &payload.first_name,
                &payload.last_name,
                &payload.email,
                INITIAL_RECRUITMENT_STATUS,
                consent_date,
            )
            .await
            .map_err(unexpected_store_failure)?;

        if candidate_id <= 0 {
            return Err(Error::MissingCandidateId);
        }

        for &job_offer_id in job_offer_ids {
            tx.insert_candidate_job_offer(candidate_id, job_offer_id)
                .await
                .map_err(unexpected_store_failure)?;
        }

        let notification = LegacyCandidatePayload {
            first_name: payload.first_name.clone(),
            last_name: payload.last_name.clone(),
            email: payload.email.clone(),
        };

        let response = match self
            .legacy
            .notify(&legacy.endpoint, &legacy.api_key, &notification)
            .await
        {
            Ok(response) => response,
            Err(LegacyError::Transport(reason)) => {
                warn!(reason = %reason, "legacy API call failed at transport level");
                return Err(Error::LegacyUnreachable);
            }
        };

        if !response.ok {
            let status = if (400..=599).contains(&response.status) {
                response.status
            } else {
                502
            };
            let message = response.message().unwrap_or_else(|| {
                "Failed to synchronize candidate with legacy API.".to_string()
            });
            return Err(Error::LegacyRejected { status, message });
        }

        let candidate = tx
            .find_candidate_by_id(candidate_id)
            .await
            .map_err(unexpected_store_failure)?
            .ok_or(Error::CandidateNotPersisted)?;

        Ok(CreatedCandidate {
            id: candidate.id,
            first_name: candidate.first_name,
            last_name: candidate.last_name,
            email: candidate.email,
            created_at: candidate.created_at,
            job_offer_ids: job_offer_ids.to_vec(),
        })
    }

    pub async fn get_candidates(&self, page: i64, limit: i64) -> Result<CandidateListResponse> {
        // Extreme page numbers must not overflow; a saturated offset lands
        // past the last row and yields an empty page.
        let offset = page.saturating_sub(1).saturating_mul(limit);
        let (total_items, candidates) = tokio::try_join!(
            self.store.count_candidates(),
            self.store.find_candidates_paginated(limit, offset),
        )?;

        let total_pages = if limit > 0 {
            (total_items + limit - 1) / limit
        } else {
            0
        };

        Ok(CandidateListResponse {
            data: candidates
                .into_iter()
                .map(|candidate| CandidateSummary {
                    id: candidate.id,
                    first_name: candidate.first_name,
                    last_name: candidate.last_name,
                    email: candidate.email,
                    created_at: candidate.created_at,
                })
                .collect(),
            meta: PaginationMeta {
                page,
                limit,
                total_items,
                total_pages,
            },
        })
    }

    /// Ordered fallback: service-level legacy key, then the inbound key; the
    /// base URL falls back to the local default. Empty strings never resolve.
    fn resolve_legacy_api(&self) -> Result<ResolvedLegacyApi> {
        let api_key = self
            .config
            .legacy_api_key
            .clone()
            .or_else(|| self.config.expected_api_key.clone())
            .filter(|key| !key.is_empty())
            .ok_or(Error::LegacyKeyMissing)?;

        let base = self
            .config
            .legacy_api_url
            .as_deref()
            .unwrap_or(DEFAULT_LEGACY_API_URL);
        let endpoint = Url::parse(base)
            .and_then(|url| url.join(LEGACY_CANDIDATES_PATH))
            .map_err(|_| Error::LegacyUrlInvalid)?
            .to_string();

        Ok(ResolvedLegacyApi { api_key, endpoint })
    }
}

/// Drops non-positive ids and duplicates, keeping first-seen order.
pub fn normalize_job_offer_ids(raw: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    raw.iter()
        .copied()
        .filter(|id| *id > 0)
        .filter(|id| seen.insert(*id))
        .collect()
}

fn unexpected_store_failure(err: Error) -> Error {
    if let Error::Database(sqlx::Error::Database(db_err)) = &err {
        // The UNIQUE(email) constraint is the backstop for the advisory
        // duplicate check that runs before the transaction opens.
        if db_err.is_unique_violation() {
            return Error::DuplicateEmail;
        }
    }
    error!(error = %err, "store failure during candidate creation");
    Error::CreateFailed
}

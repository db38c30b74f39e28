pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::database::store::CandidateStore;
use crate::services::candidate_service::{CandidateService, CandidateServiceConfig};
use crate::services::legacy_service::LegacyClient;

#[derive(Clone)]
pub struct AppState {
    pub candidate_service: CandidateService,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        let config = crate::config::get_config();

        let store = CandidateStore::new(pool);
        let legacy_client = Arc::new(LegacyClient::new());
        let service_config = CandidateServiceConfig {
            expected_api_key: config.api_key.clone(),
            legacy_api_key: config.legacy_api_key.clone(),
            legacy_api_url: config.legacy_api_url.clone(),
        };
        let candidate_service = CandidateService::new(store, legacy_client, service_config);

        Self { candidate_service }
    }
}

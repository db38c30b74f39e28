use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A candidate row as persisted. Timestamps stay in the store-native text
/// representation and are surfaced verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub recruitment_status: String,
    pub consent_date: String,
    pub created_at: String,
}

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::dto::candidate_dto::{
    validation_messages, CreateCandidateRequest, CreateCandidateResponse, ListCandidatesQuery,
};
use crate::error::{Error, Result};
use crate::services::candidate_service::CandidatePayload;
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
}

pub async fn create_candidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateCandidateRequest>,
) -> Result<impl IntoResponse> {
    let api_key = api_key(&headers);

    // The workflow re-checks the key; this rejection runs before body
    // validation.
    if !state.candidate_service.is_authorized(api_key) {
        return Err(Error::Forbidden);
    }

    if let Err(errors) = request.validate() {
        return Err(Error::Validation(validation_messages(&errors)));
    }

    let payload = CandidatePayload {
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
        job_offer_ids: request.job_offer_ids,
    };

    let candidate = state
        .candidate_service
        .create_candidate(&payload, api_key)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCandidateResponse {
            message: "Candidate added successfully".to_string(),
            candidate,
        }),
    ))
}

pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<ListCandidatesQuery>,
) -> Result<impl IntoResponse> {
    let page = query.page.filter(|page| *page >= 1).unwrap_or(1);
    let limit = query.limit.filter(|limit| *limit >= 1).unwrap_or(10);

    let result = state.candidate_service.get_candidates(page, limit).await?;
    Ok(Json(result))
}

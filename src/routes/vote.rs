use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, header::AUTHORIZATION},
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::vote::{VoteRequest, VoteResponse, VoteScope},
    error::{AppError, ServiceError},
    services::votes::{self, VoteReceipt},
    state::SharedState,
};

/// Vote ingestion endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/communities/{community}/vote", post(cast_vote))
}

#[utoipa::path(
    post,
    path = "/communities/{community}/vote",
    tag = "vote",
    params(("community" = String, Path, description = "Community identifier")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = VoteResponse),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Missing or wrong bearer token"),
        (status = 404, description = "Unknown community or team"),
        (status = 409, description = "Voting closed, or the voter already voted")
    )
)]
/// Record one vote for the community's current ballot.
pub async fn cast_vote(
    State(state): State<SharedState>,
    Path(community): Path<String>,
    headers: HeaderMap,
    Valid(Json(payload)): Valid<Json<VoteRequest>>,
) -> Result<Json<VoteResponse>, AppError> {
    let config = state
        .store()
        .load_config(community.clone())
        .await
        .map_err(ServiceError::from)?
        .unwrap_or_default();
    if let Some(expected) = &config.vote_token {
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            return Err(AppError::Unauthorized("invalid vote token".into()));
        }
    }

    if state
        .store()
        .load_competition(community.clone())
        .await
        .map_err(ServiceError::from)?
        .is_none()
    {
        return Err(AppError::NotFound(format!(
            "no competition is running in `{community}`"
        )));
    }

    let receipt = votes::cast_vote(&state, &community, payload.voter, &payload.team).await?;
    let response = match receipt {
        VoteReceipt::Weekly(week) => VoteResponse {
            week: week.to_string(),
            scope: VoteScope::Weekly,
        },
        VoteReceipt::FaceOff(week) => VoteResponse {
            week: week.to_string(),
            scope: VoteScope::FaceOff,
        },
    };
    Ok(Json(response))
}

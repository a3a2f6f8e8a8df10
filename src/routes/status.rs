use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::status::{
        HistoryResponse, LeaderboardResponse, StatusResponse, SubmissionsResponse, VotingResponse,
    },
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Read-only endpoints that expose one community's competition state.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/communities/{community}/status", get(get_status))
        .route("/communities/{community}/submissions", get(get_submissions))
        .route("/communities/{community}/voting", get(get_voting))
        .route("/communities/{community}/history", get(get_history))
        .route("/communities/{community}/leaderboard", get(get_leaderboard))
}

#[utoipa::path(
    get,
    path = "/communities/{community}/status",
    tag = "status",
    params(("community" = String, Path, description = "Community identifier")),
    responses(
        (status = 200, description = "Current competition status", body = StatusResponse),
        (status = 404, description = "Unknown community")
    )
)]
/// Return the phase, theme and deadlines of the current week.
pub async fn get_status(
    State(state): State<SharedState>,
    Path(community): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let payload = public_service::get_status(&state, &community).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/communities/{community}/submissions",
    tag = "status",
    params(("community" = String, Path, description = "Community identifier")),
    responses(
        (status = 200, description = "Teams registered this week", body = SubmissionsResponse),
        (status = 404, description = "Unknown community")
    )
)]
/// Return this week's registered teams and their tracks.
pub async fn get_submissions(
    State(state): State<SharedState>,
    Path(community): Path<String>,
) -> Result<Json<SubmissionsResponse>, AppError> {
    let payload = public_service::get_submissions(&state, &community).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/communities/{community}/voting",
    tag = "status",
    params(("community" = String, Path, description = "Community identifier")),
    responses(
        (status = 200, description = "Current tally and face-off standing", body = VotingResponse),
        (status = 404, description = "Unknown community")
    )
)]
/// Return the current tally and any running face-off.
pub async fn get_voting(
    State(state): State<SharedState>,
    Path(community): Path<String>,
) -> Result<Json<VotingResponse>, AppError> {
    let payload = public_service::get_voting(&state, &community).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/communities/{community}/history",
    tag = "status",
    params(("community" = String, Path, description = "Community identifier")),
    responses((status = 200, description = "Winner history", body = HistoryResponse))
)]
/// Return past winners, most recent week first.
pub async fn get_history(
    State(state): State<SharedState>,
    Path(community): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let payload = public_service::get_history(&state, &community).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/communities/{community}/leaderboard",
    tag = "status",
    params(("community" = String, Path, description = "Community identifier")),
    responses((status = 200, description = "All-time standings", body = LeaderboardResponse))
)]
/// Return the all-time standings ranked by weeks won.
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Path(community): Path<String>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let payload = public_service::get_leaderboard(&state, &community).await?;
    Ok(Json(payload))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Beat League Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::status::get_status,
        crate::routes::status::get_submissions,
        crate::routes::status::get_voting,
        crate::routes::status::get_history,
        crate::routes::status::get_leaderboard,
        crate::routes::vote::cast_vote,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::status::StatusResponse,
            crate::dto::status::SubmissionsResponse,
            crate::dto::status::TeamEntry,
            crate::dto::status::VotingResponse,
            crate::dto::status::TallyEntry,
            crate::dto::status::FaceOffView,
            crate::dto::status::HistoryResponse,
            crate::dto::status::WinnerEntry,
            crate::dto::status::LeaderboardResponse,
            crate::dto::status::LeaderboardEntry,
            crate::dto::vote::VoteRequest,
            crate::dto::vote::VoteResponse,
            crate::dto::vote::VoteScope,
            crate::collab::metadata::TrackMetadata,
            crate::state::week::Phase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "status", description = "Read-only competition projections"),
        (name = "vote", description = "Vote ingestion"),
    )
)]
pub struct ApiDoc;

use serde::Serialize;
use utoipa::ToSchema;

/// Coarse health of the competition backend, returned by `/healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when the state store answers its probe, `degraded` otherwise.
    pub status: String,
}

impl HealthResponse {
    /// The state store answered; scheduler and API can make progress.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// The state store failed its probe; the process is up but transitions
    /// and votes will fail until it recovers.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}

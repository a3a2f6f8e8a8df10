//! Vote ingestion payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// A vote submitted through the HTTP API.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VoteRequest {
    /// Identity of the voter.
    #[validate(length(min = 1, max = 128))]
    pub voter: String,
    /// Team the vote goes to (matched case-insensitively).
    #[validate(length(min = 1, max = 128))]
    pub team: String,
}

/// Where an accepted vote was counted.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteScope {
    /// The weekly tally.
    Weekly,
    /// The running tie face-off.
    FaceOff,
}

/// Acknowledgement of an accepted vote.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoteResponse {
    /// Week the vote was counted in.
    pub week: String,
    /// Tally the vote was counted in.
    pub scope: VoteScope,
}

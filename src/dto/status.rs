//! Read-only projections of a community's competition state.

use serde::Serialize;
use utoipa::ToSchema;

use crate::collab::metadata::TrackMetadata;
use crate::state::week::Phase;

/// Snapshot of where the competition stands for one community.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Current week, e.g. `2025-W07`.
    pub week: String,
    /// Current phase.
    pub phase: Phase,
    /// Theme of the current week.
    pub theme: String,
    /// Teams competing this week.
    pub team_count: u32,
    /// When submissions close (RFC 3339).
    pub submission_deadline: String,
    /// When voting closes (RFC 3339).
    pub voting_deadline: String,
    /// True while a tie face-off is running.
    pub faceoff_active: bool,
}

/// One registered team, with whatever metadata the provider knows about its
/// track.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamEntry {
    /// Team name.
    pub name: String,
    /// The two team members.
    pub members: Vec<String>,
    /// When the submission was accepted (RFC 3339).
    pub submitted_at: String,
    /// External track reference, absent for attachment-only submissions.
    pub track_reference: Option<String>,
    /// Provider metadata, when available.
    pub metadata: Option<TrackMetadata>,
}

/// All teams registered for the current week.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionsResponse {
    /// Week the teams belong to.
    pub week: String,
    /// Registered teams, in registration order.
    pub teams: Vec<TeamEntry>,
}

/// One line of a tally.
#[derive(Debug, Serialize, ToSchema)]
pub struct TallyEntry {
    /// Team name.
    pub team: String,
    /// Votes counted so far.
    pub votes: u32,
}

/// A running face-off, as shown to voters.
#[derive(Debug, Serialize, ToSchema)]
pub struct FaceOffView {
    /// Tied teams competing in the face-off.
    pub teams: Vec<String>,
    /// When the face-off closes (RFC 3339).
    pub deadline: String,
    /// Current face-off counts.
    pub results: Vec<TallyEntry>,
}

/// State of the current vote.
#[derive(Debug, Serialize, ToSchema)]
pub struct VotingResponse {
    /// Week being voted on.
    pub week: String,
    /// True while votes are being accepted.
    pub open: bool,
    /// Weekly tally in team-registration order.
    pub tally: Vec<TallyEntry>,
    /// Face-off details while one is running.
    pub faceoff: Option<FaceOffView>,
}

/// One past weekly winner.
#[derive(Debug, Serialize, ToSchema)]
pub struct WinnerEntry {
    /// Week that was won.
    pub week: String,
    /// Winning team name.
    pub team_name: String,
    /// The winning pair.
    pub members: Vec<String>,
    /// True when the winner was drawn at random after a tied face-off.
    pub random_pick: bool,
    /// When the winner was determined (RFC 3339).
    pub decided_at: String,
}

/// Winner history, most recent first.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    /// Past winners.
    pub winners: Vec<WinnerEntry>,
}

/// One member's all-time standing.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// Member identity.
    pub user: String,
    /// Weeks won.
    pub wins: u32,
}

/// All-time standings, best first.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Ranked members; ties sort by identity.
    pub entries: Vec<LeaderboardEntry>,
}

use std::collections::BTreeMap;

use futures::future::BoxFuture;

use crate::dao::models::{
    CommunityConfig, CommunityId, CompetitionRecord, FaceOffRecord, PendingAnnouncementRecord,
    TeamRecord, UserId, WeeklyWinnerRecord,
};
use crate::dao::storage::StorageResult;
use crate::state::week::WeekId;

/// Abstraction over the durable per-community state store.
///
/// Writes for a given `(community, week)` are serialized by the callers (the
/// keyed lock registry in `AppState`), so implementations only need each
/// individual operation to be atomic.
pub trait StateStore: Send + Sync {
    /// Per-community configuration record.
    fn load_config(
        &self,
        community: CommunityId,
    ) -> BoxFuture<'static, StorageResult<Option<CommunityConfig>>>;
    /// Persist the per-community configuration record.
    fn save_config(
        &self,
        community: CommunityId,
        config: CommunityConfig,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Competition state owned by the phase scheduler.
    fn load_competition(
        &self,
        community: CommunityId,
    ) -> BoxFuture<'static, StorageResult<Option<CompetitionRecord>>>;
    /// Persist the competition state.
    fn save_competition(
        &self,
        community: CommunityId,
        record: CompetitionRecord,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Teams registered for one week, in registration order.
    fn load_teams(
        &self,
        community: CommunityId,
        week: WeekId,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamRecord>>>;
    /// Replace the team list for one week.
    fn save_teams(
        &self,
        community: CommunityId,
        week: WeekId,
        teams: Vec<TeamRecord>,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Recorded votes for one week (voter to team name).
    fn load_votes(
        &self,
        community: CommunityId,
        week: WeekId,
    ) -> BoxFuture<'static, StorageResult<BTreeMap<UserId, String>>>;
    /// Replace the vote map for one week.
    fn save_votes(
        &self,
        community: CommunityId,
        week: WeekId,
        votes: BTreeMap<UserId, String>,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// The active face-off, if any (at most one per community).
    fn load_faceoff(
        &self,
        community: CommunityId,
    ) -> BoxFuture<'static, StorageResult<Option<FaceOffRecord>>>;
    /// Install or clear the active face-off.
    fn save_faceoff(
        &self,
        community: CommunityId,
        faceoff: Option<FaceOffRecord>,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// The single pending announcement slot.
    fn load_pending(
        &self,
        community: CommunityId,
    ) -> BoxFuture<'static, StorageResult<Option<PendingAnnouncementRecord>>>;
    /// Fill or clear the pending announcement slot (last writer wins).
    fn save_pending(
        &self,
        community: CommunityId,
        pending: Option<PendingAnnouncementRecord>,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Full winner history, oldest first.
    fn load_winners(
        &self,
        community: CommunityId,
    ) -> BoxFuture<'static, StorageResult<Vec<WeeklyWinnerRecord>>>;
    /// Append one winner record (one per week maximum).
    fn append_winner(
        &self,
        community: CommunityId,
        winner: WeeklyWinnerRecord,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Communities with stored competition state, for the scheduler sweep.
    fn list_communities(&self) -> BoxFuture<'static, StorageResult<Vec<CommunityId>>>;

    /// Cheap reachability probe for the health endpoint.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

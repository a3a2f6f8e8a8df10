//! In-process state-store backend backed by concurrent maps.
//!
//! The production deployment swaps in a durable backend behind the same
//! [`StateStore`] seam; this one serves the standalone binary and the tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::models::{
    CommunityConfig, CommunityId, CompetitionRecord, FaceOffRecord, PendingAnnouncementRecord,
    TeamRecord, UserId, WeeklyWinnerRecord,
};
use crate::dao::storage::StorageResult;
use crate::dao::store::StateStore;
use crate::state::week::WeekId;

/// Volatile [`StateStore`] implementation keyed by community and week.
#[derive(Default)]
pub struct MemoryStore {
    configs: DashMap<CommunityId, CommunityConfig>,
    competitions: DashMap<CommunityId, CompetitionRecord>,
    teams: DashMap<(CommunityId, WeekId), Vec<TeamRecord>>,
    votes: DashMap<(CommunityId, WeekId), BTreeMap<UserId, String>>,
    faceoffs: DashMap<CommunityId, FaceOffRecord>,
    pending: DashMap<CommunityId, PendingAnnouncementRecord>,
    winners: DashMap<CommunityId, Vec<WeeklyWinnerRecord>>,
}

impl MemoryStore {
    /// Create an empty store wrapped in an [`Arc`] ready for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

fn ready<T: Send + 'static>(value: T) -> BoxFuture<'static, StorageResult<T>> {
    Box::pin(async move { Ok(value) })
}

impl StateStore for MemoryStore {
    fn load_config(
        &self,
        community: CommunityId,
    ) -> BoxFuture<'static, StorageResult<Option<CommunityConfig>>> {
        ready(self.configs.get(&community).map(|entry| entry.clone()))
    }

    fn save_config(
        &self,
        community: CommunityId,
        config: CommunityConfig,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.configs.insert(community, config);
        ready(())
    }

    fn load_competition(
        &self,
        community: CommunityId,
    ) -> BoxFuture<'static, StorageResult<Option<CompetitionRecord>>> {
        ready(self.competitions.get(&community).map(|entry| entry.clone()))
    }

    fn save_competition(
        &self,
        community: CommunityId,
        record: CompetitionRecord,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.competitions.insert(community, record);
        ready(())
    }

    fn load_teams(
        &self,
        community: CommunityId,
        week: WeekId,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamRecord>>> {
        ready(
            self.teams
                .get(&(community, week))
                .map(|entry| entry.clone())
                .unwrap_or_default(),
        )
    }

    fn save_teams(
        &self,
        community: CommunityId,
        week: WeekId,
        teams: Vec<TeamRecord>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.teams.insert((community, week), teams);
        ready(())
    }

    fn load_votes(
        &self,
        community: CommunityId,
        week: WeekId,
    ) -> BoxFuture<'static, StorageResult<BTreeMap<UserId, String>>> {
        ready(
            self.votes
                .get(&(community, week))
                .map(|entry| entry.clone())
                .unwrap_or_default(),
        )
    }

    fn save_votes(
        &self,
        community: CommunityId,
        week: WeekId,
        votes: BTreeMap<UserId, String>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.votes.insert((community, week), votes);
        ready(())
    }

    fn load_faceoff(
        &self,
        community: CommunityId,
    ) -> BoxFuture<'static, StorageResult<Option<FaceOffRecord>>> {
        ready(self.faceoffs.get(&community).map(|entry| entry.clone()))
    }

    fn save_faceoff(
        &self,
        community: CommunityId,
        faceoff: Option<FaceOffRecord>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        match faceoff {
            Some(record) => {
                self.faceoffs.insert(community, record);
            }
            None => {
                self.faceoffs.remove(&community);
            }
        }
        ready(())
    }

    fn load_pending(
        &self,
        community: CommunityId,
    ) -> BoxFuture<'static, StorageResult<Option<PendingAnnouncementRecord>>> {
        ready(self.pending.get(&community).map(|entry| entry.clone()))
    }

    fn save_pending(
        &self,
        community: CommunityId,
        pending: Option<PendingAnnouncementRecord>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        match pending {
            Some(record) => {
                self.pending.insert(community, record);
            }
            None => {
                self.pending.remove(&community);
            }
        }
        ready(())
    }

    fn load_winners(
        &self,
        community: CommunityId,
    ) -> BoxFuture<'static, StorageResult<Vec<WeeklyWinnerRecord>>> {
        ready(
            self.winners
                .get(&community)
                .map(|entry| entry.clone())
                .unwrap_or_default(),
        )
    }

    fn append_winner(
        &self,
        community: CommunityId,
        winner: WeeklyWinnerRecord,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.winners.entry(community).or_default().push(winner);
        ready(())
    }

    fn list_communities(&self) -> BoxFuture<'static, StorageResult<Vec<CommunityId>>> {
        ready(
            self.competitions
                .iter()
                .map(|entry| entry.key().clone())
                .collect(),
        )
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        ready(())
    }
}

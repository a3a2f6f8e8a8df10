//! Vote tally: one vote per voter per week, plus the separate face-off tally.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use time::OffsetDateTime;
use tracing::info;

use crate::dao::models::{CommunityId, FaceOffRecord, UserId};
use crate::error::ServiceError;
use crate::state::SharedState;
use crate::state::week::{Phase, WeekId};

/// Where a cast vote was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteReceipt {
    /// Counted in the weekly tally for this week.
    Weekly(WeekId),
    /// Counted in the active face-off, which is separate from the weekly
    /// tally.
    FaceOff(WeekId),
}

/// Record a vote for the community's current ballot.
///
/// While a face-off is active (and its deadline has not passed) votes go to
/// the face-off tally; otherwise voting must be open and the vote lands in
/// the weekly tally. Both paths are an atomic check-and-record under the
/// per-`(community, week)` lock, so a voter is never recorded twice even
/// under concurrent duplicate requests.
pub async fn cast_vote(
    state: &SharedState,
    community: &CommunityId,
    voter: UserId,
    team_name: &str,
) -> Result<VoteReceipt, ServiceError> {
    let now = OffsetDateTime::now_utc();
    if let Some(faceoff) = state.store().load_faceoff(community.clone()).await?
        && now < faceoff.deadline
    {
        return cast_faceoff_vote(state, community, &faceoff, voter, team_name).await;
    }

    let week = state
        .store()
        .load_competition(community.clone())
        .await?
        .ok_or_else(|| {
            ServiceError::InvalidState("the competition is not active in this community".into())
        })?
        .week;

    let lock = state.week_lock(community, week);
    let _guard = lock.lock().await;

    // Re-check under the lock: the record read for routing may predate a
    // resolution that closed voting while this request waited.
    let competition = state
        .store()
        .load_competition(community.clone())
        .await?
        .ok_or_else(|| {
            ServiceError::InvalidState("the competition is not active in this community".into())
        })?;
    if competition.phase != Phase::Voting || competition.week != week {
        return Err(ServiceError::InvalidState(format!(
            "voting is not open (current phase: {:?})",
            competition.phase
        )));
    }

    let mut votes = state.store().load_votes(community.clone(), week).await?;
    if let Some(previous) = votes.get(&voter) {
        return Err(ServiceError::Conflict(format!(
            "already voted this week (for `{previous}`)"
        )));
    }

    let teams = state.store().load_teams(community.clone(), week).await?;
    let Some(team) = teams
        .iter()
        .find(|team| team.name.eq_ignore_ascii_case(team_name))
    else {
        return Err(ServiceError::NotFound(format!(
            "no team named `{team_name}` this week"
        )));
    };

    votes.insert(voter.clone(), team.name.clone());
    state
        .store()
        .save_votes(community.clone(), week, votes)
        .await?;

    info!(%community, %week, %voter, team = %team.name, "vote recorded");
    Ok(VoteReceipt::Weekly(week))
}

/// Record a face-off vote, keyed by the face-off instance rather than the
/// week. Never touches the weekly tally.
async fn cast_faceoff_vote(
    state: &SharedState,
    community: &CommunityId,
    faceoff: &FaceOffRecord,
    voter: UserId,
    team_name: &str,
) -> Result<VoteReceipt, ServiceError> {
    let lock = state.week_lock(community, faceoff.week);
    let _guard = lock.lock().await;

    // Reload under the lock; the copy used for routing may be stale.
    let Some(mut faceoff) = state.store().load_faceoff(community.clone()).await? else {
        return Err(ServiceError::InvalidState(
            "the face-off just resolved; no further votes accepted".into(),
        ));
    };

    if let Some(previous) = faceoff.votes.get(&voter) {
        return Err(ServiceError::Conflict(format!(
            "already voted in this face-off (for `{previous}`)"
        )));
    }

    let Some(team) = faceoff
        .teams
        .iter()
        .find(|team| team.eq_ignore_ascii_case(team_name))
        .cloned()
    else {
        return Err(ServiceError::NotFound(format!(
            "`{team_name}` is not part of the face-off"
        )));
    };

    let week = faceoff.week;
    faceoff.votes.insert(voter.clone(), team.clone());
    state
        .store()
        .save_faceoff(community.clone(), Some(faceoff))
        .await?;

    info!(%community, %week, %voter, %team, "face-off vote recorded");
    Ok(VoteReceipt::FaceOff(week))
}

/// Weekly tally in team-registration order, with explicit zero counts.
///
/// Always recomputed from the recorded votes; no cached tally is trusted
/// across concurrent operations.
pub async fn tally(
    state: &SharedState,
    community: &CommunityId,
    week: WeekId,
) -> Result<IndexMap<String, u32>, ServiceError> {
    let teams = state.store().load_teams(community.clone(), week).await?;
    let votes = state.store().load_votes(community.clone(), week).await?;

    let mut counts: IndexMap<String, u32> = teams
        .iter()
        .map(|team| (team.name.clone(), 0))
        .collect();
    let mut stray: Vec<&str> = Vec::new();
    for team in votes.values() {
        match counts.get_mut(team) {
            Some(count) => *count += 1,
            None => stray.push(team),
        }
    }

    if !tally_consistent(&counts, &votes) {
        return Err(ServiceError::Invariant(format!(
            "{} vote(s) in {week} reference unregistered teams: {}",
            stray.len(),
            stray.join(", ")
        )));
    }

    Ok(counts)
}

/// Consistency check: the tally must account for every recorded vote. A
/// shortfall means a recorded vote references a team that is no longer
/// registered, which cast-time validation should have made impossible.
pub fn tally_consistent(counts: &IndexMap<String, u32>, votes: &BTreeMap<UserId, String>) -> bool {
    counts.values().sum::<u32>() as usize == votes.len()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::collab::dev::{DevChat, DevMetadata, DevRewards, DevThemes};
    use crate::dao::memory::MemoryStore;
    use crate::dao::models::{CompetitionRecord, TeamRecord};
    use crate::state::AppState;
    use uuid::Uuid;

    use super::*;

    fn test_state() -> SharedState {
        AppState::new(
            MemoryStore::shared(),
            Arc::new(DevChat::permissive()),
            Arc::new(DevThemes),
            Arc::new(DevRewards::succeeding()),
            Arc::new(DevMetadata),
        )
    }

    async fn open_voting(state: &SharedState, community: &str, week: WeekId, teams: &[&str]) {
        let mut record = CompetitionRecord::inactive(week);
        record.phase = Phase::Voting;
        state
            .store()
            .save_competition(community.into(), record)
            .await
            .unwrap();

        let teams: Vec<TeamRecord> = teams
            .iter()
            .enumerate()
            .map(|(i, name)| TeamRecord {
                name: (*name).to_string(),
                members: [format!("a{i}"), format!("b{i}")],
                submitted_at: OffsetDateTime::now_utc(),
                track_reference: None,
            })
            .collect();
        state
            .store()
            .save_teams(community.into(), week, teams)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn duplicate_vote_conflicts_and_reports_previous_choice() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        open_voting(&state, &community, week, &["Moonlight", "Starfall"]).await;

        cast_vote(&state, &community, "alice".into(), "Moonlight")
            .await
            .unwrap();
        let err = cast_vote(&state, &community, "alice".into(), "Starfall")
            .await
            .unwrap_err();
        match err {
            ServiceError::Conflict(message) => assert!(message.contains("Moonlight")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_team_is_rejected() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        open_voting(&state, &community, week, &["Moonlight"]).await;

        let err = cast_vote(&state, &community, "alice".into(), "Nobody")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn team_name_matching_is_case_insensitive() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        open_voting(&state, &community, week, &["Moonlight"]).await;

        cast_vote(&state, &community, "alice".into(), "moonlight")
            .await
            .unwrap();
        let counts = tally(&state, &community, week).await.unwrap();
        assert_eq!(counts.get("Moonlight"), Some(&1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_distinct_voters_all_count() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        open_voting(&state, &community, week, &["Moonlight"]).await;

        let mut tasks = Vec::new();
        for i in 0..16 {
            let state = state.clone();
            let community = community.clone();
            tasks.push(tokio::spawn(async move {
                cast_vote(&state, &community, format!("voter-{i}"), "Moonlight").await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let counts = tally(&state, &community, week).await.unwrap();
        assert_eq!(counts.get("Moonlight"), Some(&16));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_votes_admit_exactly_one() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        open_voting(&state, &community, week, &["Moonlight", "Starfall"]).await;

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let state = state.clone();
            let community = community.clone();
            tasks.push(tokio::spawn(async move {
                cast_vote(&state, &community, "alice".into(), "Moonlight").await
            }));
        }

        let mut successes = 0;
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(ServiceError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 15);

        let counts = tally(&state, &community, week).await.unwrap();
        assert_eq!(counts.values().sum::<u32>(), 1);
    }

    #[tokio::test]
    async fn tally_sum_equals_recorded_vote_count() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        open_voting(&state, &community, week, &["Moonlight", "Starfall"]).await;

        for (voter, team) in [("a", "Moonlight"), ("b", "Moonlight"), ("c", "Starfall")] {
            cast_vote(&state, &community, voter.into(), team)
                .await
                .unwrap();
        }

        let counts = tally(&state, &community, week).await.unwrap();
        let votes = state.store().load_votes(community.clone(), week).await.unwrap();
        assert_eq!(counts.values().sum::<u32>() as usize, votes.len());
        assert!(tally_consistent(&counts, &votes));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn vote_waiting_on_resolution_is_rejected_once_voting_closed() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        open_voting(&state, &community, week, &["Moonlight"]).await;

        // Hold the week lock the way resolution does, park a vote on it,
        // then close voting before releasing.
        let lock = state.week_lock(&community, week);
        let guard = lock.lock().await;

        let parked = {
            let state = state.clone();
            let community = community.clone();
            tokio::spawn(
                async move { cast_vote(&state, &community, "late".into(), "Moonlight").await },
            )
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut record = state
            .store()
            .load_competition(community.clone())
            .await
            .unwrap()
            .unwrap();
        record.phase = Phase::Ended;
        record.winner_announced = true;
        state
            .store()
            .save_competition(community.clone(), record)
            .await
            .unwrap();
        drop(guard);

        let err = parked.await.unwrap().unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        let votes = state.store().load_votes(community.clone(), week).await.unwrap();
        assert!(votes.is_empty());
    }

    #[tokio::test]
    async fn vote_for_a_vanished_team_fails_the_tally() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        open_voting(&state, &community, week, &["Moonlight"]).await;

        // A vote referencing a team with no surviving record.
        state
            .store()
            .save_votes(
                community.clone(),
                week,
                BTreeMap::from([("drifter".to_string(), "Ghost".to_string())]),
            )
            .await
            .unwrap();

        let err = tally(&state, &community, week).await.unwrap_err();
        match err {
            ServiceError::Invariant(message) => assert!(message.contains("Ghost")),
            other => panic!("expected invariant failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn active_faceoff_receives_votes_instead_of_weekly_tally() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        open_voting(&state, &community, week, &["Moonlight", "Starfall"]).await;

        let faceoff = FaceOffRecord {
            id: Uuid::new_v4(),
            week,
            teams: vec!["Moonlight".into(), "Starfall".into()],
            deadline: OffsetDateTime::now_utc() + time::Duration::hours(24),
            votes: BTreeMap::new(),
        };
        state
            .store()
            .save_faceoff(community.clone(), Some(faceoff))
            .await
            .unwrap();

        let receipt = cast_vote(&state, &community, "alice".into(), "Starfall")
            .await
            .unwrap();
        assert_eq!(receipt, VoteReceipt::FaceOff(week));

        // The weekly tally is untouched.
        let counts = tally(&state, &community, week).await.unwrap();
        assert_eq!(counts.values().sum::<u32>(), 0);

        let stored = state
            .store()
            .load_faceoff(community.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.results().get("Starfall"), Some(&1));
    }
}

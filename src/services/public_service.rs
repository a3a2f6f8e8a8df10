//! Service helpers that expose read-only projections of the competition.

use crate::dao::models::{CommunityId, CompetitionRecord};
use crate::dto::format_timestamp;
use crate::dto::status::{
    FaceOffView, HistoryResponse, LeaderboardEntry, LeaderboardResponse, StatusResponse,
    SubmissionsResponse, TallyEntry, TeamEntry, VotingResponse, WinnerEntry,
};
use crate::error::ServiceError;
use crate::services::{teams, votes};
use crate::state::SharedState;
use crate::state::week::{self, Phase};

/// Return the phase, theme and deadlines of the community's current week.
pub async fn get_status(
    state: &SharedState,
    community: &CommunityId,
) -> Result<StatusResponse, ServiceError> {
    let competition = require_competition(state, community).await?;
    let week = competition.week;
    let team_count = teams::count_teams(state, community, week).await?;
    let faceoff_active = state.store().load_faceoff(community.clone()).await?.is_some();

    Ok(StatusResponse {
        week: week.to_string(),
        phase: competition.phase,
        theme: competition.theme,
        team_count,
        submission_deadline: format_timestamp(week::submission_deadline(week)),
        voting_deadline: format_timestamp(week::voting_deadline(week)),
        faceoff_active,
    })
}

/// Return this week's registered teams, enriched with provider metadata where
/// the provider knows the track.
pub async fn get_submissions(
    state: &SharedState,
    community: &CommunityId,
) -> Result<SubmissionsResponse, ServiceError> {
    let competition = require_competition(state, community).await?;
    let week = competition.week;
    let registered = state.store().load_teams(community.clone(), week).await?;

    let mut entries = Vec::with_capacity(registered.len());
    for team in registered {
        let metadata = match &team.track_reference {
            Some(reference) => state.metadata().fetch(reference.clone()).await,
            None => None,
        };
        entries.push(TeamEntry {
            name: team.name,
            members: team.members.to_vec(),
            submitted_at: format_timestamp(team.submitted_at),
            track_reference: team.track_reference,
            metadata,
        });
    }

    Ok(SubmissionsResponse {
        week: week.to_string(),
        teams: entries,
    })
}

/// Return the current tally and, while one runs, the face-off standing.
pub async fn get_voting(
    state: &SharedState,
    community: &CommunityId,
) -> Result<VotingResponse, ServiceError> {
    let competition = require_competition(state, community).await?;
    let week = competition.week;
    let faceoff = state.store().load_faceoff(community.clone()).await?;

    let tally = votes::tally(state, community, week)
        .await?
        .into_iter()
        .map(|(team, count)| TallyEntry { team, votes: count })
        .collect();

    let open = competition.phase == Phase::Voting || faceoff.is_some();
    let faceoff = faceoff.map(|faceoff| FaceOffView {
        teams: faceoff.teams.clone(),
        deadline: format_timestamp(faceoff.deadline),
        results: faceoff
            .results()
            .into_iter()
            .map(|(team, count)| TallyEntry { team, votes: count })
            .collect(),
    });

    Ok(VotingResponse {
        week: week.to_string(),
        open,
        tally,
        faceoff,
    })
}

/// Return the winner history, most recent week first.
pub async fn get_history(
    state: &SharedState,
    community: &CommunityId,
) -> Result<HistoryResponse, ServiceError> {
    let mut winners = state.store().load_winners(community.clone()).await?;
    winners.sort_by(|a, b| b.week.cmp(&a.week));

    Ok(HistoryResponse {
        winners: winners
            .into_iter()
            .map(|record| WinnerEntry {
                week: record.week.to_string(),
                team_name: record.team_name,
                members: record.members.to_vec(),
                random_pick: record.random_pick,
                decided_at: format_timestamp(record.decided_at),
            })
            .collect(),
    })
}

/// Return the all-time standings: one line per member, ranked by weeks won.
pub async fn get_leaderboard(
    state: &SharedState,
    community: &CommunityId,
) -> Result<LeaderboardResponse, ServiceError> {
    let winners = state.store().load_winners(community.clone()).await?;

    let mut wins = std::collections::BTreeMap::<String, u32>::new();
    for record in &winners {
        for member in &record.members {
            *wins.entry(member.clone()).or_default() += 1;
        }
    }

    let mut entries: Vec<LeaderboardEntry> = wins
        .into_iter()
        .map(|(user, wins)| LeaderboardEntry { user, wins })
        .collect();
    entries.sort_by(|a, b| b.wins.cmp(&a.wins).then_with(|| a.user.cmp(&b.user)));

    Ok(LeaderboardResponse { entries })
}

async fn require_competition(
    state: &SharedState,
    community: &CommunityId,
) -> Result<CompetitionRecord, ServiceError> {
    state
        .store()
        .load_competition(community.clone())
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("no competition is running in `{community}`"))
        })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use time::OffsetDateTime;

    use crate::collab::dev::{DevChat, DevRewards, DevThemes};
    use crate::collab::metadata::{MetadataPort, TrackMetadata};
    use crate::dao::memory::MemoryStore;
    use crate::dao::models::{TeamRecord, WeeklyWinnerRecord};
    use crate::state::AppState;
    use crate::state::week::WeekId;

    use super::*;

    struct KnownMetadata;

    impl MetadataPort for KnownMetadata {
        fn fetch(&self, _reference: String) -> BoxFuture<'static, Option<TrackMetadata>> {
            Box::pin(async move {
                Some(TrackMetadata {
                    title: Some("Night Drive".into()),
                    artist: Some("Moonlight".into()),
                    duration_secs: Some(184),
                })
            })
        }
    }

    fn test_state(metadata: Arc<dyn MetadataPort>) -> SharedState {
        AppState::new(
            MemoryStore::shared(),
            Arc::new(DevChat::permissive()),
            Arc::new(DevThemes),
            Arc::new(DevRewards::succeeding()),
            metadata,
        )
    }

    #[tokio::test]
    async fn unknown_community_is_not_found() {
        let state = test_state(Arc::new(KnownMetadata));
        let err = get_status(&state, &"ghost".to_string()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn submissions_are_enriched_only_when_a_reference_exists() {
        let state = test_state(Arc::new(KnownMetadata));
        let community = "guild".to_string();
        let week: WeekId = "2025-W07".parse().unwrap();

        state
            .store()
            .save_competition(community.clone(), {
                let mut record = crate::dao::models::CompetitionRecord::inactive(week);
                record.phase = Phase::Submission;
                record
            })
            .await
            .unwrap();
        state
            .store()
            .save_teams(
                community.clone(),
                week,
                vec![
                    TeamRecord {
                        name: "Moonlight".into(),
                        members: ["a".into(), "b".into()],
                        submitted_at: OffsetDateTime::now_utc(),
                        track_reference: Some("https://suno.com/s/Abc123".into()),
                    },
                    TeamRecord {
                        name: "Tape Ghosts".into(),
                        members: ["c".into(), "d".into()],
                        submitted_at: OffsetDateTime::now_utc(),
                        track_reference: None,
                    },
                ],
            )
            .await
            .unwrap();

        let response = get_submissions(&state, &community).await.unwrap();
        assert_eq!(response.teams.len(), 2);
        assert_eq!(
            response.teams[0]
                .metadata
                .as_ref()
                .and_then(|metadata| metadata.title.clone()),
            Some("Night Drive".into())
        );
        assert!(response.teams[1].metadata.is_none());
    }

    #[tokio::test]
    async fn leaderboard_ranks_by_wins_then_identity() {
        let state = test_state(Arc::new(KnownMetadata));
        let community = "guild".to_string();

        for (week, members) in [
            ("2025-W05", ["ann", "ben"]),
            ("2025-W06", ["ann", "cat"]),
            ("2025-W07", ["ben", "cat"]),
            ("2025-W08", ["ann", "ben"]),
        ] {
            state
                .store()
                .append_winner(
                    community.clone(),
                    WeeklyWinnerRecord {
                        week: week.parse().unwrap(),
                        team_name: "whoever".into(),
                        members: [members[0].into(), members[1].into()],
                        reward_outcome: BTreeMap::new(),
                        decided_at: OffsetDateTime::now_utc(),
                        random_pick: false,
                    },
                )
                .await
                .unwrap();
        }

        let response = get_leaderboard(&state, &community).await.unwrap();
        let ranked: Vec<(String, u32)> = response
            .entries
            .into_iter()
            .map(|entry| (entry.user, entry.wins))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("ann".to_string(), 3),
                ("ben".to_string(), 3),
                ("cat".to_string(), 2),
            ]
        );
    }

    #[tokio::test]
    async fn history_lists_most_recent_weeks_first() {
        let state = test_state(Arc::new(KnownMetadata));
        let community = "guild".to_string();
        for week in ["2025-W05", "2025-W07", "2025-W06"] {
            state
                .store()
                .append_winner(
                    community.clone(),
                    WeeklyWinnerRecord {
                        week: week.parse().unwrap(),
                        team_name: format!("team-{week}"),
                        members: ["a".into(), "b".into()],
                        reward_outcome: BTreeMap::new(),
                        decided_at: OffsetDateTime::now_utc(),
                        random_pick: false,
                    },
                )
                .await
                .unwrap();
        }

        let response = get_history(&state, &community).await.unwrap();
        let weeks: Vec<String> = response
            .winners
            .iter()
            .map(|winner| winner.week.clone())
            .collect();
        assert_eq!(weeks, vec!["2025-W07", "2025-W06", "2025-W05"]);
    }
}

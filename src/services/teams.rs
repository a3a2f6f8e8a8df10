//! Team registry: enforces "each person and each team name at most once per
//! week" and records successful submissions.

use time::OffsetDateTime;
use tracing::info;

use crate::collab::chat::InboundMessage;
use crate::dao::models::{CommunityId, TeamRecord, UserId};
use crate::error::ServiceError;
use crate::services::submission::{self, MentionCandidate, ValidSubmission};
use crate::state::SharedState;
use crate::state::week::{Phase, WeekId};

/// Pure uniqueness check against the already-registered teams. Every failing
/// rule is reported, not just the first.
pub fn submission_conflicts(
    teams: &[TeamRecord],
    team_name: &str,
    user: &UserId,
    partner: &UserId,
) -> Vec<String> {
    let mut errors = Vec::new();

    if teams
        .iter()
        .any(|team| team.name.eq_ignore_ascii_case(team_name))
    {
        errors.push(format!(
            "team name `{team_name}` is already taken this week"
        ));
    }

    for member in [user, partner] {
        if let Some(team) = teams.iter().find(|team| team.members.contains(member)) {
            errors.push(format!(
                "{member} already submitted this week with team `{}`",
                team.name
            ));
        }
    }

    errors
}

/// Check whether a submission would be accepted, without registering it.
pub async fn check_can_submit(
    state: &SharedState,
    community: &CommunityId,
    week: WeekId,
    team_name: &str,
    user: &UserId,
    partner: &UserId,
) -> Result<Vec<String>, ServiceError> {
    let teams = state
        .store()
        .load_teams(community.clone(), week)
        .await?;
    Ok(submission_conflicts(&teams, team_name, user, partner))
}

/// Register a validated submission.
///
/// Takes the per-`(community, week)` lock so the uniqueness check and the
/// write are one atomic step: of two racing submissions sharing a name or a
/// member, exactly one registers and the other fails the check.
pub async fn register(
    state: &SharedState,
    community: &CommunityId,
    week: WeekId,
    author: UserId,
    submission: ValidSubmission,
) -> Result<TeamRecord, ServiceError> {
    let lock = state.week_lock(community, week);
    let _guard = lock.lock().await;
    register_locked(state, community, week, author, submission).await
}

/// Registration body; the caller holds the `(community, week)` lock.
async fn register_locked(
    state: &SharedState,
    community: &CommunityId,
    week: WeekId,
    author: UserId,
    submission: ValidSubmission,
) -> Result<TeamRecord, ServiceError> {
    let mut teams = state
        .store()
        .load_teams(community.clone(), week)
        .await?;

    let conflicts =
        submission_conflicts(&teams, &submission.team_name, &author, &submission.partner);
    if !conflicts.is_empty() {
        return Err(ServiceError::Validation(conflicts));
    }

    let record = TeamRecord {
        name: submission.team_name,
        members: [author, submission.partner],
        submitted_at: OffsetDateTime::now_utc(),
        track_reference: submission.track_reference,
    };
    teams.push(record.clone());
    state
        .store()
        .save_teams(community.clone(), week, teams)
        .await?;

    info!(%community, %week, team = %record.name, "team registered");
    Ok(record)
}

/// Full inbound-submission flow: phase gate, mention resolution, validation,
/// registration.
pub async fn handle_submission(
    state: &SharedState,
    community: &CommunityId,
    message: InboundMessage,
) -> Result<TeamRecord, ServiceError> {
    let competition = state
        .store()
        .load_competition(community.clone())
        .await?
        .ok_or_else(|| {
            ServiceError::InvalidState("the competition is not active in this community".into())
        })?;
    if competition.phase != Phase::Submission {
        return Err(ServiceError::InvalidState(format!(
            "submissions are closed (current phase: {:?})",
            competition.phase
        )));
    }
    let week = competition.week;

    let mut mentions = Vec::with_capacity(message.mentions.len());
    for id in &message.mentions {
        let profile = state
            .chat()
            .resolve_member(community.clone(), id.clone())
            .await?;
        mentions.push(MentionCandidate {
            id: id.clone(),
            profile,
        });
    }

    let submission =
        submission::validate(&message, &mentions).map_err(ServiceError::Validation)?;

    let lock = state.week_lock(community, week);
    let _guard = lock.lock().await;

    // Re-check under the lock; the deadline transition may have closed
    // submissions while mentions were resolving or while this request waited.
    let competition = state
        .store()
        .load_competition(community.clone())
        .await?
        .ok_or_else(|| {
            ServiceError::InvalidState("the competition is not active in this community".into())
        })?;
    if competition.phase != Phase::Submission || competition.week != week {
        return Err(ServiceError::InvalidState(format!(
            "submissions are closed (current phase: {:?})",
            competition.phase
        )));
    }

    register_locked(state, community, week, message.author, submission).await
}

/// Number of teams competing this week.
///
/// When submission validation is administratively disabled there is no
/// registry to count, so the chat collaborator's raw message count for the
/// submission channel is authoritative instead (no blending of the two).
pub async fn count_teams(
    state: &SharedState,
    community: &CommunityId,
    week: WeekId,
) -> Result<u32, ServiceError> {
    let config = state
        .store()
        .load_config(community.clone())
        .await?
        .unwrap_or_default();

    if !config.validation_enabled
        && let Some(channel) = config.submission_channel
    {
        let raw = state.chat().count_messages(channel, week).await?;
        return Ok(raw);
    }

    let teams = state
        .store()
        .load_teams(community.clone(), week)
        .await?;
    Ok(teams.len() as u32)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::collab::dev::{DevChat, DevMetadata, DevRewards, DevThemes};
    use crate::dao::memory::MemoryStore;
    use crate::dao::models::CompetitionRecord;
    use crate::state::AppState;

    use super::*;

    fn team(name: &str, a: &str, b: &str) -> TeamRecord {
        TeamRecord {
            name: name.into(),
            members: [a.into(), b.into()],
            submitted_at: OffsetDateTime::now_utc(),
            track_reference: None,
        }
    }

    fn test_state() -> SharedState {
        AppState::new(
            MemoryStore::shared(),
            Arc::new(DevChat::permissive()),
            Arc::new(DevThemes),
            Arc::new(DevRewards::succeeding()),
            Arc::new(DevMetadata),
        )
    }

    async fn activate(state: &SharedState, community: &str, week: WeekId) {
        let mut record = CompetitionRecord::inactive(week);
        record.phase = Phase::Submission;
        state
            .store()
            .save_competition(community.into(), record)
            .await
            .unwrap();
    }

    #[test]
    fn name_collision_is_case_insensitive() {
        let teams = [team("Moonlight", "a", "b")];
        let errors = submission_conflicts(&teams, "moonlight", &"c".into(), &"d".into());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("already taken"));
    }

    #[test]
    fn member_reuse_and_name_collision_all_reported() {
        let teams = [team("Moonlight", "a", "b")];
        let errors = submission_conflicts(&teams, "MOONLIGHT", &"a".into(), &"b".into());
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn fresh_submission_has_no_conflicts() {
        let teams = [team("Moonlight", "a", "b")];
        assert!(submission_conflicts(&teams, "Starfall", &"c".into(), &"d".into()).is_empty());
    }

    #[tokio::test]
    async fn register_rejects_second_use_of_member() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();

        let first = ValidSubmission {
            team_name: "Moonlight".into(),
            partner: "bob".into(),
            track_reference: None,
        };
        register(&state, &community, week, "alice".into(), first)
            .await
            .unwrap();

        let second = ValidSubmission {
            team_name: "Starfall".into(),
            partner: "carol".into(),
            track_reference: None,
        };
        let err = register(&state, &community, week, "bob".into(), second)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn concurrent_registrations_of_same_name_admit_exactly_one() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();

        let mut tasks = Vec::new();
        for i in 0..8 {
            let state = state.clone();
            let community = community.clone();
            tasks.push(tokio::spawn(async move {
                let submission = ValidSubmission {
                    team_name: "Moonlight".into(),
                    partner: format!("partner-{i}"),
                    track_reference: None,
                };
                register(&state, &community, week, format!("author-{i}"), submission).await
            }));
        }

        let mut successes = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);

        let teams = state
            .store()
            .load_teams(community.clone(), week)
            .await
            .unwrap();
        assert_eq!(teams.len(), 1);
    }

    #[tokio::test]
    async fn handle_submission_registers_valid_message() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        activate(&state, &community, week).await;

        let message = InboundMessage {
            text: "Team name: Moonlight\n@bob here it is\nhttps://suno.com/s/Abc123".into(),
            attachments: 0,
            mentions: vec!["bob".into()],
            author: "alice".into(),
            channel: "submissions".into(),
        };
        let record = handle_submission(&state, &community, message).await.unwrap();
        assert_eq!(record.name, "Moonlight");
        assert_eq!(record.members, ["alice".to_string(), "bob".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn submission_waiting_on_deadline_transition_is_rejected() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        activate(&state, &community, week).await;

        // Hold the week lock the way the voting-start transition does, park a
        // submission on it, then close the phase before releasing.
        let lock = state.week_lock(&community, week);
        let guard = lock.lock().await;

        let parked = {
            let state = state.clone();
            let community = community.clone();
            tokio::spawn(async move {
                let message = InboundMessage {
                    text: "Team name: Moonlight\n@bob here it is\nhttps://suno.com/s/Abc123"
                        .into(),
                    attachments: 0,
                    mentions: vec!["bob".into()],
                    author: "alice".into(),
                    channel: "submissions".into(),
                };
                handle_submission(&state, &community, message).await
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut record = state
            .store()
            .load_competition(community.clone())
            .await
            .unwrap()
            .unwrap();
        record.phase = Phase::Voting;
        state
            .store()
            .save_competition(community.clone(), record)
            .await
            .unwrap();
        drop(guard);

        let err = parked.await.unwrap().unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        let teams = state
            .store()
            .load_teams(community.clone(), week)
            .await
            .unwrap();
        assert!(teams.is_empty());
    }

    #[tokio::test]
    async fn handle_submission_rejected_outside_submission_phase() {
        let state = test_state();
        let community: CommunityId = "guild".into();
        let week: WeekId = "2025-W07".parse().unwrap();
        let mut record = CompetitionRecord::inactive(week);
        record.phase = Phase::Voting;
        state
            .store()
            .save_competition(community.clone(), record)
            .await
            .unwrap();

        let message = InboundMessage {
            text: "Team name: Moonlight\n@bob".into(),
            attachments: 1,
            mentions: vec!["bob".into()],
            author: "alice".into(),
            channel: "submissions".into(),
        };
        let err = handle_submission(&state, &community, message)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }
}

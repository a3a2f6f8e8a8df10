//! Winner determination: closes the weekly vote, runs face-offs for ties,
//! records the winner and hands out rewards.

use std::collections::BTreeMap;

use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dao::models::{
    AnnouncementKind, CommunityConfig, CommunityId, FaceOffRecord, WeeklyWinnerRecord,
};
use crate::error::ServiceError;
use crate::services::announce::{self, AnnouncementIntent};
use crate::services::scheduler::fired_key;
use crate::services::votes;
use crate::state::SharedState;
use crate::state::resolution::{self, FaceOffOutcome, VoteOutcome};
use crate::state::week::{Phase, WeekId};

/// How long a face-off stays open.
const FACEOFF_DURATION: Duration = Duration::hours(24);

/// What the winner-determination run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinnerStep {
    /// Nobody voted; the week was cancelled.
    NoVotesCancelled,
    /// Top teams were tied; a face-off is now open.
    FaceOffOpened(Vec<String>),
    /// A winner was crowned.
    Crowned(String),
}

/// Close the weekly vote and determine the outcome.
///
/// Runs at most once per week: the idempotency token is consumed in the same
/// write that records the outcome, so a restarted scheduler re-evaluating the
/// deadline finds the token and does nothing.
pub async fn resolve_week(
    state: &SharedState,
    community: &CommunityId,
) -> Result<WinnerStep, ServiceError> {
    let config = state
        .store()
        .load_config(community.clone())
        .await?
        .unwrap_or_default();
    let mut competition = state
        .store()
        .load_competition(community.clone())
        .await?
        .ok_or_else(|| {
            ServiceError::InvalidState("no competition to resolve in this community".into())
        })?;
    let week = competition.week;
    let key = fired_key(week, "resolve-winner");
    if competition.fired(&key) {
        return Err(ServiceError::Conflict(format!(
            "the winner run for {week} already happened"
        )));
    }

    let lock = state.week_lock(community, week);
    let _guard = lock.lock().await;

    let tally = votes::tally(state, community, week).await?;

    match resolution::decide_weekly(&tally) {
        VoteOutcome::NoVotes => {
            competition.week_cancelled = true;
            competition.winner_announced = true;
            competition.phase = Phase::Cancelled;
            competition.fired_keys.insert(key);
            competition.updated_at = OffsetDateTime::now_utc();
            state
                .store()
                .save_competition(community.clone(), competition)
                .await?;

            info!(%community, %week, "no votes were cast; week cancelled");
            announce::dispatch(
                state,
                community,
                &config,
                AnnouncementIntent {
                    kind: AnnouncementKind::WeekCancelled,
                    body: format!(
                        "No votes were cast this week ({week}), so no winner can be crowned. \
                         The competition resumes next week."
                    ),
                    theme: None,
                    deadline_text: None,
                },
            )
            .await?;
            Ok(WinnerStep::NoVotesCancelled)
        }
        VoteOutcome::Winner(team) => {
            competition.winner_announced = true;
            competition.phase = Phase::Ended;
            competition.fired_keys.insert(key);
            competition.updated_at = OffsetDateTime::now_utc();
            state
                .store()
                .save_competition(community.clone(), competition)
                .await?;

            crown(state, community, &config, week, &team, false).await?;
            Ok(WinnerStep::Crowned(team))
        }
        VoteOutcome::Tie(teams) => {
            let deadline = OffsetDateTime::now_utc() + FACEOFF_DURATION;
            let faceoff = FaceOffRecord {
                id: Uuid::new_v4(),
                week,
                teams: teams.clone(),
                deadline,
                votes: BTreeMap::new(),
            };
            state
                .store()
                .save_faceoff(community.clone(), Some(faceoff))
                .await?;

            competition.fired_keys.insert(key);
            competition.updated_at = OffsetDateTime::now_utc();
            state
                .store()
                .save_competition(community.clone(), competition)
                .await?;

            info!(%community, %week, ?teams, "tie detected; face-off opened");
            announce::dispatch(
                state,
                community,
                &config,
                AnnouncementIntent {
                    kind: AnnouncementKind::FaceOff,
                    body: format!(
                        "It's a tie between {}! A 24-hour face-off decides the winner of {week}. \
                         Cast your face-off vote now.",
                        teams.join(" and ")
                    ),
                    theme: None,
                    deadline_text: Some(format!("face-off closes at {deadline}")),
                },
            )
            .await?;
            Ok(WinnerStep::FaceOffOpened(teams))
        }
    }
}

/// Close an expired face-off and crown the winner.
///
/// A face-off that is still tied at its deadline (including one where nobody
/// voted) is broken uniformly at random, and the announcement says so.
pub async fn resolve_faceoff(
    state: &SharedState,
    community: &CommunityId,
) -> Result<WinnerStep, ServiceError> {
    let config = state
        .store()
        .load_config(community.clone())
        .await?
        .unwrap_or_default();
    let Some(faceoff) = state.store().load_faceoff(community.clone()).await? else {
        return Err(ServiceError::InvalidState(
            "no face-off to resolve in this community".into(),
        ));
    };
    let week = faceoff.week;

    let lock = state.week_lock(community, week);
    let _guard = lock.lock().await;

    // Clear the record first so no further face-off votes are accepted.
    state.store().save_faceoff(community.clone(), None).await?;

    let (team, random) = match resolution::decide_faceoff(&faceoff.results()) {
        FaceOffOutcome::Winner(team) => (team, false),
        FaceOffOutcome::StillTied(tied) => {
            let Some(pick) = resolution::pick_random(&tied) else {
                return Err(ServiceError::Invariant(format!(
                    "face-off for {week} resolved with no teams"
                )));
            };
            info!(%community, %week, team = %pick, "face-off stayed tied; winner picked at random");
            (pick, true)
        }
    };

    let mut competition = state
        .store()
        .load_competition(community.clone())
        .await?
        .ok_or_else(|| {
            ServiceError::Invariant(format!("face-off for {week} outlived its competition record"))
        })?;
    if competition.week == week {
        competition.winner_announced = true;
        competition.phase = Phase::Ended;
        competition.fired_keys.insert(fired_key(week, "resolve-faceoff"));
        competition.updated_at = OffsetDateTime::now_utc();
        state
            .store()
            .save_competition(community.clone(), competition)
            .await?;
    }

    crown(state, community, &config, week, &team, random).await?;
    Ok(WinnerStep::Crowned(team))
}

/// Record the winner, award each member, and announce.
///
/// Reward delivery is best effort per member: a failed award is logged and
/// recorded in the history entry, never retried, and never blocks the
/// announcement.
async fn crown(
    state: &SharedState,
    community: &CommunityId,
    config: &CommunityConfig,
    week: WeekId,
    team_name: &str,
    random: bool,
) -> Result<(), ServiceError> {
    let teams = state.store().load_teams(community.clone(), week).await?;
    let members = teams
        .iter()
        .find(|team| team.name == team_name)
        .map(|team| team.members.clone())
        .ok_or_else(|| {
            ServiceError::Invariant(format!("winning team `{team_name}` is not registered"))
        })?;

    let mut reward_outcome = BTreeMap::new();
    for member in &members {
        let delivered = state
            .rewards()
            .award(member.clone(), config.reward_amount)
            .await;
        if !delivered {
            warn!(%community, %week, %member, "reward delivery failed");
        }
        reward_outcome.insert(member.clone(), delivered);
    }

    let record = WeeklyWinnerRecord {
        week,
        team_name: team_name.to_string(),
        members,
        reward_outcome,
        decided_at: OffsetDateTime::now_utc(),
        random_pick: random,
    };
    state
        .store()
        .append_winner(community.clone(), record)
        .await?;

    info!(%community, %week, team = %team_name, random, "winner crowned");
    let body = if random {
        format!(
            "The face-off stayed tied, so the winner of {week} was drawn at random: \
             congratulations, {team_name}!"
        )
    } else {
        format!("The winner of {week} is {team_name} — congratulations!")
    };
    announce::dispatch(
        state,
        community,
        config,
        AnnouncementIntent {
            kind: AnnouncementKind::Winner,
            body,
            theme: None,
            deadline_text: None,
        },
    )
    .await
}

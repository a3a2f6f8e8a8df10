//! Phase scheduler: the periodic sweep that drives every community through
//! the weekly rhythm.
//!
//! Each tick evaluates one community against the wall clock and fires at most
//! one transition. Deciding what to do is the pure [`plan_tick`]; executing it
//! is [`execute`]. Every transition consumes an idempotency token in the same
//! write that records its effect, so a tick that runs twice (or a scheduler
//! restarted onto old state) never repeats a transition.

use std::time::Duration as StdDuration;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::collab::theme::ThemeContext;
use crate::dao::models::{
    AnnouncementKind, CommunityConfig, CommunityId, CompetitionRecord, FaceOffRecord,
};
use crate::error::ServiceError;
use crate::services::announce::{self, AnnouncementIntent};
use crate::services::{teams, winner};
use crate::state::SharedState;
use crate::state::week::{self, Phase, WeekId};

/// Idempotency token for one transition of one week.
pub fn fired_key(week: WeekId, action: &str) -> String {
    format!("{week}:{action}")
}

/// Transition a tick decided to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickAction {
    /// Open the given week for submissions.
    StartWeek(WeekId),
    /// Close submissions and open voting.
    OpenVoting,
    /// Cancel the week for insufficient participation.
    CancelWeek,
    /// Evening reminder before the submission deadline.
    SubmissionReminder,
    /// Evening reminder before the voting deadline.
    VotingReminder,
    /// Close the weekly vote and determine the winner.
    ResolveWinner,
    /// Close an expired face-off.
    ResolveFaceOff,
    /// Generate and stage next week's theme.
    GenerateTheme,
}

/// Everything a tick decision needs, loaded up front so the decision itself
/// stays pure.
#[derive(Debug, Clone)]
pub struct TickContext {
    /// Wall clock the decision is made against.
    pub now: OffsetDateTime,
    /// Community configuration.
    pub config: CommunityConfig,
    /// Current competition record.
    pub competition: CompetitionRecord,
    /// Active face-off, if one is open.
    pub faceoff: Option<FaceOffRecord>,
    /// Teams competing in the record's week.
    pub team_count: u32,
}

/// Decide the single transition due now, if any.
///
/// Checks run in priority order, so when several conditions hold at once (a
/// scheduler catching up after downtime) the earliest pending transition fires
/// first and the rest follow on later ticks.
pub fn plan_tick(ctx: &TickContext) -> Option<TickAction> {
    let competition = &ctx.competition;
    if competition.phase == Phase::Paused {
        return None;
    }

    let this_week = WeekId::of(ctx.now);

    // Week start. Requires the previous week to be resolved and no face-off
    // still running; a week resolved late (after a face-off) starts the next
    // one on whatever day the resolution landed.
    let resolved = competition.winner_announced
        || competition.week_cancelled
        || matches!(
            competition.phase,
            Phase::Inactive | Phase::Ended | Phase::Cancelled
        );
    // Abandoned records: a record more than a week behind can never resolve
    // (its calendar windows are gone), and a Submission week left behind never
    // opened voting, so no votes are lost by restarting. Give up and start
    // fresh, even mid-week.
    let stale = competition.week.next() < this_week
        || (competition.phase == Phase::Submission && competition.week < this_week);
    let on_start_day = ctx.now.date().weekday() == ctx.config.start_weekday;
    let carryover =
        (competition.winner_announced || competition.week_cancelled) && competition.week < this_week;
    if competition.week != this_week
        && (resolved || stale)
        && ctx.faceoff.is_none()
        && !competition.fired(&fired_key(this_week, "week-start"))
        && (on_start_day || carryover || stale)
    {
        return Some(TickAction::StartWeek(this_week));
    }

    let week = competition.week;

    // Submission deadline: open voting or cancel, exactly once.
    if competition.phase == Phase::Submission
        && week == this_week
        && ctx.now >= week::submission_deadline(week)
        && !competition.fired(&fired_key(week, "voting-start"))
    {
        return Some(if ctx.team_count >= ctx.config.min_teams {
            TickAction::OpenVoting
        } else {
            TickAction::CancelWeek
        });
    }

    if competition.phase == Phase::Submission
        && week == this_week
        && ctx.now >= week::submission_reminder_at(week)
        && ctx.now < week::submission_deadline(week)
        && !competition.fired(&fired_key(week, "submission-reminder"))
    {
        return Some(TickAction::SubmissionReminder);
    }

    if competition.phase == Phase::Voting
        && week == this_week
        && ctx.now >= week::voting_reminder_at(week)
        && ctx.now < week::voting_deadline(week)
        && !competition.fired(&fired_key(week, "voting-reminder"))
    {
        return Some(TickAction::VotingReminder);
    }

    // Voting deadline. The week under resolution is the record's week, which
    // by Monday 00:00 is already the previous calendar week.
    if competition.phase == Phase::Voting
        && ctx.now >= week::voting_deadline(week)
        && !competition.winner_announced
        && !competition.week_cancelled
        && ctx.faceoff.is_none()
        && !competition.fired(&fired_key(week, "resolve-winner"))
    {
        return Some(TickAction::ResolveWinner);
    }

    if let Some(faceoff) = &ctx.faceoff
        && ctx.now >= faceoff.deadline
    {
        return Some(TickAction::ResolveFaceOff);
    }

    if matches!(competition.phase, Phase::Submission | Phase::Voting)
        && week == this_week
        && competition.next_theme.is_none()
        && !competition.theme_generation_done
        && !competition.fired(&fired_key(week, "generate-theme"))
    {
        return Some(TickAction::GenerateTheme);
    }

    None
}

/// Run the decided transition.
pub async fn execute(
    state: &SharedState,
    community: &CommunityId,
    config: &CommunityConfig,
    action: TickAction,
) -> Result<(), ServiceError> {
    match action {
        TickAction::StartWeek(target) => start_week(state, community, config, target).await,
        TickAction::OpenVoting => open_voting(state, community, config).await,
        TickAction::CancelWeek => cancel_week(state, community, config).await,
        TickAction::SubmissionReminder => {
            remind(
                state,
                community,
                config,
                AnnouncementKind::SubmissionReminder,
                "submission-reminder",
                "Last call! Submissions close tomorrow at 12:00 UTC. Get your track in.",
            )
            .await
        }
        TickAction::VotingReminder => {
            remind(
                state,
                community,
                config,
                AnnouncementKind::VotingReminder,
                "voting-reminder",
                "Voting closes at the end of the day. Listen through and cast your vote!",
            )
            .await
        }
        TickAction::ResolveWinner => winner::resolve_week(state, community).await.map(|_| ()),
        TickAction::ResolveFaceOff => winner::resolve_faceoff(state, community).await.map(|_| ()),
        TickAction::GenerateTheme => generate_theme(state, community, config).await,
    }
}

async fn start_week(
    state: &SharedState,
    community: &CommunityId,
    config: &CommunityConfig,
    target: WeekId,
) -> Result<(), ServiceError> {
    let lock = state.week_lock(community, target);
    let _guard = lock.lock().await;

    let mut competition = state
        .store()
        .load_competition(community.clone())
        .await?
        .unwrap_or_else(|| CompetitionRecord::inactive(target));

    competition.week = target;
    competition.phase = Phase::Submission;
    if let Some(theme) = competition.next_theme.take() {
        competition.theme = theme;
    }
    competition.week_cancelled = false;
    competition.winner_announced = false;
    competition.theme_generation_done = false;
    // The token set restarts each week; only the week-start token itself
    // carries over into the fresh set.
    competition.fired_keys = [fired_key(target, "week-start")].into();
    competition.updated_at = OffsetDateTime::now_utc();
    let theme = competition.theme.clone();

    state
        .store()
        .save_competition(community.clone(), competition)
        .await?;

    info!(%community, week = %target, %theme, "week started");
    let deadline = week::submission_deadline(target);
    announce::dispatch(
        state,
        community,
        config,
        AnnouncementIntent {
            kind: AnnouncementKind::WeekStart,
            body: format!(
                "A new week of the competition begins ({target})! This week's theme: {theme}. \
                 Team up in pairs and submit your track before Friday 12:00 UTC."
            ),
            theme: Some(theme),
            deadline_text: Some(format!("submissions close at {deadline}")),
        },
    )
    .await
}

async fn open_voting(
    state: &SharedState,
    community: &CommunityId,
    config: &CommunityConfig,
) -> Result<(), ServiceError> {
    let week = require_competition(state, community).await?.week;
    let lock = state.week_lock(community, week);
    let _guard = lock.lock().await;

    let mut competition = require_competition(state, community).await?;
    competition.phase = Phase::Voting;
    competition.fired_keys.insert(fired_key(week, "voting-start"));
    competition.updated_at = OffsetDateTime::now_utc();
    state
        .store()
        .save_competition(community.clone(), competition)
        .await?;

    info!(%community, %week, "voting opened");
    let deadline = week::voting_deadline(week);
    announce::dispatch(
        state,
        community,
        config,
        AnnouncementIntent {
            kind: AnnouncementKind::VotingStart,
            body: format!(
                "Submissions are closed and voting is open for {week}! \
                 Listen to every entry and vote for your favourite before the end of Sunday."
            ),
            theme: None,
            deadline_text: Some(format!("voting closes at {deadline}")),
        },
    )
    .await
}

async fn cancel_week(
    state: &SharedState,
    community: &CommunityId,
    config: &CommunityConfig,
) -> Result<(), ServiceError> {
    let week = require_competition(state, community).await?.week;
    let lock = state.week_lock(community, week);
    let _guard = lock.lock().await;

    let mut competition = require_competition(state, community).await?;
    competition.phase = Phase::Cancelled;
    competition.week_cancelled = true;
    // Consumes the same token as the voting-start transition: the submission
    // deadline fires one of the two, never both.
    competition.fired_keys.insert(fired_key(week, "voting-start"));
    competition.updated_at = OffsetDateTime::now_utc();
    state
        .store()
        .save_competition(community.clone(), competition)
        .await?;

    info!(%community, %week, "week cancelled for insufficient participation");
    announce::dispatch(
        state,
        community,
        config,
        AnnouncementIntent {
            kind: AnnouncementKind::WeekCancelled,
            body: format!(
                "Not enough teams entered this week ({week}), so the round is cancelled. \
                 See you next Monday for a fresh start!"
            ),
            theme: None,
            deadline_text: None,
        },
    )
    .await
}

async fn remind(
    state: &SharedState,
    community: &CommunityId,
    config: &CommunityConfig,
    kind: AnnouncementKind,
    action: &str,
    body: &str,
) -> Result<(), ServiceError> {
    let mut competition = require_competition(state, community).await?;
    let week = competition.week;

    competition.fired_keys.insert(fired_key(week, action));
    competition.updated_at = OffsetDateTime::now_utc();
    state
        .store()
        .save_competition(community.clone(), competition)
        .await?;

    info!(%community, %week, ?kind, "reminder sent");
    announce::dispatch(
        state,
        community,
        config,
        AnnouncementIntent {
            kind,
            body: body.to_string(),
            theme: None,
            deadline_text: None,
        },
    )
    .await
}

/// Generate the next week's theme and stage it on the competition record.
///
/// A failed generation leaves the flags untouched so the next tick retries.
async fn generate_theme(
    state: &SharedState,
    community: &CommunityId,
    config: &CommunityConfig,
) -> Result<(), ServiceError> {
    let competition = require_competition(state, community).await?;
    let week = competition.week;

    let theme = state
        .themes()
        .generate(ThemeContext {
            week: week.next(),
            previous_theme: Some(competition.theme.clone()).filter(|theme| !theme.is_empty()),
        })
        .await?;

    let mut competition = require_competition(state, community).await?;
    competition.next_theme = Some(theme.clone());
    competition.theme_generation_done = true;
    competition.fired_keys.insert(fired_key(week, "generate-theme"));
    competition.updated_at = OffsetDateTime::now_utc();
    state
        .store()
        .save_competition(community.clone(), competition)
        .await?;

    info!(%community, %week, %theme, "theme staged for next week");
    announce::dispatch(
        state,
        community,
        config,
        AnnouncementIntent {
            kind: AnnouncementKind::ThemeProposal,
            body: format!("Sneak peek: next week's theme will be \u{201c}{theme}\u{201d}."),
            theme: Some(theme),
            deadline_text: None,
        },
    )
    .await
}

/// Typed admin override: stage next week's theme, replacing anything the
/// generator staged and preventing a later generation run from clobbering it.
pub async fn override_theme(
    state: &SharedState,
    community: &CommunityId,
    theme: String,
) -> Result<(), ServiceError> {
    let mut competition = require_competition(state, community).await?;
    competition.next_theme = Some(theme.clone());
    competition.theme_generation_done = true;
    competition.updated_at = OffsetDateTime::now_utc();
    state
        .store()
        .save_competition(community.clone(), competition)
        .await?;

    info!(%community, %theme, "next week's theme overridden");
    Ok(())
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
            ServiceError::Invariant(format!("competition record for {community} disappeared"))
        })
}

/// Evaluate one community once.
///
/// A tick already running for the community makes this a no-op: transitions
/// are slow (announcements, collaborator calls) and must not pile up.
pub async fn tick(
    state: &SharedState,
    community: &CommunityId,
    now: OffsetDateTime,
) -> Result<Option<TickAction>, ServiceError> {
    let gate = state.tick_gate(community);
    let Ok(_running) = gate.try_lock() else {
        debug!(%community, "previous tick still running; skipped");
        return Ok(None);
    };

    let Some(competition) = state.store().load_competition(community.clone()).await? else {
        return Ok(None);
    };
    let config = state
        .store()
        .load_config(community.clone())
        .await?
        .unwrap_or_default();
    let faceoff = state.store().load_faceoff(community.clone()).await?;
    let team_count = teams::count_teams(state, community, competition.week).await?;

    let ctx = TickContext {
        now,
        config,
        competition,
        faceoff,
        team_count,
    };
    let Some(action) = plan_tick(&ctx) else {
        return Ok(None);
    };

    info!(%community, ?action, "transition due");
    execute(state, community, &ctx.config, action.clone()).await?;
    Ok(Some(action))
}

/// Tick every known community once. One community failing never stops the
/// others.
pub async fn sweep(state: &SharedState) {
    let now = OffsetDateTime::now_utc();
    let communities = match state.store().list_communities().await {
        Ok(communities) => communities,
        Err(error) => {
            warn!(%error, "scheduler sweep skipped; store unavailable");
            return;
        }
    };

    for community in communities {
        if let Err(error) = tick(state, &community, now).await {
            warn!(%community, %error, "tick failed");
        }
    }
}

/// Scheduler loop: sweep all communities at a fixed interval, forever.
pub async fn run(state: SharedState, interval: StdDuration) {
    info!(?interval, "scheduler started");
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        timer.tick().await;
        sweep(&state).await;
    }
}

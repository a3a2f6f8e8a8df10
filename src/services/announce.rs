//! Outbound announcements and the admin confirmation gate.
//!
//! Every public announcement flows through [`dispatch`]. Without an admin (or
//! with confirmation disabled) it posts straight to the community's announce
//! channel; otherwise it parks in the single pending slot, the admin gets a DM
//! prompt, and either a reaction or the timeout resolves it. The slot holds one
//! announcement at a time and the last writer wins.

use std::time::Duration as StdDuration;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::collab::chat::ReactionEvent;
use crate::dao::models::{
    AnnouncementKind, CommunityConfig, CommunityId, PendingAnnouncementRecord,
};
use crate::error::ServiceError;
use crate::state::SharedState;
use crate::state::week;

/// Reaction emoji approving a pending announcement.
const APPROVE_EMOJI: &str = "\u{2705}";
/// Reaction emoji denying a pending announcement.
const DENY_EMOJI: &str = "\u{274c}";

/// Floor and ceiling for the week-start confirmation timeout.
const MIN_CONFIRM_TIMEOUT: StdDuration = StdDuration::from_secs(60 * 60);
const MAX_CONFIRM_TIMEOUT: StdDuration = StdDuration::from_secs(7 * 24 * 60 * 60);

/// An announcement a service wants posted.
#[derive(Debug, Clone)]
pub struct AnnouncementIntent {
    /// What the announcement is about.
    pub kind: AnnouncementKind,
    /// Rendered message body.
    pub body: String,
    /// Theme the announcement refers to, if any.
    pub theme: Option<String>,
    /// Human-readable deadline included in the prompt, if any.
    pub deadline_text: Option<String>,
}

/// Admin verdict on a pending announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementDecision {
    /// Post the announcement now.
    Approve,
    /// Discard the announcement without posting.
    Deny,
}

/// How long a pending announcement waits before auto-posting.
///
/// Week-start announcements wait until the next Monday 09:00 so a prompt sent
/// on Sunday evening is still actionable, clamped to stay between one hour and
/// one week. Everything else uses the fixed per-community timeout.
pub fn confirm_timeout(
    kind: AnnouncementKind,
    config: &CommunityConfig,
    now: OffsetDateTime,
) -> StdDuration {
    match kind {
        AnnouncementKind::WeekStart => {
            let until = week::next_monday_morning(now) - now;
            let until = StdDuration::from_secs(until.whole_seconds().max(0) as u64);
            until.clamp(MIN_CONFIRM_TIMEOUT, MAX_CONFIRM_TIMEOUT)
        }
        _ => StdDuration::from_secs(config.confirm_timeout_secs),
    }
}

/// Post an announcement, going through the confirmation gate when the
/// community requires it.
pub async fn dispatch(
    state: &SharedState,
    community: &CommunityId,
    config: &CommunityConfig,
    intent: AnnouncementIntent,
) -> Result<(), ServiceError> {
    let Some(admin) = config
        .admin_user
        .as_ref()
        .filter(|_| config.confirmation_required)
    else {
        post(state, community, config, &intent.body).await?;
        return Ok(());
    };

    let now = OffsetDateTime::now_utc();
    let mut pending = PendingAnnouncementRecord {
        kind: intent.kind,
        body: intent.body,
        theme: intent.theme,
        deadline_text: intent.deadline_text,
        target_channel: config.announce_channel.clone(),
        created_at: now,
        prompt_message: None,
    };

    let timeout = confirm_timeout(intent.kind, config, now);
    let prompt = render_prompt(&pending, timeout);
    match state.chat().dm_user(admin.clone(), prompt).await {
        Ok(message) => {
            state.register_prompt(message.clone(), community.clone());
            pending.prompt_message = Some(message);
        }
        // The admin is unreachable; fall back to posting right away rather
        // than letting the announcement silently stall.
        Err(error) => {
            warn!(%community, %error, "confirmation prompt undeliverable; posting immediately");
            post(state, community, config, &pending.body).await?;
            return Ok(());
        }
    }

    state
        .store()
        .save_pending(community.clone(), Some(pending))
        .await?;

    let timer_state = state.clone();
    let timer_community = community.clone();
    let task = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if let Err(error) = fire_timeout(&timer_state, &timer_community).await {
            warn!(community = %timer_community, %error, "confirmation timeout failed");
        }
    });
    state.install_confirm_timer(community.clone(), task);

    info!(%community, kind = ?intent.kind, ?timeout, "announcement awaiting confirmation");
    Ok(())
}

/// Auto-post the pending announcement after its confirmation timeout.
///
/// An empty slot is a silent no-op: the admin resolved (or a newer
/// announcement replaced) the prompt before the timer fired.
pub async fn fire_timeout(state: &SharedState, community: &CommunityId) -> Result<(), ServiceError> {
    let Some(pending) = state.store().load_pending(community.clone()).await? else {
        return Ok(());
    };

    info!(%community, kind = ?pending.kind, "confirmation timed out; posting");
    if let Some(message) = &pending.prompt_message {
        state.forget_prompt(message);
    }
    state
        .chat()
        .post_message(pending.target_channel.clone(), pending.body.clone())
        .await?;
    state.store().save_pending(community.clone(), None).await?;
    Ok(())
}

/// Apply an admin decision to the pending announcement.
pub async fn handle_decision(
    state: &SharedState,
    community: &CommunityId,
    decision: AnnouncementDecision,
) -> Result<(), ServiceError> {
    state.cancel_confirm_timer(community);

    let Some(pending) = state.store().load_pending(community.clone()).await? else {
        return Err(ServiceError::Conflict(
            "no announcement is awaiting confirmation".into(),
        ));
    };
    if let Some(message) = &pending.prompt_message {
        state.forget_prompt(message);
    }

    match decision {
        AnnouncementDecision::Approve => {
            info!(%community, kind = ?pending.kind, "announcement approved");
            state
                .chat()
                .post_message(pending.target_channel.clone(), pending.body.clone())
                .await?;
        }
        AnnouncementDecision::Deny => {
            info!(%community, kind = ?pending.kind, "announcement denied");
        }
    }

    state.store().save_pending(community.clone(), None).await?;
    Ok(())
}

/// Route a reaction on a confirmation prompt to the owning community.
///
/// Reactions with other emojis, or on messages that are not prompts, are
/// ignored.
pub async fn handle_reaction(
    state: &SharedState,
    reaction: ReactionEvent,
) -> Result<(), ServiceError> {
    let decision = match reaction.emoji.as_str() {
        APPROVE_EMOJI => AnnouncementDecision::Approve,
        DENY_EMOJI => AnnouncementDecision::Deny,
        _ => return Ok(()),
    };
    let Some(community) = state.prompt_owner(&reaction.message) else {
        return Ok(());
    };
    handle_decision(state, &community, decision).await
}

async fn post(
    state: &SharedState,
    community: &CommunityId,
    config: &CommunityConfig,
    body: &str,
) -> Result<(), ServiceError> {
    state
        .chat()
        .post_message(config.announce_channel.clone(), body.to_string())
        .await?;
    info!(%community, "announcement posted");
    Ok(())
}

fn render_prompt(pending: &PendingAnnouncementRecord, timeout: StdDuration) -> String {
    let mut prompt = format!(
        "Announcement awaiting your approval ({APPROVE_EMOJI} to post, {DENY_EMOJI} to discard; \
         auto-posts in {} minutes):\n\n{}",
        timeout.as_secs() / 60,
        pending.body
    );
    if let Some(theme) = &pending.theme {
        prompt.push_str(&format!("\n\nTheme: {theme}"));
    }
    if let Some(deadline) = &pending.deadline_text {
        prompt.push_str(&format!("\n({deadline})"));
    }
    prompt
}

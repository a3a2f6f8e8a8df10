//! Built-in collaborator implementations for standalone runs and tests.
//!
//! `DevChat` records every outbound message instead of talking to a real
//! platform, which makes it usable both as the default adapter of the binary
//! and as the recording double in the service tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures::future::BoxFuture;
use rand::seq::IndexedRandom;
use tracing::info;

use crate::collab::chat::{ChatPort, MemberProfile};
use crate::collab::metadata::{MetadataPort, TrackMetadata};
use crate::collab::reward::RewardPort;
use crate::collab::theme::{ThemeContext, ThemeGenerator};
use crate::collab::CollabResult;
use crate::dao::models::{ChannelId, CommunityId, MessageId, UserId};
use crate::state::week::WeekId;

/// A message captured by [`DevChat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedMessage {
    /// Channel or user the message went to.
    pub target: String,
    /// Message body.
    pub body: String,
    /// Generated message id.
    pub id: MessageId,
}

/// Chat port that logs and records outbound traffic.
pub struct DevChat {
    posts: Mutex<Vec<CapturedMessage>>,
    dms: Mutex<Vec<CapturedMessage>>,
    members: DashMap<UserId, MemberProfile>,
    /// When true, unknown user ids resolve to a synthesized member.
    permissive: bool,
    next_id: AtomicU64,
}

impl DevChat {
    /// Chat double that treats every user id as a community member.
    pub fn permissive() -> Self {
        Self::new(true)
    }

    /// Chat double that only knows explicitly inserted members.
    pub fn strict() -> Self {
        Self::new(false)
    }

    fn new(permissive: bool) -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            dms: Mutex::new(Vec::new()),
            members: DashMap::new(),
            permissive,
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a member the strict directory will resolve.
    pub fn insert_member(&self, id: impl Into<UserId>, display_name: impl Into<String>, bot: bool) {
        let id = id.into();
        self.members.insert(
            id.clone(),
            MemberProfile {
                id,
                display_name: display_name.into(),
                bot,
            },
        );
    }

    /// Messages posted to channels so far.
    pub fn posted(&self) -> Vec<CapturedMessage> {
        self.posts.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Direct messages sent so far.
    pub fn dmed(&self) -> Vec<CapturedMessage> {
        self.dms.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn allocate_id(&self) -> MessageId {
        format!("msg-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn capture(&self, log: &Mutex<Vec<CapturedMessage>>, target: String, body: String) -> MessageId {
        let id = self.allocate_id();
        if let Ok(mut log) = log.lock() {
            log.push(CapturedMessage {
                target,
                body,
                id: id.clone(),
            });
        }
        id
    }
}

impl ChatPort for DevChat {
    fn post_message(
        &self,
        channel: ChannelId,
        body: String,
    ) -> BoxFuture<'static, CollabResult<MessageId>> {
        info!(%channel, "chat post: {body}");
        let id = self.capture(&self.posts, channel, body);
        Box::pin(async move { Ok(id) })
    }

    fn dm_user(&self, user: UserId, body: String) -> BoxFuture<'static, CollabResult<MessageId>> {
        info!(%user, "chat dm: {body}");
        let id = self.capture(&self.dms, user, body);
        Box::pin(async move { Ok(id) })
    }

    fn resolve_member(
        &self,
        _community: CommunityId,
        user: UserId,
    ) -> BoxFuture<'static, CollabResult<Option<MemberProfile>>> {
        let known = self.members.get(&user).map(|entry| entry.clone());
        let resolved = match known {
            Some(profile) => Some(profile),
            None if self.permissive => Some(MemberProfile {
                display_name: user.clone(),
                id: user,
                bot: false,
            }),
            None => None,
        };
        Box::pin(async move { Ok(resolved) })
    }

    fn count_messages(
        &self,
        _channel: ChannelId,
        _week: WeekId,
    ) -> BoxFuture<'static, CollabResult<u32>> {
        Box::pin(async move { Ok(0) })
    }
}

const CANNED_THEMES: &[&str] = &[
    "Songs for a rainy rooftop",
    "Two chords, no more",
    "Midnight arcade",
    "Cover a nursery rhyme",
    "Basslines from another planet",
    "One-take wonder",
];

/// Theme generator that picks from a canned list.
#[derive(Default)]
pub struct DevThemes;

impl ThemeGenerator for DevThemes {
    fn generate(&self, context: ThemeContext) -> BoxFuture<'static, CollabResult<String>> {
        let fresh: Vec<&&str> = CANNED_THEMES
            .iter()
            .filter(|theme| Some(**theme) != context.previous_theme.as_deref())
            .collect();
        let pick = fresh
            .choose(&mut rand::rng())
            .map(|theme| (**theme).to_string())
            .unwrap_or_else(|| "Free theme".to_string());
        Box::pin(async move { Ok(pick) })
    }
}

/// Reward port that always reports the configured outcome.
pub struct DevRewards {
    outcome: bool,
}

impl DevRewards {
    /// Rewards that always land.
    pub fn succeeding() -> Self {
        Self { outcome: true }
    }

    /// Rewards that always fail, for degradation tests.
    pub fn failing() -> Self {
        Self { outcome: false }
    }
}

impl RewardPort for DevRewards {
    fn award(&self, user: UserId, amount: i64) -> BoxFuture<'static, bool> {
        let outcome = self.outcome;
        info!(%user, amount, outcome, "reward award");
        Box::pin(async move { outcome })
    }
}

/// Metadata port that never enriches anything.
#[derive(Default)]
pub struct DevMetadata;

impl MetadataPort for DevMetadata {
    fn fetch(&self, _reference: String) -> BoxFuture<'static, Option<TrackMetadata>> {
        Box::pin(async move { None })
    }
}

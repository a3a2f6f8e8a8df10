use futures::future::BoxFuture;

use crate::collab::CollabResult;
use crate::dao::models::{ChannelId, CommunityId, MessageId, UserId};
use crate::state::week::WeekId;

/// Inbound message event delivered by the chat platform adapter.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Raw message text.
    pub text: String,
    /// Number of file attachments (content is opaque to the core).
    pub attachments: u32,
    /// Users mentioned in the message, in order of appearance.
    pub mentions: Vec<UserId>,
    /// Author of the message.
    pub author: UserId,
    /// Channel the message arrived in.
    pub channel: ChannelId,
}

/// Inbound reaction event delivered by the chat platform adapter.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    /// Emoji the user reacted with.
    pub emoji: String,
    /// Message the reaction was placed on.
    pub message: MessageId,
    /// User who reacted.
    pub user: UserId,
}

/// Community member as resolved by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberProfile {
    /// Platform identity.
    pub id: UserId,
    /// Display name used in announcements.
    pub display_name: String,
    /// True for bot accounts, which can never be submission partners.
    pub bot: bool,
}

/// Outbound chat operations the core needs from the platform adapter.
pub trait ChatPort: Send + Sync {
    /// Post a message to a channel, returning the posted message id.
    fn post_message(
        &self,
        channel: ChannelId,
        body: String,
    ) -> BoxFuture<'static, CollabResult<MessageId>>;

    /// Send a direct message to a user, returning the posted message id.
    fn dm_user(&self, user: UserId, body: String) -> BoxFuture<'static, CollabResult<MessageId>>;

    /// Resolve a user id to a community member, or `None` when the user is
    /// not (or no longer) a member.
    fn resolve_member(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> BoxFuture<'static, CollabResult<Option<MemberProfile>>>;

    /// Raw count of messages posted to a channel during a week. Only used as
    /// the team-count fallback when submission validation is disabled.
    fn count_messages(
        &self,
        channel: ChannelId,
        week: WeekId,
    ) -> BoxFuture<'static, CollabResult<u32>>;
}

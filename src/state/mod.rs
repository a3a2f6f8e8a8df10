/// Pure vote-resolution decisions.
pub mod resolution;
/// ISO-week scoping and the weekly calendar.
pub mod week;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::collab::chat::ChatPort;
use crate::collab::metadata::MetadataPort;
use crate::collab::reward::RewardPort;
use crate::collab::theme::ThemeGenerator;
use crate::dao::models::{CommunityId, MessageId};
use crate::dao::store::StateStore;
use crate::state::week::WeekId;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state: the state store, the collaborator ports, and
/// the keyed serialization primitives required by the core.
pub struct AppState {
    store: Arc<dyn StateStore>,
    chat: Arc<dyn ChatPort>,
    themes: Arc<dyn ThemeGenerator>,
    rewards: Arc<dyn RewardPort>,
    metadata: Arc<dyn MetadataPort>,
    /// Serializes check-then-write sequences per `(community, week)`.
    week_locks: DashMap<(CommunityId, WeekId), Arc<Mutex<()>>>,
    /// One active scheduler tick per community at a time.
    tick_gates: DashMap<CommunityId, Arc<Mutex<()>>>,
    /// Confirmation prompts awaiting a reaction, keyed by prompt message id.
    prompts: DashMap<MessageId, CommunityId>,
    /// Abortable confirmation-timeout tasks, one slot per community.
    confirm_timers: DashMap<CommunityId, JoinHandle<()>>,
}

impl AppState {
    /// Assemble the shared state from a store and the collaborator ports.
    pub fn new(
        store: Arc<dyn StateStore>,
        chat: Arc<dyn ChatPort>,
        themes: Arc<dyn ThemeGenerator>,
        rewards: Arc<dyn RewardPort>,
        metadata: Arc<dyn MetadataPort>,
    ) -> SharedState {
        Arc::new(Self {
            store,
            chat,
            themes,
            rewards,
            metadata,
            week_locks: DashMap::new(),
            tick_gates: DashMap::new(),
            prompts: DashMap::new(),
            confirm_timers: DashMap::new(),
        })
    }

    /// Handle to the durable state store.
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Handle to the chat platform port.
    pub fn chat(&self) -> &Arc<dyn ChatPort> {
        &self.chat
    }

    /// Handle to the theme generator port.
    pub fn themes(&self) -> &Arc<dyn ThemeGenerator> {
        &self.themes
    }

    /// Handle to the reward port.
    pub fn rewards(&self) -> &Arc<dyn RewardPort> {
        &self.rewards
    }

    /// Handle to the metadata enrichment port.
    pub fn metadata(&self) -> &Arc<dyn MetadataPort> {
        &self.metadata
    }

    /// Mutex guarding check-then-write sequences for one community week.
    ///
    /// Both the team registry and the vote tally take this lock, so two
    /// concurrent submissions (or duplicate votes) cannot both pass their
    /// uniqueness check.
    pub fn week_lock(&self, community: &CommunityId, week: WeekId) -> Arc<Mutex<()>> {
        self.week_locks
            .entry((community.clone(), week))
            .or_default()
            .clone()
    }

    /// Mutex ensuring a single active scheduler tick per community.
    pub fn tick_gate(&self, community: &CommunityId) -> Arc<Mutex<()>> {
        self.tick_gates.entry(community.clone()).or_default().clone()
    }

    /// Register a confirmation prompt so reaction events can be routed back
    /// to the owning community.
    pub fn register_prompt(&self, message: MessageId, community: CommunityId) {
        self.prompts.insert(message, community);
    }

    /// Community owning a confirmation prompt, if the message is one.
    pub fn prompt_owner(&self, message: &MessageId) -> Option<CommunityId> {
        self.prompts.get(message).map(|entry| entry.clone())
    }

    /// Drop a confirmation prompt registration.
    pub fn forget_prompt(&self, message: &MessageId) {
        self.prompts.remove(message);
    }

    /// Install a confirmation-timeout task, aborting any previous one for the
    /// same community (single pending announcement slot, last writer wins).
    pub fn install_confirm_timer(&self, community: CommunityId, task: JoinHandle<()>) {
        if let Some((_, previous)) = self.confirm_timers.remove(&community) {
            previous.abort();
        }
        self.confirm_timers.insert(community, task);
    }

    /// Abort and drop the confirmation-timeout task, if one is armed.
    pub fn cancel_confirm_timer(&self, community: &CommunityId) {
        if let Some((_, task)) = self.confirm_timers.remove(community) {
            task.abort();
        }
    }
}

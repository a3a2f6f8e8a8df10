//! Persisted entities shared between the state store and the service layer.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, Weekday};
use uuid::Uuid;

use crate::state::week::{Phase, WeekId};

/// Identifier of a served community (the chat platform's guild).
pub type CommunityId = String;
/// Identifier of a chat platform user.
pub type UserId = String;
/// Identifier of a chat channel.
pub type ChannelId = String;
/// Identifier of a posted chat message.
pub type MessageId = String;

/// Competition state owned by the phase scheduler, one record per community.
///
/// Reset at each week-start transition; mutated only by scheduler transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompetitionRecord {
    /// Week this record currently describes.
    pub week: WeekId,
    /// Current phase of the competition.
    pub phase: Phase,
    /// Theme of the current week.
    pub theme: String,
    /// Theme staged for the next week, applied at the week-start transition.
    pub next_theme: Option<String>,
    /// True when the current week was cancelled instead of finishing.
    pub week_cancelled: bool,
    /// True once exactly one winner-determination run completed for the week
    /// that just closed.
    pub winner_announced: bool,
    /// True once a theme for the following week has been generated.
    pub theme_generation_done: bool,
    /// Idempotency tokens of the transitions already fired. A restarted
    /// scheduler that re-evaluates a past condition finds its key here and
    /// does nothing.
    pub fired_keys: BTreeSet<String>,
    /// Last mutation timestamp, for auditing.
    pub updated_at: OffsetDateTime,
}

impl CompetitionRecord {
    /// Fresh record for a community that has not been activated yet.
    pub fn inactive(week: WeekId) -> Self {
        Self {
            week,
            phase: Phase::Inactive,
            theme: String::new(),
            next_theme: None,
            week_cancelled: false,
            winner_announced: false,
            theme_generation_done: false,
            fired_keys: BTreeSet::new(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// Whether the idempotency token has already been consumed.
    pub fn fired(&self, key: &str) -> bool {
        self.fired_keys.contains(key)
    }
}

/// A registered two-person team for one week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamRecord {
    /// Display name, unique per week (case-insensitive).
    pub name: String,
    /// Exactly two distinct member identities.
    pub members: [UserId; 2],
    /// When the submission was accepted.
    pub submitted_at: OffsetDateTime,
    /// External audio reference, absent for attachment-only submissions.
    pub track_reference: Option<String>,
}

/// A 24-hour secondary vote among tied top teams.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaceOffRecord {
    /// Instance identifier; face-off votes are keyed by it, not by the week.
    pub id: Uuid,
    /// Week whose winner is being decided.
    pub week: WeekId,
    /// Tied team names, in weekly-tally order.
    pub teams: Vec<String>,
    /// Instant after which the face-off resolves (24h after creation).
    pub deadline: OffsetDateTime,
    /// One vote per voter, wholly separate from the weekly tally.
    pub votes: BTreeMap<UserId, String>,
}

impl FaceOffRecord {
    /// Derive the per-team counts from the recorded votes. Teams without a
    /// single vote still appear, with a count of zero.
    pub fn results(&self) -> BTreeMap<String, u32> {
        let mut counts: BTreeMap<String, u32> =
            self.teams.iter().map(|team| (team.clone(), 0)).collect();
        for team in self.votes.values() {
            if let Some(count) = counts.get_mut(team) {
                *count += 1;
            }
        }
        counts
    }
}

/// Kinds of outbound announcements the confirmation gate can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementKind {
    /// A new week opened for submissions.
    WeekStart,
    /// Voting opened for the current week.
    VotingStart,
    /// Evening reminder before the submission deadline.
    SubmissionReminder,
    /// Evening reminder before the voting deadline.
    VotingReminder,
    /// The weekly winner was determined.
    Winner,
    /// A tie was detected and a face-off opened.
    FaceOff,
    /// The week was cancelled (insufficient teams or no votes).
    WeekCancelled,
    /// A generated theme is staged for the next week.
    ThemeProposal,
}

/// The single pending announcement slot per community (last writer wins).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingAnnouncementRecord {
    /// What kind of announcement is awaiting confirmation.
    pub kind: AnnouncementKind,
    /// Rendered message body posted on approval or timeout.
    pub body: String,
    /// Theme referenced by the announcement, if any.
    pub theme: Option<String>,
    /// Human-readable deadline shown in the announcement, if any.
    pub deadline_text: Option<String>,
    /// Channel the announcement posts to.
    pub target_channel: ChannelId,
    /// When the slot was filled.
    pub created_at: OffsetDateTime,
    /// DM prompt whose reactions resolve this announcement, once delivered.
    pub prompt_message: Option<MessageId>,
}

/// Append-only historical record of a week's winner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyWinnerRecord {
    /// Week that was won.
    pub week: WeekId,
    /// Winning team name.
    pub team_name: String,
    /// The two members of the winning team.
    pub members: [UserId; 2],
    /// Per-member reward delivery outcome; a failed award is recorded as
    /// `false` and never blocks the announcement.
    pub reward_outcome: BTreeMap<UserId, bool>,
    /// When the winner was determined.
    pub decided_at: OffsetDateTime,
    /// True when the winner was picked uniformly at random after a face-off
    /// that stayed tied.
    pub random_pick: bool,
}

/// Per-community configuration, loaded and saved through the state store
/// rather than held in process-wide globals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommunityConfig {
    /// Weekday the week-start transition is allowed to fire on.
    #[serde(with = "weekday_serde")]
    pub start_weekday: Weekday,
    /// Minimum registered teams required to open voting.
    pub min_teams: u32,
    /// When false, submissions are not validated and the team count falls
    /// back to the chat collaborator's raw message count.
    pub validation_enabled: bool,
    /// When true (and an admin is configured) announcements await approval.
    pub confirmation_required: bool,
    /// Admin who receives confirmation prompts.
    pub admin_user: Option<UserId>,
    /// Channel announcements are posted to.
    pub announce_channel: ChannelId,
    /// Channel submissions arrive in, used for the raw-count fallback.
    pub submission_channel: Option<ChannelId>,
    /// Fixed confirmation timeout for non-week-start announcements.
    pub confirm_timeout_secs: u64,
    /// Reputation points awarded to each winning member.
    pub reward_amount: i64,
    /// Bearer token required by the vote ingestion endpoint, if set.
    pub vote_token: Option<String>,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            start_weekday: Weekday::Monday,
            min_teams: 2,
            validation_enabled: true,
            confirmation_required: false,
            admin_user: None,
            announce_channel: String::new(),
            submission_channel: None,
            confirm_timeout_secs: 30 * 60,
            reward_amount: 100,
            vote_token: None,
        }
    }
}

mod weekday_serde {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use time::Weekday;

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        let name = match day {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        };
        serializer.serialize_str(name)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "monday" => Ok(Weekday::Monday),
            "tuesday" => Ok(Weekday::Tuesday),
            "wednesday" => Ok(Weekday::Wednesday),
            "thursday" => Ok(Weekday::Thursday),
            "friday" => Ok(Weekday::Friday),
            "saturday" => Ok(Weekday::Saturday),
            "sunday" => Ok(Weekday::Sunday),
            other => Err(D::Error::custom(format!("unknown weekday `{other}`"))),
        }
    }
}

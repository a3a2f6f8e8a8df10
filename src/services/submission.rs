//! Submission validation: turns a raw chat message into a structured
//! submission attempt or an ordered list of user-facing errors.
//!
//! Validation is pure; the caller resolves mentioned users through the chat
//! port first and hands the results in. Registration is a separate step owned
//! by the team registry.

use uuid::Uuid;

use crate::collab::chat::{InboundMessage, MemberProfile};
use crate::dao::models::UserId;

/// Domain of the only platform whose references are accepted.
const ALLOWED_DOMAIN: &str = "suno.com";

/// External platforms that are explicitly rejected.
const DISALLOWED_DOMAINS: &[&str] = &[
    "spotify.com",
    "soundcloud.com",
    "youtube.com",
    "youtu.be",
    "bandcamp.com",
    "audiomack.com",
    "deezer.com",
];

/// Label introducing the team-name line (matched case-insensitively).
const TEAM_NAME_LABEL: &str = "team name:";

/// A mentioned user together with its membership resolution.
#[derive(Debug, Clone)]
pub struct MentionCandidate {
    /// Mentioned user id.
    pub id: UserId,
    /// Resolved member profile; `None` when the user is not a community
    /// member.
    pub profile: Option<MemberProfile>,
}

/// A submission attempt that passed all format and partner rules.
///
/// Not yet registered: uniqueness is enforced by the team registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    /// Team name extracted from the `team name:` line, trimmed.
    pub team_name: String,
    /// The resolved partner of the submitting user.
    pub partner: UserId,
    /// Canonical track reference, absent for attachment-only submissions.
    pub track_reference: Option<String>,
}

/// Validate a submission message against the format and partner rules.
///
/// Rules are checked in order and the first failing platform/format rule
/// short-circuits; the team-name and partner rules are independent and can
/// both contribute errors.
pub fn validate(
    message: &InboundMessage,
    mentions: &[MentionCandidate],
) -> Result<ValidSubmission, Vec<String>> {
    let lower = message.text.to_ascii_lowercase();

    if let Some(domain) = DISALLOWED_DOMAINS
        .iter()
        .find(|domain| lower.contains(*domain))
    {
        return Err(vec![format!(
            "links to `{domain}` cannot be submitted; only Suno links ({ALLOWED_DOMAIN}) \
             or direct file attachments are accepted"
        )]);
    }

    let track_reference = extract_track_reference(&message.text);

    if lower.contains(ALLOWED_DOMAIN) && track_reference.is_none() {
        return Err(vec![format!(
            "that {ALLOWED_DOMAIN} link is not recognised; expected \
             https://{ALLOWED_DOMAIN}/s/<id> or https://{ALLOWED_DOMAIN}/song/<uuid>"
        )]);
    }

    if message.attachments == 0 && track_reference.is_none() {
        return Err(vec![format!(
            "attach your track or include a {ALLOWED_DOMAIN} link"
        )]);
    }

    let mut errors = Vec::new();

    let team_name = match extract_team_name(&message.text) {
        Some(name) => Some(name),
        None => {
            errors.push("include a line `Team name: <your team name>` in your submission".into());
            None
        }
    };

    let partner = match resolve_partner(&message.author, mentions) {
        Ok(partner) => Some(partner),
        Err(error) => {
            errors.push(error);
            None
        }
    };

    match (team_name, partner) {
        (Some(team_name), Some(partner)) if errors.is_empty() => Ok(ValidSubmission {
            team_name,
            partner,
            track_reference,
        }),
        _ => Err(errors),
    }
}

/// Find the first URL in the text whose path matches one of the two accepted
/// reference shapes (`/s/<alphanumeric>` or `/song/<uuid>`) and return it.
///
/// Disallowed platforms were already rejected by the time this runs, so any
/// surviving domain carrying the right shape is taken as the track reference.
fn extract_track_reference(text: &str) -> Option<String> {
    for raw in text.split(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '(' | ')' | '"')) {
        let token = raw.trim_end_matches(['.', ',', '!']);
        let Some(scheme_end) = token.find("://") else {
            continue;
        };
        let Some(slash) = token[scheme_end + 3..].find('/') else {
            continue;
        };
        // Ignore query strings and fragments when judging the shape.
        let path = token[scheme_end + 3 + slash..]
            .split(['?', '#'])
            .next()
            .unwrap_or("");

        if let Some(id) = path.strip_prefix("/s/") {
            if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Some(token.to_string());
            }
        } else if let Some(id) = path.strip_prefix("/song/")
            && Uuid::parse_str(id).is_ok()
        {
            return Some(token.to_string());
        }
    }
    None
}

/// Extract the team name from the first `team name:` line, if present.
fn extract_team_name(text: &str) -> Option<String> {
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.len() >= TEAM_NAME_LABEL.len()
            && trimmed[..TEAM_NAME_LABEL.len()].eq_ignore_ascii_case(TEAM_NAME_LABEL)
        {
            let name = trimmed[TEAM_NAME_LABEL.len()..].trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Pick the partner among the mentioned users: not the author, not a bot, and
/// a current community member. The first qualifying mention wins.
fn resolve_partner(author: &UserId, mentions: &[MentionCandidate]) -> Result<UserId, String> {
    if mentions.is_empty() {
        return Err("mention the partner you collaborated with".into());
    }

    let others: Vec<&MentionCandidate> = mentions
        .iter()
        .filter(|candidate| &candidate.id != author)
        .collect();
    if others.is_empty() {
        return Err("you mentioned only yourself; mention your partner instead".into());
    }

    let humans: Vec<&MentionCandidate> = others
        .into_iter()
        .filter(|candidate| !candidate.profile.as_ref().is_some_and(|profile| profile.bot))
        .collect();
    if humans.is_empty() {
        return Err("mention the partner you collaborated with".into());
    }

    humans
        .iter()
        .find(|candidate| candidate.profile.is_some())
        .map(|candidate| candidate.id.clone())
        .ok_or_else(|| "the partner you mentioned is not a member of this community".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str, attachments: u32, mentions: &[&str], author: &str) -> InboundMessage {
        InboundMessage {
            text: text.to_string(),
            attachments,
            mentions: mentions.iter().map(|id| (*id).to_string()).collect(),
            author: author.to_string(),
            channel: "submissions".into(),
        }
    }

    fn member(id: &str) -> MentionCandidate {
        MentionCandidate {
            id: id.to_string(),
            profile: Some(MemberProfile {
                id: id.to_string(),
                display_name: id.to_string(),
                bot: false,
            }),
        }
    }

    #[test]
    fn valid_song_link_submission_passes() {
        let text = "Team name: Moonlight\n@partner here's our track\n\
                    https://example.com/song/3b172539-fc21-4f37-937c-a641ed52da26";
        let msg = message(text, 0, &["partner"], "author");
        let result = validate(&msg, &[member("partner")]).unwrap();
        assert_eq!(result.team_name, "Moonlight");
        assert_eq!(result.partner, "partner");
        assert_eq!(
            result.track_reference.as_deref(),
            Some("https://example.com/song/3b172539-fc21-4f37-937c-a641ed52da26")
        );
    }

    #[test]
    fn short_link_shape_is_accepted() {
        let msg = message(
            "team name: Starfall\n@p https://suno.com/s/Abc123xyz",
            0,
            &["p"],
            "author",
        );
        let result = validate(&msg, &[member("p")]).unwrap();
        assert_eq!(
            result.track_reference.as_deref(),
            Some("https://suno.com/s/Abc123xyz")
        );
    }

    #[test]
    fn attachment_only_submission_passes_without_link() {
        let msg = message("Team Name: Tape Ghosts\n@p our demo", 1, &["p"], "author");
        let result = validate(&msg, &[member("p")]).unwrap();
        assert_eq!(result.team_name, "Tape Ghosts");
        assert_eq!(result.track_reference, None);
    }

    #[test]
    fn disallowed_platform_rejected_regardless_of_other_content() {
        let msg = message(
            "Team name: Moonlight\n@p https://open.spotify.com/track/x",
            1,
            &["p"],
            "author",
        );
        let errors = validate(&msg, &[member("p")]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("spotify.com"));
        assert!(errors[0].contains("suno.com"));
    }

    #[test]
    fn allowed_domain_with_malformed_path_is_a_format_error() {
        let msg = message(
            "Team name: Moonlight\n@p https://suno.com/playlist/123",
            1,
            &["p"],
            "author",
        );
        let errors = validate(&msg, &[member("p")]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("/s/<id>"));
    }

    #[test]
    fn malformed_uuid_is_a_format_error() {
        let msg = message(
            "Team name: Moonlight\n@p https://suno.com/song/not-a-uuid",
            0,
            &["p"],
            "author",
        );
        let errors = validate(&msg, &[member("p")]).unwrap_err();
        assert!(errors[0].contains("not recognised"));
    }

    #[test]
    fn no_attachment_and_no_link_is_rejected() {
        let msg = message("Team name: Moonlight\n@p listen later", 0, &["p"], "author");
        let errors = validate(&msg, &[member("p")]).unwrap_err();
        assert!(errors[0].contains("attach your track"));
    }

    #[test]
    fn missing_team_line_and_missing_mention_both_reported() {
        let msg = message("here's our track", 1, &[], "author");
        let errors = validate(&msg, &[]).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("Team name:"));
        assert!(errors[1].contains("mention the partner"));
    }

    #[test]
    fn self_mention_only_is_a_distinct_error() {
        let msg = message("Team name: Moonlight\n@author solo?", 1, &["author"], "author");
        let errors = validate(&msg, &[member("author")]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("only yourself"));
    }

    #[test]
    fn non_member_partner_is_a_distinct_error() {
        let msg = message("Team name: Moonlight\n@ghost", 1, &["ghost"], "author");
        let mentions = [MentionCandidate {
            id: "ghost".into(),
            profile: None,
        }];
        let errors = validate(&msg, &mentions).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("not a member"));
    }

    #[test]
    fn bot_mentions_are_ignored_when_picking_the_partner() {
        let msg = message(
            "Team name: Moonlight\n@bot @human",
            1,
            &["bot", "human"],
            "author",
        );
        let mentions = [
            MentionCandidate {
                id: "bot".into(),
                profile: Some(MemberProfile {
                    id: "bot".into(),
                    display_name: "bot".into(),
                    bot: true,
                }),
            },
            member("human"),
        ];
        let result = validate(&msg, &mentions).unwrap();
        assert_eq!(result.partner, "human");
    }

    #[test]
    fn first_member_mention_wins() {
        let msg = message(
            "Team name: Moonlight\n@first @second",
            1,
            &["first", "second"],
            "author",
        );
        let result = validate(&msg, &[member("first"), member("second")]).unwrap();
        assert_eq!(result.partner, "first");
    }
}

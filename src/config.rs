//! Application-level configuration loading, including the served communities.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::{ChannelId, CommunityConfig, CommunityId, UserId};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BEAT_LEAGUE_BACK_CONFIG_PATH";
/// Scheduler sweep interval used when the config does not set one.
const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    tick_interval: Duration,
    communities: Vec<(CommunityId, CommunityConfig)>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to a
    /// baked-in development community.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        communities = app_config.communities.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Interval between scheduler sweeps.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Communities to register at startup.
    pub fn communities(&self) -> &[(CommunityId, CommunityConfig)] {
        &self.communities
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
            communities: vec![(
                "dev".to_string(),
                CommunityConfig {
                    announce_channel: "announcements".into(),
                    submission_channel: Some("submissions".into()),
                    ..CommunityConfig::default()
                },
            )],
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    tick_interval_secs: Option<u64>,
    #[serde(default)]
    communities: Vec<RawCommunity>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            tick_interval: Duration::from_secs(
                value.tick_interval_secs.unwrap_or(DEFAULT_TICK_INTERVAL_SECS),
            ),
            communities: value.communities.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single community inside the configuration file.
struct RawCommunity {
    id: CommunityId,
    announce_channel: ChannelId,
    submission_channel: Option<ChannelId>,
    admin_user: Option<UserId>,
    #[serde(default)]
    confirmation_required: bool,
    min_teams: Option<u32>,
    vote_token: Option<String>,
}

impl From<RawCommunity> for (CommunityId, CommunityConfig) {
    fn from(value: RawCommunity) -> Self {
        let defaults = CommunityConfig::default();
        (
            value.id,
            CommunityConfig {
                announce_channel: value.announce_channel,
                submission_channel: value.submission_channel,
                admin_user: value.admin_user,
                confirmation_required: value.confirmation_required,
                min_teams: value.min_teams.unwrap_or(defaults.min_teams),
                vote_token: value.vote_token,
                ..defaults
            },
        )
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_fills_in_community_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "tick_interval_secs": 30,
                "communities": [
                    {
                        "id": "guild",
                        "announce_channel": "general",
                        "admin_user": "admin",
                        "confirmation_required": true,
                        "vote_token": "secret"
                    }
                ]
            }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.tick_interval(), Duration::from_secs(30));
        let (id, community) = &config.communities()[0];
        assert_eq!(id, "guild");
        assert_eq!(community.announce_channel, "general");
        assert!(community.confirmation_required);
        assert_eq!(community.min_teams, 2);
        assert_eq!(community.vote_token.as_deref(), Some("secret"));
    }

    #[test]
    fn defaults_carry_a_development_community() {
        let config = AppConfig::default();
        assert_eq!(config.communities().len(), 1);
        assert_eq!(config.communities()[0].0, "dev");
    }
}

use crate::application_impl::SocialConfig;
use crate::domain_model::{FriendLimit, UserPreferences};
use anyhow::{Result, anyhow};
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log: Log,
    pub social: Social,
    pub preferences: Preferences,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Social {
    pub friend_request_duration_secs: u64,
    pub max_friend_limit: i64, // positive, or -1 for unlimited
}

#[derive(Debug, Deserialize)]
pub struct Preferences {
    /// Applied to players without a stored record.
    pub default: UserPreferences,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub backend: String, // "sqlite" or "mysql"
    pub sqlite_path: String,
    pub mysql_dsn: String,
    pub max_connections: u32,
}

impl Settings {
    pub fn social_config(&self) -> Result<SocialConfig> {
        let max_friends = FriendLimit::from_setting(self.social.max_friend_limit).ok_or_else(|| {
            anyhow!(
                "social.max_friend_limit must be positive or -1, got {}",
                self.social.max_friend_limit
            )
        })?;
        if self.social.friend_request_duration_secs == 0 {
            return Err(anyhow!("social.friend_request_duration_secs must be positive"));
        }

        Ok(SocialConfig {
            friend_request_duration: Duration::from_secs(self.social.friend_request_duration_secs),
            max_friends,
            default_preferences: self.preferences.default,
        })
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

pub fn parse_settings_str(toml: &str) -> Result<Settings> {
    let settings: Settings = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::DeviceVisibility;

    fn sample(max_friend_limit: i64) -> String {
        format!(
            r#"
[log]
filter = "debug"

[social]
friend_request_duration_secs = 90
max_friend_limit = {max_friend_limit}

[preferences.default]
prefers_text = true
device_visibility = "nobody"
mute_friend_requests = false

[database]
backend = "sqlite"
sqlite_path = ":memory:"
mysql_dsn = ""
max_connections = 1
"#
        )
    }

    #[test]
    fn bundled_settings_parse() {
        for path in ["settings/dev.toml", "settings/release.toml"] {
            let settings = parse_settings(Some(path)).unwrap();
            settings.social_config().unwrap();
        }
    }

    #[test]
    fn social_config_from_settings() {
        let config = parse_settings_str(&sample(25)).unwrap().social_config().unwrap();
        assert_eq!(config.friend_request_duration, Duration::from_secs(90));
        assert_eq!(config.max_friends, FriendLimit::AtMost(25));
        assert!(config.default_preferences.prefers_text);
        assert_eq!(config.default_preferences.device_visibility, DeviceVisibility::Nobody);

        let unlimited = parse_settings_str(&sample(-1)).unwrap().social_config().unwrap();
        assert_eq!(unlimited.max_friends, FriendLimit::Unlimited);
    }

    #[test]
    fn bad_friend_limits_are_rejected() {
        for limit in [0, -2] {
            let settings = parse_settings_str(&sample(limit)).unwrap();
            assert!(settings.social_config().is_err(), "limit {limit} accepted");
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("settings/does-not-exist.toml")).is_err());
    }
}

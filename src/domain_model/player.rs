use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct PlayerId(pub uuid::Uuid);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(PlayerId)
    }
}

/// A player as seen at one moment: the name and client label can change between
/// sessions, so handles are captured fresh per operation instead of cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerHandle {
    pub id: PlayerId,
    pub username: String,
    pub last_client: String,
    pub last_seen: DateTime<Utc>,
}

impl PlayerHandle {
    pub fn new(
        id: PlayerId,
        username: impl Into<String>,
        last_client: impl Into<String>,
        last_seen: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            last_client: last_client.into(),
            last_seen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceVisibility {
    Everyone,
    Friends,
    Nobody,
}

impl DeviceVisibility {
    pub fn code(self) -> i32 {
        match self {
            DeviceVisibility::Everyone => 0,
            DeviceVisibility::Friends => 1,
            DeviceVisibility::Nobody => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DeviceVisibility::Everyone),
            1 => Some(DeviceVisibility::Friends),
            2 => Some(DeviceVisibility::Nobody),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub prefers_text: bool,
    pub device_visibility: DeviceVisibility,
    pub mute_friend_requests: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            prefers_text: false,
            device_visibility: DeviceVisibility::Friends,
            mute_friend_requests: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRecord {
    pub handle: PlayerHandle,
    pub preferences: UserPreferences,
}

/// Unordered pair of distinct players, normalised so `min() < max()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerPair(PlayerId, PlayerId);

impl PlayerPair {
    pub fn new(a: PlayerId, b: PlayerId) -> Self {
        if a < b { Self(a, b) } else { Self(b, a) }
    }

    pub fn min(&self) -> PlayerId {
        self.0
    }

    pub fn max(&self) -> PlayerId {
        self.1
    }
}

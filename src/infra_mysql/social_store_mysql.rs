use super::codes;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySqlPool, Row};

const SCHEMA: &str = include_str!("mysql_schema.sql");
const STATEMENT_DELIMITER: &str = "-- ;;";

/// MySQL backend. Every compound call is a stored procedure running in its own
/// transaction, so calls are atomic without the `CompoundGuard`.
pub struct MySqlSocialStore {
    pool: MySqlPool,
}

impl MySqlSocialStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlSocialStore { pool }
    }

    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(dsn)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    fn status(row: &MySqlRow) -> Result<i64, StoreError> {
        // literal selects come back as BIGINT, declared variables as INT
        match row.try_get::<i64, _>("status") {
            Ok(status) => Ok(status),
            Err(_) => Ok(i64::from(row.try_get::<i32, _>("status")?)),
        }
    }

    fn handle_at(row: &MySqlRow, prefix: &str) -> Result<PlayerHandle, StoreError> {
        let col = |name: &str| format!("{prefix}{name}");
        Ok(PlayerHandle {
            id: row.try_get(col("uuid").as_str())?,
            username: row.try_get(col("username").as_str())?,
            last_client: row.try_get(col("last_client").as_str())?,
            last_seen: row.try_get(col("last_seen").as_str())?,
        })
    }

    fn row_to_friendship(row: &MySqlRow) -> Result<Friendship, StoreError> {
        Ok(Friendship {
            requester: Self::handle_at(row, "r_")?,
            accepter: Self::handle_at(row, "a_")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_block(row: &MySqlRow) -> Result<BlockRelation, StoreError> {
        Ok(BlockRelation {
            player: Self::handle_at(row, "p_")?,
            blocked: Self::handle_at(row, "t_")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_record(row: &MySqlRow) -> Result<PlayerRecord, StoreError> {
        let code: i32 = row.try_get("device_visibility")?;
        let device_visibility = DeviceVisibility::from_code(code)
            .ok_or_else(|| StoreError::Decode(format!("device_visibility {code}")))?;
        Ok(PlayerRecord {
            handle: Self::handle_at(row, "")?,
            preferences: UserPreferences {
                prefers_text: row.try_get("prefers_text")?,
                device_visibility,
                mute_friend_requests: row.try_get("mute_friend_requests")?,
            },
        })
    }

    async fn touch_both(
        &self,
        a: &PlayerHandle,
        b: &PlayerHandle,
        defaults: &UserPreferences,
    ) -> Result<(), StoreError> {
        self.touch_player(a, defaults).await?;
        self.touch_player(b, defaults).await
    }
}

#[async_trait::async_trait]
impl SocialStore for MySqlSocialStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        for statement in SCHEMA
            .split(STATEMENT_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::raw_sql(statement).execute(&self.pool).await?;
        }
        tracing::info!("MySQL schema and procedures installed");
        Ok(())
    }

    async fn touch_player(
        &self,
        player: &PlayerHandle,
        default_preferences: &UserPreferences,
    ) -> Result<(), StoreError> {
        sqlx::query("CALL qf_touch_player(?, ?, ?, ?, ?, ?, ?)")
            .bind(player.id)
            .bind(&player.username)
            .bind(&player.last_client)
            .bind(player.last_seen)
            .bind(default_preferences.prefers_text)
            .bind(default_preferences.device_visibility.code())
            .bind(default_preferences.mute_friend_requests)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_player(&self, player: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        let row = sqlx::query(
            r#"
SELECT uuid, username, last_client, last_seen, prefers_text, device_visibility, mute_friend_requests
FROM qf_players WHERE uuid = ?
"#,
        )
        .bind(player)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn update_player(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        let handle = &record.handle;
        let prefs = &record.preferences;
        sqlx::query(
            r#"
INSERT INTO qf_players (uuid, username, last_client, last_seen, prefers_text, device_visibility, mute_friend_requests)
VALUES (?, ?, ?, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE
    username = VALUES(username),
    last_client = VALUES(last_client),
    last_seen = VALUES(last_seen),
    prefers_text = VALUES(prefers_text),
    device_visibility = VALUES(device_visibility),
    mute_friend_requests = VALUES(mute_friend_requests)
"#,
        )
        .bind(handle.id)
        .bind(&handle.username)
        .bind(&handle.last_client)
        .bind(handle.last_seen)
        .bind(prefs.prefers_text)
        .bind(prefs.device_visibility.code())
        .bind(prefs.mute_friend_requests)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_friends(&self, player: PlayerId) -> Result<Vec<Friendship>, StoreError> {
        let rows = sqlx::query(
            r#"
SELECT f.created_at,
       r.uuid AS r_uuid, r.username AS r_username, r.last_client AS r_last_client, r.last_seen AS r_last_seen,
       a.uuid AS a_uuid, a.username AS a_username, a.last_client AS a_last_client, a.last_seen AS a_last_seen
FROM qf_friendships f
JOIN qf_players r ON r.uuid = f.requester
JOIN qf_players a ON a.uuid = f.accepter
WHERE f.player_min = ? OR f.player_max = ?
ORDER BY f.created_at
"#,
        )
        .bind(player)
        .bind(player)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_friendship).collect()
    }

    async fn list_blocked(&self, player: PlayerId) -> Result<Vec<BlockRelation>, StoreError> {
        let rows = sqlx::query(
            r#"
SELECT k.created_at,
       p.uuid AS p_uuid, p.username AS p_username, p.last_client AS p_last_client, p.last_seen AS p_last_seen,
       t.uuid AS t_uuid, t.username AS t_username, t.last_client AS t_last_client, t.last_seen AS t_last_seen
FROM qf_blocks k
JOIN qf_players p ON p.uuid = k.player
JOIN qf_players t ON t.uuid = k.blocked
WHERE k.player = ?
ORDER BY k.created_at
"#,
        )
        .bind(player)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_block).collect()
    }

    async fn list_blocked_by(&self, player: PlayerId) -> Result<Vec<BlockRelation>, StoreError> {
        let rows = sqlx::query(
            r#"
SELECT k.created_at,
       p.uuid AS p_uuid, p.username AS p_username, p.last_client AS p_last_client, p.last_seen AS p_last_seen,
       t.uuid AS t_uuid, t.username AS t_username, t.last_client AS t_last_client, t.last_seen AS t_last_seen
FROM qf_blocks k
JOIN qf_players p ON p.uuid = k.player
JOIN qf_players t ON t.uuid = k.blocked
WHERE k.blocked = ?
ORDER BY k.created_at
"#,
        )
        .bind(player)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_block).collect()
    }

    async fn add_friendship(
        &self,
        requester: &PlayerHandle,
        accepter: &PlayerHandle,
        created_at: DateTime<Utc>,
        default_preferences: &UserPreferences,
        max_friends: FriendLimit,
    ) -> Result<AddFriendshipCode, StoreError> {
        self.touch_both(requester, accepter, default_preferences)
            .await?;

        let row = sqlx::query("CALL qf_add_friend(?, ?, ?, ?)")
            .bind(requester.id)
            .bind(accepter.id)
            .bind(created_at)
            .bind(max_friends.as_sql())
            .fetch_one(&self.pool)
            .await?;

        codes::add_friendship(Self::status(&row)?)
    }

    async fn remove_friendship(
        &self,
        a: PlayerId,
        b: PlayerId,
    ) -> Result<RemoveFriendshipOutcome, StoreError> {
        let row = sqlx::query("CALL qf_remove_friend(?, ?)")
            .bind(a)
            .bind(b)
            .fetch_one(&self.pool)
            .await?;

        if codes::removed("qf_remove_friend", Self::status(&row)?)? {
            Ok(RemoveFriendshipOutcome::Removed(Self::row_to_friendship(&row)?))
        } else {
            Ok(RemoveFriendshipOutcome::NotFriends)
        }
    }

    async fn add_block(
        &self,
        player: &PlayerHandle,
        blocked: &PlayerHandle,
        created_at: DateTime<Utc>,
        default_preferences: &UserPreferences,
    ) -> Result<AddBlockCode, StoreError> {
        self.touch_both(player, blocked, default_preferences).await?;

        let row = sqlx::query("CALL qf_add_block(?, ?, ?)")
            .bind(player.id)
            .bind(blocked.id)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await?;

        codes::add_block(Self::status(&row)?)
    }

    async fn remove_block(
        &self,
        player: PlayerId,
        blocked: PlayerId,
    ) -> Result<RemoveBlockOutcome, StoreError> {
        let row = sqlx::query("CALL qf_remove_block(?, ?)")
            .bind(player)
            .bind(blocked)
            .fetch_one(&self.pool)
            .await?;

        if codes::removed("qf_remove_block", Self::status(&row)?)? {
            Ok(RemoveBlockOutcome::Removed(Self::row_to_block(&row)?))
        } else {
            Ok(RemoveBlockOutcome::NotBlocked)
        }
    }

    async fn friend_request_disposition(
        &self,
        requester: &PlayerHandle,
        receiver: &PlayerHandle,
        default_preferences: &UserPreferences,
        max_friends: FriendLimit,
    ) -> Result<RequestDisposition, StoreError> {
        let row = sqlx::query("CALL qf_friend_request_disposition(?, ?, ?, ?)")
            .bind(requester.id)
            .bind(receiver.id)
            .bind(max_friends.as_sql())
            .bind(default_preferences.mute_friend_requests)
            .fetch_one(&self.pool)
            .await?;

        codes::disposition(Self::status(&row)?)
    }
}

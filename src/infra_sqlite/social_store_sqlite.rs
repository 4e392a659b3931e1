use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};

const SCHEMA: &str = include_str!("sqlite_schema.sql");

macro_rules! friendship_select {
    ($filter:literal) => {
        concat!(
            r#"
SELECT f.created_at,
       r.uuid AS r_uuid, r.username AS r_username, r.last_client AS r_last_client, r.last_seen AS r_last_seen,
       a.uuid AS a_uuid, a.username AS a_username, a.last_client AS a_last_client, a.last_seen AS a_last_seen
FROM friendships f
JOIN players r ON r.uuid = f.requester
JOIN players a ON a.uuid = f.accepter
"#,
            $filter
        )
    };
}

macro_rules! block_select {
    ($filter:literal) => {
        concat!(
            r#"
SELECT k.created_at,
       p.uuid AS p_uuid, p.username AS p_username, p.last_client AS p_last_client, p.last_seen AS p_last_seen,
       t.uuid AS t_uuid, t.username AS t_username, t.last_client AS t_last_client, t.last_seen AS t_last_seen
FROM blocks k
JOIN players p ON p.uuid = k.player
JOIN players t ON t.uuid = k.blocked
"#,
            $filter
        )
    };
}

/// Row-level SQLite backend.
///
/// Each compound call runs inside one SQLite transaction, but the
/// check-then-write sequences are only safe against each other while the
/// caller holds the `CompoundGuard` for both players.
pub struct SqliteSocialStore {
    pool: SqlitePool,
}

impl SqliteSocialStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteSocialStore { pool }
    }

    pub async fn connect(path: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// Private database with the schema applied. The pool keeps its single
    /// connection forever, since closing it would discard the data.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self::new(pool);
        store.initialize().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn handle_at(row: &SqliteRow, prefix: &str) -> Result<PlayerHandle, StoreError> {
        let col = |name: &str| format!("{prefix}{name}");
        Ok(PlayerHandle {
            id: row.try_get(col("uuid").as_str())?,
            username: row.try_get(col("username").as_str())?,
            last_client: row.try_get(col("last_client").as_str())?,
            last_seen: row.try_get(col("last_seen").as_str())?,
        })
    }

    fn row_to_friendship(row: &SqliteRow) -> Result<Friendship, StoreError> {
        Ok(Friendship {
            requester: Self::handle_at(row, "r_")?,
            accepter: Self::handle_at(row, "a_")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_block(row: &SqliteRow) -> Result<BlockRelation, StoreError> {
        Ok(BlockRelation {
            player: Self::handle_at(row, "p_")?,
            blocked: Self::handle_at(row, "t_")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_record(row: &SqliteRow) -> Result<PlayerRecord, StoreError> {
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
}

async fn touch(
    conn: &mut SqliteConnection,
    player: &PlayerHandle,
    defaults: &UserPreferences,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
INSERT INTO players (uuid, username, last_client, last_seen, prefers_text, device_visibility, mute_friend_requests)
VALUES (?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (uuid) DO UPDATE SET
    username = excluded.username,
    last_client = excluded.last_client,
    last_seen = excluded.last_seen
"#,
    )
    .bind(player.id)
    .bind(&player.username)
    .bind(&player.last_client)
    .bind(player.last_seen)
    .bind(defaults.prefers_text)
    .bind(defaults.device_visibility.code())
    .bind(defaults.mute_friend_requests)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn count_friends(conn: &mut SqliteConnection, player: PlayerId) -> Result<usize, StoreError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM friendships WHERE player_min = ? OR player_max = ?",
    )
    .bind(player)
    .bind(player)
    .fetch_one(&mut *conn)
    .await?;
    Ok(usize::try_from(count).unwrap_or(usize::MAX))
}

async fn friendship_exists(conn: &mut SqliteConnection, pair: PlayerPair) -> Result<bool, StoreError> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM friendships WHERE player_min = ? AND player_max = ?",
    )
    .bind(pair.min())
    .bind(pair.max())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(found.is_some())
}

async fn block_exists(
    conn: &mut SqliteConnection,
    player: PlayerId,
    blocked: PlayerId,
) -> Result<bool, StoreError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM blocks WHERE player = ? AND blocked = ?")
        .bind(player)
        .bind(blocked)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

#[async_trait::async_trait]
impl SocialStore for SqliteSocialStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn touch_player(
        &self,
        player: &PlayerHandle,
        default_preferences: &UserPreferences,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        touch(&mut conn, player, default_preferences).await
    }

    async fn get_player(&self, player: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        let row = sqlx::query(
            r#"
SELECT uuid, username, last_client, last_seen, prefers_text, device_visibility, mute_friend_requests
FROM players WHERE uuid = ?
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
INSERT INTO players (uuid, username, last_client, last_seen, prefers_text, device_visibility, mute_friend_requests)
VALUES (?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (uuid) DO UPDATE SET
    username = excluded.username,
    last_client = excluded.last_client,
    last_seen = excluded.last_seen,
    prefers_text = excluded.prefers_text,
    device_visibility = excluded.device_visibility,
    mute_friend_requests = excluded.mute_friend_requests
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
        let rows = sqlx::query(friendship_select!(
            "WHERE f.player_min = ? OR f.player_max = ? ORDER BY f.created_at"
        ))
        .bind(player)
        .bind(player)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_friendship).collect()
    }

    async fn list_blocked(&self, player: PlayerId) -> Result<Vec<BlockRelation>, StoreError> {
        let rows = sqlx::query(block_select!("WHERE k.player = ? ORDER BY k.created_at"))
            .bind(player)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_block).collect()
    }

    async fn list_blocked_by(&self, player: PlayerId) -> Result<Vec<BlockRelation>, StoreError> {
        let rows = sqlx::query(block_select!("WHERE k.blocked = ? ORDER BY k.created_at"))
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
        let pair = PlayerPair::new(requester.id, accepter.id);
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, requester, default_preferences).await?;
        touch(&mut tx, accepter, default_preferences).await?;

        let code = if friendship_exists(&mut tx, pair).await? {
            AddFriendshipCode::AlreadyFriends
        } else if max_friends.is_reached(count_friends(&mut tx, requester.id).await?) {
            AddFriendshipCode::RequesterLimitReached
        } else if max_friends.is_reached(count_friends(&mut tx, accepter.id).await?) {
            AddFriendshipCode::AccepterLimitReached
        } else {
            sqlx::query(
                r#"
DELETE FROM blocks
WHERE (player = ? AND blocked = ?) OR (player = ? AND blocked = ?)
"#,
            )
            .bind(requester.id)
            .bind(accepter.id)
            .bind(accepter.id)
            .bind(requester.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
INSERT INTO friendships (player_min, player_max, requester, accepter, created_at)
VALUES (?, ?, ?, ?, ?)
"#,
            )
            .bind(pair.min())
            .bind(pair.max())
            .bind(requester.id)
            .bind(accepter.id)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            AddFriendshipCode::NowFriends
        };

        tx.commit().await?;
        Ok(code)
    }

    async fn remove_friendship(
        &self,
        a: PlayerId,
        b: PlayerId,
    ) -> Result<RemoveFriendshipOutcome, StoreError> {
        let pair = PlayerPair::new(a, b);
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(friendship_select!(
            "WHERE f.player_min = ? AND f.player_max = ?"
        ))
        .bind(pair.min())
        .bind(pair.max())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(RemoveFriendshipOutcome::NotFriends);
        };
        let friendship = Self::row_to_friendship(&row)?;

        sqlx::query("DELETE FROM friendships WHERE player_min = ? AND player_max = ?")
            .bind(pair.min())
            .bind(pair.max())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(RemoveFriendshipOutcome::Removed(friendship))
    }

    async fn add_block(
        &self,
        player: &PlayerHandle,
        blocked: &PlayerHandle,
        created_at: DateTime<Utc>,
        default_preferences: &UserPreferences,
    ) -> Result<AddBlockCode, StoreError> {
        let pair = PlayerPair::new(player.id, blocked.id);
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, player, default_preferences).await?;
        touch(&mut tx, blocked, default_preferences).await?;

        if block_exists(&mut tx, player.id, blocked.id).await? {
            tx.commit().await?;
            return Ok(AddBlockCode::AlreadyBlocked);
        }

        let unfriended = sqlx::query("DELETE FROM friendships WHERE player_min = ? AND player_max = ?")
            .bind(pair.min())
            .bind(pair.max())
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        sqlx::query("INSERT INTO blocks (player, blocked, created_at) VALUES (?, ?, ?)")
            .bind(player.id)
            .bind(blocked.id)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(if unfriended {
            AddBlockCode::AlsoUnfriended
        } else {
            AddBlockCode::NowBlocked
        })
    }

    async fn remove_block(
        &self,
        player: PlayerId,
        blocked: PlayerId,
    ) -> Result<RemoveBlockOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(block_select!("WHERE k.player = ? AND k.blocked = ?"))
            .bind(player)
            .bind(blocked)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(RemoveBlockOutcome::NotBlocked);
        };
        let relation = Self::row_to_block(&row)?;

        sqlx::query("DELETE FROM blocks WHERE player = ? AND blocked = ?")
            .bind(player)
            .bind(blocked)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(RemoveBlockOutcome::Removed(relation))
    }

    async fn friend_request_disposition(
        &self,
        requester: &PlayerHandle,
        receiver: &PlayerHandle,
        default_preferences: &UserPreferences,
        max_friends: FriendLimit,
    ) -> Result<RequestDisposition, StoreError> {
        // one read transaction so every check sees the same snapshot
        let mut tx = self.pool.begin().await?;

        let disposition = if block_exists(&mut tx, requester.id, receiver.id).await? {
            RequestDisposition::BlockedByRequester
        } else if block_exists(&mut tx, receiver.id, requester.id).await? {
            RequestDisposition::BlockedByReceiver
        } else if friendship_exists(&mut tx, PlayerPair::new(requester.id, receiver.id)).await? {
            RequestDisposition::AlreadyFriends
        } else if max_friends.is_reached(count_friends(&mut tx, requester.id).await?) {
            RequestDisposition::LimitReached
        } else {
            let muted = sqlx::query_scalar::<_, bool>(
                "SELECT mute_friend_requests FROM players WHERE uuid = ?",
            )
            .bind(receiver.id)
            .fetch_optional(&mut *tx)
            .await?
            .unwrap_or(default_preferences.mute_friend_requests);

            if muted {
                RequestDisposition::Mute
            } else {
                RequestDisposition::Notify
            }
        };

        tx.commit().await?;
        Ok(disposition)
    }
}

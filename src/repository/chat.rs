use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::error::Result;
use crate::models::{Chat, ChatView, MessageView, UserProfile};

/// Repository for chat and membership database operations
#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

/// Member row joined with its chat id, for batched member loading
#[derive(FromRow)]
struct MemberRow {
    chat_id: i64,
    id: i64,
    name: String,
    email: String,
    avatar_url: Option<String>,
}

/// Latest-message row with its sender columns aliased in
#[derive(FromRow)]
struct LatestMessageRow {
    id: i64,
    chat_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    sender_id: i64,
    sender_name: String,
    sender_email: String,
    sender_avatar_url: Option<String>,
}

impl From<LatestMessageRow> for MessageView {
    fn from(row: LatestMessageRow) -> Self {
        MessageView {
            id: row.id,
            chat_id: row.chat_id,
            content: row.content,
            sender: UserProfile {
                id: row.sender_id,
                name: row.sender_name,
                email: row.sender_email,
                avatar_url: row.sender_avatar_url,
            },
            created_at: row.created_at,
        }
    }
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a chat by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, name, is_group, admin_id, latest_message_id, created_at, updated_at
            FROM chats
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chat)
    }

    /// Find the one-to-one chat between two users, if it exists
    pub async fn find_direct(&self, user_a: i64, user_b: i64) -> Result<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>(
            r#"
            SELECT c.id, c.name, c.is_group, c.admin_id, c.latest_message_id,
                   c.created_at, c.updated_at
            FROM chats c
            JOIN chat_members ma ON ma.chat_id = c.id AND ma.user_id = $1
            JOIN chat_members mb ON mb.chat_id = c.id AND mb.user_id = $2
            WHERE c.is_group = FALSE
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chat)
    }

    /// Create a one-to-one chat between two users
    pub async fn create_direct(&self, user_a: i64, user_b: i64) -> Result<Chat> {
        let mut tx = self.pool.begin().await?;

        let chat = sqlx::query_as::<_, Chat>(
            r#"
            INSERT INTO chats (is_group)
            VALUES (FALSE)
            RETURNING id, name, is_group, admin_id, latest_message_id, created_at, updated_at
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2), ($1, $3)")
            .bind(chat.id)
            .bind(user_a)
            .bind(user_b)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = chat.id, "Created direct chat");
        Ok(chat)
    }

    /// Create a group chat with the given admin and members.
    ///
    /// The admin is always included in the member list.
    pub async fn create_group(&self, name: &str, admin_id: i64, member_ids: &[i64]) -> Result<Chat> {
        let mut members: Vec<i64> = member_ids.to_vec();
        if !members.contains(&admin_id) {
            members.push(admin_id);
        }

        let mut tx = self.pool.begin().await?;

        let chat = sqlx::query_as::<_, Chat>(
            r#"
            INSERT INTO chats (name, is_group, admin_id)
            VALUES ($1, TRUE, $2)
            RETURNING id, name, is_group, admin_id, latest_message_id, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO chat_members (chat_id, user_id)
            SELECT $1, unnest($2::bigint[])
            ON CONFLICT (chat_id, user_id) DO NOTHING
            "#,
        )
        .bind(chat.id)
        .bind(&members)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = chat.id, name = name, members = members.len(), "Created group chat");
        Ok(chat)
    }

    /// Check whether a user belongs to a chat
    pub async fn is_member(&self, chat_id: i64, user_id: i64) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM chat_members WHERE chat_id = $1 AND user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Rename a chat
    pub async fn rename(&self, chat_id: i64, name: &str) -> Result<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>(
            r#"
            UPDATE chats
            SET name = $2
            WHERE id = $1
            RETURNING id, name, is_group, admin_id, latest_message_id, created_at, updated_at
            "#,
        )
        .bind(chat_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ref c) = chat {
            info!(id = c.id, name = name, "Renamed chat");
        }

        Ok(chat)
    }

    /// Add a member to a chat; adding an existing member is a no-op
    pub async fn add_member(&self, chat_id: i64, user_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_members (chat_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (chat_id, user_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        info!(chat_id = chat_id, user_id = user_id, "Added chat member");
        Ok(())
    }

    /// Remove a member from a chat
    pub async fn remove_member(&self, chat_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chat_members WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!(chat_id = chat_id, user_id = user_id, "Removed chat member");
        }

        Ok(removed)
    }

    /// All chats a user belongs to, most recently updated first, fully populated
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<ChatView>> {
        let chats = sqlx::query_as::<_, Chat>(
            r#"
            SELECT c.id, c.name, c.is_group, c.admin_id, c.latest_message_id,
                   c.created_at, c.updated_at
            FROM chats c
            JOIN chat_members cm ON cm.chat_id = c.id
            WHERE cm.user_id = $1
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.compose_views(chats).await
    }

    /// A single chat, fully populated
    pub async fn view(&self, chat_id: i64) -> Result<Option<ChatView>> {
        let chat = match self.get_by_id(chat_id).await? {
            Some(chat) => chat,
            None => return Ok(None),
        };

        let mut views = self.compose_views(vec![chat]).await?;
        Ok(views.pop())
    }

    /// Populate members, admins, and latest messages for a batch of chats
    /// with one query per concern instead of one per chat.
    async fn compose_views(&self, chats: Vec<Chat>) -> Result<Vec<ChatView>> {
        if chats.is_empty() {
            return Ok(Vec::new());
        }

        let chat_ids: Vec<i64> = chats.iter().map(|c| c.id).collect();

        let member_rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT cm.chat_id, u.id, u.name, u.email, u.avatar_url
            FROM chat_members cm
            JOIN users u ON u.id = cm.user_id
            WHERE cm.chat_id = ANY($1)
            ORDER BY cm.joined_at
            "#,
        )
        .bind(&chat_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut members: HashMap<i64, Vec<UserProfile>> = HashMap::new();
        for row in member_rows {
            members.entry(row.chat_id).or_default().push(UserProfile {
                id: row.id,
                name: row.name,
                email: row.email,
                avatar_url: row.avatar_url,
            });
        }

        // Admins are usually members, but a removed admin still needs resolving
        let admin_ids: Vec<i64> = chats.iter().filter_map(|c| c.admin_id).collect();
        let mut admins: HashMap<i64, UserProfile> = HashMap::new();
        if !admin_ids.is_empty() {
            let profiles = sqlx::query_as::<_, UserProfile>(
                "SELECT id, name, email, avatar_url FROM users WHERE id = ANY($1)",
            )
            .bind(&admin_ids)
            .fetch_all(&self.pool)
            .await?;

            admins = profiles.into_iter().map(|p| (p.id, p)).collect();
        }

        let latest_ids: Vec<i64> = chats.iter().filter_map(|c| c.latest_message_id).collect();
        let mut latest: HashMap<i64, MessageView> = HashMap::new();
        if !latest_ids.is_empty() {
            let rows = sqlx::query_as::<_, LatestMessageRow>(
                r#"
                SELECT m.id, m.chat_id, m.content, m.created_at,
                       u.id AS sender_id, u.name AS sender_name,
                       u.email AS sender_email, u.avatar_url AS sender_avatar_url
                FROM messages m
                JOIN users u ON u.id = m.sender_id
                WHERE m.id = ANY($1)
                "#,
            )
            .bind(&latest_ids)
            .fetch_all(&self.pool)
            .await?;

            for row in rows {
                latest.insert(row.chat_id, row.into());
            }
        }

        Ok(chats
            .into_iter()
            .map(|chat| ChatView {
                admin: chat.admin_id.and_then(|id| admins.get(&id).cloned()),
                members: members.remove(&chat.id).unwrap_or_default(),
                latest_message: latest.remove(&chat.id),
                id: chat.id,
                name: chat.name,
                is_group: chat.is_group,
                created_at: chat.created_at,
                updated_at: chat.updated_at,
            })
            .collect())
    }
}

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::error::Result;
use crate::models::{Message, MessageView, UserProfile};

/// Repository for message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

/// Message row with its sender columns aliased in
#[derive(FromRow)]
struct MessageRow {
    id: i64,
    chat_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    sender_id: i64,
    sender_name: String,
    sender_email: String,
    sender_avatar_url: Option<String>,
}

impl From<MessageRow> for MessageView {
    fn from(row: MessageRow) -> Self {
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

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a message and advance the chat's latest-message pointer.
    ///
    /// Both writes happen in one transaction; the chats update also bumps the
    /// chat's `updated_at`, which drives the recency ordering of chat lists.
    pub async fn create(&self, chat_id: i64, sender_id: i64, content: &str) -> Result<Message> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (chat_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, chat_id, sender_id, content, created_at
            "#,
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chats SET latest_message_id = $2 WHERE id = $1")
            .bind(chat_id)
            .bind(message.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = message.id, chat_id = chat_id, sender_id = sender_id, "Stored message");
        Ok(message)
    }

    /// All messages of a chat in ascending creation order, sender populated
    pub async fn list_for_chat(&self, chat_id: i64) -> Result<Vec<MessageView>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT m.id, m.chat_id, m.content, m.created_at,
                   u.id AS sender_id, u.name AS sender_name,
                   u.email AS sender_email, u.avatar_url AS sender_avatar_url
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.chat_id = $1
            ORDER BY m.created_at, m.id
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageView::from).collect())
    }
}

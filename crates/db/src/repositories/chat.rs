use chrono::Utc;
use sqlx::Row;

use planpal_core::domain::chat::{ChatMessage, ChatMessageId, NewChatMessage};
use planpal_core::domain::group::GroupId;
use planpal_core::domain::member::MemberId;

use super::{decode_error, parse_timestamp, ChatRepository, RepositoryError};
use crate::DbPool;

pub struct SqlChatRepository {
    pool: DbPool,
}

impl SqlChatRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let group_id: i64 = row.try_get("group_id").map_err(decode_error)?;
    let member_id: Option<i64> = row.try_get("member_id").map_err(decode_error)?;
    let message: String = row.try_get("message").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(ChatMessage {
        id: ChatMessageId(id),
        group_id: GroupId(group_id),
        member_id: member_id.map(MemberId),
        message,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl ChatRepository for SqlChatRepository {
    async fn append(
        &self,
        group_id: GroupId,
        message: NewChatMessage,
    ) -> Result<ChatMessage, RepositoryError> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO chat_message (group_id, member_id, message, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(group_id.0)
        .bind(message.member_id.map(|member_id| member_id.0))
        .bind(&message.message)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(ChatMessage {
            id: ChatMessageId(result.last_insert_rowid()),
            group_id,
            member_id: message.member_id,
            message: message.message,
            created_at,
        })
    }

    async fn list_for_group(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, group_id, member_id, message, created_at
             FROM chat_message WHERE group_id = ? ORDER BY id ASC",
        )
        .bind(group_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }
}

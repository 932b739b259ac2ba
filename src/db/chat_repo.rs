// src/db/chat_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::chat::{
        Conversation, ConversationStatus, ConversationType, HistoryCursor, Message, MessageAttachment,
    },
};

const CONVERSATION_COLUMNS: &str = "id, conversation_type, participant_id, participant_name, status, tags, protocol_ids, unread_count, last_message, last_message_at, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, sender_name, text, attachments, reactions, read, created_at";

#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CONVERSAS
    // =========================================================================

    /// Carga inicial do `ChatStore`.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, AppError> {
        let conversations = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {} FROM conversations ORDER BY last_message_at DESC NULLS LAST, created_at DESC",
            CONVERSATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(conversations)
    }

    pub async fn insert_conversation<'e, E>(
        &self,
        executor: E,
        conversation_type: ConversationType,
        participant_id: Uuid,
        participant_name: &str,
    ) -> Result<Conversation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            INSERT INTO conversations (conversation_type, participant_id, participant_name)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(conversation_type)
        .bind(participant_id)
        .bind(participant_name)
        .fetch_one(executor)
        .await?;
        Ok(conversation)
    }

    /// Atualiza o resumo da conversa depois de uma mensagem nova.
    pub async fn touch_after_message<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        last_message: &str,
        last_message_at: DateTime<Utc>,
        increment_unread: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message = $2,
                last_message_at = $3,
                unread_count = unread_count + CASE WHEN $4 THEN 1 ELSE 0 END,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(last_message)
        .bind(last_message_at)
        .bind(increment_unread)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: ConversationStatus,
    ) -> Result<Option<Conversation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "UPDATE conversations SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            CONVERSATION_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await?;
        Ok(conversation)
    }

    /// Acrescenta a tag só se ela ainda não estiver na lista.
    pub async fn add_tag<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        tag: &str,
    ) -> Result<Option<Conversation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            UPDATE conversations
            SET tags = CASE WHEN $2 = ANY(tags) THEN tags ELSE array_append(tags, $2) END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(id)
        .bind(tag)
        .fetch_optional(executor)
        .await?;
        Ok(conversation)
    }

    pub async fn link_protocol<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        protocol_number: &str,
    ) -> Result<Option<Conversation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            UPDATE conversations
            SET protocol_ids = CASE WHEN $2 = ANY(protocol_ids) THEN protocol_ids
                                    ELSE array_append(protocol_ids, $2) END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(id)
        .bind(protocol_number)
        .fetch_optional(executor)
        .await?;
        Ok(conversation)
    }

    /// Zera o contador e marca todas as mensagens como lidas.
    pub async fn mark_read<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Conversation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            WITH read_messages AS (
                UPDATE messages SET read = true
                WHERE conversation_id = $1 AND read = false
            )
            UPDATE conversations SET unread_count = 0 WHERE id = $1
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(conversation)
    }

    // =========================================================================
    //  MENSAGENS
    // =========================================================================

    pub async fn insert_message<'e, E>(
        &self,
        executor: E,
        conversation_id: Uuid,
        sender_id: Uuid,
        sender_name: &str,
        text: &str,
        attachments: &[MessageAttachment],
    ) -> Result<Message, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (conversation_id, sender_id, sender_name, text, attachments)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(conversation_id)
        .bind(sender_id)
        .bind(sender_name)
        .bind(text)
        .bind(Json(attachments))
        .fetch_one(executor)
        .await?;
        Ok(message)
    }

    /// Página de histórico, da mais antiga para a mais recente.
    /// Com cursor, traz apenas mensagens anteriores ao par (instante, id).
    pub async fn messages_before(
        &self,
        conversation_id: Uuid,
        cursor: Option<HistoryCursor>,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let mut messages = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {} FROM messages
            WHERE conversation_id = $1
              AND ($2::timestamptz IS NULL OR (created_at, id) < ($2, $3::uuid))
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(conversation_id)
        .bind(cursor.map(|c| c.created_at))
        .bind(cursor.map(|c| c.id))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }
}

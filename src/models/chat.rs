// src/models/chat.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::common::field_map::FieldMap;

pub const CONVERSATION_FIELDS: FieldMap = FieldMap::new(
    "conversations",
    &[
        ("type", "conversation_type"),
        ("participantName", "participant_name"),
        ("status", "status"),
        ("unreadCount", "unread_count"),
        ("lastMessageAt", "last_message_at"),
        ("createdAt", "created_at"),
    ],
    "last_message_at",
);

pub const DEFAULT_MESSAGE_PAGE: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "conversation_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    Citizen,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "conversation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub conversation_type: ConversationType,
    pub participant_id: Uuid,
    #[schema(example = "Ana Pereira")]
    pub participant_name: String,
    pub status: ConversationStatus,
    #[schema(example = json!(["iluminação", "urgente"]))]
    pub tags: Vec<String>,
    /// Protocolos de solicitações ligados à conversa
    #[schema(example = json!(["2026000042"]))]
    pub protocol_ids: Vec<String>,
    pub unread_count: i32,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttachment {
    #[schema(example = "foto_buraco.jpg")]
    pub name: String,
    pub url: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    #[schema(example = "👍")]
    pub emoji: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub text: String,
    #[schema(value_type = Vec<MessageAttachment>)]
    pub attachments: Json<Vec<MessageAttachment>>,
    #[schema(value_type = Vec<Reaction>)]
    pub reactions: Json<Vec<Reaction>>,
    pub read: bool,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Posição no histórico: a mensagem mais antiga já entregue.
/// A paginação usa o par (instante, id) porque o instante sozinho pode se repetir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl HistoryCursor {
    pub fn of(message: &Message) -> Self {
        Self {
            created_at: message.created_at,
            id: message.id,
        }
    }
}

/// Quem está olhando o chat: o painel administrativo vê tudo,
/// o cidadão só as conversas em que é participante.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatViewer {
    Admin,
    Citizen(Uuid),
}

// --- FILTROS E PAYLOADS ---

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ConversationFilter {
    #[serde(rename = "type")]
    #[param(rename = "type")]
    pub conversation_type: Option<ConversationType>,
    pub status: Option<ConversationStatus>,
    pub tag: Option<String>,
    /// Busca pelo nome do participante
    pub search: Option<String>,
    /// Visão do cidadão: apenas conversas deste participante
    pub participant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MessagesQuery {
    /// Mensagens anteriores a este instante (rolagem para o topo)
    pub before: Option<DateTime<Utc>>,
    /// Id da mensagem em `before`, para desempatar mensagens do mesmo instante
    pub before_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl MessagesQuery {
    /// Sem `beforeId`, o cursor pega tudo estritamente anterior a `before`.
    pub fn cursor(&self) -> Option<HistoryCursor> {
        self.before.map(|created_at| HistoryCursor {
            created_at,
            id: self.before_id.unwrap_or_else(Uuid::nil),
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationPayload {
    pub contact_id: Uuid,
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Ana Pereira")]
    pub name: String,
    #[serde(rename = "type")]
    #[schema(rename = "type")]
    pub conversation_type: ConversationType,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[validate(length(min = 1, max = 4000, message = "required"))]
    #[schema(example = "Bom dia! Sua solicitação foi encaminhada para Obras.")]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<MessageAttachment>,
    /// Registra a mensagem em nome do participante (contato recebido por outro canal).
    /// Conta como não lida até alguém abrir a conversa.
    #[serde(default)]
    pub from_participant: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddTagPayload {
    #[validate(length(min = 1, max = 40, message = "required"))]
    #[schema(example = "iluminação")]
    pub tag: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkProtocolPayload {
    #[schema(example = "2026000042")]
    pub protocol_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_cursor_from_query() {
        let at = Utc::now();
        let id = Uuid::new_v4();

        let only_instant = MessagesQuery { before: Some(at), ..Default::default() };
        assert_eq!(only_instant.cursor(), Some(HistoryCursor { created_at: at, id: Uuid::nil() }));

        let with_id = MessagesQuery { before: Some(at), before_id: Some(id), limit: Some(10) };
        assert_eq!(with_id.cursor(), Some(HistoryCursor { created_at: at, id }));

        assert_eq!(MessagesQuery::default().cursor(), None);
    }
}

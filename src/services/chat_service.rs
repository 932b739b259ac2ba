// src/services/chat_service.rs

use std::{cmp::Ordering, sync::Arc};

use sqlx::{Postgres, Transaction};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest, SortDir},
    },
    db::ChatRepository,
    models::{
        auth::AdminUser,
        chat::{
            ChatViewer, Conversation, ConversationFilter, ConversationStatus, ConversationType,
            CreateConversationPayload, HistoryCursor, Message, SendMessagePayload,
            DEFAULT_MESSAGE_PAGE,
        },
    },
    services::chat_store::ChatStore,
};

const MAX_MESSAGE_PAGE: i64 = 100;

#[derive(Clone)]
pub struct ChatService {
    repo: ChatRepository,
    store: Arc<RwLock<ChatStore>>,
}

impl ChatService {
    /// Carrega as conversas do banco para o store em memória.
    pub async fn load(repo: ChatRepository) -> Result<Self, AppError> {
        let conversations = repo.list_conversations().await?;
        tracing::info!("💬 {} conversas carregadas no chat", conversations.len());

        Ok(Self {
            repo,
            store: Arc::new(RwLock::new(ChatStore::new(conversations))),
        })
    }

    // =========================================================================
    //  LEITURAS
    // =========================================================================

    pub async fn list_conversations(
        &self,
        viewer: ChatViewer,
        filter: &ConversationFilter,
        page: &PageRequest,
    ) -> Page<Conversation> {
        let store = self.store.read().await;
        let mut visible: Vec<Conversation> =
            store.view(viewer, filter).into_iter().cloned().collect();
        drop(store);

        visible.sort_by(|a, b| {
            let ordering = compare_by_column(a, b, page.sort_column);
            match page.sort_dir {
                SortDir::Asc => ordering,
                SortDir::Desc => ordering.reverse(),
            }
        });

        let count = visible.len() as i64;
        let data = visible
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Page::new(data, count, page)
    }

    pub async fn get_conversation(&self, id: Uuid) -> Result<Conversation, AppError> {
        let store = self.store.read().await;
        store.require(id).cloned()
    }

    pub async fn active_conversation(&self, viewer: Uuid) -> Option<Conversation> {
        let store = self.store.read().await;
        store
            .active_conversation(viewer)
            .and_then(|id| store.conversation(id))
            .cloned()
    }

    /// Janela de mensagens já carregada. Na primeira leitura busca a página mais recente.
    pub async fn messages(&self, id: Uuid) -> Result<Vec<Message>, AppError> {
        {
            let store = self.store.read().await;
            store.require(id)?;
            if store.has_loaded_messages(id) {
                return Ok(store.messages(id).to_vec());
            }
        }

        self.load_more_messages(id, None, None).await?;
        let store = self.store.read().await;
        Ok(store.messages(id).to_vec())
    }

    /// Página anterior à mensagem mais antiga carregada (ou ao cursor informado).
    /// Devolve sempre a página lida do banco; ela só entra no store se continuar a
    /// janela carregada e nenhuma carga mais nova tiver sido emitida.
    pub async fn load_more_messages(
        &self,
        id: Uuid,
        before: Option<HistoryCursor>,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, AppError> {
        let (generation, cutoff) = {
            let mut store = self.store.write().await;
            store.require(id)?;
            let cutoff = before.or_else(|| store.oldest_loaded(id));
            (store.begin_history_load(id), cutoff)
        };

        let limit = limit.unwrap_or(DEFAULT_MESSAGE_PAGE).clamp(1, MAX_MESSAGE_PAGE);
        let older = self.repo.messages_before(id, cutoff, limit).await?;

        let mut store = self.store.write().await;
        if !store.finish_history_load(id, generation, cutoff, older.clone()) {
            tracing::debug!(
                "Página de histórico da conversa {} fora da janela carregada (geração {})",
                id,
                generation
            );
        }
        Ok(older)
    }

    // =========================================================================
    //  AÇÕES
    // =========================================================================
    // Cada ação recebe a transação auditada do handler e faz o commit com o lock de
    // escrita preso; o store só é alterado depois do commit.

    /// Reaproveita a conversa não interna do mesmo contato; senão cria uma nova.
    /// Em ambos os casos ela vira a conversa ativa de quem pediu.
    pub async fn create_conversation(
        &self,
        mut tx: Transaction<'static, Postgres>,
        viewer: Uuid,
        payload: &CreateConversationPayload,
    ) -> Result<(Conversation, bool), AppError> {
        let mut store = self.store.write().await;

        let (conversation, created) = store
            .create_or_reuse(viewer, payload.contact_id, |existing| async move {
                let conversation = match existing {
                    Some(id) => self
                        .repo
                        .mark_read(&mut *tx, id)
                        .await?
                        .ok_or_else(|| AppError::ResourceNotFound(format!("Conversa {}", id)))?,
                    None => {
                        self.repo
                            .insert_conversation(
                                &mut *tx,
                                payload.conversation_type,
                                payload.contact_id,
                                &payload.name,
                            )
                            .await?
                    }
                };
                tx.commit().await?;
                Ok(conversation)
            })
            .await?;

        if created {
            tracing::info!(
                "Nova conversa {} ({:?}) com {}",
                conversation.id,
                conversation.conversation_type,
                conversation.participant_name
            );
        }
        Ok((conversation, created))
    }

    pub async fn set_active_conversation(
        &self,
        mut tx: Transaction<'static, Postgres>,
        viewer: Uuid,
        id: Uuid,
    ) -> Result<Conversation, AppError> {
        let mut store = self.store.write().await;
        store.require(id)?;

        let conversation = self
            .repo
            .mark_read(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Conversa {}", id)))?;
        tx.commit().await?;

        store.upsert_conversation(conversation);
        store.set_active_conversation(viewer, id)?;
        store.require(id).cloned()
    }

    /// Grava a mensagem e o resumo da conversa na mesma transação e só então
    /// atualiza o store.
    pub async fn send_message(
        &self,
        mut tx: Transaction<'static, Postgres>,
        sender: &AdminUser,
        id: Uuid,
        payload: &SendMessagePayload,
    ) -> Result<Message, AppError> {
        let mut store = self.store.write().await;
        let author = store.author_for(id, sender, payload.from_participant)?;

        let message = self
            .repo
            .insert_message(
                &mut *tx,
                id,
                author.id,
                &author.name,
                &payload.text,
                &payload.attachments,
            )
            .await?;
        self.repo
            .touch_after_message(
                &mut *tx,
                id,
                &message.text,
                message.created_at,
                author.counts_as_unread,
            )
            .await?;
        tx.commit().await?;

        store.record_message(message.clone(), author.counts_as_unread);
        Ok(message)
    }

    pub async fn close_conversation(
        &self,
        mut tx: Transaction<'static, Postgres>,
        id: Uuid,
    ) -> Result<Conversation, AppError> {
        let mut store = self.store.write().await;
        store.require(id)?;

        let conversation = self
            .repo
            .set_status(&mut *tx, id, ConversationStatus::Closed)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Conversa {}", id)))?;
        tx.commit().await?;

        store.upsert_conversation(conversation.clone());
        Ok(conversation)
    }

    pub async fn add_tag(
        &self,
        mut tx: Transaction<'static, Postgres>,
        id: Uuid,
        tag: &str,
    ) -> Result<Conversation, AppError> {
        let mut store = self.store.write().await;
        let tag = tag.trim();
        if store.require(id)?.tags.iter().any(|t| t == tag) {
            return store.require(id).cloned();
        }

        let conversation = self
            .repo
            .add_tag(&mut *tx, id, tag)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Conversa {}", id)))?;
        tx.commit().await?;

        store.upsert_conversation(conversation.clone());
        Ok(conversation)
    }

    pub async fn link_protocol(
        &self,
        mut tx: Transaction<'static, Postgres>,
        id: Uuid,
        protocol_number: &str,
    ) -> Result<Conversation, AppError> {
        let mut store = self.store.write().await;
        store.require(id)?;

        let conversation = self
            .repo
            .link_protocol(&mut *tx, id, protocol_number.trim())
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Conversa {}", id)))?;
        tx.commit().await?;

        store.upsert_conversation(conversation.clone());
        Ok(conversation)
    }
}

// Ordenação das listagens a partir da coluna já validada pelo FieldMap
fn compare_by_column(a: &Conversation, b: &Conversation, column: &str) -> Ordering {
    match column {
        "conversation_type" => is_internal(a).cmp(&is_internal(b)),
        "participant_name" => a
            .participant_name
            .to_lowercase()
            .cmp(&b.participant_name.to_lowercase()),
        "status" => is_closed(a).cmp(&is_closed(b)),
        "unread_count" => a.unread_count.cmp(&b.unread_count),
        "created_at" => a.created_at.cmp(&b.created_at),
        _ => a
            .last_message_at
            .cmp(&b.last_message_at)
            .then(a.created_at.cmp(&b.created_at)),
    }
}

fn is_internal(c: &Conversation) -> bool {
    c.conversation_type == ConversationType::Internal
}

fn is_closed(c: &Conversation) -> bool {
    c.status == ConversationStatus::Closed
}

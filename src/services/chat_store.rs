// src/services/chat_store.rs

use std::{collections::HashMap, future::Future};

use uuid::Uuid;

use crate::{
    common::{error::AppError, generation::GenerationCounter},
    models::{
        auth::AdminUser,
        chat::{
            ChatViewer, Conversation, ConversationFilter, ConversationStatus, ConversationType,
            HistoryCursor, Message,
        },
    },
};

/// Estado compartilhado do chat.
///
/// Só os métodos abaixo alteram o estado; o `ChatService` guarda o store atrás de um
/// `tokio::sync::RwLock` (um escritor, vários leitores) e só aplica a mudança aqui
/// depois do commit no banco, ainda segurando o lock de escrita.
#[derive(Debug, Default)]
pub struct ChatStore {
    conversations: Vec<Conversation>,
    /// Janela de mensagens já carregadas por conversa, em ordem cronológica
    messages: HashMap<Uuid, Vec<Message>>,
    /// Conversa aberta por cada usuário
    active: HashMap<Uuid, Uuid>,
    history_loads: GenerationCounter<Uuid>,
}

/// Quem assina uma mensagem nova e se ela entra no contador de não lidas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAuthor {
    pub id: Uuid,
    pub name: String,
    pub counts_as_unread: bool,
}

impl ChatStore {
    pub fn new(conversations: Vec<Conversation>) -> Self {
        Self {
            conversations,
            ..Default::default()
        }
    }

    pub fn conversation(&self, id: Uuid) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn require(&self, id: Uuid) -> Result<&Conversation, AppError> {
        self.conversation(id)
            .ok_or_else(|| AppError::ResourceNotFound(format!("Conversa {}", id)))
    }

    /// Varredura linear: conversa não interna com o mesmo participante.
    pub fn find_reusable(&self, contact_id: Uuid) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|c| c.participant_id == contact_id && c.conversation_type != ConversationType::Internal)
    }

    /// Reaproveita a conversa não interna do contato ou cria uma nova; nos dois casos
    /// ela vira a conversa ativa de `viewer`.
    ///
    /// `persist` recebe o id da conversa reaproveitada (ou `None` para criar), grava no
    /// banco e devolve a versão gravada. O store só muda se `persist` der certo.
    /// Retorna `true` quando a conversa foi criada.
    pub async fn create_or_reuse<F, Fut>(
        &mut self,
        viewer: Uuid,
        contact_id: Uuid,
        persist: F,
    ) -> Result<(Conversation, bool), AppError>
    where
        F: FnOnce(Option<Uuid>) -> Fut,
        Fut: Future<Output = Result<Conversation, AppError>>,
    {
        let existing = self.find_reusable(contact_id).map(|c| c.id);
        let conversation = persist(existing).await?;

        self.upsert_conversation(conversation.clone());
        self.set_active_conversation(viewer, conversation.id)?;
        let conversation = self.require(conversation.id)?.clone();
        Ok((conversation, existing.is_none()))
    }

    /// Insere ou substitui (pelo id) a versão gravada no banco.
    pub fn upsert_conversation(&mut self, conversation: Conversation) {
        match self.conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation,
            None => self.conversations.push(conversation),
        }
    }

    pub fn active_conversation(&self, viewer: Uuid) -> Option<Uuid> {
        self.active.get(&viewer).copied()
    }

    /// Seleciona a conversa para o usuário e marca as mensagens carregadas como lidas.
    pub fn set_active_conversation(&mut self, viewer: Uuid, id: Uuid) -> Result<(), AppError> {
        self.require(id)?;
        self.active.insert(viewer, id);

        if let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == id) {
            conversation.unread_count = 0;
        }
        if let Some(messages) = self.messages.get_mut(&id) {
            messages.iter_mut().for_each(|m| m.read = true);
        }
        Ok(())
    }

    pub fn ensure_open(&self, id: Uuid) -> Result<&Conversation, AppError> {
        let conversation = self.require(id)?;
        if conversation.status == ConversationStatus::Closed {
            return Err(AppError::ConversationClosed(id));
        }
        Ok(conversation)
    }

    /// Autor da próxima mensagem. Mensagem registrada em nome do participante (ou
    /// enviada pelo próprio participante de uma conversa interna) conta como não lida.
    pub fn author_for(
        &self,
        id: Uuid,
        staff: &AdminUser,
        from_participant: bool,
    ) -> Result<MessageAuthor, AppError> {
        let conversation = self.ensure_open(id)?;
        if from_participant {
            return Ok(MessageAuthor {
                id: conversation.participant_id,
                name: conversation.participant_name.clone(),
                counts_as_unread: true,
            });
        }
        Ok(MessageAuthor {
            id: staff.id,
            name: staff.full_name.clone(),
            counts_as_unread: staff.id == conversation.participant_id,
        })
    }

    /// Mensagem nova já persistida: atualiza o resumo da conversa e entra no fim da
    /// janela, se o histórico já foi carregado. Sem janela, a mensagem vem junto com a
    /// primeira carga.
    pub fn record_message(&mut self, message: Message, counts_as_unread: bool) {
        if let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == message.conversation_id)
        {
            conversation.last_message = Some(message.text.clone());
            conversation.last_message_at = Some(message.created_at);
            conversation.updated_at = message.created_at;
            if counts_as_unread {
                conversation.unread_count += 1;
            }
        }
        if let Some(window) = self.messages.get_mut(&message.conversation_id) {
            window.push(message);
        }
    }

    pub fn messages(&self, id: Uuid) -> &[Message] {
        self.messages.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_loaded_messages(&self, id: Uuid) -> bool {
        self.messages.contains_key(&id)
    }

    pub fn oldest_loaded(&self, id: Uuid) -> Option<HistoryCursor> {
        self.messages
            .get(&id)
            .and_then(|m| m.first())
            .map(HistoryCursor::of)
    }

    /// Marca o início de uma carga de histórico; a geração devolvida identifica a carga.
    pub fn begin_history_load(&mut self, id: Uuid) -> u64 {
        self.history_loads.issue(id)
    }

    /// Aplica a página lida a partir de `cutoff` e retorna `true` se ela entrou na janela.
    ///
    /// A página fica de fora quando chegou atrasada (outra carga mais nova foi emitida)
    /// ou quando não continua a janela: `cutoff` precisa ser a mensagem mais antiga já
    /// carregada, ou `None` se ainda não há nenhuma. Do contrário sobraria um buraco
    /// entre a página e a janela.
    pub fn finish_history_load(
        &mut self,
        id: Uuid,
        generation: u64,
        cutoff: Option<HistoryCursor>,
        older: Vec<Message>,
    ) -> bool {
        if !self.history_loads.is_current(&id, generation) || cutoff != self.oldest_loaded(id) {
            return false;
        }

        let loaded = self.messages.entry(id).or_default();
        let mut merged: Vec<Message> = older
            .into_iter()
            .filter(|m| !loaded.iter().any(|l| l.id == m.id))
            .collect();
        merged.append(loaded);
        *loaded = merged;
        true
    }

    /// Visão do painel (todas as conversas) ou do cidadão (só as dele), filtrada e
    /// ordenada pela última mensagem.
    pub fn view(&self, viewer: ChatViewer, filter: &ConversationFilter) -> Vec<&Conversation> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut visible: Vec<&Conversation> = self
            .conversations
            .iter()
            .filter(|c| match viewer {
                ChatViewer::Admin => true,
                ChatViewer::Citizen(citizen) => c.participant_id == citizen,
            })
            .filter(|c| filter.conversation_type.is_none_or(|t| c.conversation_type == t))
            .filter(|c| filter.status.is_none_or(|s| c.status == s))
            .filter(|c| filter.participant_id.is_none_or(|p| c.participant_id == p))
            .filter(|c| filter.tag.as_ref().is_none_or(|t| c.tags.contains(t)))
            .filter(|c| {
                search
                    .as_ref()
                    .is_none_or(|s| c.participant_name.to_lowercase().contains(s))
            })
            .collect();

        visible.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then(b.created_at.cmp(&a.created_at))
        });
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::AdminRole, chat::MessageAttachment};
    use chrono::{DateTime, Duration, Utc};
    use sqlx::types::Json;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn conversation(participant: Uuid, kind: ConversationType) -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            conversation_type: kind,
            participant_id: participant,
            participant_name: "Ana Pereira".into(),
            status: ConversationStatus::Active,
            tags: vec![],
            protocol_ids: vec![],
            unread_count: 2,
            last_message: None,
            last_message_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn message(conversation_id: Uuid, at: DateTime<Utc>, text: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: Uuid::new_v4(),
            sender_name: "Ana".into(),
            text: text.into(),
            attachments: Json(Vec::<MessageAttachment>::new()),
            reactions: Json(vec![]),
            read: false,
            created_at: at,
        }
    }

    fn staff() -> AdminUser {
        AdminUser {
            id: Uuid::new_v4(),
            email: "atendimento@prefeitura.gov.br".into(),
            password_hash: String::new(),
            full_name: "Carlos Atendente".into(),
            department: None,
            role: AdminRole::Admin,
            permissions: Json(vec![]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Versão gravada no banco: reaproveitada (unread zerado) ou recém-criada.
    fn persisted(existing: Option<Uuid>, contact: Uuid) -> Conversation {
        let mut stored = conversation(contact, ConversationType::Citizen);
        if let Some(id) = existing {
            stored.id = id;
        }
        stored.unread_count = 0;
        stored
    }

    fn loaded_window(store: &mut ChatStore, id: Uuid, page: Vec<Message>) {
        let generation = store.begin_history_load(id);
        assert!(store.finish_history_load(id, generation, None, page));
    }

    fn texts(store: &ChatStore, id: Uuid) -> Vec<String> {
        store.messages(id).iter().map(|m| m.text.clone()).collect()
    }

    #[tokio::test]
    async fn creating_citizen_conversation_twice_reuses_the_first() {
        let mut store = ChatStore::default();
        let viewer = Uuid::new_v4();
        let contact = Uuid::new_v4();

        let (first, created) = store
            .create_or_reuse(viewer, contact, |existing| async move { Ok(persisted(existing, contact)) })
            .await
            .unwrap();
        assert!(created);

        let (second, created) = store
            .create_or_reuse(viewer, contact, |existing| async move { Ok(persisted(existing, contact)) })
            .await
            .unwrap();

        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(store.view(ChatViewer::Admin, &ConversationFilter::default()).len(), 1);
        assert_eq!(store.active_conversation(viewer), Some(first.id));
    }

    #[tokio::test]
    async fn failed_insert_leaves_the_store_untouched() {
        let mut store = ChatStore::default();
        let viewer = Uuid::new_v4();

        let result = store
            .create_or_reuse(viewer, Uuid::new_v4(), |_| async {
                Err(AppError::ResourceNotFound("Conversa".into()))
            })
            .await;

        assert!(result.is_err());
        assert!(store.view(ChatViewer::Admin, &ConversationFilter::default()).is_empty());
        assert_eq!(store.active_conversation(viewer), None);
    }

    #[test]
    fn internal_conversations_are_not_reused() {
        let contact = Uuid::new_v4();
        let store = ChatStore::new(vec![conversation(contact, ConversationType::Internal)]);
        assert!(store.find_reusable(contact).is_none());
    }

    #[test]
    fn participant_message_raises_unread_until_selected() {
        let mut conv = conversation(Uuid::new_v4(), ConversationType::Citizen);
        conv.unread_count = 0;
        let id = conv.id;
        let mut store = ChatStore::new(vec![conv]);
        loaded_window(&mut store, id, vec![]);
        let attendant = staff();

        let author = store.author_for(id, &attendant, true).unwrap();
        assert!(author.counts_as_unread);
        assert_eq!(author.name, "Ana Pereira");
        store.record_message(message(id, Utc::now(), "Minha rua está sem luz"), author.counts_as_unread);
        assert_eq!(store.conversation(id).unwrap().unread_count, 1);

        let reply = store.author_for(id, &attendant, false).unwrap();
        assert!(!reply.counts_as_unread);
        assert_eq!(reply.id, attendant.id);
        store.record_message(message(id, Utc::now(), "Vamos verificar"), reply.counts_as_unread);

        let summary = store.conversation(id).unwrap();
        assert_eq!(summary.unread_count, 1);
        assert_eq!(summary.last_message.as_deref(), Some("Vamos verificar"));

        store.set_active_conversation(attendant.id, id).unwrap();
        assert_eq!(store.conversation(id).unwrap().unread_count, 0);
        assert_eq!(store.messages(id).len(), 2);
        assert!(store.messages(id).iter().all(|m| m.read));
    }

    #[test]
    fn message_sent_before_first_load_only_updates_the_summary() {
        let conv = conversation(Uuid::new_v4(), ConversationType::Citizen);
        let id = conv.id;
        let mut store = ChatStore::new(vec![conv]);

        store.record_message(message(id, Utc::now(), "Oi"), false);

        assert!(!store.has_loaded_messages(id));
        assert_eq!(store.conversation(id).unwrap().last_message.as_deref(), Some("Oi"));
    }

    #[test]
    fn selecting_unknown_conversation_fails() {
        let mut store = ChatStore::default();
        assert!(matches!(
            store.set_active_conversation(Uuid::new_v4(), Uuid::new_v4()),
            Err(AppError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn closed_conversation_rejects_new_messages() {
        let mut conv = conversation(Uuid::new_v4(), ConversationType::Citizen);
        conv.status = ConversationStatus::Closed;
        let id = conv.id;
        let store = ChatStore::new(vec![conv]);
        assert!(matches!(store.ensure_open(id), Err(AppError::ConversationClosed(_))));
        assert!(matches!(
            store.author_for(id, &staff(), false),
            Err(AppError::ConversationClosed(_))
        ));
    }

    #[test]
    fn stale_history_page_is_discarded() {
        let conv = conversation(Uuid::new_v4(), ConversationType::Citizen);
        let id = conv.id;
        let now = Utc::now();
        let mut store = ChatStore::new(vec![conv]);
        loaded_window(&mut store, id, vec![]);
        store.record_message(message(id, now, "recente"), false);
        let cutoff = store.oldest_loaded(id);

        let slow = store.begin_history_load(id);
        let fast = store.begin_history_load(id);

        assert!(store.finish_history_load(id, fast, cutoff, vec![message(id, now - Duration::minutes(5), "antiga")]));
        assert!(!store.finish_history_load(id, slow, cutoff, vec![message(id, now - Duration::minutes(9), "atrasada")]));

        assert_eq!(texts(&store, id), vec!["antiga", "recente"]);
        assert_eq!(store.oldest_loaded(id).map(|c| c.created_at), Some(now - Duration::minutes(5)));
    }

    #[test]
    fn page_that_does_not_touch_the_window_is_not_merged() {
        let conv = conversation(Uuid::new_v4(), ConversationType::Citizen);
        let id = conv.id;
        let now = Utc::now();
        let mut store = ChatStore::new(vec![conv]);
        loaded_window(
            &mut store,
            id,
            vec![message(id, now - Duration::minutes(2), "m-2"), message(id, now - Duration::minutes(1), "m-1")],
        );
        let window_start = store.oldest_loaded(id);

        // Cliente pulou direto para 100 minutos atrás
        let far = Some(HistoryCursor { created_at: now - Duration::minutes(100), id: Uuid::nil() });
        let generation = store.begin_history_load(id);
        assert!(!store.finish_history_load(id, generation, far, vec![message(id, now - Duration::minutes(101), "m-101")]));

        assert_eq!(texts(&store, id), vec!["m-2", "m-1"]);
        assert_eq!(store.oldest_loaded(id), window_start);

        // A página seguinte à janela continua entrando normalmente
        let generation = store.begin_history_load(id);
        assert!(store.finish_history_load(id, generation, window_start, vec![message(id, now - Duration::minutes(3), "m-3")]));
        assert_eq!(texts(&store, id), vec!["m-3", "m-2", "m-1"]);
    }

    #[test]
    fn older_page_before_first_load_is_not_taken_as_the_window() {
        let conv = conversation(Uuid::new_v4(), ConversationType::Citizen);
        let id = conv.id;
        let mut store = ChatStore::new(vec![conv]);

        let cutoff = Some(HistoryCursor { created_at: Utc::now() - Duration::days(1), id: Uuid::nil() });
        let generation = store.begin_history_load(id);
        assert!(!store.finish_history_load(id, generation, cutoff, vec![message(id, Utc::now() - Duration::days(2), "velha")]));
        assert!(!store.has_loaded_messages(id));
    }

    #[test]
    fn messages_sharing_the_window_start_instant_still_connect() {
        let conv = conversation(Uuid::new_v4(), ConversationType::Citizen);
        let id = conv.id;
        let at = Utc::now();
        let mut store = ChatStore::new(vec![conv]);
        loaded_window(&mut store, id, vec![message(id, at, "b"), message(id, at + Duration::seconds(1), "c")]);

        let cutoff = store.oldest_loaded(id);
        assert_eq!(cutoff.map(|c| c.created_at), Some(at));

        let generation = store.begin_history_load(id);
        assert!(store.finish_history_load(id, generation, cutoff, vec![message(id, at, "a")]));
        assert_eq!(texts(&store, id), vec!["a", "b", "c"]);
    }

    #[test]
    fn citizen_view_only_sees_own_conversations() {
        let citizen = Uuid::new_v4();
        let store = ChatStore::new(vec![
            conversation(citizen, ConversationType::Citizen),
            conversation(Uuid::new_v4(), ConversationType::Citizen),
            conversation(Uuid::new_v4(), ConversationType::Internal),
        ]);

        let mine = store.view(ChatViewer::Citizen(citizen), &ConversationFilter::default());
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].participant_id, citizen);

        let internal = store.view(
            ChatViewer::Admin,
            &ConversationFilter {
                conversation_type: Some(ConversationType::Internal),
                ..Default::default()
            },
        );
        assert_eq!(internal.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_for_the_same_contact_yield_one_conversation() {
        let store = Arc::new(RwLock::new(ChatStore::default()));
        let contact = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut guard = store.write().await;
                    let (conversation, _) = guard
                        .create_or_reuse(Uuid::new_v4(), contact, |existing| async move {
                            tokio::task::yield_now().await;
                            Ok(persisted(existing, contact))
                        })
                        .await
                        .unwrap();
                    conversation.id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();

        assert_eq!(ids.len(), 1);
        assert_eq!(store.read().await.view(ChatViewer::Admin, &ConversationFilter::default()).len(), 1);
    }
}

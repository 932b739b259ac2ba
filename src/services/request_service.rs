// src/services/request_service.rs

use std::sync::Arc;

use chrono::{Datelike, Utc};
use sqlx::{Acquire, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
        protocol::request_protocol,
        storage::{storage_key, store_then, BlobStorage, UploadedFile},
    },
    db::RequestRepository,
    models::{
        auth::AdminUser,
        requests::{
            CreateRequestPayload, ForwardRequestPayload, RequestAttachment, RequestComment,
            RequestDetail, RequestFilter, RequestListItem, RequestStatus, RequesterType,
            UnifiedRequest, UpdateStatusPayload,
        },
    },
};

#[derive(Clone)]
pub struct RequestService {
    repo: RequestRepository,
    storage: Arc<dyn BlobStorage>,
}

impl RequestService {
    pub fn new(repo: RequestRepository, storage: Arc<dyn BlobStorage>) -> Self {
        Self { repo, storage }
    }

    pub async fn list(
        &self,
        filter: &RequestFilter,
        page: &PageRequest,
    ) -> Result<Page<RequestListItem>, AppError> {
        let page = self.repo.list(filter, page).await?;
        Ok(page.map(RequestListItem::from))
    }

    pub async fn get_detail(&self, id: Uuid) -> Result<RequestDetail, AppError> {
        let request = self.require(id).await?;

        let comments = self.repo.list_comments(id).await?;
        let attachments = self.repo.list_attachments(id).await?;
        let history = self.repo.list_history(id).await?;

        Ok(RequestDetail::new(request, comments, attachments, history))
    }

    pub async fn find_by_protocol(&self, protocol_number: &str) -> Result<UnifiedRequest, AppError> {
        self.repo
            .find_by_protocol(protocol_number)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Protocolo {}", protocol_number)))
    }

    async fn require(&self, id: Uuid) -> Result<UnifiedRequest, AppError> {
        self.repo
            .find_by_id(self.repo.pool(), id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Solicitação {}", id)))
    }

    /// Cria a solicitação com protocolo novo e a primeira entrada do histórico (`open`).
    pub async fn create<'e, E>(
        &self,
        executor: E,
        author: &AdminUser,
        payload: &CreateRequestPayload,
    ) -> Result<UnifiedRequest, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let seq = self.repo.next_protocol_seq(&mut *tx).await?;
        let protocol = request_protocol(Utc::now().year(), seq);

        // Sem solicitante explícito, quem abre é o próprio servidor
        let requester_type = payload.requester_type.unwrap_or(RequesterType::Employee);
        let (requester_id, requester_name) = match payload.requester_name.as_deref() {
            Some(name) if !name.trim().is_empty() => (payload.requester_id, name.trim()),
            _ => (Some(author.id), author.full_name.as_str()),
        };

        let request = self
            .repo
            .create(
                &mut *tx,
                &protocol,
                payload.title.trim(),
                payload.description.trim(),
                requester_type,
                requester_id,
                requester_name,
                payload.target_department.trim(),
                payload.priority,
            )
            .await?;

        self.repo
            .insert_history(&mut *tx, request.id, None, RequestStatus::Open, None)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Solicitação {} criada para {} por {}",
            request.protocol_number,
            request.target_department,
            author.email
        );
        Ok(request)
    }

    /// Troca de status validada pela máquina de estados; registra o histórico.
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &UpdateStatusPayload,
    ) -> Result<UnifiedRequest, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Solicitação {}", id)))?;

        if !current.status.can_transition_to(payload.status) {
            return Err(AppError::InvalidStatusTransition {
                from: current.status.as_str().to_string(),
                to: payload.status.as_str().to_string(),
            });
        }

        let updated = self.repo.update_status(&mut *tx, id, payload.status).await?;
        self.repo
            .insert_history(
                &mut *tx,
                id,
                Some(current.status),
                payload.status,
                payload.note.as_deref().filter(|n| !n.trim().is_empty()),
            )
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Encaminhar = trocar o departamento de destino + comentário marcado como encaminhamento.
    pub async fn forward<'e, E>(
        &self,
        executor: E,
        author: &AdminUser,
        id: Uuid,
        payload: &ForwardRequestPayload,
    ) -> Result<UnifiedRequest, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Solicitação {}", id)))?;

        if !current.status.can_forward() {
            return Err(AppError::ForwardNotAllowed(current.status.as_str().to_string()));
        }

        let department = payload.target_department.trim();
        let updated = self.repo.update_department(&mut *tx, id, department).await?;

        let text = format!(
            "Encaminhada de {} para {}: {}",
            current.target_department,
            department,
            payload.comment.trim()
        );
        self.repo
            .insert_comment(&mut *tx, id, author.id, &author.full_name, &text, true)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Solicitação {} encaminhada: {} -> {}",
            updated.protocol_number,
            current.target_department,
            department
        );
        Ok(updated)
    }

    /// Comentários são aceitos em qualquer status.
    pub async fn add_comment<'e, E>(
        &self,
        executor: E,
        author: &AdminUser,
        id: Uuid,
        text: &str,
    ) -> Result<RequestComment, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        self.repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Solicitação {}", id)))?;

        let comment = self
            .repo
            .insert_comment(&mut *tx, id, author.id, &author.full_name, text.trim(), false)
            .await?;

        tx.commit().await?;
        Ok(comment)
    }

    /// Recebe a transação auditada do handler e faz o commit; se o registro não
    /// chegar a ser gravado, o arquivo enviado é removido do storage.
    pub async fn upload_attachment(
        &self,
        mut tx: Transaction<'static, Postgres>,
        id: Uuid,
        file: UploadedFile,
    ) -> Result<RequestAttachment, AppError> {
        file.check_size()?;

        self.repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Solicitação {}", id)))?;

        let key = storage_key("requests", id, &file.file_name);
        store_then(self.storage.as_ref(), &key, &file.bytes, || async {
            let attachment = self
                .repo
                .insert_attachment(
                    &mut *tx,
                    id,
                    &file.file_name,
                    file.content_type.as_deref(),
                    file.bytes.len() as i64,
                    &key,
                )
                .await?;
            tx.commit().await?;
            Ok(attachment)
        })
        .await
    }

    pub async fn download_attachment(
        &self,
        request_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<(RequestAttachment, Vec<u8>), AppError> {
        let attachment = self
            .repo
            .find_attachment(request_id, attachment_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Anexo {}", attachment_id)))?;

        let bytes = self.storage.download(&attachment.storage_path).await?;
        Ok((attachment, bytes))
    }
}

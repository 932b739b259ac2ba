// src/services/health_service.rs

use std::sync::Arc;

use sqlx::{Acquire, Executor, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
        storage::{storage_key, store_then, BlobStorage, UploadedFile},
    },
    db::HealthRepository,
    models::health::{
        AssignTransportPayload, HealthProgram, ProgramFilter, ProgramPayload, TfdDetail,
        TfdDocument, TfdFilter, TfdPayload, TfdReferral, TfdStatus,
    },
};

fn referral_not_found(id: Uuid) -> AppError {
    AppError::ResourceNotFound(format!("Encaminhamento TFD {}", id))
}

#[derive(Clone)]
pub struct HealthService {
    repo: HealthRepository,
    storage: Arc<dyn BlobStorage>,
}

impl HealthService {
    pub fn new(repo: HealthRepository, storage: Arc<dyn BlobStorage>) -> Self {
        Self { repo, storage }
    }

    // =========================================================================
    //  1. TFD
    // =========================================================================

    pub async fn list_referrals(
        &self,
        filter: &TfdFilter,
        page: &PageRequest,
    ) -> Result<Page<TfdReferral>, AppError> {
        self.repo.list_referrals(filter, page).await
    }

    pub async fn get_referral<'e, E>(&self, executor: E, id: Uuid) -> Result<TfdDetail, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let referral = self
            .repo
            .find_referral(executor, id)
            .await?
            .ok_or_else(|| referral_not_found(id))?;
        let documents = self.repo.list_documents(id).await?;
        Ok(TfdDetail::new(referral, documents))
    }

    pub async fn create_referral<'e, E>(
        &self,
        executor: E,
        payload: &TfdPayload,
    ) -> Result<TfdReferral, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let referral = self.repo.create_referral(executor, payload).await?;
        tracing::info!(
            "TFD aberto: {} -> {} ({})",
            referral.patient_name,
            referral.destination_city,
            referral.specialty
        );
        Ok(referral)
    }

    pub async fn update_referral<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &TfdPayload,
    ) -> Result<TfdReferral, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_referral(executor, id, payload)
            .await?
            .ok_or_else(|| referral_not_found(id))
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: TfdStatus,
    ) -> Result<TfdReferral, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let current = self
            .repo
            .find_referral_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| referral_not_found(id))?;

        if !current.status.can_transition_to(status) {
            return Err(AppError::InvalidStatusTransition {
                from: current.status.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }

        let updated = self.repo.update_referral_status(&mut *tx, id, status).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Etapa de transporte. Aceita encaminhamento aprovado ou reagendamento.
    pub async fn assign_transport<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &AssignTransportPayload,
    ) -> Result<TfdReferral, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let current = self
            .repo
            .find_referral_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| referral_not_found(id))?;

        if !current.status.accepts_transport() {
            return Err(AppError::InvalidStatusTransition {
                from: current.status.as_str().to_string(),
                to: TfdStatus::TransportScheduled.as_str().to_string(),
            });
        }

        let updated = self.repo.assign_transport(&mut *tx, id, payload).await?;
        tx.commit().await?;

        tracing::info!(
            "Transporte do TFD {} agendado: {} em {}",
            id,
            payload.vehicle,
            payload.departure_at
        );
        Ok(updated)
    }

    /// Documento do paciente gravado em `tfd/{referralId}/...`. Faz o commit da
    /// transação recebida; em caso de falha o arquivo é removido.
    pub async fn upload_document(
        &self,
        mut tx: Transaction<'static, Postgres>,
        id: Uuid,
        document_kind: &str,
        file: UploadedFile,
    ) -> Result<TfdDocument, AppError> {
        file.check_size()?;

        self.repo
            .find_referral(&mut *tx, id)
            .await?
            .ok_or_else(|| referral_not_found(id))?;

        let key = storage_key("tfd", id, &file.file_name);
        store_then(self.storage.as_ref(), &key, &file.bytes, || async {
            let document = self
                .repo
                .insert_document(
                    &mut *tx,
                    id,
                    document_kind,
                    &file.file_name,
                    file.content_type.as_deref(),
                    &key,
                )
                .await?;
            tx.commit().await?;
            Ok(document)
        })
        .await
    }

    pub async fn download_document(
        &self,
        referral_id: Uuid,
        document_id: Uuid,
    ) -> Result<(TfdDocument, Vec<u8>), AppError> {
        let document = self
            .repo
            .find_document(referral_id, document_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Documento {}", document_id)))?;

        let bytes = self.storage.download(&document.storage_path).await?;
        Ok((document, bytes))
    }

    // =========================================================================
    //  2. PROGRAMAS DE SAÚDE
    // =========================================================================

    pub async fn list_programs(
        &self,
        filter: &ProgramFilter,
        page: &PageRequest,
    ) -> Result<Page<HealthProgram>, AppError> {
        self.repo.list_programs(filter, page).await
    }

    pub async fn get_program(&self, id: Uuid) -> Result<HealthProgram, AppError> {
        self.repo
            .find_program(id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Programa {}", id)))
    }

    pub async fn create_program<'e, E>(
        &self,
        executor: E,
        payload: &ProgramPayload,
    ) -> Result<HealthProgram, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_program(executor, payload).await
    }

    pub async fn update_program<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &ProgramPayload,
    ) -> Result<HealthProgram, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_program(executor, id, payload)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Programa {}", id)))
    }
}

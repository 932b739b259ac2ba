// src/services/ouvidoria_service.rs

use chrono::{Datelike, Local, NaiveDate};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
        protocol::ouvidoria_protocol,
    },
    db::OuvidoriaRepository,
    models::ouvidoria::{
        response_deadline, CaseDetail, CaseFilter, CaseListItem, CreateCasePayload,
        OuvidoriaCase, OuvidoriaStatus, UpdateCaseStatusPayload,
    },
};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn invalid_transition(from: OuvidoriaStatus, to: OuvidoriaStatus) -> AppError {
    AppError::InvalidStatusTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    }
}

#[derive(Clone)]
pub struct OuvidoriaService {
    repo: OuvidoriaRepository,
}

impl OuvidoriaService {
    pub fn new(repo: OuvidoriaRepository) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        filter: &CaseFilter,
        page: &PageRequest,
    ) -> Result<Page<CaseListItem>, AppError> {
        let today = today();
        let page = self.repo.list(filter, today, page).await?;
        Ok(page.map(|case| CaseListItem::new(case, today)))
    }

    pub async fn get_detail<'e, E>(&self, executor: E, id: Uuid) -> Result<CaseDetail, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let case = self
            .repo
            .find_by_id(executor, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Manifestação {}", id)))?;
        let updates = self.repo.list_updates(id).await?;

        Ok(CaseDetail {
            item: CaseListItem::new(case, today()),
            updates,
        })
    }

    /// Registra a manifestação com protocolo `OUV-{ano}-{seq}` e prazo de resposta.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        payload: &CreateCasePayload,
    ) -> Result<CaseListItem, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let opened_on = today();
        let mut tx = executor.begin().await?;

        let seq = self.repo.next_protocol_seq(&mut *tx).await?;
        let protocol = ouvidoria_protocol(opened_on.year(), seq);
        let deadline = response_deadline(opened_on);

        let case = self.repo.create(&mut *tx, &protocol, deadline, payload).await?;
        self.repo
            .insert_update(&mut *tx, case.id, case.status, "Manifestação registrada")
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Manifestação {} registrada ({}), prazo {}",
            case.protocol_number,
            case.kind.label(),
            case.deadline
        );
        Ok(CaseListItem::new(case, opened_on))
    }

    /// A resposta só entra por `respond`; aqui ficam as demais transições.
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &UpdateCaseStatusPayload,
    ) -> Result<CaseListItem, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let current = self.lock(&mut *tx, id).await?;

        if payload.status == OuvidoriaStatus::Answered
            || !current.status.can_transition_to(payload.status)
        {
            return Err(invalid_transition(current.status, payload.status));
        }

        let updated = self.repo.update_status(&mut *tx, id, payload.status).await?;
        self.repo
            .insert_update(&mut *tx, id, payload.status, payload.note.trim())
            .await?;

        tx.commit().await?;
        Ok(CaseListItem::new(updated, today()))
    }

    pub async fn respond<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        response: &str,
    ) -> Result<CaseListItem, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let current = self.lock(&mut *tx, id).await?;

        if !current.status.can_transition_to(OuvidoriaStatus::Answered) {
            return Err(invalid_transition(current.status, OuvidoriaStatus::Answered));
        }

        let updated = self.repo.save_response(&mut *tx, id, response.trim()).await?;
        self.repo
            .insert_update(&mut *tx, id, OuvidoriaStatus::Answered, "Resposta enviada ao cidadão")
            .await?;

        tx.commit().await?;

        tracing::info!("Manifestação {} respondida", updated.protocol_number);
        Ok(CaseListItem::new(updated, today()))
    }

    pub async fn assign_department<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        department: &str,
    ) -> Result<CaseListItem, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let department = department.trim();

        let updated = self
            .repo
            .assign_department(&mut *tx, id, department)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Manifestação {}", id)))?;
        self.repo
            .insert_update(
                &mut *tx,
                id,
                updated.status,
                &format!("Encaminhada para {}", department),
            )
            .await?;

        tx.commit().await?;
        Ok(CaseListItem::new(updated, today()))
    }

    async fn lock<'e, E>(&self, executor: E, id: Uuid) -> Result<OuvidoriaCase, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_for_update(executor, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Manifestação {}", id)))
    }
}

// src/db/ouvidoria_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
    },
    db::{fetch_page, search_pattern},
    models::ouvidoria::{
        CaseFilter, CreateCasePayload, OuvidoriaCase, OuvidoriaStatus, OuvidoriaUpdate,
    },
};

const CASE_COLUMNS: &str = "id, protocol_number, kind, subject, description, anonymous, citizen_name, citizen_email, citizen_phone, department, status, deadline, response, responded_at, created_at, updated_at";

#[derive(Clone)]
pub struct OuvidoriaRepository {
    pool: PgPool,
}

impl OuvidoriaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: &CaseFilter,
        today: NaiveDate,
        page: &PageRequest,
    ) -> Result<Page<OuvidoriaCase>, AppError> {
        let search = search_pattern(filter.search.as_deref());
        fetch_page(
            &self.pool,
            "ouvidoria_cases",
            |qb: &mut QueryBuilder<'static, Postgres>| {
                if let Some(status) = filter.status {
                    qb.push(" AND status = ").push_bind(status);
                }
                if let Some(kind) = filter.kind {
                    qb.push(" AND kind = ").push_bind(kind);
                }
                if let Some(department) = filter.department.clone() {
                    qb.push(" AND department = ").push_bind(department);
                }
                match filter.overdue {
                    Some(true) => {
                        qb.push(" AND status IN ('received', 'under_analysis') AND deadline < ")
                            .push_bind(today);
                    }
                    Some(false) => {
                        qb.push(" AND NOT (status IN ('received', 'under_analysis') AND deadline < ")
                            .push_bind(today)
                            .push(")");
                    }
                    None => {}
                }
                if let Some(pattern) = search.clone() {
                    qb.push(" AND (protocol_number ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR subject ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR description ILIKE ")
                        .push_bind(pattern)
                        .push(")");
                }
            },
            page,
        )
        .await
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<OuvidoriaCase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let case = sqlx::query_as::<_, OuvidoriaCase>(&format!(
            "SELECT {} FROM ouvidoria_cases WHERE id = $1",
            CASE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(case)
    }

    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<OuvidoriaCase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let case = sqlx::query_as::<_, OuvidoriaCase>(&format!(
            "SELECT {} FROM ouvidoria_cases WHERE id = $1 FOR UPDATE",
            CASE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(case)
    }

    pub async fn list_updates(&self, case_id: Uuid) -> Result<Vec<OuvidoriaUpdate>, AppError> {
        let updates = sqlx::query_as::<_, OuvidoriaUpdate>(
            r#"
            SELECT id, case_id, status, note, author_id, created_at
            FROM ouvidoria_updates
            WHERE case_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(updates)
    }

    pub async fn next_protocol_seq<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let seq: i64 = sqlx::query_scalar("SELECT nextval('ouvidoria_protocol_seq')")
            .fetch_one(executor)
            .await?;
        Ok(seq)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        protocol_number: &str,
        deadline: NaiveDate,
        payload: &CreateCasePayload,
    ) -> Result<OuvidoriaCase, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Anônima: o contato nem chega a ser gravado
        let contact = |v: &Option<String>| if payload.anonymous { None } else { v.clone() };

        let case = sqlx::query_as::<_, OuvidoriaCase>(&format!(
            r#"
            INSERT INTO ouvidoria_cases (
                protocol_number, kind, subject, description, anonymous,
                citizen_name, citizen_email, citizen_phone, department, deadline
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            CASE_COLUMNS
        ))
        .bind(protocol_number)
        .bind(payload.kind)
        .bind(&payload.subject)
        .bind(&payload.description)
        .bind(payload.anonymous)
        .bind(contact(&payload.citizen_name))
        .bind(contact(&payload.citizen_email))
        .bind(contact(&payload.citizen_phone))
        .bind(&payload.department)
        .bind(deadline)
        .fetch_one(executor)
        .await?;
        Ok(case)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: OuvidoriaStatus,
    ) -> Result<OuvidoriaCase, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let case = sqlx::query_as::<_, OuvidoriaCase>(&format!(
            "UPDATE ouvidoria_cases SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            CASE_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(case)
    }

    pub async fn save_response<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        response: &str,
    ) -> Result<OuvidoriaCase, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let case = sqlx::query_as::<_, OuvidoriaCase>(&format!(
            r#"
            UPDATE ouvidoria_cases
            SET response = $2, responded_at = NOW(), status = 'answered', updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CASE_COLUMNS
        ))
        .bind(id)
        .bind(response)
        .fetch_one(executor)
        .await?;
        Ok(case)
    }

    pub async fn assign_department<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        department: &str,
    ) -> Result<Option<OuvidoriaCase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let case = sqlx::query_as::<_, OuvidoriaCase>(&format!(
            "UPDATE ouvidoria_cases SET department = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            CASE_COLUMNS
        ))
        .bind(id)
        .bind(department)
        .fetch_optional(executor)
        .await?;
        Ok(case)
    }

    pub async fn insert_update<'e, E>(
        &self,
        executor: E,
        case_id: Uuid,
        status: OuvidoriaStatus,
        note: &str,
    ) -> Result<OuvidoriaUpdate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let update = sqlx::query_as::<_, OuvidoriaUpdate>(
            r#"
            INSERT INTO ouvidoria_updates (case_id, status, note)
            VALUES ($1, $2, $3)
            RETURNING id, case_id, status, note, author_id, created_at
            "#,
        )
        .bind(case_id)
        .bind(status)
        .bind(note)
        .fetch_one(executor)
        .await?;
        Ok(update)
    }
}

// src/db/health_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
    },
    db::{fetch_page, search_pattern},
    models::health::{
        AssignTransportPayload, HealthProgram, ProgramFilter, ProgramPayload, ProgramStatus,
        TfdDocument, TfdFilter, TfdPayload, TfdReferral, TfdStatus,
    },
};

const TFD_COLUMNS: &str = "id, patient_name, patient_cpf, patient_phone, destination_city, specialty, hospital, appointment_date, needs_companion, status, vehicle, driver_name, departure_at, cost_allowance, notes, created_at, updated_at";
const DOCUMENT_COLUMNS: &str = "id, referral_id, document_kind, file_name, content_type, storage_path, uploaded_at";
const PROGRAM_COLUMNS: &str = "id, name, description, coordinator, target_audience, start_date, end_date, status, budget, participants_count, created_at, updated_at";

#[derive(Clone)]
pub struct HealthRepository {
    pool: PgPool,
}

impl HealthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  TFD
    // =========================================================================

    pub async fn list_referrals(
        &self,
        filter: &TfdFilter,
        page: &PageRequest,
    ) -> Result<Page<TfdReferral>, AppError> {
        let search = search_pattern(filter.search.as_deref());
        fetch_page(
            &self.pool,
            "tfd_referrals",
            |qb: &mut QueryBuilder<'static, Postgres>| {
                if let Some(status) = filter.status {
                    qb.push(" AND status = ").push_bind(status);
                }
                if let Some(city) = filter.destination_city.clone() {
                    qb.push(" AND destination_city = ").push_bind(city);
                }
                if let Some(specialty) = filter.specialty.clone() {
                    qb.push(" AND specialty = ").push_bind(specialty);
                }
                if let Some(from) = filter.from {
                    qb.push(" AND appointment_date >= ").push_bind(from);
                }
                if let Some(to) = filter.to {
                    qb.push(" AND appointment_date <= ").push_bind(to);
                }
                if let Some(pattern) = search.clone() {
                    qb.push(" AND (patient_name ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR patient_cpf ILIKE ")
                        .push_bind(pattern)
                        .push(")");
                }
            },
            page,
        )
        .await
    }

    pub async fn find_referral<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<TfdReferral>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let referral = sqlx::query_as::<_, TfdReferral>(&format!(
            "SELECT {} FROM tfd_referrals WHERE id = $1",
            TFD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(referral)
    }

    pub async fn find_referral_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<TfdReferral>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let referral = sqlx::query_as::<_, TfdReferral>(&format!(
            "SELECT {} FROM tfd_referrals WHERE id = $1 FOR UPDATE",
            TFD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(referral)
    }

    pub async fn create_referral<'e, E>(
        &self,
        executor: E,
        payload: &TfdPayload,
    ) -> Result<TfdReferral, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let referral = sqlx::query_as::<_, TfdReferral>(&format!(
            r#"
            INSERT INTO tfd_referrals (
                patient_name, patient_cpf, patient_phone, destination_city,
                specialty, hospital, appointment_date, needs_companion, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            TFD_COLUMNS
        ))
        .bind(&payload.patient_name)
        .bind(&payload.patient_cpf)
        .bind(&payload.patient_phone)
        .bind(&payload.destination_city)
        .bind(&payload.specialty)
        .bind(&payload.hospital)
        .bind(payload.appointment_date)
        .bind(payload.needs_companion)
        .bind(&payload.notes)
        .fetch_one(executor)
        .await?;
        Ok(referral)
    }

    pub async fn update_referral<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &TfdPayload,
    ) -> Result<Option<TfdReferral>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let referral = sqlx::query_as::<_, TfdReferral>(&format!(
            r#"
            UPDATE tfd_referrals
            SET patient_name = $2, patient_cpf = $3, patient_phone = $4, destination_city = $5,
                specialty = $6, hospital = $7, appointment_date = $8, needs_companion = $9,
                notes = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TFD_COLUMNS
        ))
        .bind(id)
        .bind(&payload.patient_name)
        .bind(&payload.patient_cpf)
        .bind(&payload.patient_phone)
        .bind(&payload.destination_city)
        .bind(&payload.specialty)
        .bind(&payload.hospital)
        .bind(payload.appointment_date)
        .bind(payload.needs_companion)
        .bind(&payload.notes)
        .fetch_optional(executor)
        .await?;
        Ok(referral)
    }

    pub async fn update_referral_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: TfdStatus,
    ) -> Result<TfdReferral, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let referral = sqlx::query_as::<_, TfdReferral>(&format!(
            "UPDATE tfd_referrals SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            TFD_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(referral)
    }

    /// Grava o transporte e move o encaminhamento para `transport_scheduled`.
    pub async fn assign_transport<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &AssignTransportPayload,
    ) -> Result<TfdReferral, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let referral = sqlx::query_as::<_, TfdReferral>(&format!(
            r#"
            UPDATE tfd_referrals
            SET vehicle = $2, driver_name = $3, departure_at = $4, cost_allowance = $5,
                status = 'transport_scheduled', updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TFD_COLUMNS
        ))
        .bind(id)
        .bind(&payload.vehicle)
        .bind(&payload.driver_name)
        .bind(payload.departure_at)
        .bind(payload.cost_allowance)
        .fetch_one(executor)
        .await?;
        Ok(referral)
    }

    pub async fn list_documents(&self, referral_id: Uuid) -> Result<Vec<TfdDocument>, AppError> {
        let documents = sqlx::query_as::<_, TfdDocument>(&format!(
            "SELECT {} FROM tfd_documents WHERE referral_id = $1 ORDER BY uploaded_at ASC",
            DOCUMENT_COLUMNS
        ))
        .bind(referral_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    pub async fn find_document(
        &self,
        referral_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<TfdDocument>, AppError> {
        let document = sqlx::query_as::<_, TfdDocument>(&format!(
            "SELECT {} FROM tfd_documents WHERE referral_id = $1 AND id = $2",
            DOCUMENT_COLUMNS
        ))
        .bind(referral_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(document)
    }

    pub async fn insert_document<'e, E>(
        &self,
        executor: E,
        referral_id: Uuid,
        document_kind: &str,
        file_name: &str,
        content_type: Option<&str>,
        storage_path: &str,
    ) -> Result<TfdDocument, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, TfdDocument>(&format!(
            r#"
            INSERT INTO tfd_documents (referral_id, document_kind, file_name, content_type, storage_path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(referral_id)
        .bind(document_kind)
        .bind(file_name)
        .bind(content_type)
        .bind(storage_path)
        .fetch_one(executor)
        .await?;
        Ok(document)
    }

    // =========================================================================
    //  PROGRAMAS DE SAÚDE
    // =========================================================================

    pub async fn list_programs(
        &self,
        filter: &ProgramFilter,
        page: &PageRequest,
    ) -> Result<Page<HealthProgram>, AppError> {
        let search = search_pattern(filter.search.as_deref());
        fetch_page(
            &self.pool,
            "health_programs",
            |qb: &mut QueryBuilder<'static, Postgres>| {
                if let Some(status) = filter.status {
                    qb.push(" AND status = ").push_bind(status);
                }
                if let Some(pattern) = search.clone() {
                    qb.push(" AND (name ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR coordinator ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR target_audience ILIKE ")
                        .push_bind(pattern)
                        .push(")");
                }
            },
            page,
        )
        .await
    }

    pub async fn find_program(&self, id: Uuid) -> Result<Option<HealthProgram>, AppError> {
        let program = sqlx::query_as::<_, HealthProgram>(&format!(
            "SELECT {} FROM health_programs WHERE id = $1",
            PROGRAM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(program)
    }

    pub async fn create_program<'e, E>(
        &self,
        executor: E,
        payload: &ProgramPayload,
    ) -> Result<HealthProgram, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let program = sqlx::query_as::<_, HealthProgram>(&format!(
            r#"
            INSERT INTO health_programs (
                name, description, coordinator, target_audience, start_date,
                end_date, status, budget, participants_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            PROGRAM_COLUMNS
        ))
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(&payload.coordinator)
        .bind(&payload.target_audience)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .bind(payload.status.unwrap_or(ProgramStatus::Planned))
        .bind(payload.budget)
        .bind(payload.participants_count.unwrap_or(0))
        .fetch_one(executor)
        .await?;
        Ok(program)
    }

    pub async fn update_program<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &ProgramPayload,
    ) -> Result<Option<HealthProgram>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let program = sqlx::query_as::<_, HealthProgram>(&format!(
            r#"
            UPDATE health_programs
            SET name = $2, description = $3, coordinator = $4, target_audience = $5,
                start_date = $6, end_date = $7, status = COALESCE($8, status), budget = $9,
                participants_count = COALESCE($10, participants_count), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROGRAM_COLUMNS
        ))
        .bind(id)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(&payload.coordinator)
        .bind(&payload.target_audience)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .bind(payload.status)
        .bind(payload.budget)
        .bind(payload.participants_count)
        .fetch_optional(executor)
        .await?;
        Ok(program)
    }
}

// src/db/dashboard_repo.rs

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::dashboard::{DashboardSummary, RequestStatusCount},
};

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Resumo geral do painel
    pub async fn get_summary(&self, today: NaiveDate) -> Result<DashboardSummary, AppError> {
        // Transação para ler todos os contadores do mesmo snapshot
        let mut tx = self.pool.begin().await?;

        // A. Solicitações por status
        let requests_by_status = sqlx::query_as::<_, RequestStatusCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM unified_requests
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        // B. Ouvidoria em aberto / vencida
        let (open_ouvidoria_cases, overdue_ouvidoria_cases): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status IN ('received', 'under_analysis')),
                COUNT(*) FILTER (WHERE status IN ('received', 'under_analysis') AND deadline < $1)
            FROM ouvidoria_cases
            "#,
        )
        .bind(today)
        .fetch_one(&mut *tx)
        .await?;

        // C. Conversas ativas
        let active_conversations: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE status = 'active'")
                .fetch_one(&mut *tx)
                .await?;

        // D. Matrículas aguardando análise
        let pending_enrollments: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE status = 'pending'")
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(DashboardSummary {
            requests_by_status,
            open_ouvidoria_cases,
            overdue_ouvidoria_cases,
            active_conversations,
            pending_enrollments,
        })
    }
}

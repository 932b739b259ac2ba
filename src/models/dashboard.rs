// src/models/dashboard.rs

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::requests::RequestStatus;

// Contagem de solicitações por status (linha do GROUP BY)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestStatusCount {
    pub status: RequestStatus,
    pub count: i64,
}

// Os cards do topo do painel
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub requests_by_status: Vec<RequestStatusCount>,
    pub open_ouvidoria_cases: i64,
    /// Manifestações pendentes com prazo vencido
    pub overdue_ouvidoria_cases: i64,
    pub active_conversations: i64,
    pub pending_enrollments: i64,
}

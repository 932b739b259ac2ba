// src/handlers/dashboard.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermDashboardRead, RequirePermission},
    },
    models::{dashboard::DashboardSummary, permissions::SystemModule},
};

inventory::submit! { SystemModule::new("dashboard", "Painel") }

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Contadores do painel inicial", body = DashboardSummary),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso ao painel")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermDashboardRead>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .dashboard_service
        .get_summary()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}

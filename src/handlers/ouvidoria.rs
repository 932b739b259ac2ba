// src/handlers/ouvidoria.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::begin_audited,
        error::{ApiError, AppError},
        pagination::{Page, PageParams},
        validation::CrossFieldRules,
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermOuvidoriaCreate, PermOuvidoriaRead, PermOuvidoriaUpdate, RequirePermission},
    },
    models::{
        ouvidoria::{
            AssignDepartmentPayload, CaseDetail, CaseFilter, CaseListItem, CreateCasePayload,
            RespondCasePayload, UpdateCaseStatusPayload, CASE_FIELDS,
        },
        permissions::SystemModule,
    },
};

inventory::submit! { SystemModule::new("ouvidoria", "Ouvidoria") }

// GET /api/ouvidoria
#[utoipa::path(
    get,
    path = "/api/ouvidoria",
    tag = "Ouvidoria",
    params(CaseFilter, PageParams),
    responses(
        (status = 200, description = "Manifestações com prazo e atraso calculados", body = Page<CaseListItem>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_cases(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOuvidoriaRead>,
    Query(filter): Query<CaseFilter>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .resolve(&CASE_FIELDS)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .ouvidoria_service
        .list(&filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// POST /api/ouvidoria
#[utoipa::path(
    post,
    path = "/api/ouvidoria",
    tag = "Ouvidoria",
    request_body = CreateCasePayload,
    responses(
        (status = 201, description = "Manifestação registrada com protocolo e prazo", body = CaseListItem),
        (status = 400, description = "Contato obrigatório quando não é anônima")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_case(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermOuvidoriaCreate>,
    Json(payload): Json<CreateCasePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let case = app_state
        .ouvidoria_service
        .create(&mut *tx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(case)))
}

// GET /api/ouvidoria/{id}
#[utoipa::path(
    get,
    path = "/api/ouvidoria/{id}",
    tag = "Ouvidoria",
    params(("id" = Uuid, Path, description = "ID da manifestação")),
    responses(
        (status = 200, description = "Manifestação com o histórico de andamento", body = CaseDetail),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_case(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOuvidoriaRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .ouvidoria_service
        .get_detail(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detail))
}

// PATCH /api/ouvidoria/{id}/status
#[utoipa::path(
    patch,
    path = "/api/ouvidoria/{id}/status",
    tag = "Ouvidoria",
    params(("id" = Uuid, Path, description = "ID da manifestação")),
    request_body = UpdateCaseStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = CaseListItem),
        (status = 422, description = "Transição não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_case_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermOuvidoriaUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCaseStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let case = app_state
        .ouvidoria_service
        .update_status(&mut *tx, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(case))
}

// POST /api/ouvidoria/{id}/respond
#[utoipa::path(
    post,
    path = "/api/ouvidoria/{id}/respond",
    tag = "Ouvidoria",
    params(("id" = Uuid, Path, description = "ID da manifestação")),
    request_body = RespondCasePayload,
    responses(
        (status = 200, description = "Resposta registrada; manifestação respondida", body = CaseListItem),
        (status = 422, description = "Manifestação já encerrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn respond_case(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermOuvidoriaUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondCasePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let case = app_state
        .ouvidoria_service
        .respond(&mut *tx, id, payload.response.trim())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(case))
}

// PATCH /api/ouvidoria/{id}/department
#[utoipa::path(
    patch,
    path = "/api/ouvidoria/{id}/department",
    tag = "Ouvidoria",
    params(("id" = Uuid, Path, description = "ID da manifestação")),
    request_body = AssignDepartmentPayload,
    responses(
        (status = 200, description = "Departamento responsável alterado", body = CaseListItem)
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_department(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermOuvidoriaUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignDepartmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let case = app_state
        .ouvidoria_service
        .assign_department(&mut *tx, id, payload.department.trim())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(case))
}

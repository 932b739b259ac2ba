// src/handlers/health.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::begin_audited,
        error::{ApiError, AppError},
        pagination::{Page, PageParams},
        validation::CrossFieldRules,
    },
    config::AppState,
    handlers::{file_response, read_upload, UploadForm},
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{
            PermHealthProgramsCreate, PermHealthProgramsRead, PermHealthProgramsUpdate,
            PermTfdCreate, PermTfdRead, PermTfdUpdate, RequirePermission,
        },
    },
    models::{
        health::{
            AssignTransportPayload, HealthProgram, ProgramFilter, ProgramPayload, TfdDetail,
            TfdDocument, TfdFilter, TfdPayload, TfdReferral, UpdateTfdStatusPayload,
            PROGRAM_FIELDS, TFD_FIELDS,
        },
        permissions::SystemModule,
    },
};

inventory::submit! { SystemModule::new("tfd", "TFD") }
inventory::submit! { SystemModule::new("health_programs", "Programas de Saúde") }

const DEFAULT_DOCUMENT_KIND: &str = "outro";

// =============================================================================
//  1. TFD (Tratamento Fora do Domicílio)
// =============================================================================

// GET /api/tfd
#[utoipa::path(
    get,
    path = "/api/tfd",
    tag = "Saúde",
    params(TfdFilter, PageParams),
    responses(
        (status = 200, description = "Encaminhamentos TFD", body = Page<TfdReferral>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_referrals(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermTfdRead>,
    Query(filter): Query<TfdFilter>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .resolve(&TFD_FIELDS)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .health_service
        .list_referrals(&filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// POST /api/tfd
#[utoipa::path(
    post,
    path = "/api/tfd",
    tag = "Saúde",
    request_body = TfdPayload,
    responses(
        (status = 201, description = "Encaminhamento aberto", body = TfdReferral),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_referral(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermTfdCreate>,
    Json(payload): Json<TfdPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let referral = app_state
        .health_service
        .create_referral(&mut *tx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(referral)))
}

// GET /api/tfd/{id}
#[utoipa::path(
    get,
    path = "/api/tfd/{id}",
    tag = "Saúde",
    params(("id" = Uuid, Path, description = "ID do encaminhamento")),
    responses(
        (status = 200, description = "Encaminhamento com documentos e próximas etapas", body = TfdDetail),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_referral(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermTfdRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .health_service
        .get_referral(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detail))
}

// PUT /api/tfd/{id}
#[utoipa::path(
    put,
    path = "/api/tfd/{id}",
    tag = "Saúde",
    params(("id" = Uuid, Path, description = "ID do encaminhamento")),
    request_body = TfdPayload,
    responses(
        (status = 200, description = "Encaminhamento atualizado", body = TfdReferral),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_referral(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermTfdUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TfdPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let referral = app_state
        .health_service
        .update_referral(&mut *tx, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(referral))
}

// PATCH /api/tfd/{id}/status
#[utoipa::path(
    patch,
    path = "/api/tfd/{id}/status",
    tag = "Saúde",
    params(("id" = Uuid, Path, description = "ID do encaminhamento")),
    request_body = UpdateTfdStatusPayload,
    responses(
        (status = 200, description = "Etapa alterada", body = TfdReferral),
        (status = 422, description = "Transição não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_referral_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermTfdUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTfdStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let referral = app_state
        .health_service
        .update_status(&mut *tx, id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(referral))
}

// POST /api/tfd/{id}/transport
#[utoipa::path(
    post,
    path = "/api/tfd/{id}/transport",
    tag = "Saúde",
    params(("id" = Uuid, Path, description = "ID do encaminhamento")),
    request_body = AssignTransportPayload,
    responses(
        (status = 200, description = "Transporte agendado", body = TfdReferral),
        (status = 422, description = "Encaminhamento ainda não aprovado")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_transport(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermTfdUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignTransportPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let referral = app_state
        .health_service
        .assign_transport(&mut *tx, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(referral))
}

// POST /api/tfd/{id}/documents
#[utoipa::path(
    post,
    path = "/api/tfd/{id}/documents",
    tag = "Saúde",
    params(("id" = Uuid, Path, description = "ID do encaminhamento")),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Documento anexado", body = TfdDocument),
        (status = 400, description = "Arquivo ausente, vazio ou grande demais")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_document(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermTfdUpdate>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (file, fields) = read_upload(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let kind = fields
        .get("kind")
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .unwrap_or(DEFAULT_DOCUMENT_KIND);

    let tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let document = app_state
        .health_service
        .upload_document(tx, id, kind, file)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(document)))
}

// GET /api/tfd/{id}/documents/{document_id}
#[utoipa::path(
    get,
    path = "/api/tfd/{id}/documents/{document_id}",
    tag = "Saúde",
    params(
        ("id" = Uuid, Path, description = "ID do encaminhamento"),
        ("document_id" = Uuid, Path, description = "ID do documento")
    ),
    responses(
        (status = 200, description = "Conteúdo do documento", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 404, description = "Documento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn download_document(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermTfdRead>,
    Path((id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ApiError> {
    let (document, bytes) = app_state
        .health_service
        .download_document(id, document_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let content_type = document
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");
    Ok(file_response(bytes, content_type, &document.file_name))
}

// =============================================================================
//  2. PROGRAMAS DE SAÚDE
// =============================================================================

// GET /api/health-programs
#[utoipa::path(
    get,
    path = "/api/health-programs",
    tag = "Saúde",
    params(ProgramFilter, PageParams),
    responses(
        (status = 200, description = "Programas de saúde", body = Page<HealthProgram>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_programs(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermHealthProgramsRead>,
    Query(filter): Query<ProgramFilter>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .resolve(&PROGRAM_FIELDS)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .health_service
        .list_programs(&filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// GET /api/health-programs/{id}
#[utoipa::path(
    get,
    path = "/api/health-programs/{id}",
    tag = "Saúde",
    params(("id" = Uuid, Path, description = "ID do programa")),
    responses(
        (status = 200, description = "Programa", body = HealthProgram),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_program(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermHealthProgramsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let program = app_state
        .health_service
        .get_program(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(program))
}

// POST /api/health-programs
#[utoipa::path(
    post,
    path = "/api/health-programs",
    tag = "Saúde",
    request_body = ProgramPayload,
    responses(
        (status = 201, description = "Programa criado", body = HealthProgram),
        (status = 400, description = "Período inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_program(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermHealthProgramsCreate>,
    Json(payload): Json<ProgramPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let program = app_state
        .health_service
        .create_program(&mut *tx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(program)))
}

// PUT /api/health-programs/{id}
#[utoipa::path(
    put,
    path = "/api/health-programs/{id}",
    tag = "Saúde",
    params(("id" = Uuid, Path, description = "ID do programa")),
    request_body = ProgramPayload,
    responses(
        (status = 200, description = "Programa atualizado", body = HealthProgram),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_program(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermHealthProgramsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProgramPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let program = app_state
        .health_service
        .update_program(&mut *tx, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(program))
}
